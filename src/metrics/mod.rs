use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;


lazy_static! {
    pub static ref EVENTS_ENQUEUED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_enqueued", "Watch notifications accepted into the event queue"),
        &["controller_id", "event_type"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_DISPATCHED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_dispatched", "Objects handed to an event handler callback"),
        &["controller_id", "event_type"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_dropped", "Events dropped before reaching a callback"),
        &["controller_id", "reason"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_DEFERRED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_deferred", "Events re-queued because they did not match the batch type"),
        &["controller_id"]
    )
    .expect("metric can not be created");

    pub static ref CALLBACK_PANICS: IntCounterVec = IntCounterVec::new(
        Opts::new("callback_panics", "Event handler callbacks that panicked"),
        &["controller_id", "event_type"]
    )
    .expect("metric can not be created");

    pub static ref FILTER_NON_BOOLEAN_RESULTS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "filter_non_boolean_results",
            "Exclusion expressions whose result was not a boolean and counted as false"
        ),
        &["expression"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("shim".to_string()), None)
            .expect("registry can be created");
        register_metrics(&registry).expect("collector can be registered");
        registry
    };
}

/// Drop reasons used as `events_dropped` label values
pub(crate) mod drop_reason {
    pub const LOOKUP_ERROR: &str = "lookup_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const FILTERED: &str = "filtered";
    pub const BATCH_ABORTED: &str = "batch_aborted";
}

/// Registers every shim collector on `registry`.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(EVENTS_ENQUEUED.clone()))?;
    registry.register(Box::new(EVENTS_DISPATCHED.clone()))?;
    registry.register(Box::new(EVENTS_DROPPED.clone()))?;
    registry.register(Box::new(EVENTS_DEFERRED.clone()))?;
    registry.register(Box::new(CALLBACK_PANICS.clone()))?;
    registry.register(Box::new(FILTER_NON_BOOLEAN_RESULTS.clone()))?;
    Ok(())
}

/// Renders the crate registry in the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode shim metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("shim metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
