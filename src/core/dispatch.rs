//! The dispatch loop: pop events, resolve them against the resource cache,
//! filter, and hand the survivors to the event handler.
//!
//! Exactly one task drives a [`Dispatcher`]; it is the only consumer of its
//! queue. The batched iteration re-queues events of a foreign type at the
//! tail, which is only order-safe with a single consumer.

use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::debug_span;
use tracing::error;
use tracing::trace;

use super::Event;
use super::EventQueue;
use super::EventType;
use super::ObjectFilter;
use crate::metrics::drop_reason;
use crate::metrics::CALLBACK_PANICS;
use crate::metrics::EVENTS_DEFERRED;
use crate::metrics::EVENTS_DISPATCHED;
use crate::metrics::EVENTS_DROPPED;
use crate::DispatchConfig;
use crate::DispatchMode;
use crate::EventHandler;
use crate::ResourceCache;

pub struct Dispatcher<C, H>
where
    C: ResourceCache,
    H: EventHandler<C::Object>,
{
    controller_id: Arc<str>,
    queue: Arc<EventQueue>,
    cache: Arc<C>,
    filter: Arc<ObjectFilter>,
    handler: Arc<H>,
}

impl<C, H> Dispatcher<C, H>
where
    C: ResourceCache,
    H: EventHandler<C::Object>,
{
    pub(crate) fn new(
        controller_id: Arc<str>,
        queue: Arc<EventQueue>,
        cache: Arc<C>,
        filter: Arc<ObjectFilter>,
        handler: Arc<H>,
    ) -> Self {
        Self {
            controller_id,
            queue,
            cache,
            filter,
            handler,
        }
    }

    /// Runs until the queue expires or `cancel` fires.
    pub(crate) async fn run(
        &self,
        config: &DispatchConfig,
        cancel: &CancellationToken,
    ) {
        match config.mode {
            DispatchMode::Single => while self.process_next(cancel).await {},
            DispatchMode::Batched => {
                let mut ticker = tokio::time::interval(config.batch_interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!(controller_id = %self.controller_id, "Breaking: on signal");
                            break;
                        }
                        _ = ticker.tick() => {
                            if !self.process_batch(config.max_batch, cancel) {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Works the backlog off, then expires the queue and returns. At least
    /// one pass is made even when the queue starts out empty.
    pub(crate) async fn drain(
        &self,
        config: &DispatchConfig,
        cancel: &CancellationToken,
    ) {
        match config.mode {
            DispatchMode::Single => loop {
                self.queue.expire_if_drained();
                if !self.process_next(cancel).await {
                    break;
                }
            },
            DispatchMode::Batched => {
                while self.process_batch(config.max_batch, cancel) {
                    if self.queue.expire_if_drained() {
                        break;
                    }
                }
            }
        }
    }

    /// Single-item iteration. Returns `false` once the queue signalled
    /// expiry or cancellation.
    pub async fn process_next(
        &self,
        cancel: &CancellationToken,
    ) -> bool {
        match self.queue.pop(cancel).await {
            Some(event) => {
                self.dispatch_one(event);
                true
            }
            None => {
                debug!(controller_id = %self.controller_id, "Breaking: on quit");
                false
            }
        }
    }

    fn dispatch_one(
        &self,
        event: Event,
    ) {
        let span = debug_span!(
            "mainloop",
            controller_id = %self.controller_id,
            queue_len = self.queue.len(),
            event_key = %event.key,
            event_type = %event.event_type,
        );
        let _enter = span.enter();
        trace!("mainloop: running from top");

        let obj = match self.cache.get_by_key(&event.key) {
            Ok(Some(obj)) => obj,
            Ok(None) => {
                debug!("object skipped because it was not found");
                self.dropped(drop_reason::NOT_FOUND, 1);
                return;
            }
            Err(e) => {
                error!("error fetching object from resource cache: {}", e);
                self.dropped(drop_reason::LOOKUP_ERROR, 1);
                return;
            }
        };

        if !self.filter.accepts(&obj) {
            debug!("object skipped because it matches filter");
            self.dropped(drop_reason::FILTERED, 1);
            return;
        }

        let handler = &self.handler;
        self.invoke(event.event_type, 1, || match event.event_type {
            EventType::Create => handler.on_add(obj),
            EventType::Update => handler.on_update(obj),
            EventType::Delete => handler.on_delete(obj),
        });
    }

    /// Batched iteration over at most `max_batch` events.
    ///
    /// The first popped event fixes the batch type; events of another type
    /// go back to the tail for a later iteration. A failed or missing lookup
    /// abandons the whole batch. Returns `false` once the queue signalled
    /// expiry or cancellation.
    pub fn process_batch(
        &self,
        max_batch: usize,
        cancel: &CancellationToken,
    ) -> bool {
        if self.queue.is_expired() || cancel.is_cancelled() {
            debug!(controller_id = %self.controller_id, "Breaking: on quit");
            return false;
        }

        // one lock: n = min(len, max_batch) and the pops happen atomically
        let Some(popped) = self.queue.take_front(max_batch) else {
            debug!(controller_id = %self.controller_id, "Breaking: on quit");
            return false;
        };
        if popped.is_empty() {
            trace!(controller_id = %self.controller_id, "batch tick on empty queue");
            return true;
        }

        let mut batch_type = None;
        let mut members = Vec::with_capacity(popped.len());
        for event in popped {
            match batch_type {
                None => {
                    batch_type = Some(event.event_type);
                    members.push(event);
                }
                Some(t) if t == event.event_type => members.push(event),
                Some(_) => {
                    trace!(
                        controller_id = %self.controller_id,
                        event_key = %event.key,
                        event_type = %event.event_type,
                        "deferred to a later batch"
                    );
                    EVENTS_DEFERRED.with_label_values(&[&*self.controller_id]).inc();
                    self.queue.insert(event);
                }
            }
        }

        if let Some(batch_type) = batch_type {
            let span = debug_span!(
                "mainloop",
                controller_id = %self.controller_id,
                queue_len = self.queue.len(),
                batch_type = %batch_type,
                batch_len = members.len(),
            );
            span.in_scope(|| self.dispatch_batch(batch_type, members));
        }
        true
    }

    fn dispatch_batch(
        &self,
        batch_type: EventType,
        members: Vec<Event>,
    ) {
        let mut objects = Vec::with_capacity(members.len());
        for event in &members {
            match self.cache.get_by_key(&event.key) {
                Ok(Some(obj)) => {
                    if self.filter.accepts(&obj) {
                        objects.push(obj);
                    } else {
                        debug!(event_key = %event.key, "object skipped because it matches filter");
                        self.dropped(drop_reason::FILTERED, 1);
                    }
                }
                Ok(None) => {
                    if batch_type != EventType::Delete {
                        debug!(event_key = %event.key, "object not found, batch abandoned");
                    }
                    self.dropped(drop_reason::BATCH_ABORTED, members.len());
                    return;
                }
                Err(e) => {
                    error!(
                        event_key = %event.key,
                        "error fetching object from resource cache, batch abandoned: {}",
                        e
                    );
                    self.dropped(drop_reason::BATCH_ABORTED, members.len());
                    return;
                }
            }
        }

        let handler = &self.handler;
        let count = objects.len();
        self.invoke(batch_type, count, move || match batch_type {
            EventType::Create => handler.on_add_batch(objects),
            EventType::Update => handler.on_update_batch(objects),
            EventType::Delete => handler.on_delete_batch(objects),
        });
    }

    fn invoke(
        &self,
        event_type: EventType,
        count: usize,
        callback: impl FnOnce(),
    ) {
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(()) => EVENTS_DISPATCHED
                .with_label_values(&[&*self.controller_id, event_type.as_str()])
                .inc_by(count as u64),
            Err(_) => {
                error!(event_type = %event_type, "event handler panicked, continuing");
                CALLBACK_PANICS
                    .with_label_values(&[&*self.controller_id, event_type.as_str()])
                    .inc();
            }
        }
    }

    fn dropped(
        &self,
        reason: &str,
        count: usize,
    ) {
        EVENTS_DROPPED
            .with_label_values(&[&*self.controller_id, reason])
            .inc_by(count as u64);
    }
}
