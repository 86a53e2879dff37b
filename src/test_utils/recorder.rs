use parking_lot::Mutex;
use serde_json::Value;

use crate::meta_namespace_key;
use crate::EventHandler;

/// One observed callback, with objects reduced to their keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(String),
    Update(String),
    Delete(String),
    AddBatch(Vec<String>),
    UpdateBatch(Vec<String>),
    DeleteBatch(Vec<String>),
}

/// Event handler that records every callback. Panics when handed the object
/// stored under `panic_on`.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    panic_on: Option<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking_on(key: &str) -> Self {
        Self {
            panic_on: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    fn key(
        &self,
        obj: &Value,
    ) -> String {
        let key = meta_namespace_key(obj).unwrap();
        if self.panic_on.as_deref() == Some(key.as_str()) {
            panic!("handler refused {key}");
        }
        key
    }

    fn keys(
        &self,
        objs: &[Value],
    ) -> Vec<String> {
        objs.iter().map(|obj| self.key(obj)).collect()
    }

    fn record(
        &self,
        call: Call,
    ) {
        self.calls.lock().push(call);
    }
}

impl EventHandler<Value> for Recorder {
    fn on_add(
        &self,
        obj: Value,
    ) {
        self.record(Call::Add(self.key(&obj)));
    }

    fn on_update(
        &self,
        obj: Value,
    ) {
        self.record(Call::Update(self.key(&obj)));
    }

    fn on_delete(
        &self,
        obj: Value,
    ) {
        self.record(Call::Delete(self.key(&obj)));
    }

    fn on_add_batch(
        &self,
        objs: Vec<Value>,
    ) {
        self.record(Call::AddBatch(self.keys(&objs)));
    }

    fn on_update_batch(
        &self,
        objs: Vec<Value>,
    ) {
        self.record(Call::UpdateBatch(self.keys(&objs)));
    }

    fn on_delete_batch(
        &self,
        objs: Vec<Value>,
    ) {
        self.record(Call::DeleteBatch(self.keys(&objs)));
    }
}

/// Shorthand for a list of keys.
pub fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}
