use std::fmt;

/// Kind of change a queued event announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Create,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued change notification. Only the key travels through the queue; the
/// object itself is resolved from the resource cache at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub key: String,
    pub event_type: EventType,
}

impl Event {
    pub fn new(
        key: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            key: key.into(),
            event_type,
        }
    }

    pub fn create(key: impl Into<String>) -> Self {
        Self::new(key, EventType::Create)
    }

    pub fn update(key: impl Into<String>) -> Self {
        Self::new(key, EventType::Update)
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(key, EventType::Delete)
    }
}

/// Payload of a delete notification.
///
/// A watch that missed the actual deletion only knows the last key it saw,
/// optionally with a stale copy of the object.
#[derive(Debug, Clone)]
pub enum DeletedObject<T> {
    Object(T),
    Tombstone { key: String, object: Option<T> },
}
