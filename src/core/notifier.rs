use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use super::deletion_handling_key;
use super::meta_namespace_key;
use super::DeletedObject;
use super::Event;
use super::EventQueue;
use super::EventType;
use crate::metrics::EVENTS_ENQUEUED;
use crate::Result;

/// Inbound side of a controller: the add/update/delete entry points a watch
/// calls. Cheap to clone; every clone feeds the same queue.
pub struct EventNotifier<T> {
    controller_id: Arc<str>,
    queue: Arc<EventQueue>,
    _object: PhantomData<fn(&T)>,
}

impl<T> Clone for EventNotifier<T> {
    fn clone(&self) -> Self {
        Self {
            controller_id: self.controller_id.clone(),
            queue: self.queue.clone(),
            _object: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EventNotifier<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("controller_id", &self.controller_id)
            .finish()
    }
}

impl<T: Serialize> EventNotifier<T> {
    pub(crate) fn new(
        controller_id: Arc<str>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            controller_id,
            queue,
            _object: PhantomData,
        }
    }

    pub fn on_add(
        &self,
        obj: &T,
    ) {
        self.enqueue(meta_namespace_key(obj), EventType::Create);
    }

    /// The key comes from the previous version of the object.
    pub fn on_update(
        &self,
        old: &T,
        _new: &T,
    ) {
        self.enqueue(meta_namespace_key(old), EventType::Update);
    }

    pub fn on_delete(
        &self,
        deleted: &DeletedObject<T>,
    ) {
        self.enqueue(deletion_handling_key(deleted), EventType::Delete);
    }

    fn enqueue(
        &self,
        key: Result<String>,
        event_type: EventType,
    ) {
        let key = match key {
            Ok(key) => key,
            Err(e) => {
                trace!(
                    controller_id = %self.controller_id,
                    event_type = %event_type,
                    "notification dropped: {}",
                    e
                );
                return;
            }
        };

        if self.queue.insert(Event::new(key, event_type)) {
            EVENTS_ENQUEUED
                .with_label_values(&[&*self.controller_id, event_type.as_str()])
                .inc();
        }
    }
}
