//! User callbacks.
//!
//! Single-item dispatch calls `on_add`/`on_update`/`on_delete`; batched
//! dispatch calls the `_batch` variants. Every method defaults to a no-op, so
//! an implementation only overrides what it cares about.
//!
//! Callbacks run on the dispatch task. A panic is caught and logged and the
//! loop moves on, but a slow callback stalls the queue.

pub trait EventHandler<T>: Send + Sync + 'static {
    fn on_add(
        &self,
        _obj: T,
    ) {
    }

    fn on_update(
        &self,
        _obj: T,
    ) {
    }

    fn on_delete(
        &self,
        _obj: T,
    ) {
    }

    fn on_add_batch(
        &self,
        _objs: Vec<T>,
    ) {
    }

    fn on_update_batch(
        &self,
        _objs: Vec<T>,
    ) {
    }

    fn on_delete_batch(
        &self,
        _objs: Vec<T>,
    ) {
    }
}

/// Handler with no registered callbacks
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl<T> EventHandler<T> for NoopHandler {}
