//! Controller lifecycle.
//!
//! ```text
//! Created -> Starting -> Running -> Draining  -> Stopped
//!                |                \-> Cancelled -> Stopped
//!                \-> Failed (cache never synced)
//! ```
//!
//! `start` waits for the resource cache and spawns the dispatch task;
//! `run_once` waits for the cache, works the backlog off in place and returns.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::Dispatcher;
use super::EventNotifier;
use super::EventQueue;
use super::ExpressionEvaluator;
use super::ObjectFilter;
use super::PathExpressionEvaluator;
use crate::CacheError;
use crate::DispatchConfig;
use crate::Error;
use crate::EventHandler;
use crate::ResourceCache;
use crate::Result;
use crate::Selector;
use crate::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    /// Waiting for the resource cache to sync
    Starting,
    /// Dispatch loop active
    Running,
    /// Queue expired, in-flight iteration finishing
    Draining,
    /// Stop signal received, loop exiting without draining
    Cancelled,
    Stopped,
    /// Startup synchronisation failed; the controller never ran
    Failed,
}

pub struct Controller<C, H>
where
    C: ResourceCache,
    H: EventHandler<C::Object>,
{
    id: Arc<str>,
    selector: Selector,
    config: DispatchConfig,
    queue: Arc<EventQueue>,
    cache: Arc<C>,
    filter: Arc<ObjectFilter>,
    dispatcher: Arc<Dispatcher<C, H>>,
    state: Arc<watch::Sender<ControllerState>>,
}

impl<C, H> fmt::Debug for Controller<C, H>
where
    C: ResourceCache,
    H: EventHandler<C::Object>,
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("state", &*self.state.borrow())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}

impl<C, H> Controller<C, H>
where
    C: ResourceCache,
    H: EventHandler<C::Object>,
{
    /// Builds a controller using the built-in path expression evaluator for
    /// exclusion rules.
    pub fn new(
        selector: Selector,
        config: DispatchConfig,
        cache: Arc<C>,
        handler: Arc<H>,
    ) -> Result<Self> {
        Self::with_evaluator(selector, config, cache, handler, Arc::new(PathExpressionEvaluator))
    }

    /// Builds a controller from loaded [`Settings`].
    pub fn from_settings(
        settings: Settings,
        cache: Arc<C>,
        handler: Arc<H>,
    ) -> Result<Self> {
        Self::new(settings.selector, settings.dispatch, cache, handler)
    }

    pub fn with_evaluator(
        selector: Selector,
        config: DispatchConfig,
        cache: Arc<C>,
        handler: Arc<H>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Result<Self> {
        selector.validate()?;
        config.validate()?;

        let id: Arc<str> = selector.controller_id().into();
        let queue = Arc::new(EventQueue::new());
        let filter = Arc::new(ObjectFilter::with_evaluator(&selector, evaluator));
        let dispatcher = Arc::new(Dispatcher::new(
            id.clone(),
            queue.clone(),
            cache.clone(),
            filter.clone(),
            handler,
        ));
        let (state, _) = watch::channel(ControllerState::Created);

        debug!(controller_id = %id, mode = ?config.mode, "controller created");
        Ok(Self {
            id,
            selector,
            config,
            queue,
            cache,
            filter,
            dispatcher,
            state: Arc::new(state),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn filter(&self) -> &ObjectFilter {
        &self.filter
    }

    /// Entry points for the watch feeding this controller.
    pub fn notifier(&self) -> EventNotifier<C::Object> {
        EventNotifier::new(self.id.clone(), self.queue.clone())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Waits for the cache, then spawns the dispatch loop. The loop runs
    /// until `cancel` fires or the returned handle drains it.
    pub async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<ControllerHandle> {
        self.wait_for_cache_sync(&cancel).await?;

        self.state.send_replace(ControllerState::Running);
        info!(controller_id = %self.id, "dispatch loop started");

        let dispatcher = self.dispatcher.clone();
        let config = self.config.clone();
        let state = self.state.clone();
        let id = self.id.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            dispatcher.run(&config, &task_cancel).await;
            if task_cancel.is_cancelled() {
                state.send_replace(ControllerState::Cancelled);
            }
            state.send_replace(ControllerState::Stopped);
            info!(controller_id = %id, "dispatch loop stopped");
        });

        Ok(ControllerHandle {
            id: self.id.clone(),
            queue: self.queue.clone(),
            cancel,
            state: self.state.clone(),
            task,
        })
    }

    /// Waits for the cache, processes everything queued (at least one pass,
    /// even over an empty queue), expires the queue and returns.
    pub async fn run_once(&self) -> Result<()> {
        let cancel = CancellationToken::new();
        self.wait_for_cache_sync(&cancel).await?;

        self.state.send_replace(ControllerState::Running);
        info!(controller_id = %self.id, queue_len = self.queue.len(), "draining queue once");
        self.dispatcher.drain(&self.config, &cancel).await;

        self.state.send_replace(ControllerState::Stopped);
        info!(controller_id = %self.id, "run once complete");
        Ok(())
    }

    async fn wait_for_cache_sync(
        &self,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let current = self.state();
        if current != ControllerState::Created {
            return Err(Error::Fatal(format!(
                "[{}] controller cannot start from state {current:?}",
                self.id
            )));
        }
        self.state.send_replace(ControllerState::Starting);

        let sync = timeout(self.config.cache_sync_timeout(), self.cache.wait_for_cache_sync());
        let readiness = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.state.send_replace(ControllerState::Cancelled);
                self.state.send_replace(ControllerState::Stopped);
                return Err(Error::Fatal(format!("[{}] cancelled while waiting for caches to sync", self.id)));
            }
            result = sync => result.unwrap_or_default(),
        };

        if readiness.is_empty() || readiness.iter().any(|ready| !ready) {
            error!(controller_id = %self.id, ?readiness, "Timed out waiting for caches to sync");
            self.state.send_replace(ControllerState::Failed);
            return Err(CacheError::NotSynced {
                controller_id: self.id.to_string(),
            }
            .into());
        }

        info!(controller_id = %self.id, informers = readiness.len(), "Informer is ready and synced");
        Ok(())
    }
}

/// Handle on a running dispatch loop.
#[derive(Debug)]
pub struct ControllerHandle {
    id: Arc<str>,
    queue: Arc<EventQueue>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ControllerState>>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Controlled shutdown: expire the queue so no more events are accepted
    /// or delivered, let the current iteration finish, wait for the loop.
    pub async fn drain(self) -> Result<()> {
        info!(controller_id = %self.id, queue_len = self.queue.len(), "draining controller");
        self.state.send_replace(ControllerState::Draining);
        self.queue.set_expired();
        self.task.await?;
        Ok(())
    }

    /// Fires the stop signal; the loop exits without touching the backlog.
    pub async fn cancel(self) -> Result<()> {
        info!(controller_id = %self.id, "cancelling controller");
        self.cancel.cancel();
        self.task.await?;
        Ok(())
    }

    /// Waits for the loop to end on its own (external cancellation).
    pub async fn wait(self) -> Result<()> {
        self.task.await?;
        Ok(())
    }
}
