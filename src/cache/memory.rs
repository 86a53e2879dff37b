use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use super::ResourceCache;
use crate::meta_namespace_key;
use crate::Result;

/// A process-local [`ResourceCache`] fed by whoever owns the watch.
///
/// Objects are keyed the same way the notifier keys events, so an object
/// stored with [`InMemoryCache::upsert`] resolves from the events it produced.
pub struct InMemoryCache<T> {
    objects: RwLock<HashMap<String, T>>,
    synced: watch::Sender<bool>,
}

impl<T> fmt::Debug for InMemoryCache<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("len", &self.objects.read().len())
            .field("synced", &*self.synced.borrow())
            .finish()
    }
}

impl<T> Default for InMemoryCache<T> {
    fn default() -> Self {
        let (synced, _) = watch::channel(false);
        Self {
            objects: RwLock::new(HashMap::new()),
            synced,
        }
    }
}

impl<T> InMemoryCache<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `obj` under its `namespace/name` key and returns the key.
    pub fn upsert(
        &self,
        obj: T,
    ) -> Result<String> {
        let key = meta_namespace_key(&obj)?;
        self.objects.write().insert(key.clone(), obj);
        Ok(key)
    }

    pub fn insert(
        &self,
        key: impl Into<String>,
        obj: T,
    ) {
        self.objects.write().insert(key.into(), obj);
    }

    pub fn remove(
        &self,
        key: &str,
    ) -> Option<T> {
        self.objects.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Signals that the initial listing is complete.
    pub fn mark_synced(&self) {
        debug!(objects = self.len(), "in-memory cache marked as synced");
        self.synced.send_replace(true);
    }

    pub fn is_synced(&self) -> bool {
        *self.synced.borrow()
    }
}

#[async_trait]
impl<T> ResourceCache for InMemoryCache<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    type Object = T;

    fn get_by_key(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        Ok(self.objects.read().get(key).cloned())
    }

    async fn wait_for_cache_sync(&self) -> Vec<bool> {
        let mut synced = self.synced.subscribe();
        let ready = synced.wait_for(|ready| *ready).await.is_ok();
        vec![ready]
    }
}
