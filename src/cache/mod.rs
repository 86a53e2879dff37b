//! Read side of the watched resource collection.
//!
//! The controller never writes to the cache. It asks for objects by key and
//! waits, once, for the cache to report that its initial listing completed.

mod memory;
pub use memory::*;

#[cfg(test)]
mod memory_test;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::Result;

#[cfg_attr(test, automock(type Object = serde_json::Value;))]
#[async_trait]
pub trait ResourceCache: Send + Sync + 'static {
    type Object: Serialize + Clone + Send + Sync + 'static;

    /// Point lookup. `Ok(None)` means the key is unknown (stale or deleted).
    fn get_by_key(
        &self,
        key: &str,
    ) -> Result<Option<Self::Object>>;

    fn contains_key(
        &self,
        key: &str,
    ) -> Result<bool> {
        Ok(self.get_by_key(key)?.is_some())
    }

    /// Blocks until every informer backing this cache finished its initial
    /// sync. One readiness flag per informer; any `false` is fatal to startup.
    async fn wait_for_cache_sync(&self) -> Vec<bool>;
}
