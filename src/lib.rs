//! A generic controller shim for watched Kubernetes-style resources.
//!
//! Change notifications from a watch are turned into keyed events, queued,
//! resolved against a resource cache, filtered by namespace and exclusion
//! expressions, and dispatched to user callbacks one at a time or in
//! same-type batches.
//!
//! ```text
//! watch --> EventNotifier --> EventQueue --> Dispatcher --> EventHandler
//!                                               |
//!                                  ResourceCache + ObjectFilter
//! ```

mod cache;
mod config;
mod core;
mod errors;
mod handler;
pub mod metrics;

pub use core::*;

pub use cache::*;
pub use config::*;
pub use errors::*;
pub use handler::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
