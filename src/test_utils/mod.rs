//! Shared fixtures for the unit tests: object builders, a recording event
//! handler and a canned resource cache.
mod common;
mod recorder;

pub use common::*;
pub use recorder::*;
