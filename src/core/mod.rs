mod controller;
mod dispatch;
mod event;
mod expression;
mod filter;
mod key;
mod notifier;
mod queue;

pub use controller::*;
pub use dispatch::*;
pub use event::*;
pub use expression::*;
pub use filter::*;
pub use key::*;
pub use notifier::*;
pub use queue::*;

#[cfg(test)]
mod key_test;
#[cfg(test)]
mod queue_test;
