//! pagerouter library exports for testing

pub mod api;
pub mod core;
pub mod host;

#[cfg(test)]
pub mod test_support;

pub use crate::core::cache::{CacheSlot, PersistentCache};
pub use crate::core::router::{Host, NavError, NavigationController};
