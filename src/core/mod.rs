//! # Core Navigation Logic
//!
//! This module contains the router's business logic.
//! It knows nothing about any specific browser binding.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • router (lifecycle)   │
//!                    │  • cache (persisted)    │
//!                    │  • state (per cycle)    │
//!                    │  • document (parsing)   │
//!                    └───────────┬─────────────┘
//!                                │ host traits
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Browser   │      │  In-memory │      │    HTTP    │
//!     │  bindings  │      │    host    │      │ API client │
//!     │  (future)  │      │ (CLI/test) │      │ (reqwest)  │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`router`]: `NavigationController`, which drives every navigation
//! - [`lifecycle`]: events, phases and announcements, as data
//! - [`cache`]: `PersistentCache`, mirrored to session storage
//! - [`storage`]: the session storage seam and its backends
//! - [`state`]: `EphemeralStateStore`, state that expires after a cycle
//! - [`document`]: page fragment extraction
//! - [`nav_tree`]: navigation tree and root path resolution
//! - [`config`]: settings and their override hierarchy

pub mod cache;
pub mod config;
pub mod document;
pub mod lifecycle;
pub mod nav_tree;
pub mod router;
pub mod state;
pub mod storage;
