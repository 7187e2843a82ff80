pub mod client;
pub mod types;

pub use client::{ApiClient, HttpApiClient};
pub use types::{ApiError, CollectionQuery, Format};
