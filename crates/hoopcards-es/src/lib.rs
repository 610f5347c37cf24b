// Elasticsearch backend for the hoopcards document store.

pub mod client;
pub mod query;
pub mod retry;

pub use client::EsStore;
pub use retry::RetryPolicy;
