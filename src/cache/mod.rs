//! 响应缓存模块：跨运行持久化的请求应答存储（continual 模式）。
//!
//! # Persistent Response Cache
//!
//! Durable, process-wide map from a request identity to a previously produced
//! answer string. Backing continual mode: when an evaluation run is restarted,
//! answered documents are served from the cache instead of the remote API.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestKey`] | Composite (task, split, doc id) request identity |
//! | [`ResponseCache`] | Write-through JSON-file-backed store |
//! | [`CacheMode`] | Whether the store resumed from a prior run |
//!
//! ## Semantics
//!
//! - Load is all-or-nothing at startup; no partial or streaming read.
//! - Every `store` rewrites the full file — last full write wins.
//! - An empty-string entry records a prior permanent failure. It is **not**
//!   a hit on lookup-for-reuse: the adapter re-requests such documents.

mod key;
mod store;

pub use key::RequestKey;
pub use store::{CacheMode, ResponseCache};
