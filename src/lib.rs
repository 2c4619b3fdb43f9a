//! # gemini-eval
//!
//! 将 Gemini 生成式 API 适配到多模态评测框架模型接口的适配器库。
//!
//! Adapter library that plugs the Google Gemini generative API into a
//! benchmark-evaluation harness's model interface, with durable response
//! caching for resumable runs and multimodal payload construction
//! (interleaving text with uploaded image/audio/video media).
//!
//! ## Overview
//!
//! The harness hands over batches of requests; for each one the adapter
//! checks the persistent cache, resolves the document's media into the
//! representation the service expects, issues the generation call under a
//! bounded retry budget, releases uploaded video handles, and records the
//! answer write-through. Remote failures degrade to empty answers so an
//! evaluation run always completes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_eval::{AdapterConfig, EvalModel, GeminiAdapter, GenerateRequest, MediaItem};
//!
//! #[tokio::main]
//! async fn main() -> gemini_eval::Result<()> {
//!     let mut model = GeminiAdapter::new(AdapterConfig::new())?;
//!
//!     let requests = vec![
//!         GenerateRequest::new("What happens in this clip?", "mvbench", "test", 0)
//!             .with_resolver(|| vec![MediaItem::video("/data/clip_0.mp4")]),
//!     ];
//!     let answers = model.generate_until(requests).await?;
//!     println!("{}", answers[0]);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | The request-processing loop behind the harness interface |
//! | [`cache`] | Persistent response cache for continual mode |
//! | [`client`] | Gemini REST transport (generation + file service) |
//! | [`config`] | Adapter configuration and generation-parameter defaults |
//! | [`harness`] | Host-framework model contract and request types |
//! | [`media`] | Tagged media union, payload parts, uploaded-file handles |
//! | [`payload`] | Flat/interleaved payload construction and template helpers |
//! | [`retry`] | Bounded fixed-backoff retry driver |

pub mod adapter;
pub mod cache;
pub mod client;
pub mod config;
pub mod harness;
pub mod media;
pub mod payload;
pub mod retry;

pub mod error;
pub use error::{Error, ErrorClass};

// Re-export main types for convenience
pub use adapter::GeminiAdapter;
pub use cache::{CacheMode, RequestKey, ResponseCache};
pub use client::{GeminiClient, GenerateResponse};
pub use config::{AdapterConfig, GenParams};
pub use harness::{DistributedContext, EvalModel, GenerateRequest, MediaResolver};
pub use media::{AudioClip, FileHandle, FileState, MediaItem, Part};
pub use retry::RetryPolicy;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
