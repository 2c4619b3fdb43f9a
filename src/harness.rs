//! Host evaluation-framework contract.
//!
//! The evaluation harness drives models through a fixed interface: batched
//! generation, multi-round generation, and likelihood scoring, plus the
//! rank/world-size properties of the launcher's process group. This module
//! defines that seam; [`GeminiAdapter`](crate::adapter::GeminiAdapter)
//! implements it.

use crate::media::MediaItem;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::env;
use std::fmt;

/// Resolves the media attached to one document. Bound to its document when
/// the harness builds the request; invoked at most once, during processing.
pub type MediaResolver = Box<dyn FnOnce() -> Vec<MediaItem> + Send>;

/// One evaluation request handed over by the harness.
pub struct GenerateRequest {
    /// Free-text context for the model.
    pub context: String,
    /// Loosely typed generation kwargs (`max_new_tokens`, `temperature`).
    pub gen_kwargs: Value,
    /// Document-to-media resolver.
    pub resolver: MediaResolver,
    /// Document id, unique within (task, split).
    pub doc_id: u64,
    pub task: String,
    pub split: String,
}

impl GenerateRequest {
    pub fn new(
        context: impl Into<String>,
        task: impl Into<String>,
        split: impl Into<String>,
        doc_id: u64,
    ) -> Self {
        Self {
            context: context.into(),
            gen_kwargs: Value::Object(Default::default()),
            resolver: Box::new(Vec::new),
            doc_id,
            task: task.into(),
            split: split.into(),
        }
    }

    pub fn with_gen_kwargs(mut self, kwargs: Value) -> Self {
        self.gen_kwargs = kwargs;
        self
    }

    pub fn with_resolver(mut self, resolver: impl FnOnce() -> Vec<MediaItem> + Send + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }
}

impl fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("task", &self.task)
            .field("split", &self.split)
            .field("doc_id", &self.doc_id)
            .field("context", &self.context)
            .field("gen_kwargs", &self.gen_kwargs)
            .finish_non_exhaustive()
    }
}

/// Model interface expected by the harness.
#[async_trait]
pub trait EvalModel {
    /// Answer each request in order, returning one string per request.
    async fn generate_until(&mut self, requests: Vec<GenerateRequest>) -> Result<Vec<String>>;

    /// Multi-turn generation. Not every backend supports this.
    async fn generate_until_multi_round(
        &mut self,
        requests: Vec<GenerateRequest>,
    ) -> Result<Vec<String>>;

    /// Per-continuation (log-probability, greedy-match) scoring. Not every
    /// backend supports this.
    async fn loglikelihood(&mut self, requests: Vec<GenerateRequest>) -> Result<Vec<(f64, bool)>>;

    /// Rank of this process in the launcher's process group.
    fn rank(&self) -> usize;

    /// Number of parallel worker processes.
    fn world_size(&self) -> usize;
}

/// Distributed role of this process, per the launcher's environment
/// convention (`RANK` / `WORLD_SIZE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedContext {
    pub rank: usize,
    pub world_size: usize,
}

impl DistributedContext {
    /// Single-process execution.
    pub fn single() -> Self {
        Self {
            rank: 0,
            world_size: 1,
        }
    }

    /// Read the launcher's environment; absent or unparsable variables fall
    /// back to single-process values.
    pub fn from_env() -> Self {
        Self {
            rank: read_env_usize("RANK").unwrap_or(0),
            world_size: read_env_usize("WORLD_SIZE").unwrap_or(1),
        }
    }

    pub fn is_main_process(&self) -> bool {
        self.rank == 0
    }

    pub fn is_distributed(&self) -> bool {
        self.world_size > 1
    }
}

impl Default for DistributedContext {
    fn default() -> Self {
        Self::single()
    }
}

fn read_env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_context() {
        let ctx = DistributedContext::single();
        assert!(ctx.is_main_process());
        assert!(!ctx.is_distributed());
    }

    #[test]
    fn test_request_builder() {
        let req = GenerateRequest::new("what is shown?", "mvbench", "test", 3)
            .with_gen_kwargs(json!({"max_new_tokens": 64}))
            .with_resolver(|| vec![MediaItem::video("/data/clip.mp4")]);
        assert_eq!(req.doc_id, 3);
        assert_eq!(req.gen_kwargs["max_new_tokens"], 64);
        let media = (req.resolver)();
        assert_eq!(media, vec![MediaItem::video("/data/clip.mp4")]);
    }

    #[test]
    fn test_default_resolver_is_empty() {
        let req = GenerateRequest::new("q", "t", "s", 0);
        assert!((req.resolver)().is_empty());
    }
}
