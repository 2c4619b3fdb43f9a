//! Request identity keys.

use std::fmt;

/// Composite identity of one evaluation item: (task, split, document id).
///
/// Rendered verbatim as the cache key string, `"{task}___{split}___{doc_id}"`.
/// Unique per document within a benchmark run; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub task: String,
    pub split: String,
    pub doc_id: u64,
}

impl RequestKey {
    pub fn new(task: impl Into<String>, split: impl Into<String>, doc_id: u64) -> Self {
        Self {
            task: task.into(),
            split: split.into(),
            doc_id,
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}___{}___{}", self.task, self.split, self.doc_id)
    }
}
