use std::collections::HashSet;

use crate::types::NormalizedKey;

/// Keys already emitted during one run.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<NormalizedKey>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &NormalizedKey) -> bool {
        self.seen.contains(key)
    }

    pub fn mark_seen(&mut self, key: NormalizedKey) {
        self.seen.insert(key);
    }

    /// Marks `key` and reports whether it was new.
    pub fn admit(&mut self, key: NormalizedKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
