//! Short opaque identifiers.
//!
//! Every collection owns an [`IdRegistry`] that remembers each id it has
//! ever handed out, so an id is never issued twice for the life of the
//! process even after the record carrying it is deleted.

use std::collections::HashSet;

/// Length of resource identifiers (agents, knowledge bases, documents, ...).
pub const RESOURCE_ID_LEN: usize = 8;

/// Length of agent conversation handles.
pub const SESSION_ID_LEN: usize = 10;

#[derive(Debug, Default)]
pub struct IdRegistry {
    issued: HashSet<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh id of `len` characters that this registry has never
    /// issued before.
    pub fn issue(&mut self, len: usize) -> String {
        loop {
            let candidate = nanoid::nanoid!(len);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }
}
