//! Ordered fragment storage.

use serde::{Deserialize, Serialize};

/// Append-only list of text fragments.
///
/// A fragment's position never changes once appended; vector ids in the
/// index refer to these positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentStore {
    fragments: Vec<String>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fragments and return the position of the first one.
    pub fn append(&mut self, fragments: Vec<String>) -> usize {
        let first = self.fragments.len();
        self.fragments.extend(fragments);
        first
    }

    /// Fragment at `position`, if it exists.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.fragments.get(position).map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.fragments
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }
}

impl From<Vec<String>> for FragmentStore {
    fn from(fragments: Vec<String>) -> Self {
        Self { fragments }
    }
}
