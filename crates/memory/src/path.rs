//! Memory addresses.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// A path through the memory tree, one segment per level.
///
/// Segments are string keys. Integer indices are stored as their decimal
/// rendering, which is also how they appear once the store is saved as JSON.
/// The textual form joins segments with `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryPath(Vec<String>);

impl MemoryPath {
    /// The empty path (the store root).
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse `a/b/0` into three segments. Empty segments are skipped.
    pub fn parse(s: &str) -> Self {
        Self(
            s.split('/')
                .filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Append a key segment (builder style).
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(key.into());
        self
    }

    /// Append an integer index segment (builder style).
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(index.to_string());
        self
    }

    /// A new path one level below this one.
    pub fn child(&self, key: impl Into<String>) -> Self {
        self.clone().key(key)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into the parent segments and the final key.
    ///
    /// Returns `None` for the empty path, which has no final key.
    pub fn split_leaf(&self) -> Option<(&[String], &str)> {
        self.0
            .split_last()
            .map(|(leaf, parents)| (parents, leaf.as_str()))
    }
}

impl std::fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for MemoryPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for MemoryPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for MemoryPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Vec<String>> for MemoryPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<Vec<&str>> for MemoryPath {
    fn from(segments: Vec<&str>) -> Self {
        Self(segments.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for MemoryPath {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.into_iter().map(str::to_string).collect())
    }
}

impl From<&MemoryPath> for MemoryPath {
    fn from(path: &MemoryPath) -> Self {
        path.clone()
    }
}
