//! The memory tree and its addressing rules.
//!
//! Reads are strict: every segment of the path must already exist. Writes
//! (`push`) are lazy: missing interior nodes are created on the way down.
//! A failing operation never leaves the tree partially modified.

use llmpu_core::error::MemoryError;
use llmpu_core::Turn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::path::MemoryPath;

/// A node in the memory tree.
///
/// Serializes untagged: a leaf is a JSON array of turns, a node is a JSON
/// object of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryEntry {
    /// An ordered sequence of turns
    Leaf(Vec<Turn>),
    /// Named children
    Node(BTreeMap<String, MemoryEntry>),
}

impl MemoryEntry {
    pub fn as_leaf(&self) -> Option<&[Turn]> {
        match self {
            MemoryEntry::Leaf(turns) => Some(turns),
            MemoryEntry::Node(_) => None,
        }
    }
}

/// The hierarchical turn store owned by a processing unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    root: BTreeMap<String, MemoryEntry>,
}

fn invalid(path: &MemoryPath, operation: &'static str) -> MemoryError {
    MemoryError::InvalidLocation {
        path: path.to_string(),
        operation,
    }
}

fn not_found(path: &MemoryPath) -> MemoryError {
    MemoryError::PathNotFound {
        path: path.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level entries.
    pub fn root(&self) -> &BTreeMap<String, MemoryEntry> {
        &self.root
    }

    /// Strictly resolve the entry at `path`.
    pub fn get(&self, path: &MemoryPath) -> Result<&MemoryEntry, MemoryError> {
        let (parents, key) = path.split_leaf().ok_or_else(|| invalid(path, "read"))?;
        self.node(parents, path, "read")?
            .get(key)
            .ok_or_else(|| not_found(path))
    }

    /// Strictly resolve the turn sequence at `path`.
    pub fn leaf(&self, path: &MemoryPath) -> Result<&[Turn], MemoryError> {
        self.get(path)?
            .as_leaf()
            .ok_or_else(|| invalid(path, "load"))
    }

    /// Whether `path` currently resolves to anything.
    pub fn contains(&self, path: &MemoryPath) -> bool {
        self.get(path).is_ok()
    }

    /// Append `turns`, in order, to the sequence at `path`.
    ///
    /// Missing interior nodes and a missing leaf are created. Returns the new
    /// length of the sequence.
    pub fn push<I>(&mut self, path: &MemoryPath, turns: I) -> Result<usize, MemoryError>
    where
        I: IntoIterator<Item = Turn>,
    {
        let (parents, key) = path.split_leaf().ok_or_else(|| invalid(path, "push"))?;
        self.check_push_target(parents, key, path)?;

        let parent = self.node_or_create(parents, path)?;
        match parent
            .entry(key.to_string())
            .or_insert_with(|| MemoryEntry::Leaf(Vec::new()))
        {
            MemoryEntry::Leaf(existing) => {
                existing.extend(turns);
                debug!(path = %path, len = existing.len(), "Pushed turns to memory");
                Ok(existing.len())
            }
            MemoryEntry::Node(_) => Err(invalid(path, "push")),
        }
    }

    /// Remove and return the last turn of the sequence at `path`.
    pub fn pop(&mut self, path: &MemoryPath) -> Result<Turn, MemoryError> {
        let (parents, key) = path.split_leaf().ok_or_else(|| invalid(path, "pop"))?;
        let parent = self.node_mut(parents, path, "pop")?;

        match parent.get_mut(key) {
            None => Err(not_found(path)),
            Some(MemoryEntry::Node(_)) => Err(invalid(path, "pop")),
            Some(MemoryEntry::Leaf(turns)) => {
                let turn = turns.pop().ok_or_else(|| MemoryError::EmptySequence {
                    path: path.to_string(),
                })?;
                debug!(path = %path, remaining = turns.len(), "Popped turn from memory");
                Ok(turn)
            }
        }
    }

    /// Delete the subtree at `path`. Deleting an absent child is a no-op.
    ///
    /// Returns the removed entry, if there was one.
    pub fn clear(&mut self, path: &MemoryPath) -> Result<Option<MemoryEntry>, MemoryError> {
        let (parents, key) = path.split_leaf().ok_or_else(|| invalid(path, "clear"))?;
        let removed = self.node_mut(parents, path, "clear")?.remove(key);
        debug!(path = %path, removed = removed.is_some(), "Cleared memory location");
        Ok(removed)
    }

    /// Every leaf path with the number of turns it holds, depth-first in key order.
    pub fn leaf_paths(&self) -> Vec<(MemoryPath, usize)> {
        fn walk(
            children: &BTreeMap<String, MemoryEntry>,
            prefix: &MemoryPath,
            out: &mut Vec<(MemoryPath, usize)>,
        ) {
            for (key, entry) in children {
                let path = prefix.child(key.clone());
                match entry {
                    MemoryEntry::Leaf(turns) => out.push((path, turns.len())),
                    MemoryEntry::Node(grandchildren) => walk(grandchildren, &path, out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &MemoryPath::new(), &mut out);
        out
    }

    // --- path walking ---

    fn node(
        &self,
        segments: &[String],
        path: &MemoryPath,
        operation: &'static str,
    ) -> Result<&BTreeMap<String, MemoryEntry>, MemoryError> {
        let mut current = &self.root;
        for segment in segments {
            current = match current.get(segment) {
                Some(MemoryEntry::Node(children)) => children,
                Some(MemoryEntry::Leaf(_)) => return Err(invalid(path, operation)),
                None => return Err(not_found(path)),
            };
        }
        Ok(current)
    }

    fn node_mut(
        &mut self,
        segments: &[String],
        path: &MemoryPath,
        operation: &'static str,
    ) -> Result<&mut BTreeMap<String, MemoryEntry>, MemoryError> {
        let mut current = &mut self.root;
        for segment in segments {
            current = match current.get_mut(segment) {
                Some(MemoryEntry::Node(children)) => children,
                Some(MemoryEntry::Leaf(_)) => return Err(invalid(path, operation)),
                None => return Err(not_found(path)),
            };
        }
        Ok(current)
    }

    /// Walk `segments`, creating empty nodes where they are missing.
    fn node_or_create(
        &mut self,
        segments: &[String],
        path: &MemoryPath,
    ) -> Result<&mut BTreeMap<String, MemoryEntry>, MemoryError> {
        let mut current = &mut self.root;
        for segment in segments {
            current = match current
                .entry(segment.clone())
                .or_insert_with(|| MemoryEntry::Node(BTreeMap::new()))
            {
                MemoryEntry::Node(children) => children,
                MemoryEntry::Leaf(_) => return Err(invalid(path, "push")),
            };
        }
        Ok(current)
    }

    /// Read-only shape check so a rejected push creates nothing.
    fn check_push_target(
        &self,
        parents: &[String],
        key: &str,
        path: &MemoryPath,
    ) -> Result<(), MemoryError> {
        let mut current = &self.root;
        for segment in parents {
            current = match current.get(segment) {
                Some(MemoryEntry::Node(children)) => children,
                Some(MemoryEntry::Leaf(_)) => return Err(invalid(path, "push")),
                None => return Ok(()),
            };
        }
        match current.get(key) {
            Some(MemoryEntry::Node(_)) => Err(invalid(path, "push")),
            _ => Ok(()),
        }
    }
}
