//! Counter metadata for append/consume structured buffers.
//!
//! A buffer with a hidden counter, or a struct that nests such buffers, is
//! tracked as a flat list of [`CounterEntry`] keyed by the field index path
//! from the root declaration. Assignments between aliasing declarations are
//! planned path-for-path over those keys.

use std::collections::HashMap;
use std::fmt;

use spvx_ir::{Handle, Variable};

use crate::CounterError;

/// Field indices from a root declaration down to a nested member. The empty
/// path is the declaration itself.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexPath(Vec<u32>);

impl IndexPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// This path extended by one field index.
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// The remainder of this path below `prefix`, if `prefix` leads here.
    pub fn strip_prefix(&self, prefix: &IndexPath) -> Option<IndexPath> {
        self.0
            .strip_prefix(prefix.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    pub fn join(&self, rest: &IndexPath) -> Self {
        let mut path = self.0.clone();
        path.extend_from_slice(&rest.0);
        Self(path)
    }
}

impl From<Vec<u32>> for IndexPath {
    fn from(path: Vec<u32>) -> Self {
        Self(path)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// One counter reachable from a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterEntry {
    pub path: IndexPath,
    pub counter: Handle<Variable>,
    /// The counter variable holds a pointer to some real counter and is
    /// rebound on assignment.
    pub is_alias: bool,
}

/// A counter pointer store implied by an assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterCopy {
    pub dst: Handle<Variable>,
    pub src: Handle<Variable>,
}

/// The counters of one root declaration.
#[derive(Clone, Debug, Default)]
pub struct CounterVarFields {
    entries: Vec<CounterEntry>,
    by_path: HashMap<IndexPath, usize>,
}

impl CounterVarFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any entry with the same path.
    pub fn insert(&mut self, entry: CounterEntry) {
        match self.by_path.get(&entry.path) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.by_path.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, path: &IndexPath) -> Option<&CounterEntry> {
        self.by_path.get(path).map(|&slot| &self.entries[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CounterEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plans assigning `src` to `self` as a whole.
    pub fn assign(&self, src: &CounterVarFields) -> Result<Vec<CounterCopy>, CounterError> {
        self.assign_from(&IndexPath::root(), src, &IndexPath::root())
    }

    /// Plans assigning the member of `src` at `src_prefix` to the member of
    /// `self` at `dst_prefix`. Every source counter below `src_prefix` must
    /// have an aliasing destination at the same relative path.
    pub fn assign_from(
        &self,
        dst_prefix: &IndexPath,
        src: &CounterVarFields,
        src_prefix: &IndexPath,
    ) -> Result<Vec<CounterCopy>, CounterError> {
        let mut copies = Vec::new();
        for entry in src.iter() {
            let Some(rest) = entry.path.strip_prefix(src_prefix) else {
                continue;
            };
            let path = dst_prefix.join(&rest);
            let dst = self
                .get(&path)
                .ok_or_else(|| CounterError::MissingPath(path.clone()))?;
            if !dst.is_alias {
                return Err(CounterError::NotAlias(path));
            }
            copies.push(CounterCopy {
                dst: dst.counter,
                src: entry.counter,
            });
        }
        Ok(copies)
    }
}
