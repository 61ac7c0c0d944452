//! Hierarchical kind registry.
//!
//! Assigns stable integer ids to a tree of related kinds and records each
//! kind's parent, so "is-a" questions become a walk up an integer table
//! instead of a cascade of per-kind conditionals.
//!
//! ```text
//! register(Root, Root)      -> 0   (super 0)
//! register(Link, Root)      -> 1   (super 0)
//! register(JointPath, Link) -> 2   (super 1)
//! ```
//!
//! The table is append-only. Process-wide registries are built once inside
//! a `LazyLock` initializer and only read afterwards.

use std::collections::HashMap;
use std::hash::Hash;

/// Id returned for kinds that were never registered, unless a caller
/// supplies its own fallback.
pub const UNKNOWN_KIND_ID: i32 = -1;

/// Append-only table of kinds and their parents.
#[derive(Debug, Clone)]
pub struct TypeHierarchyRegistry<K> {
    ids: HashMap<K, i32>,
    /// `super_ids[id]` is the parent id of kind `id`.
    super_ids: Vec<i32>,
}

impl<K: Eq + Hash + Clone> TypeHierarchyRegistry<K> {
    /// Create a registry whose root kind is `root` (id `0`).
    #[must_use]
    pub fn new(root: K) -> Self {
        let mut registry = Self {
            ids: HashMap::new(),
            super_ids: Vec::new(),
        };
        registry.register(root.clone(), root);
        registry
    }

    /// Register `kind` as a child of `parent`.
    ///
    /// The first registration assigns the next unused id. Registering an
    /// already-known kind is a no-op returning the existing id. An unknown
    /// `parent` is registered first as a child of the root so the chain
    /// always terminates.
    pub fn register(&mut self, kind: K, parent: K) -> i32 {
        if let Some(&id) = self.ids.get(&kind) {
            return id;
        }
        let next = self.next_id();
        let super_id = if parent == kind {
            next
        } else {
            match self.ids.get(&parent) {
                Some(&id) => id,
                None => {
                    let root = self.root_id().unwrap_or(next);
                    let parent_id = self.next_id();
                    self.ids.insert(parent, parent_id);
                    self.super_ids.push(root);
                    parent_id
                }
            }
        };
        let id = self.next_id();
        self.ids.insert(kind, id);
        self.super_ids.push(super_id);
        id
    }

    /// Assigned id of `kind`, or `fallback` if it is unknown.
    pub fn id_of(&self, kind: &K, fallback: i32) -> i32 {
        self.ids.get(kind).copied().unwrap_or(fallback)
    }

    /// Immediate parent id of `id`. The root kind is its own parent.
    /// Unknown ids yield [`UNKNOWN_KIND_ID`].
    #[must_use]
    pub fn super_id_of(&self, id: i32) -> i32 {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.super_ids.get(index))
            .copied()
            .unwrap_or(UNKNOWN_KIND_ID)
    }

    /// Whether `id` equals `ancestor` or derives from it.
    #[must_use]
    pub fn is_a(&self, id: i32, ancestor: i32) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// `id` followed by each of its ancestors up to and including the root.
    pub fn ancestors(&self, id: i32) -> Ancestors<'_, K> {
        Ancestors {
            registry: self,
            next: (self.super_id_of(id) != UNKNOWN_KIND_ID).then_some(id),
        }
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.super_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.super_ids.is_empty()
    }

    fn next_id(&self) -> i32 {
        i32::try_from(self.super_ids.len()).unwrap_or(i32::MAX)
    }

    fn root_id(&self) -> Option<i32> {
        (!self.super_ids.is_empty()).then_some(0)
    }
}

/// Iterator over a kind id and its ancestors. See
/// [`TypeHierarchyRegistry::ancestors`].
pub struct Ancestors<'a, K> {
    registry: &'a TypeHierarchyRegistry<K>,
    next: Option<i32>,
}

impl<K: Eq + Hash + Clone> Iterator for Ancestors<'_, K> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let current = self.next?;
        let parent = self.registry.super_id_of(current);
        self.next = (parent != current && parent != UNKNOWN_KIND_ID).then_some(parent);
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
