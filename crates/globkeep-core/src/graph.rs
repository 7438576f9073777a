//! The watcher forest: the central data structure the manager mutates on
//! every dispatch step.
//!
//! A [`Graph`] is intentionally dumb — it only knows how to create, look up,
//! and tear down nodes and keep the id/path indexes consistent (invariants
//! 3 and 6 in the design). The state-machine behaviour (what role a new node
//! should take, when to acquire/release kernel watches) lives one layer up,
//! in [`crate::manager`] and [`crate::dispatch`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pattern::Recursion;

pub type NodeId = u64;

/// What a node is for. See the module-level invariants in the design doc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// User-facing handle; holds the original glob. Never watched directly.
    Glob,
    /// Live watch on an existing directory, contributing user events.
    Folder,
    /// Placeholder watching an ancestor of a not-yet-existing target.
    Parent,
    /// A recursively-discovered subdirectory under a Folder or Child.
    Child,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub pattern: PathBuf,
    pub role: Role,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub recursive: Recursion,
}

#[derive(Debug, Default)]
pub struct Graph {
    next_id: NodeId,
    by_id: HashMap<NodeId, Node>,
    by_path: HashMap<PathBuf, Vec<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.by_id.get_mut(&id)
    }

    pub fn nodes_at(&self, path: &Path) -> &[NodeId] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// Create a node, index it by id and path, and — if it has a parent —
    /// register it in that parent's `children`. Returns the fresh id.
    pub fn insert(
        &mut self,
        pattern: PathBuf,
        role: Role,
        parent: Option<NodeId>,
        recursive: Recursion,
    ) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;

        self.by_path.entry(pattern.clone()).or_default().push(id);

        self.by_id.insert(
            id,
            Node {
                id,
                pattern,
                role,
                parent,
                children: Vec::new(),
                recursive,
            },
        );

        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.by_id.get_mut(&parent_id) {
                parent_node.children.push(id);
            }
        }

        id
    }

    /// Follow `parent` edges up to the Glob ancestor (or a self-owning
    /// Folder, when the original pattern wasn't actually a glob).
    pub fn glob_ancestor(&self, mut id: NodeId) -> NodeId {
        loop {
            let Some(node) = self.by_id.get(&id) else {
                return id;
            };
            if node.role == Role::Glob {
                return id;
            }
            match node.parent {
                Some(parent_id) => id = parent_id,
                None => return id,
            }
        }
    }

    /// Remove exactly this node from both indexes and its parent's
    /// `children`. Does not touch descendants or the parent chain — callers
    /// that want propagating removal drive that themselves (see
    /// [`crate::manager::Manager::remove_watch`]).
    pub fn take(&mut self, id: NodeId) -> Option<Node> {
        let node = self.by_id.remove(&id)?;

        if let Some(bucket) = self.by_path.get_mut(&node.pattern) {
            bucket.retain(|&n| n != id);
            if bucket.is_empty() {
                self.by_path.remove(&node.pattern);
            }
        }

        if let Some(parent_id) = node.parent {
            if let Some(parent_node) = self.by_id.get_mut(&parent_id) {
                parent_node.children.retain(|&n| n != id);
            }
        }

        Some(node)
    }
}
