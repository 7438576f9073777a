//! Registration and teardown: turning a glob pattern into a forest of
//! watcher nodes, and tearing one back down again.
//!
//! The actual event loop lives in [`crate::dispatch`]; this module only
//! builds and destroys the [`Graph`] nodes that the dispatcher reacts to.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use globset::{Glob, GlobMatcher};
use tracing::trace;

use crate::cache::WatchCache;
use crate::event::{EventLogger, WatchEvent};
use crate::graph::{Graph, NodeId, Role};
use crate::kernel::Kernel;
use crate::pattern::{is_glob, recursion_depth, root_of, Recursion};

pub struct Manager<K: Kernel> {
    pub(crate) graph: Graph,
    pub(crate) cache: WatchCache<K>,
    pub(crate) matchers: HashMap<NodeId, GlobMatcher>,
    pub(crate) logger: Option<Box<dyn EventLogger>>,
    pub(crate) pending: VecDeque<WatchEvent>,
}

impl<K: Kernel> Manager<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            graph: Graph::new(),
            cache: WatchCache::new(kernel),
            matchers: HashMap::new(),
            logger: None,
            pending: VecDeque::new(),
        }
    }

    pub fn set_logger(&mut self, logger: impl EventLogger + 'static) {
        self.logger = Some(Box::new(logger));
    }

    /// Direct access to the underlying kernel, chiefly useful in tests that
    /// drive a [`crate::MockKernel`] by hand.
    pub fn kernel_mut(&mut self) -> &mut K {
        self.cache.kernel_mut()
    }

    /// Register `pattern` and return the id future events for it will carry.
    pub fn add_watch(&mut self, pattern: &str) -> Result<u64> {
        self.create_watcher(PathBuf::from(pattern), Role::Glob, None, Recursion::Bounded(0))
    }

    /// Unregister a previously-added pattern. Propagates to every node the
    /// registration spawned, and — since a bare Folder/Parent node implies
    /// an owning subscription — climbs back up to tear down its ancestors
    /// too when called on one directly.
    pub fn remove_watch(&mut self, id: u64) -> Result<()> {
        self.teardown(id, true, false)
    }

    pub(crate) fn create_watcher(
        &mut self,
        pattern: PathBuf,
        role: Role,
        parent: Option<NodeId>,
        recursive: Recursion,
    ) -> Result<NodeId> {
        let id = self.graph.insert(pattern.clone(), role, parent, recursive);
        let mut role = role;

        if role == Role::Glob {
            let pattern_str = pattern.to_string_lossy().into_owned();

            if is_glob(&pattern_str) {
                let matcher = Glob::new(&pattern_str)
                    .wrap_err_with(|| format!("invalid glob pattern {pattern_str:?}"))?
                    .compile_matcher();
                self.matchers.insert(id, matcher);

                let root = root_of(&pattern_str);
                let depth = recursion_depth(&pattern_str);
                self.create_watcher(root, Role::Folder, Some(id), depth)?;
            } else {
                self.graph.get_mut(id).expect("just inserted").role = Role::Folder;
                role = Role::Folder;
            }
        }

        let exists = pattern.exists();

        if !exists && matches!(role, Role::Folder | Role::Parent) {
            let ancestor = pattern
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));
            self.create_watcher(ancestor, Role::Parent, Some(id), Recursion::Bounded(0))?;
        } else if role == Role::Parent && exists {
            self.cache.acquire(&pattern)?;
        }

        if exists && matches!(role, Role::Folder | Role::Child) {
            self.cache.acquire(&pattern)?;
            self.spawn_existing_children(id, &pattern, recursive)?;
        }

        Ok(id)
    }

    fn spawn_existing_children(
        &mut self,
        parent_id: NodeId,
        dir: &Path,
        recursive: Recursion,
    ) -> Result<()> {
        if !recursive.allows_more() || !dir.is_dir() {
            return Ok(());
        }

        let entries = std::fs::read_dir(dir)
            .wrap_err_with(|| format!("failed to list directory {}", dir.display()))?;

        for entry in entries {
            let entry = entry.wrap_err_with(|| format!("failed to read an entry of {}", dir.display()))?;
            let file_type = entry
                .file_type()
                .wrap_err_with(|| format!("failed to stat {}", entry.path().display()))?;

            if file_type.is_dir() {
                let child_path = dir.join(entry.file_name());
                self.create_watcher(child_path, Role::Child, Some(parent_id), recursive.step_down())?;
            }
        }

        Ok(())
    }

    /// Drop a node from the graph (and its matcher, if it had one),
    /// releasing its kernel watch through the cache. With `propagate`, also
    /// tears down every descendant and, for a Folder or Parent node, climbs
    /// back up to the owning subscription.
    pub(crate) fn teardown(&mut self, id: NodeId, propagate: bool, superficial: bool) -> Result<()> {
        let Some(node) = self.graph.take(id) else {
            return Ok(());
        };

        self.matchers.remove(&id);
        trace!(id, role = ?node.role, path = %node.pattern.display(), "tore down watcher node");

        if matches!(node.role, Role::Folder | Role::Child | Role::Parent) {
            self.cache.release(&node.pattern, superficial)?;
        }

        if propagate {
            for child_id in node.children {
                self.teardown(child_id, true, superficial)?;
            }

            if matches!(node.role, Role::Folder | Role::Parent) {
                if let Some(parent_id) = node.parent {
                    self.teardown(parent_id, true, superficial)?;
                }
            }
        }

        Ok(())
    }
}
