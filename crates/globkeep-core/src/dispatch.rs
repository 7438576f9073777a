//! The event dispatcher: turns one raw kernel event into zero or more
//! user-facing [`WatchEvent`]s, driving the state transitions described in
//! the graph module's node roles.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use eyre::Result;

use crate::event::{Action, EventLogger as _, Kind, WatchEvent};
use crate::graph::{NodeId, Role};
use crate::kernel::{Kernel, RawEvent};
use crate::manager::Manager;
use crate::pattern::Recursion;

impl<K: Kernel> Manager<K> {
    /// Pull the next user-facing event, blocking on the kernel source as
    /// needed. `Ok(None)` is an idle tick, passed straight through so
    /// callers can do periodic work; it does not mean the manager is done.
    pub fn poll(&mut self) -> Result<Option<WatchEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.cache.kernel_mut().next_event()? {
                Some(raw) => self.handle_raw_event(raw)?,
                None => return Ok(None),
            }
        }
    }

    /// An iterator over [`poll`](Self::poll) results, matching the crate's
    /// public `listen` signature.
    pub fn listen(&mut self) -> Listen<'_, K> {
        Listen { manager: self }
    }

    fn handle_raw_event(&mut self, raw: RawEvent<K::Handle>) -> Result<()> {
        let Some(dir) = self.cache.path_for(&raw.handle).map(Path::to_path_buf) else {
            return Ok(());
        };

        if !self.graph.contains_path(&dir) {
            return Ok(());
        }

        let Some(action) = Action::from_raw(raw.flags) else {
            return Ok(());
        };
        let kind = Kind::from_raw(raw.flags);
        let name = raw.name;

        let mut logged = false;

        for node_id in self.graph.nodes_at(&dir).to_vec() {
            let Some(node) = self.graph.get(node_id).cloned() else {
                continue;
            };

            let mut target_id = node_id;
            let mut target_dir = dir.clone();
            let mut target_name = name.clone();
            let mut skip_emit = false;

            match node.role {
                Role::Parent => {
                    let awaited_id = node
                        .parent
                        .expect("a Parent node always waits on behalf of another node");

                    if let Some(awaited) = self.graph.get(awaited_id).cloned() {
                        let arrived = match &name {
                            Some(n) => dir.join(n),
                            None => dir.clone(),
                        };

                        if action == Action::Create && arrived == awaited.pattern {
                            self.teardown(node_id, false, false)?;
                            self.cache.acquire(&awaited.pattern)?;
                            target_id = awaited_id;
                            target_dir = arrived;
                            target_name = None;
                        } else if action == Action::Remove && name.is_none() {
                            let ancestor = node
                                .pattern
                                .parent()
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|| PathBuf::from("/"));
                            self.create_watcher(ancestor, Role::Parent, Some(node_id), Recursion::Bounded(0))?;
                            self.cache.release(&node.pattern, true)?;
                            skip_emit = true;
                        }
                    }
                }
                Role::Folder | Role::Child => {
                    if kind == Kind::Folder && action == Action::Create && node.recursive.allows_more() {
                        if let Some(child_name) = &name {
                            let child_path = node.pattern.join(child_name);
                            self.create_watcher(
                                child_path,
                                Role::Child,
                                Some(node_id),
                                node.recursive.step_down(),
                            )?;
                        }
                    } else if action == Action::Remove && name.is_none() {
                        if node.role == Role::Child {
                            let parent_id = node
                                .parent
                                .expect("a Child node always has a Folder or Child parent");
                            self.teardown(node_id, false, true)?;
                            target_id = parent_id;
                            target_dir = node
                                .pattern
                                .parent()
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|| PathBuf::from("/"));
                            target_name = node.pattern.file_name().map(OsString::from);
                        } else {
                            let ancestor = node
                                .pattern
                                .parent()
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|| PathBuf::from("/"));
                            self.create_watcher(ancestor, Role::Parent, Some(node_id), Recursion::Bounded(0))?;
                            self.cache.release(&node.pattern, true)?;
                        }
                    }
                }
                Role::Glob => {}
            }

            if skip_emit {
                continue;
            }

            if let Some(event) = self.emit(target_id, &target_dir, target_name.as_deref(), action, kind) {
                if !logged {
                    if let Some(logger) = &self.logger {
                        logger.log(event.action, event.kind, &event.path);
                    }
                    logged = true;
                }
                self.pending.push_back(event);
            }
        }

        Ok(())
    }

    /// The one place the Parent-exclusion and glob-filtering rules are
    /// applied, so every dispatch rule above gets them for free regardless
    /// of which node it ultimately attributes the event to.
    fn emit(
        &self,
        node_id: NodeId,
        dir: &Path,
        name: Option<&OsStr>,
        action: Action,
        kind: Kind,
    ) -> Option<WatchEvent> {
        let node = self.graph.get(node_id)?;

        if node.role == Role::Parent {
            return None;
        }

        let path = match name {
            Some(n) => dir.join(n),
            None => dir.to_path_buf(),
        };

        let root_id = self.graph.glob_ancestor(node_id);

        if let Some(matcher) = self.matchers.get(&root_id) {
            if !matcher.is_match(&path) {
                return None;
            }
        }

        Some(WatchEvent {
            id: root_id,
            action,
            kind,
            path,
        })
    }
}

/// Iterator returned by [`Manager::listen`].
pub struct Listen<'a, K: Kernel> {
    manager: &'a mut Manager<K>,
}

impl<K: Kernel> Iterator for Listen<'_, K> {
    type Item = Result<Option<WatchEvent>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.manager.poll())
    }
}
