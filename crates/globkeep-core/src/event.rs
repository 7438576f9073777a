//! User-facing event types emitted by [`crate::Manager::listen`].

use std::path::{Path, PathBuf};

use crate::kernel::RawFlags;

/// What happened to the entity at `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Remove,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Remove => "remove",
        }
    }

    /// `IN_CREATE | IN_MOVED_TO` → create, `IN_DELETE | IN_MOVED_FROM |
    /// IN_DELETE_SELF` → remove, `IN_MODIFY` → update, anything else has no
    /// user-facing action.
    pub(crate) fn from_raw(flags: RawFlags) -> Option<Self> {
        if flags.create || flags.moved_to {
            Some(Action::Create)
        } else if flags.delete || flags.moved_from || flags.delete_self {
            Some(Action::Remove)
        } else if flags.modify {
            Some(Action::Update)
        } else {
            None
        }
    }
}

/// Whether the changed entity is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    File,
    Folder,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::File => "file",
            Kind::Folder => "folder",
        }
    }

    /// `IN_ISDIR | IN_DELETE_SELF` → folder, otherwise file.
    pub(crate) fn from_raw(flags: RawFlags) -> Self {
        if flags.is_dir || flags.delete_self {
            Kind::Folder
        } else {
            Kind::File
        }
    }
}

/// A single user-level notification: watcher `id` saw `action` happen to an
/// entity of kind `kind` at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub id: u64,
    pub action: Action,
    pub kind: Kind,
    pub path: PathBuf,
}

/// Optional collaborator invoked at most once per raw kernel event that
/// produced at least one user event.
pub trait EventLogger {
    fn log(&self, action: Action, kind: Kind, path: &Path);
}
