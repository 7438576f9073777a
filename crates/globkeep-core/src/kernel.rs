//! Abstraction over the OS's per-directory watch primitive.
//!
//! Nothing outside this module and [`crate::cache`] ever touches a concrete
//! kernel type. That keeps the graph and dispatcher testable without a real
//! inotify instance, and leaves room for a second backend later without
//! touching the rest of the crate.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

/// The subset of inotify event flags the manager cares about.
///
/// Mirrors `IN_CREATE`, `IN_MOVED_TO`, `IN_DELETE`, `IN_MOVED_FROM`,
/// `IN_DELETE_SELF`, `IN_MODIFY` and `IN_ISDIR` without pulling the `inotify`
/// crate's types past the kernel boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFlags {
    pub create: bool,
    pub moved_to: bool,
    pub delete: bool,
    pub moved_from: bool,
    pub delete_self: bool,
    pub modify: bool,
    pub is_dir: bool,
}

/// A single raw event read off the kernel source, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawEvent<H> {
    pub handle: H,
    /// Entry name within the watched directory; absent for `*_SELF` events.
    pub name: Option<OsString>,
    pub flags: RawFlags,
}

/// A registered per-directory kernel watch, non-recursive, invalidated when
/// the watched directory is deleted.
pub trait Kernel {
    type Handle: Clone + Eq + std::hash::Hash + std::fmt::Debug;

    fn watch(&mut self, dir: &Path) -> Result<Self::Handle>;

    fn unwatch(&mut self, handle: Self::Handle) -> Result<()>;

    /// Block until the next raw event, or `Ok(None)` for an idle tick.
    fn next_event(&mut self) -> Result<Option<RawEvent<Self::Handle>>>;
}

/// Linux backend, built on the `inotify` crate.
pub struct InotifyKernel {
    inner: inotify::Inotify,
    buffer: [u8; 4096],
}

impl InotifyKernel {
    pub fn new() -> Result<Self> {
        let inner = inotify::Inotify::init().wrap_err("failed to initialize inotify")?;
        Ok(Self {
            inner,
            buffer: [0; 4096],
        })
    }

    fn watch_mask() -> inotify::WatchMask {
        use inotify::WatchMask;
        WatchMask::CREATE
            | WatchMask::MOVED_TO
            | WatchMask::DELETE
            | WatchMask::MOVED_FROM
            | WatchMask::DELETE_SELF
            | WatchMask::MODIFY
    }
}

impl Kernel for InotifyKernel {
    type Handle = inotify::WatchDescriptor;

    fn watch(&mut self, dir: &Path) -> Result<Self::Handle> {
        self.inner
            .add_watch(dir, Self::watch_mask())
            .wrap_err_with(|| format!("failed to watch {}", dir.display()))
    }

    fn unwatch(&mut self, handle: Self::Handle) -> Result<()> {
        self.inner
            .rm_watch(handle)
            .wrap_err("failed to remove inotify watch")
    }

    fn next_event(&mut self) -> Result<Option<RawEvent<Self::Handle>>> {
        let mut events = self
            .inner
            .read_events_blocking(&mut self.buffer)
            .wrap_err("failed to read inotify events")?;

        Ok(events.next().map(|event| RawEvent {
            handle: event.wd,
            name: event.name.map(OsString::from),
            flags: RawFlags {
                create: event.mask.contains(inotify::EventMask::CREATE),
                moved_to: event.mask.contains(inotify::EventMask::MOVED_TO),
                delete: event.mask.contains(inotify::EventMask::DELETE),
                moved_from: event.mask.contains(inotify::EventMask::MOVED_FROM),
                delete_self: event.mask.contains(inotify::EventMask::DELETE_SELF),
                modify: event.mask.contains(inotify::EventMask::MODIFY),
                is_dir: event.mask.contains(inotify::EventMask::ISDIR),
            },
        }))
    }
}

/// In-memory kernel used by tests to drive the dispatcher without real
/// directories or a real inotify instance. `watch`/`unwatch` calls are
/// recorded so tests can assert on the cache's behaviour; events are fed in
/// by hand via [`MockKernel::push`].
#[derive(Debug, Default)]
pub struct MockKernel {
    next_handle: u64,
    pub watched: Vec<PathBuf>,
    pub unwatched: Vec<u64>,
    queue: VecDeque<Option<RawEvent<u64>>>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Option<RawEvent<u64>>) {
        self.queue.push_back(event);
    }
}

impl Kernel for MockKernel {
    type Handle = u64;

    fn watch(&mut self, dir: &Path) -> Result<Self::Handle> {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.watched.push(dir.to_path_buf());
        Ok(handle)
    }

    fn unwatch(&mut self, handle: Self::Handle) -> Result<()> {
        self.unwatched.push(handle);
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<RawEvent<Self::Handle>>> {
        Ok(self.queue.pop_front().flatten())
    }
}
