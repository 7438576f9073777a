//! Reference-counted registry of live kernel watches.
//!
//! Several graph nodes can share the same watched directory (overlapping
//! patterns rooted at the same place, or a `Folder` and the `Child` nodes
//! discovered under it before any of them narrow down). The cache is what
//! lets the manager acquire and release those watches by count instead of
//! by node, and is also the reverse index from a raw kernel handle back to
//! the directory it watches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eyre::Result;
use tracing::debug;

use crate::kernel::Kernel;

pub struct WatchCache<K: Kernel> {
    kernel: K,
    counts: HashMap<PathBuf, (K::Handle, usize)>,
    paths: HashMap<K::Handle, PathBuf>,
}

impl<K: Kernel> WatchCache<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            counts: HashMap::new(),
            paths: HashMap::new(),
        }
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Increment the reference count for `dir`, registering a fresh kernel
    /// watch the first time anyone asks for it.
    pub fn acquire(&mut self, dir: &Path) -> Result<()> {
        if let Some((_, count)) = self.counts.get_mut(dir) {
            *count += 1;
            return Ok(());
        }

        let handle = self.kernel.watch(dir)?;
        self.paths.insert(handle.clone(), dir.to_path_buf());
        self.counts.insert(dir.to_path_buf(), (handle, 1));
        Ok(())
    }

    /// Decrement the reference count for `dir`. At zero, either unregister
    /// the kernel watch (`superficial = false`) or just drop the bookkeeping
    /// (`superficial = true`, for when the kernel already invalidated the
    /// watch on its own — e.g. the directory itself was deleted).
    pub fn release(&mut self, dir: &Path, superficial: bool) -> Result<()> {
        let reached_zero = match self.counts.get_mut(dir) {
            Some((_, count)) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => {
                debug!(path = %dir.display(), "release of a watch path not in the cache");
                return Ok(());
            }
        };

        if !reached_zero {
            return Ok(());
        }

        let (handle, _) = self.counts.remove(dir).expect("checked above");
        self.paths.remove(&handle);

        if superficial {
            Ok(())
        } else {
            self.kernel.unwatch(handle)
        }
    }

    /// The directory a raw event's handle refers to, if still tracked.
    pub fn path_for(&self, handle: &K::Handle) -> Option<&Path> {
        self.paths.get(handle).map(PathBuf::as_path)
    }

    #[cfg(test)]
    pub fn ref_count(&self, dir: &Path) -> usize {
        self.counts.get(dir).map_or(0, |&(_, c)| c)
    }
}

impl<K: Kernel> Drop for WatchCache<K> {
    /// Release every live kernel watch. A caller abandoning the manager
    /// mid-iteration is equivalent to destroying it outright — nothing
    /// should be left registered with the kernel behind its back.
    fn drop(&mut self) {
        for (dir, (handle, _)) in self.counts.drain() {
            if let Err(error) = self.kernel.unwatch(handle) {
                debug!(path = %dir.display(), %error, "failed to release watch on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MockKernel;
    use std::path::PathBuf;

    #[test]
    fn first_acquire_registers_a_kernel_watch() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        assert_eq!(cache.ref_count(Path::new("/a")), 1);
        assert_eq!(cache.kernel_mut().watched, vec![PathBuf::from("/a")]);
    }

    #[test]
    fn repeated_acquire_shares_one_kernel_watch() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        cache.acquire(Path::new("/a")).unwrap();
        cache.acquire(Path::new("/a")).unwrap();
        assert_eq!(cache.ref_count(Path::new("/a")), 3);
        assert_eq!(cache.kernel_mut().watched.len(), 1);
    }

    #[test]
    fn release_to_zero_unwatches_normally() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        cache.acquire(Path::new("/a")).unwrap();
        cache.release(Path::new("/a"), false).unwrap();
        assert_eq!(cache.ref_count(Path::new("/a")), 1);
        assert!(cache.kernel_mut().unwatched.is_empty());

        cache.release(Path::new("/a"), false).unwrap();
        assert_eq!(cache.ref_count(Path::new("/a")), 0);
        assert_eq!(cache.kernel_mut().unwatched.len(), 1);
    }

    #[test]
    fn superficial_release_skips_kernel_unwatch() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        cache.release(Path::new("/a"), true).unwrap();
        assert_eq!(cache.ref_count(Path::new("/a")), 0);
        assert!(cache.kernel_mut().unwatched.is_empty());
    }

    #[test]
    fn release_of_untracked_path_is_a_no_op() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.release(Path::new("/never-watched"), false).unwrap();
    }

    #[test]
    fn path_for_resolves_a_live_handle() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        let handle = cache.kernel_mut().watched.len() as u64 - 1;
        assert_eq!(cache.path_for(&handle), Some(Path::new("/a")));
    }

    #[test]
    fn path_for_forgets_released_handle() {
        let mut cache = WatchCache::new(MockKernel::new());
        cache.acquire(Path::new("/a")).unwrap();
        let handle = 0u64;
        cache.release(Path::new("/a"), false).unwrap();
        assert_eq!(cache.path_for(&handle), None);
    }
}
