//! Glob-aware watching on top of Linux's inotify.
//!
//! inotify only ever watches one directory, non-recursively, and only if
//! that directory already exists — it forgets everything the moment the
//! directory is deleted out from under it. This crate builds the three
//! things a shell-glob-style watch needs on top of that: a forest of
//! auxiliary watchers that stand in for directories that don't exist yet or
//! have just been removed, a reference-counted cache so the same directory
//! is never watched twice, and a dispatcher that turns raw kernel events
//! back into events scoped to the pattern the caller actually asked for.
//!
//! ```no_run
//! use globkeep_core::{InotifyKernel, Manager};
//!
//! # fn main() -> eyre::Result<()> {
//! let kernel = InotifyKernel::new()?;
//! let mut manager = Manager::new(kernel);
//! let id = manager.add_watch("/tmp/demo/**/*.rs")?;
//!
//! for event in manager.listen() {
//!     let Some(event) = event? else { continue };
//!     println!("{} #{}: {} ({:?})", event.action.as_str(), event.id, event.path.display(), event.kind);
//!     assert_eq!(event.id, id);
//!     break;
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod dispatch;
mod event;
mod graph;
mod kernel;
mod manager;
mod pattern;

pub use dispatch::Listen;
pub use event::{Action, EventLogger, Kind, WatchEvent};
pub use graph::Role;
pub use kernel::{InotifyKernel, Kernel, MockKernel, RawEvent, RawFlags};
pub use manager::Manager;
pub use pattern::{is_glob, recursion_depth, root_of, Recursion};
