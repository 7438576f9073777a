//! Pure functions over a glob string: its literal root, whether it is a glob
//! at all, and how many directory levels below the root must be watched.
//!
//! These three questions drive everything the graph does at registration
//! time (see [`crate::graph`]), so they are kept dependency-free and heavily
//! unit tested.

use std::path::{Component, Path, PathBuf};

/// Characters that make a path segment a glob segment. Deliberately narrow —
/// matches the set the manager has always recognised, not the full grammar
/// `?` and `[...]` also participate in (see the crate's glob matching,
/// which uses `globset` and understands the full grammar).
const WILDCARD_CHARS: [char; 5] = ['*', '|', '!', '(', ')'];

fn segment_has_wildcard(segment: &str) -> bool {
    segment.chars().any(|c| WILDCARD_CHARS.contains(&c))
}

/// Whether any segment of `pattern` contains a wildcard character.
pub fn is_glob(pattern: &str) -> bool {
    Path::new(pattern)
        .components()
        .any(|c| component_has_wildcard(&c))
}

fn component_has_wildcard(component: &Component<'_>) -> bool {
    match component {
        Component::Normal(s) => segment_has_wildcard(&s.to_string_lossy()),
        _ => false,
    }
}

/// The longest wildcard-free prefix of `pattern`.
///
/// Falls back to `.` when the pattern starts with a wildcard segment, so
/// callers always get a directory to anchor the first kernel watch on.
pub fn root_of(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();

    for component in Path::new(pattern).components() {
        if component_has_wildcard(&component) {
            break;
        }
        root.push(component);
    }

    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    }
}

/// How many directory levels below the root the manager must watch to see
/// every file `pattern` could match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    /// Watch exactly this many additional levels below the root.
    Bounded(u32),
    /// `**` appeared somewhere in the pattern: watch indefinitely.
    Unbounded,
}

impl Recursion {
    /// The recursion a child directory inherits from this one.
    pub fn step_down(self) -> Self {
        match self {
            Recursion::Bounded(n) => Recursion::Bounded(n.saturating_sub(1)),
            Recursion::Unbounded => Recursion::Unbounded,
        }
    }

    pub fn allows_more(self) -> bool {
        match self {
            Recursion::Bounded(n) => n > 0,
            Recursion::Unbounded => true,
        }
    }
}

/// Counts path segments from the first wildcard-bearing segment (inclusive)
/// to the end, minus one, clamped at zero — the number of subdirectory
/// levels under the root that still need a kernel watch of their own.
/// Returns `Unbounded` the moment a `**` segment is seen.
pub fn recursion_depth(pattern: &str) -> Recursion {
    let mut level: i64 = 0;
    let mut past_root = false;

    for component in Path::new(pattern).components() {
        let segment = match component {
            Component::Normal(s) => s.to_string_lossy(),
            _ => continue,
        };

        if !past_root {
            if !segment_has_wildcard(&segment) {
                continue;
            }
            past_root = true;
        }

        if segment == "**" {
            return Recursion::Unbounded;
        }

        level += 1;
    }

    Recursion::Bounded((level - 1).max(0) as u32)
}
