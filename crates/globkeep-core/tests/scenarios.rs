//! Scenario tests driving a [`Manager`] through a [`MockKernel`] while
//! touching a real temporary directory tree, so the existence/enumeration
//! logic in `manager::create_watcher` runs against a real filesystem while
//! the kernel side stays fully deterministic.

use std::ffi::OsString;
use std::fs;

use globkeep_core::{Action, Kind, Manager, MockKernel, RawEvent, RawFlags};
use tempfile::TempDir;

fn manager() -> Manager<MockKernel> {
    Manager::new(MockKernel::new())
}

fn create_flags() -> RawFlags {
    RawFlags {
        create: true,
        ..Default::default()
    }
}

fn push(manager: &mut Manager<MockKernel>, handle: u64, name: Option<&str>, flags: RawFlags) {
    manager.kernel_mut().push(Some(RawEvent {
        handle,
        name: name.map(OsString::from),
        flags,
    }));
}

#[test]
fn static_directory_reports_plain_file_events() {
    let tmp = TempDir::new().unwrap();
    let watched = tmp.path().join("watched");
    fs::create_dir(&watched).unwrap();

    let mut manager = manager();
    let id = manager.add_watch(watched.to_str().unwrap()).unwrap();
    assert_eq!(manager.kernel_mut().watched, vec![watched.clone()]);

    push(&mut manager, 0, Some("a.txt"), create_flags());
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.action, Action::Create);
    assert_eq!(event.kind, Kind::File);
    assert_eq!(event.path, watched.join("a.txt"));

    push(
        &mut manager,
        0,
        Some("a.txt"),
        RawFlags {
            modify: true,
            ..Default::default()
        },
    );
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.action, Action::Update);

    push(
        &mut manager,
        0,
        Some("a.txt"),
        RawFlags {
            delete: true,
            ..Default::default()
        },
    );
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.action, Action::Remove);
}

#[test]
fn idle_tick_passes_through_untouched() {
    let mut manager = manager();
    manager.kernel_mut().push(None);
    assert_eq!(manager.poll().unwrap(), None);
}

#[test]
fn shallow_glob_enumerates_existing_and_discovered_subdirectories() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let sub = root.join("sub");
    fs::create_dir_all(&sub).unwrap();

    let mut manager = manager();
    let pattern = format!("{}/*/*.txt", root.display());
    let id = manager.add_watch(&pattern).unwrap();

    // root (handle 0) and the pre-existing `sub` (handle 1) are both
    // watched as soon as the pattern is registered.
    assert_eq!(manager.kernel_mut().watched, vec![root.clone(), sub.clone()]);

    // A file matching the glob appears inside the pre-existing subdirectory.
    push(&mut manager, 1, Some("x.txt"), create_flags());
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.action, Action::Create);
    assert_eq!(event.path, sub.join("x.txt"));

    // A brand new subdirectory appears directly under root.
    let sub2 = root.join("sub2");
    fs::create_dir(&sub2).unwrap();
    push(
        &mut manager,
        0,
        Some("sub2"),
        RawFlags {
            create: true,
            is_dir: true,
            ..Default::default()
        },
    );

    // The bare directory-creation path doesn't itself satisfy `*/*.txt`, so
    // no user event is emitted for it...
    assert_eq!(manager.poll().unwrap(), None);
    // ...but a Child watcher was still set up for it.
    assert_eq!(manager.kernel_mut().watched.len(), 3);
    assert_eq!(manager.kernel_mut().watched[2], sub2);

    // Files created inside the newly-discovered subdirectory are reported.
    push(&mut manager, 2, Some("y.txt"), create_flags());
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.path, sub2.join("y.txt"));
}

#[test]
fn nonexistent_target_is_reported_once_its_whole_ancestor_chain_appears() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir(&root).unwrap();
    let target = root.join("missing").join("target");

    let mut manager = manager();
    let id = manager.add_watch(target.to_str().unwrap()).unwrap();

    // Only the deepest existing ancestor is actually watched.
    assert_eq!(manager.kernel_mut().watched, vec![root.clone()]);

    // `missing` appears under `root`: the chain climbs one level, no user
    // event yet (an intermediate Parent can never emit).
    fs::create_dir(root.join("missing")).unwrap();
    push(
        &mut manager,
        0,
        Some("missing"),
        RawFlags {
            create: true,
            is_dir: true,
            ..Default::default()
        },
    );
    assert_eq!(manager.poll().unwrap(), None);
    assert_eq!(manager.kernel_mut().unwatched, vec![0]);
    assert_eq!(manager.kernel_mut().watched[1], root.join("missing"));

    // `target` finally appears under `root/missing`: now the original watch
    // is live and reports the creation under its own id.
    fs::create_dir(&target).unwrap();
    push(
        &mut manager,
        1,
        Some("target"),
        RawFlags {
            create: true,
            is_dir: true,
            ..Default::default()
        },
    );
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.action, Action::Create);
    assert_eq!(event.kind, Kind::Folder);
    assert_eq!(event.path, target);
}

#[test]
fn deleted_watch_root_is_re_promoted_under_the_same_id() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let target = root.join("target");
    fs::create_dir_all(&target).unwrap();

    let mut manager = manager();
    let id = manager.add_watch(target.to_str().unwrap()).unwrap();
    assert_eq!(manager.kernel_mut().watched, vec![target.clone()]);

    // The watched directory itself is removed.
    fs::remove_dir(&target).unwrap();
    push(
        &mut manager,
        0,
        None,
        RawFlags {
            delete_self: true,
            is_dir: true,
            ..Default::default()
        },
    );
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.action, Action::Remove);
    assert_eq!(event.path, target);
    // The kernel already invalidated the old watch on its own.
    assert!(manager.kernel_mut().unwatched.is_empty());
    assert_eq!(manager.kernel_mut().watched[1], root);

    // It reappears...
    fs::create_dir(&target).unwrap();
    push(
        &mut manager,
        1,
        Some("target"),
        RawFlags {
            create: true,
            is_dir: true,
            ..Default::default()
        },
    );
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id, "re-promotion must reuse the original watch id");
    assert_eq!(event.action, Action::Create);
    assert_eq!(event.path, target);
    assert_eq!(manager.kernel_mut().unwatched, vec![1]);
}

#[test]
fn overlapping_patterns_share_one_kernel_watch() {
    let tmp = TempDir::new().unwrap();
    let shared = tmp.path().join("shared");
    fs::create_dir(&shared).unwrap();

    let mut manager = manager();
    let id1 = manager
        .add_watch(&format!("{}/*.txt", shared.display()))
        .unwrap();
    let id2 = manager
        .add_watch(&format!("{}/*.log", shared.display()))
        .unwrap();
    assert_ne!(id1, id2);

    // Both patterns root at the same directory: one kernel watch, shared.
    assert_eq!(manager.kernel_mut().watched, vec![shared.clone()]);

    manager.remove_watch(id1).unwrap();
    assert!(
        manager.kernel_mut().unwatched.is_empty(),
        "the second subscription still needs the watch"
    );

    manager.remove_watch(id2).unwrap();
    assert_eq!(manager.kernel_mut().unwatched, vec![0]);
}

#[test]
fn deep_double_star_enumerates_the_whole_existing_tree() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let nested = root.join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let mut manager = manager();
    let id = manager
        .add_watch(&format!("{}/**", root.display()))
        .unwrap();

    // root, root/a and root/a/b are all watched up front.
    assert_eq!(manager.kernel_mut().watched.len(), 3);
    let nested_handle = manager
        .kernel_mut()
        .watched
        .iter()
        .position(|p| p == &nested)
        .unwrap() as u64;

    push(&mut manager, nested_handle, Some("deep.rs"), create_flags());
    let event = manager.poll().unwrap().unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.path, nested.join("deep.rs"));
}
