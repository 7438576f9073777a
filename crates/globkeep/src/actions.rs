//! Runs a fired rule's action lines through `/bin/sh -c`.

use std::path::Path;
use std::process::Command;

use globkeep_core::{Action, Kind};
use tracing::warn;

/// Join `actions` with newlines and run the result through `/bin/sh -c`,
/// with the rules-file-documented environment variables set. A non-zero
/// exit is logged, never propagated — one failing rule must not stop the
/// watch loop.
pub fn run(actions: &[String], action: Action, kind: Kind, path: &Path) {
    let script = actions.join("\n");

    let extname = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let status = Command::new("/bin/sh")
        .arg("-c")
        .arg(&script)
        .env("FILE", path)
        .env("EXTNAME", extname)
        .env("FILENAME", path.file_name().unwrap_or_default())
        .env("DIRNAME", path.parent().unwrap_or_else(|| Path::new("")))
        .env("ACTION", action.as_str())
        .env("TYPE", kind.as_str())
        .status();

    match status {
        Ok(status) if !status.success() => {
            warn!(?status, path = %path.display(), "action exited non-zero");
        }
        Err(error) => {
            warn!(%error, path = %path.display(), "failed to run action");
        }
        Ok(_) => {}
    }
}
