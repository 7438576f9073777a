//! Structured logging init and the coloured one-line event report.

use std::path::Path;

use globkeep_core::{Action, EventLogger, Kind};
use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

/// Priority: `RUST_LOG` env var > `-v`/`-vv` CLI verbosity > `info`.
pub fn init(verbosity: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

/// Prints one line per user event, at most once per raw kernel event.
pub struct ReportLogger {
    pub color: bool,
}

impl EventLogger for ReportLogger {
    /// Colour is gated on both the `--no-color` flag and, via
    /// `if_supports_color`, on stdout actually being a terminal — a
    /// redirected or piped run never gets ANSI escapes even with the flag
    /// left at its default.
    fn log(&self, action: Action, kind: Kind, path: &Path) {
        if !self.color {
            println!("{} {} {}", action.as_str(), kind.as_str(), path.display());
            return;
        }

        let action_label = match action {
            Action::Create => action
                .as_str()
                .if_supports_color(Stream::Stdout, |t| t.green())
                .to_string(),
            Action::Update => action
                .as_str()
                .if_supports_color(Stream::Stdout, |t| t.yellow())
                .to_string(),
            Action::Remove => action
                .as_str()
                .if_supports_color(Stream::Stdout, |t| t.red())
                .to_string(),
        };

        let kind_label = match kind {
            Kind::Folder => kind
                .as_str()
                .if_supports_color(Stream::Stdout, |t| t.cyan())
                .to_string(),
            Kind::File => kind
                .as_str()
                .if_supports_color(Stream::Stdout, |t| t.dimmed())
                .to_string(),
        };

        println!("{action_label} {kind_label} {}", path.display());
    }
}
