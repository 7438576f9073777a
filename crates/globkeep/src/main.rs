//! CLI entry point: load a rules file, register a watch per pattern, and
//! run matched rules' actions as filesystem events come in.

mod actions;
mod config;
mod logger;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Result, WrapErr};
use globkeep_core::{InotifyKernel, Manager};
use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;

use config::{Rule, RulesFile};

/// Run shell actions in response to glob-matched filesystem changes.
#[derive(Parser, Debug)]
#[command(name = "globkeep", version, about)]
struct Cli {
    /// Path to the TOML rules file.
    #[arg(default_value = "watchfile.toml")]
    watch_rules_file: PathBuf,

    /// Directory relative patterns in the rules file are resolved against.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Increase log verbosity (repeatable: -v for debug, -vv for trace).
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable coloured event output.
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let rules = RulesFile::load(&cli.watch_rules_file).wrap_err("failed to load rules file")?;

    spawn_sigint_logger()?;

    let kernel = InotifyKernel::new().wrap_err("failed to initialize the watch kernel")?;
    let mut manager = Manager::new(kernel);
    manager.set_logger(logger::ReportLogger {
        color: !cli.no_color,
    });

    let mut rules_by_id: HashMap<u64, Rule> = HashMap::new();

    for rule in rules.rules {
        for pattern in &rule.patterns {
            let resolved = resolve_pattern(&cli.root, pattern);
            let id = manager
                .add_watch(&resolved)
                .wrap_err_with(|| format!("failed to watch pattern {resolved:?}"))?;
            rules_by_id.insert(id, rule.clone());
        }
    }

    tracing::info!(watches = rules_by_id.len(), "globkeep is watching");

    run_loop(&mut manager, &rules_by_id)
}

fn resolve_pattern(root: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        root.join(pattern).to_string_lossy().into_owned()
    }
}

fn run_loop(manager: &mut Manager<InotifyKernel>, rules_by_id: &HashMap<u64, Rule>) -> Result<()> {
    for event in manager.listen() {
        let Some(event) = event? else {
            continue;
        };

        let Some(rule) = rules_by_id.get(&event.id) else {
            continue;
        };

        let tags = [event.action.as_str(), event.kind.as_str()];
        if rule.matches(&tags) {
            actions::run(&rule.actions, event.action, event.kind, &event.path);
        }
    }

    Ok(())
}

/// Installing a handler is all that's needed on the happy path: `listen()`
/// blocks in a single-threaded read loop, so the process simply exits from
/// this background thread once `Ctrl-C` arrives, after logging a summary.
/// The kernel reclaims inotify file descriptors on process exit either way.
fn spawn_sigint_logger() -> Result<()> {
    let mut signals = Signals::new([SIGINT]).wrap_err("failed to install a SIGINT handler")?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            tracing::info!("received Ctrl-C, releasing watches and exiting");
            std::process::exit(0);
        }
    });

    Ok(())
}
