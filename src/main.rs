//! Entry point for the **yabswitch** daemon.
//!
//! Spawns the command sources (Unix-socket listener, periodic refresh
//! tick) on background threads and processes incoming commands on the main
//! thread, one at a time.  UI events stream to stdout as newline-delimited
//! JSON for whatever front end is attached.

use log::{error, info};
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use yabswitch::command::{Command, UiEvent};
use yabswitch::config::Config;
use yabswitch::ipc::listener::UnixSocketListener;
use yabswitch::repo::StateRepository;
use yabswitch::switcher::WindowSwitcher;
use yabswitch::traits::{CommandSource, Executor};
use yabswitch::yabai::YabaiExecutor;

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| std::env::temp_dir().display().to_string());
    format!("{}/yabswitch.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/yabswitch`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("yabswitch")
}

/// Try to load the config from `$XDG_CONFIG_HOME/yabswitch/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Resolve the cache file location.
fn cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("yabswitch")
        .join("state.json")
}

fn main() {
    env_logger::init();

    let config = load_config();
    let staleness = Duration::from_millis(config.cache.staleness_ms);

    let exec = YabaiExecutor::new(&config.daemon.program);
    let repo = StateRepository::new(exec, cache_path(), config.applications.directories.clone());
    let mut switcher = WindowSwitcher::new(repo, config.ranking.policy, staleness);

    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
    switcher.set_ui(ui_tx);
    spawn_ui_forwarder(ui_rx);

    // Serve the cached snapshot immediately; refresh if it is stale.
    if let Err(e) = switcher.activate() {
        error!("activation: {}", e);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx, staleness);

    run_event_loop(switcher, cmd_rx);
}

//  Event loop

fn run_event_loop<E: Executor>(mut switcher: WindowSwitcher<E>, cmd_rx: mpsc::Receiver<Command>) {
    info!("yabswitch running");
    let mut queue: VecDeque<Command> = VecDeque::new();
    loop {
        let cmd = match queue.pop_front() {
            Some(cmd) => cmd,
            None => match cmd_rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };
        let cmd = collapse_burst(cmd, &cmd_rx, &mut queue);
        if let Err(e) = switcher.handle(cmd) {
            error!("command error: {}", e);
        }
    }
    info!("all command sources closed, exiting");
}

/// Collapse a burst of queued commands of the same debounceable kind: a
/// newer search supersedes an older one and duplicate refreshes fold into
/// a single run.  Anything else keeps its arrival order.
fn collapse_burst(
    first: Command,
    rx: &mpsc::Receiver<Command>,
    queue: &mut VecDeque<Command>,
) -> Command {
    if !matches!(first, Command::Search { .. } | Command::Refresh) {
        return first;
    }
    let mut latest = first;
    while let Ok(next) = rx.try_recv() {
        match (&latest, &next) {
            (Command::Search { .. }, Command::Search { .. }) => latest = next,
            (Command::Refresh, Command::Refresh) => {}
            _ => queue.push_back(next),
        }
    }
    latest
}

//  Helpers

/// Forward UI events to stdout as newline-delimited JSON.
fn spawn_ui_forwarder(rx: mpsc::Receiver<UiEvent>) {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for event in rx {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    let mut out = stdout.lock();
                    if writeln!(out, "{}", line).is_err() {
                        // The front end hung up; keep draining so the
                        // switcher never blocks.
                        continue;
                    }
                }
                Err(e) => error!("failed to serialize ui event: {}", e),
            }
        }
    });
}

fn spawn_command_sources(tx: mpsc::Sender<Command>, refresh_period: Duration) {
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        });
    }

    // Periodic refresh keeps the snapshot within the staleness threshold
    // even without user activity.
    std::thread::spawn(move || loop {
        std::thread::sleep(refresh_period);
        if tx.send(Command::Refresh).is_err() {
            break;
        }
    });
}
