mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod theme;
mod tui;
mod ui;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::app::{canonical_dir, App};
use crate::components::icons::resolve_icon_tag;
use crate::config::{AppConfig, GeneralConfig, TreeConfig, WatcherConfig};
use crate::event::{Event, EventHandler};
use crate::fs::listing::FsLister;
use crate::fs::tree::TreeModel;
use crate::fs::watcher::{WatchOptions, WatchSession};
use crate::tui::Tui;

/// A lazily loaded, live-updating directory tree explorer.
#[derive(Parser, Debug)]
#[command(name = "fx", version, about)]
struct Cli {
    /// Root directory to explore (defaults to `general.default_path`, then
    /// the current directory)
    path: Option<PathBuf>,

    /// Path to a config file (overrides the default search)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable the filesystem watcher
    #[arg(long)]
    no_watcher: bool,

    /// Disable mouse capture
    #[arg(long)]
    no_mouse: bool,

    /// Use ASCII markers instead of Nerd Font icons
    #[arg(long)]
    no_icons: bool,

    /// Write logs to this file instead of the state directory
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print change events for DIR as JSON lines instead of starting the UI
    #[arg(long, value_name = "DIR", conflicts_with = "print")]
    watch_json: Option<PathBuf>,

    /// Print DIR as an indented outline instead of starting the UI
    #[arg(long, value_name = "DIR")]
    print: Option<PathBuf>,

    /// Number of levels shown by --print
    #[arg(long, value_name = "N", default_value_t = 1)]
    depth: usize,
}

impl Cli {
    /// Partial config carrying only the flags that were set.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: None,
                mouse: self.no_mouse.then_some(false),
            },
            tree: TreeConfig {
                use_icons: self.no_icons.then_some(false),
                indent_width: None,
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Stream change events for `root` to stdout until Ctrl-C.
async fn run_watch_json(root: &Path, options: WatchOptions) -> error::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let session = WatchSession::start(root, options, move |change| {
        let _ = tx.send(change);
    })?;

    loop {
        tokio::select! {
            Some(change) = rx.recv() => {
                let line = serde_json::to_string(&change).map_err(std::io::Error::from)?;
                println!("{}", line);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.cancel();
    Ok(())
}

/// Load `root` level by level and write it as an outline to stdout.
async fn run_print(root: &Path, levels: usize, use_icons: bool) -> error::Result<()> {
    let mut model = TreeModel::new(|| {});
    model.load_root(&FsLister, root).await;
    model.expand_levels(&FsLister, levels).await;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", root.display())?;
    for node in model.visible_nodes() {
        let tag = resolve_icon_tag(&node.name, node.is_directory, node.is_expanded);
        let icon = if use_icons { tag.glyph() } else { tag.ascii() };
        writeln!(out, "{}{}{}", "  ".repeat(node.depth + 1), icon, node.name)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let log_path = logging::init(cli.log_file.as_deref())?;
    tracing::info!(log = ?log_path, "fx starting");

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    if let Some(dir) = &cli.watch_json {
        let root = canonical_dir(dir)?;
        return run_watch_json(&root, config.watch_options()).await;
    }

    if let Some(dir) = &cli.print {
        let root = canonical_dir(dir)?;
        return run_print(&root, cli.depth, config.use_icons()).await;
    }

    let start = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let root = canonical_dir(&start)?;

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let mut app = App::new(&config, events.sender());
    app.open_root(root);

    loop {
        tui.draw(&mut app)?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
            Event::FsChange(change) => app.handle_fs_change(change),
            Event::RootListed { root, entries } => app.handle_root_listed(root, entries),
            Event::ChildrenListed { path, entries } => app.handle_children_listed(path, entries),
            Event::WatchStarted { root, session } => app.handle_watch_started(root, session),
            Event::TreeChanged => app.sync_view(),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("fx exiting");
    Ok(())
}
