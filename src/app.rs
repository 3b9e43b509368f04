use std::path::{Path, PathBuf};
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc::UnboundedSender;

use crate::components::tree::{TreeView, ViewAction};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::Event;
use crate::fs::listing::{DirEntry, DirectoryLister, FsLister};
use crate::fs::tree::{base_name, Expansion, TreeModel};
use crate::fs::watcher::{ChangeKind, FileChangeEvent, WatchOptions, WatchSession};
use crate::theme::{resolve_theme, ThemeColors};

/// Entries of the right-click menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    NewFile,
    NewFolder,
    Rename,
    Delete,
}

impl ContextAction {
    pub const ALL: [ContextAction; 4] = [
        ContextAction::NewFile,
        ContextAction::NewFolder,
        ContextAction::Rename,
        ContextAction::Delete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContextAction::NewFile => "New File",
            ContextAction::NewFolder => "New Folder",
            ContextAction::Rename => "Rename",
            ContextAction::Delete => "Delete",
        }
    }
}

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    /// Prompt for a new root directory.
    OpenFolder,
    /// Popup menu for the entry at `target`.
    ContextMenu { target: PathBuf },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
}

/// State for a dialog's text input and menu selection.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
    /// Highlighted entry of the context menu.
    pub selected: usize,
}

/// Transient message shown in the status bar.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Main application state.
///
/// The model is only mutated from the event loop. Listings run as spawned
/// tasks and come back as [`Event::RootListed`] / [`Event::ChildrenListed`];
/// every model mutation queues an [`Event::TreeChanged`], which the loop
/// answers with [`App::sync_view`].
pub struct App {
    pub model: TreeModel,
    pub tree_view: TreeView,
    pub theme: ThemeColors,
    pub should_quit: bool,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<StatusMessage>,
    lister: FsLister,
    /// Root whose listing is in flight. Listings for any other root are stale.
    pending_root: Option<PathBuf>,
    watch_session: Option<WatchSession>,
    /// Root whose watch session is being started.
    pending_watch: Option<PathBuf>,
    watch_options: WatchOptions,
    watcher_enabled: bool,
    watcher_failed: bool,
    /// Scroll the active row into view on the next sync.
    reveal_active: bool,
    event_tx: UnboundedSender<Event>,
}

impl App {
    pub fn new(config: &AppConfig, event_tx: UnboundedSender<Event>) -> Self {
        let update_tx = event_tx.clone();
        let model = TreeModel::new(move || {
            let _ = update_tx.send(Event::TreeChanged);
        });

        Self {
            model,
            tree_view: TreeView::new(1, config.indent_width(), config.use_icons()),
            theme: resolve_theme(&config.theme),
            should_quit: false,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            lister: FsLister,
            pending_root: None,
            watch_session: None,
            pending_watch: None,
            watch_options: config.watch_options(),
            watcher_enabled: config.watcher_enabled(),
            watcher_failed: false,
            reveal_active: false,
            event_tx,
        }
    }

    // ── Root and watch session ───────────────────────────────────────────

    /// Start loading `root` and replace the watch session.
    ///
    /// The listing runs in the background; the tree switches over when
    /// [`handle_root_listed`](Self::handle_root_listed) receives it.
    pub fn open_root(&mut self, root: PathBuf) {
        tracing::info!(root = %root.display(), "opening root");
        self.pending_root = Some(root.clone());
        self.restart_watch(&root);

        let tx = self.event_tx.clone();
        let lister = self.lister;
        tokio::spawn(async move {
            let entries = lister.list_children(&root).await;
            let _ = tx.send(Event::RootListed { root, entries });
        });
    }

    /// Install a finished root listing unless another root was opened since.
    pub fn handle_root_listed(&mut self, root: PathBuf, entries: Vec<DirEntry>) {
        if self.pending_root.as_deref() != Some(root.as_path()) {
            tracing::debug!(root = %root.display(), "dropping stale root listing");
            return;
        }
        self.pending_root = None;
        self.model.install_root(&root, entries);
        self.tree_view.scroll_to(0);
    }

    /// Drop the current session and start one for `root` on a blocking
    /// task; the walk can be slow on large trees.
    fn restart_watch(&mut self, root: &Path) {
        if let Some(old) = self.watch_session.take() {
            tracing::debug!(old = %old.root_path().display(), new = %root.display(), "replacing watch session");
            old.cancel();
        }
        if !self.watcher_enabled {
            return;
        }

        self.pending_watch = Some(root.to_path_buf());
        let tx = self.event_tx.clone();
        let change_tx = self.event_tx.clone();
        let options = self.watch_options.clone();
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let session = WatchSession::start(&root, options, move |change| {
                let _ = change_tx.send(Event::FsChange(change));
            });
            let _ = tx.send(Event::WatchStarted { root, session });
        });
    }

    /// Adopt a finished session start unless another root was opened since.
    pub fn handle_watch_started(&mut self, root: PathBuf, session: notify::Result<WatchSession>) {
        if self.pending_watch.as_deref() != Some(root.as_path()) {
            tracing::debug!(root = %root.display(), "dropping stale watch session");
            return;
        }
        self.pending_watch = None;
        match session {
            Ok(session) => {
                self.watch_session = Some(session);
                self.watcher_failed = false;
            }
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "watcher unavailable");
                self.watcher_failed = true;
                self.set_error_message(format!("Watcher unavailable: {e}"));
            }
        }
    }

    /// Short watcher indicator for the status bar; `None` while watching.
    pub fn watcher_status(&self) -> Option<&'static str> {
        if !self.watcher_enabled {
            Some("[watch off]")
        } else if self.watcher_failed {
            Some("[watch unavailable]")
        } else if self.pending_watch.is_some() {
            Some("[watch starting]")
        } else {
            None
        }
    }

    /// Apply one add/unlink notification to the model.
    pub fn handle_fs_change(&mut self, change: FileChangeEvent) {
        // Events queued by a previous session may still arrive after a root switch.
        let in_root = self
            .model
            .root_path()
            .is_some_and(|root| change.path.starts_with(root) && change.path != root);
        if !in_root {
            return;
        }
        tracing::debug!(kind = ?change.kind, path = %change.path.display(), "fs change");
        match change.kind {
            ChangeKind::Add => self.model.add_node(&change.path, change.is_directory()),
            ChangeKind::Unlink => self.model.remove_node(&change.path),
        }
    }

    // ── Expansion ────────────────────────────────────────────────────────

    /// Select `path` and toggle it (click or Enter on a row).
    pub fn activate_node(&mut self, path: &Path) {
        self.model.set_active_node(Some(path));
        self.toggle_node(path);
    }

    /// Expand or collapse `path`, listing it in the background on first use.
    pub fn toggle_node(&mut self, path: &Path) {
        if self.model.begin_expansion(path) != Expansion::NeedsFetch {
            return;
        }
        let tx = self.event_tx.clone();
        let lister = self.lister;
        let path = path.to_path_buf();
        tokio::spawn(async move {
            let entries = lister.list_children(&path).await;
            let _ = tx.send(Event::ChildrenListed { path, entries });
        });
    }

    pub fn handle_children_listed(&mut self, path: PathBuf, entries: Vec<DirEntry>) {
        self.model.complete_expansion(&path, entries);
    }

    /// Push the model's visible nodes and active path into the view.
    pub fn sync_view(&mut self) {
        let nodes = self.model.visible_nodes();
        self.tree_view
            .update_nodes(nodes, self.model.active_node_path());

        if std::mem::take(&mut self.reveal_active) {
            if let Some(index) = self
                .model
                .active_node_path()
                .and_then(|active| self.tree_view.index_of(active))
            {
                self.tree_view.ensure_visible(index);
            }
        }
    }

    // ── Tree input ───────────────────────────────────────────────────────

    /// Dispatch an action reported by the tree view.
    pub fn handle_view_action(&mut self, action: ViewAction) {
        match action {
            ViewAction::Activate(path) => self.activate_node(&path),
            ViewAction::Key(key) => {
                self.handle_tree_key(key);
            }
            ViewAction::ContextMenu(path) => self.request_context_menu(path),
        }
    }

    /// Keyboard navigation over the visible nodes.
    ///
    /// Returns `true` when the key was consumed.
    pub fn handle_tree_key(&mut self, key: KeyEvent) -> bool {
        let nodes = self.model.visible_nodes();

        let Some(active) = self.model.active_node_path().map(Path::to_path_buf) else {
            if let Some(first) = nodes.first() {
                self.model.set_active_node(Some(&first.path));
                self.reveal_active = true;
            }
            return true;
        };
        let Some(index) = nodes.iter().position(|n| n.path == active) else {
            return false;
        };

        match key.code {
            KeyCode::Up => {
                let prev = &nodes[index.saturating_sub(1)];
                self.model.set_active_node(Some(&prev.path));
                self.reveal_active = true;
            }
            KeyCode::Down => {
                let next = &nodes[(index + 1).min(nodes.len() - 1)];
                self.model.set_active_node(Some(&next.path));
                self.reveal_active = true;
            }
            KeyCode::Right => {
                let node = &nodes[index];
                if node.is_directory && !node.is_expanded {
                    self.toggle_node(&node.path);
                }
            }
            KeyCode::Left => {
                let node = &nodes[index];
                if node.is_directory && node.is_expanded {
                    self.toggle_node(&node.path);
                }
            }
            _ => return false,
        }
        true
    }

    /// Toggle the active node, if any.
    pub fn activate_selected(&mut self) {
        if let Some(active) = self.model.active_node_path().map(Path::to_path_buf) {
            self.activate_node(&active);
        }
    }

    // ── Dialogs ──────────────────────────────────────────────────────────

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        if kind == DialogKind::OpenFolder {
            if let Some(root) = self.model.root_path() {
                let root = root.to_string_lossy().into_owned();
                self.dialog_state.cursor_position = root.len();
                self.dialog_state.input = root;
            }
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    /// Resolve the open-folder input and switch to it.
    pub fn confirm_open_folder(&mut self) {
        let input = self.dialog_state.input.trim().to_string();
        self.close_dialog();
        match resolve_root_dir(&input) {
            Ok(root) => self.open_root(root),
            Err(e) => {
                tracing::info!(input = %input, error = %e, "open folder rejected");
                self.set_error_message(e.to_string());
            }
        }
    }

    /// Show the context menu for `path`.
    pub fn request_context_menu(&mut self, path: PathBuf) {
        self.open_dialog(DialogKind::ContextMenu { target: path });
    }

    pub fn menu_select_next(&mut self) {
        let last = ContextAction::ALL.len() - 1;
        self.dialog_state.selected = (self.dialog_state.selected + 1).min(last);
    }

    pub fn menu_select_previous(&mut self) {
        self.dialog_state.selected = self.dialog_state.selected.saturating_sub(1);
    }

    /// Run the highlighted menu entry. Entries only report what was chosen.
    pub fn confirm_context_action(&mut self) {
        let AppMode::Dialog(DialogKind::ContextMenu { target }) = &self.mode else {
            return;
        };
        let target = target.clone();
        let action = ContextAction::ALL[self.dialog_state.selected.min(ContextAction::ALL.len() - 1)];
        self.close_dialog();

        tracing::info!(action = action.label(), path = %target.display(), "context menu action");
        self.set_status_message(format!("{}: {}", action.label(), base_name(&target)));
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
        }
    }

    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    // ── Status bar ───────────────────────────────────────────────────────

    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some(StatusMessage {
            text: msg,
            is_error: false,
            created: Instant::now(),
        });
    }

    pub fn set_error_message(&mut self, msg: String) {
        self.status_message = Some(StatusMessage {
            text: msg,
            is_error: true,
            created: Instant::now(),
        });
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some(ref msg) = self.status_message {
            if msg.created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Turn user input into a canonical directory path. A leading `~` expands
/// to the home directory.
pub fn resolve_root_dir(input: &str) -> Result<PathBuf> {
    if input.is_empty() {
        return Err(AppError::InvalidPath("no directory given".into()));
    }
    let expanded = match input.strip_prefix('~') {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(input),
        },
        None => PathBuf::from(input),
    };
    canonical_dir(&expanded)
}

/// Canonicalize `path`, which must name an existing directory.
pub fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .map_err(|_| AppError::InvalidPath(format!("{} does not exist", path.display())))?;
    if !canonical.is_dir() {
        return Err(AppError::InvalidPath(format!(
            "{} is not a directory",
            canonical.display()
        )));
    }
    Ok(canonical)
}
