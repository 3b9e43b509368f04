use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde::{Deserialize, Serialize};

/// Directory names that are never reported, in addition to hidden entries.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &["node_modules", "dist"];

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default maximum depth below the root for reported changes.
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Unlink,
}

/// A change notification, serialized as `{ "type", "path", "isDirectory"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: PathBuf,
    #[serde(
        rename = "isDirectory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_directory: Option<bool>,
}

impl FileChangeEvent {
    /// Whether the changed entry is a directory. Missing means file.
    pub fn is_directory(&self) -> bool {
        self.is_directory.unwrap_or(false)
    }
}

/// Tuning for a watch session.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub debounce: Duration,
    /// Extra component names to drop on top of hidden entries.
    pub ignore_names: Vec<String>,
    pub max_depth: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

type Debouncer = notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>;

/// Watcher plus the set of directories it currently watches.
struct Registry {
    debouncer: Option<Debouncer>,
    watched: HashSet<PathBuf>,
}

impl Registry {
    /// Watch every eligible directory from `start` down, one level each.
    ///
    /// Failing on `start` itself is an error. Failures below it are logged
    /// and skipped, except running out of watches, which stops the walk.
    fn watch_tree(&mut self, root: &Path, start: &Path, options: &WatchOptions) -> notify::Result<()> {
        let Some(debouncer) = self.debouncer.as_mut() else {
            return Ok(());
        };
        for dir in collect_watch_dirs(root, start, options) {
            if self.watched.contains(&dir) {
                continue;
            }
            match debouncer
                .watcher()
                .watch(&dir, notify::RecursiveMode::NonRecursive)
            {
                Ok(()) => {
                    self.watched.insert(dir);
                }
                Err(e) if dir == start => return Err(e),
                Err(e) if matches!(e.kind, notify::ErrorKind::MaxFilesWatch) => {
                    tracing::warn!(dir = %dir.display(), "watch limit reached, deeper changes are not reported");
                    break;
                }
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "cannot watch directory");
                }
            }
        }
        Ok(())
    }

    /// Forget `path` and everything below it. The OS drops watches on
    /// deleted directories by itself.
    fn forget(&mut self, path: &Path) {
        self.watched.retain(|dir| !dir.starts_with(path));
    }
}

/// A watch scoped to one root.
///
/// The tree is walked once with the same rules that filter events, and each
/// eligible directory gets its own non-recursive watch; directories created
/// later are added as they are reported. Owned by whoever displays that
/// root. Starting a session for a new root means dropping (or
/// [`cancel`](Self::cancel)ing) the old one first; the underlying watcher is
/// released when the session is dropped.
pub struct WatchSession {
    root_path: PathBuf,
    registry: Arc<Mutex<Registry>>,
}

impl WatchSession {
    /// Start watching `root`, passing each change to `on_event`.
    ///
    /// Walks the tree, so call it off the UI thread. Debounced paths are
    /// classified by looking at the filesystem: a path that still exists is
    /// reported as `add`, a missing one as `unlink`. Watcher errors are
    /// logged and never end the session.
    pub fn start<F>(root: &Path, options: WatchOptions, on_event: F) -> notify::Result<Self>
    where
        F: Fn(FileChangeEvent) + Send + 'static,
    {
        let root_path = root.to_path_buf();
        let registry = Arc::new(Mutex::new(Registry {
            debouncer: None,
            watched: HashSet::new(),
        }));

        // The handler only holds a weak reference so dropping the session
        // releases the watcher.
        let handler_registry = Arc::downgrade(&registry);
        let filter_root = root_path.clone();
        let filter_options = options.clone();

        let debouncer = new_debouncer(
            options.debounce,
            move |result: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(error = %e, "watcher error");
                        return;
                    }
                };
                for event in events {
                    if !matches!(
                        event.kind,
                        DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                    ) {
                        continue;
                    }
                    if should_ignore(
                        &filter_root,
                        &event.path,
                        &filter_options.ignore_names,
                        filter_options.max_depth,
                    ) {
                        continue;
                    }
                    let Some(change) = classify(&event.path) else {
                        continue;
                    };
                    if let Some(registry) = handler_registry.upgrade() {
                        if let Ok(mut registry) = registry.lock() {
                            match change.kind {
                                ChangeKind::Add if change.is_directory() => {
                                    if let Err(e) = registry.watch_tree(
                                        &filter_root,
                                        &change.path,
                                        &filter_options,
                                    ) {
                                        tracing::debug!(dir = %change.path.display(), error = %e, "cannot watch new directory");
                                    }
                                }
                                ChangeKind::Unlink => registry.forget(&change.path),
                                ChangeKind::Add => {}
                            }
                        }
                    }
                    on_event(change);
                }
            },
        )?;

        let watched = {
            let mut guard = registry
                .lock()
                .map_err(|_| notify::Error::generic("watch registry poisoned"))?;
            guard.debouncer = Some(debouncer);
            guard.watch_tree(&root_path, &root_path, &options)?;
            guard.watched.len()
        };

        tracing::info!(root = %root.display(), watched, "watch session started");
        Ok(Self {
            root_path,
            registry,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Directories currently under watch, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .registry
            .lock()
            .map(|r| r.watched.iter().cloned().collect())
            .unwrap_or_default();
        dirs.sort();
        dirs
    }

    /// Stop watching. Equivalent to dropping the session.
    pub fn cancel(self) {
        tracing::info!(root = %self.root_path.display(), "watch session closed");
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.debouncer = None;
            registry.watched.clear();
        }
    }
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("root_path", &self.root_path)
            .field("watched", &self.watched_dirs().len())
            .finish()
    }
}

/// Directories under `start` (inclusive) that need a watch.
///
/// Follows the event filter: hidden and ignored directories are skipped
/// along with their subtrees, and so is any directory whose entries would
/// sit deeper than `max_depth + 1` levels below `root`. Symlinks are not
/// followed.
fn collect_watch_dirs(root: &Path, start: &Path, options: &WatchOptions) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![start.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if dir != root
            && (should_ignore(root, &dir, &options.ignore_names, options.max_depth)
                || depth_below(root, &dir) > options.max_depth)
        {
            continue;
        }
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                // Still returned so watching it reports the failure.
                tracing::debug!(dir = %dir.display(), error = %e, "cannot read directory");
                out.push(dir);
                continue;
            }
        };
        out.push(dir);
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                stack.push(entry.path());
            }
        }
    }
    out
}

fn depth_below(root: &Path, path: &Path) -> usize {
    path.strip_prefix(root)
        .map(|rel| rel.components().count())
        .unwrap_or(0)
}

/// Turn a debounced path into an add/unlink event.
///
/// Content-only modifications also surface as `add`; the model ignores
/// adds for paths it already knows.
fn classify(path: &Path) -> Option<FileChangeEvent> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => Some(FileChangeEvent {
            kind: ChangeKind::Add,
            path: path.to_path_buf(),
            is_directory: Some(meta.is_dir()),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(FileChangeEvent {
            kind: ChangeKind::Unlink,
            path: path.to_path_buf(),
            is_directory: None,
        }),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot stat changed path");
            None
        }
    }
}

/// Check if a changed path should be dropped.
///
/// Only components below `root` are inspected: a path is ignored if one of
/// them is hidden (leading `.`) or matches an ignore name exactly, or if it
/// lies more than `max_depth` levels below the root.
pub fn should_ignore(root: &Path, path: &Path, ignore_names: &[String], max_depth: usize) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut depth = 0;
    for component in relative.components() {
        if let Component::Normal(name) = component {
            depth += 1;
            let name = name.to_string_lossy();
            if name.starts_with('.') || ignore_names.iter().any(|n| *n == name) {
                return true;
            }
        }
    }
    depth > max_depth + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn defaults() -> Vec<String> {
        DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ignore_hidden_paths() {
        let root = Path::new("/home/user/project");
        assert!(should_ignore(root, &root.join(".git/HEAD"), &defaults(), 15));
        assert!(should_ignore(root, &root.join("src/.cache"), &defaults(), 15));
        assert!(!should_ignore(root, &root.join("src/main.rs"), &defaults(), 15));
    }

    #[test]
    fn hidden_components_above_root_do_not_count() {
        let root = Path::new("/home/user/.config/app");
        assert!(!should_ignore(root, &root.join("settings.toml"), &defaults(), 15));
    }

    #[test]
    fn ignore_dependency_and_build_dirs() {
        let root = Path::new("/w");
        assert!(should_ignore(root, Path::new("/w/node_modules/pkg/index.js"), &defaults(), 15));
        assert!(should_ignore(root, Path::new("/w/app/dist"), &defaults(), 15));
        assert!(!should_ignore(root, Path::new("/w/distribution.md"), &defaults(), 15));
    }

    #[test]
    fn custom_ignore_names() {
        let root = Path::new("/w");
        let names = vec!["target".to_string()];
        assert!(should_ignore(root, Path::new("/w/target/debug"), &names, 15));
        assert!(!should_ignore(root, Path::new("/w/node_modules"), &names, 15));
    }

    #[test]
    fn depth_limit() {
        let root = Path::new("/w");
        let mut deep = root.to_path_buf();
        for i in 0..16 {
            deep.push(format!("d{i}"));
        }
        assert!(!should_ignore(root, &deep, &defaults(), 15));
        deep.push("too-deep.txt");
        assert!(should_ignore(root, &deep, &defaults(), 15));
    }

    #[test]
    fn classify_existing_and_missing() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let added = classify(&sub).unwrap();
        assert_eq!(added.kind, ChangeKind::Add);
        assert!(added.is_directory());

        let gone = classify(&dir.path().join("gone.txt")).unwrap();
        assert_eq!(gone.kind, ChangeKind::Unlink);
        assert_eq!(gone.is_directory, None);
        assert!(!gone.is_directory());
    }

    #[test]
    fn change_event_wire_shape() {
        let add = FileChangeEvent {
            kind: ChangeKind::Add,
            path: PathBuf::from("/w/a"),
            is_directory: Some(true),
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({"type": "add", "path": "/w/a", "isDirectory": true})
        );

        let unlink: FileChangeEvent =
            serde_json::from_str(r#"{"type":"unlink","path":"/w/b.txt"}"#).unwrap();
        assert_eq!(unlink.kind, ChangeKind::Unlink);
        assert!(!unlink.is_directory());
        assert_eq!(
            serde_json::to_string(&unlink).unwrap(),
            r#"{"type":"unlink","path":"/w/b.txt"}"#
        );
    }

    #[test]
    fn session_reports_created_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (tx, rx) = mpsc::channel();
        let options = WatchOptions {
            debounce: Duration::from_millis(50),
            ..Default::default()
        };
        let session = WatchSession::start(&root, options, move |e| {
            let _ = tx.send(e);
        })
        .unwrap();
        assert_eq!(session.root_path(), root.as_path());

        let created = root.join("hello.txt");
        std::fs::write(&created, "hi").unwrap();

        let event = loop {
            let e = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("expected a change event");
            if e.path == created {
                break e;
            }
        };
        assert_eq!(event.kind, ChangeKind::Add);
        assert_eq!(event.is_directory, Some(false));
        session.cancel();
    }

    /// Root with a source dir, an ignored dependency tree, a hidden dir and
    /// a long directory chain.
    fn sprawling_root(dir: &TempDir) -> PathBuf {
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("src")).unwrap();
        for i in 0..20 {
            std::fs::create_dir_all(root.join(format!("node_modules/pkg{i}/lib"))).unwrap();
        }
        std::fs::create_dir_all(root.join(".git/objects")).unwrap();
        let mut chain = root.join("deep");
        for i in 0..10 {
            chain.push(format!("d{i}"));
        }
        std::fs::create_dir_all(&chain).unwrap();
        std::fs::write(root.join("README.md"), "").unwrap();
        root
    }

    fn shallow_options() -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_millis(50),
            max_depth: 3,
            ..Default::default()
        }
    }

    #[test]
    fn walk_skips_ignored_hidden_and_deep_dirs() {
        let dir = TempDir::new().unwrap();
        let root = sprawling_root(&dir);

        let mut dirs = collect_watch_dirs(&root, &root, &shallow_options());
        dirs.sort();
        // deep/d0/d1 holds entries three levels down; d2 would be the fourth.
        assert_eq!(
            dirs,
            vec![
                root.clone(),
                root.join("deep"),
                root.join("deep/d0"),
                root.join("deep/d0/d1"),
                root.join("src"),
            ]
        );
    }

    #[test]
    fn walk_from_ignored_start_is_empty() {
        let dir = TempDir::new().unwrap();
        let root = sprawling_root(&dir);
        let start = root.join("node_modules/pkg0");
        assert!(collect_watch_dirs(&root, &start, &shallow_options()).is_empty());
    }

    #[test]
    fn session_watches_only_eligible_dirs() {
        let dir = TempDir::new().unwrap();
        let root = sprawling_root(&dir);

        let session = WatchSession::start(&root, shallow_options(), |_| {}).unwrap();
        let watched = session.watched_dirs();
        assert_eq!(watched.len(), 5);
        assert!(watched.contains(&root));
        assert!(!watched.iter().any(|d| d.starts_with(root.join("node_modules"))));
        assert!(!watched.iter().any(|d| d.starts_with(root.join(".git"))));
    }

    #[test]
    fn session_fails_for_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        assert!(WatchSession::start(&missing, WatchOptions::default(), |_| {}).is_err());
    }

    #[test]
    fn new_directories_are_watched_as_they_appear() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (tx, rx) = mpsc::channel();
        let session = WatchSession::start(&root, shallow_options(), move |e| {
            let _ = tx.send(e);
        })
        .unwrap();
        assert_eq!(session.watched_dirs(), vec![root.clone()]);

        let fresh = root.join("fresh");
        std::fs::create_dir(&fresh).unwrap();
        wait_for(&rx, &fresh);
        assert!(session.watched_dirs().contains(&fresh));

        // Entries inside the new directory are now reported too.
        let inner = fresh.join("inner.txt");
        std::fs::write(&inner, "x").unwrap();
        let event = wait_for(&rx, &inner);
        assert_eq!(event.kind, ChangeKind::Add);

        std::fs::remove_dir_all(&fresh).unwrap();
        let event = wait_for(&rx, &fresh);
        assert_eq!(event.kind, ChangeKind::Unlink);
        assert_eq!(session.watched_dirs(), vec![root.clone()]);
    }

    fn wait_for(rx: &mpsc::Receiver<FileChangeEvent>, path: &Path) -> FileChangeEvent {
        loop {
            let e = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("expected a change event");
            if e.path == path {
                return e;
            }
        }
    }
}
