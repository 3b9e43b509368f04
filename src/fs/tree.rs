use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::fs::listing::{DirEntry, DirectoryLister};

/// Callback fired once after every observable mutation of the model.
pub type UpdateCallback = Box<dyn FnMut()>;

/// A filesystem entry known to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    /// Child paths in insertion order. `None` for files and for directories
    /// whose children have never been loaded.
    pub children: Option<Vec<PathBuf>>,
    pub is_expanded: bool,
}

impl Node {
    /// Create a node for `path`, deriving its display name from the last
    /// path component. Directories start unloaded and collapsed.
    pub fn new(path: &Path, is_directory: bool) -> Self {
        Self {
            name: base_name(path),
            path: path.to_path_buf(),
            is_directory,
            children: None,
            is_expanded: false,
        }
    }

    fn from_entry(entry: DirEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            is_directory: entry.is_directory,
            children: None,
            is_expanded: false,
        }
    }

    /// Whether this directory's children have been loaded at least once.
    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }
}

/// One row of the flattened, display-ordered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_expanded: bool,
    /// Nesting level; the root's direct children are at depth 0.
    pub depth: usize,
}

impl VisibleNode {
    fn of(node: &Node, depth: usize) -> Self {
        Self {
            name: node.name.clone(),
            path: node.path.clone(),
            is_directory: node.is_directory,
            is_expanded: node.is_expanded,
            depth,
        }
    }
}

/// Outcome of [`TreeModel::begin_expansion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Unknown path, a file, or a fetch for this directory is already in flight.
    Ignored,
    /// Children were already loaded; the expansion flag was flipped.
    Toggled,
    /// The directory was never loaded. The caller must list it and hand the
    /// result to [`TreeModel::complete_expansion`].
    NeedsFetch,
}

/// Canonical in-memory model of the explored part of a directory tree.
///
/// Nodes live in a table keyed by path. There are no parent pointers; a
/// node's parent is found by stripping the last path component.
pub struct TreeModel {
    nodes: HashMap<PathBuf, Node>,
    root_path: Option<PathBuf>,
    active_node_path: Option<PathBuf>,
    /// Directories with a children fetch in flight.
    pending: HashSet<PathBuf>,
    on_update: UpdateCallback,
}

impl TreeModel {
    /// Create an empty model that calls `on_update` after each mutation.
    pub fn new(on_update: impl FnMut() + 'static) -> Self {
        Self {
            nodes: HashMap::new(),
            root_path: None,
            active_node_path: None,
            pending: HashSet::new(),
            on_update: Box::new(on_update),
        }
    }

    fn notify(&mut self) {
        (self.on_update)();
    }

    /// List `path` and install it as the new root.
    pub async fn load_root<L: DirectoryLister>(&mut self, lister: &L, path: &Path) {
        let entries = lister.list_children(path).await;
        self.install_root(path, entries);
    }

    /// Replace any previous tree with a root at `path` whose children are
    /// `entries`. Child directories are left unloaded.
    pub fn install_root(&mut self, path: &Path, entries: Vec<DirEntry>) {
        self.nodes.clear();
        self.pending.clear();
        self.active_node_path = None;

        let mut root = Node {
            name: path.to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            is_directory: true,
            children: None,
            is_expanded: true,
        };
        root.children = Some(self.insert_entries(entries));
        self.nodes.insert(path.to_path_buf(), root);
        self.root_path = Some(path.to_path_buf());

        tracing::debug!(root = %path.display(), nodes = self.nodes.len(), "root loaded");
        self.notify();
    }

    /// Insert fresh nodes for `entries`, skipping paths already in the table.
    /// Returns the paths that were inserted, in listing order.
    fn insert_entries(&mut self, entries: Vec<DirEntry>) -> Vec<PathBuf> {
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.nodes.contains_key(&entry.path) {
                continue;
            }
            inserted.push(entry.path.clone());
            self.nodes.insert(entry.path.clone(), Node::from_entry(entry));
        }
        inserted
    }

    /// Expand or collapse the directory at `path`, listing it first if it
    /// has never been loaded.
    pub async fn toggle_node_expansion<L: DirectoryLister>(&mut self, lister: &L, path: &Path) {
        if self.begin_expansion(path) == Expansion::NeedsFetch {
            let entries = lister.list_children(path).await;
            self.complete_expansion(path, entries);
        }
    }

    /// Expand visible directories level by level until `levels` levels
    /// below the root are shown. `levels` of 1 leaves the root's children
    /// collapsed.
    pub async fn expand_levels<L: DirectoryLister>(&mut self, lister: &L, levels: usize) {
        for depth in 0..levels.saturating_sub(1) {
            let collapsed: Vec<PathBuf> = self
                .visible_nodes()
                .into_iter()
                .filter(|n| n.depth == depth && n.is_directory && !n.is_expanded)
                .map(|n| n.path)
                .collect();
            for dir in collapsed {
                self.toggle_node_expansion(lister, &dir).await;
            }
        }
    }

    /// First half of an expansion toggle.
    ///
    /// Loaded directories flip synchronously and fire an update. A directory
    /// that was never loaded is marked pending and nothing is notified until
    /// [`complete_expansion`](Self::complete_expansion) runs. A second call
    /// while the fetch is pending is ignored.
    pub fn begin_expansion(&mut self, path: &Path) -> Expansion {
        let Some(node) = self.nodes.get_mut(path) else {
            return Expansion::Ignored;
        };
        if !node.is_directory {
            return Expansion::Ignored;
        }
        if self.pending.contains(path) {
            tracing::debug!(path = %path.display(), "expansion already in flight");
            return Expansion::Ignored;
        }
        if !node.is_loaded() && !node.is_expanded {
            self.pending.insert(path.to_path_buf());
            return Expansion::NeedsFetch;
        }

        node.is_expanded = !node.is_expanded;
        self.notify();
        Expansion::Toggled
    }

    /// Second half of an expansion toggle: merge the listed children and
    /// flip the expansion flag.
    ///
    /// Silently ignored when the path is no longer pending (the root was
    /// replaced) or the directory was removed while the fetch was in flight.
    pub fn complete_expansion(&mut self, path: &Path, entries: Vec<DirEntry>) {
        if !self.pending.remove(path) {
            tracing::trace!(path = %path.display(), "dropping stale listing");
            return;
        }
        if !matches!(self.nodes.get(path), Some(node) if node.is_directory) {
            return;
        }

        let inserted = self.insert_entries(entries);
        if let Some(node) = self.nodes.get_mut(path) {
            node.children.get_or_insert_with(Vec::new).extend(inserted);
            node.is_expanded = !node.is_expanded;
        }
        self.notify();
    }

    /// Select `path` (or clear the selection). The path is not validated.
    pub fn set_active_node(&mut self, path: Option<&Path>) {
        if self.active_node_path.as_deref() == path {
            return;
        }
        self.active_node_path = path.map(Path::to_path_buf);
        self.notify();
    }

    /// The selected path, which may no longer exist in the table.
    pub fn active_node_path(&self) -> Option<&Path> {
        self.active_node_path.as_deref()
    }

    /// Record a newly created entry.
    ///
    /// Dropped when the parent is unknown or has never been loaded (the
    /// first expansion will list it anyway), and when the path is already
    /// present.
    pub fn add_node(&mut self, path: &Path, is_directory: bool) {
        if self.nodes.contains_key(path) {
            return;
        }
        let Some(parent) = path.parent().and_then(|p| self.nodes.get_mut(p)) else {
            return;
        };
        let Some(children) = parent.children.as_mut() else {
            return;
        };
        if children.iter().any(|c| c == path) {
            return;
        }

        children.push(path.to_path_buf());
        self.nodes
            .insert(path.to_path_buf(), Node::new(path, is_directory));
        self.notify();
    }

    /// Remove `path` and every materialized descendant.
    pub fn remove_node(&mut self, path: &Path) {
        if !self.nodes.contains_key(path) {
            return;
        }

        if let Some(parent) = path.parent().and_then(|p| self.nodes.get_mut(p)) {
            if let Some(children) = parent.children.as_mut() {
                children.retain(|c| c != path);
            }
        }

        let mut stack = vec![path.to_path_buf()];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            self.pending.remove(&current);
            if let Some(node) = self.nodes.remove(&current) {
                removed += 1;
                if let Some(children) = node.children {
                    stack.extend(children);
                }
            }
        }

        tracing::trace!(path = %path.display(), removed, "removed subtree");
        self.notify();
    }

    /// Flatten the tree into display order.
    ///
    /// Depth-first pre-order from the root's children, descending only into
    /// expanded directories. Each level is sorted for display without
    /// touching the stored child order.
    pub fn visible_nodes(&self) -> Vec<VisibleNode> {
        let mut out = Vec::new();
        let Some(root) = self.root_path.as_ref().and_then(|p| self.nodes.get(p)) else {
            return out;
        };
        if root.is_expanded {
            self.push_children(root, 0, &mut out);
        }
        out
    }

    fn push_children(&self, node: &Node, depth: usize, out: &mut Vec<VisibleNode>) {
        let Some(children) = &node.children else {
            return;
        };
        let mut sorted: Vec<&Node> = children.iter().filter_map(|p| self.nodes.get(p)).collect();
        sorted.sort_by(|a, b| display_order(a, b));

        for child in sorted {
            out.push(VisibleNode::of(child, depth));
            if child.is_directory && child.is_expanded {
                self.push_children(child, depth + 1, out);
            }
        }
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.nodes.get(path)
    }

    /// Number of nodes in the table, root included.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }
}

/// Display order within one directory: directories first, then by name.
pub fn display_order(a: &Node, b: &Node) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| compare_names(&a.name, &b.name))
}

/// Locale-style name comparison.
///
/// Three levels: base letters (accents and case dropped, punctuation before
/// digits before letters), then accents, then lowercase before uppercase.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().nfd().cmp(b.to_lowercase().nfd()))
        .then_with(|| b.cmp(a))
}

fn collation_key(name: &str) -> Vec<(u8, char)> {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| (char_class(c), c))
        .collect()
}

fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

/// Last component of `path`, or the whole path when it has none (`/`).
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
