pub mod listing;
pub mod tree;
pub mod watcher;
