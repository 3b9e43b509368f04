pub mod dialog;
pub mod icons;
pub mod status_bar;
pub mod tree;
