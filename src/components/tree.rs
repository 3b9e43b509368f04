use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};

use crate::components::icons::{resolve_icon_tag, IconTag};
use crate::fs::tree::VisibleNode;
use crate::theme::ThemeColors;

/// Rows rendered above and below the viewport.
pub const OVERSCAN: usize = 5;

/// Left padding of every row, in columns.
pub const BASE_INDENT: usize = 1;

/// Default indentation added per depth level, in columns.
pub const DEFAULT_INDENT_WIDTH: usize = 2;

/// Lines scrolled per mouse wheel notch.
const WHEEL_STEP: usize = 3;

/// What the owner of the view should do in response to input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// A row was clicked.
    Activate(PathBuf),
    /// A key arrived while the view had focus. Never interpreted here.
    Key(KeyEvent),
    /// A row was right-clicked.
    ContextMenu(PathBuf),
}

/// A row materialized for the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub index: usize,
    /// Offset of the row from the top of the content, in scroll units.
    pub top: usize,
    /// Leading columns before the icon.
    pub indent: usize,
    pub icon: IconTag,
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_active: bool,
}

/// Compute the inclusive index range to materialize.
///
/// `start = floor(scroll_top / row_height)` and
/// `end = ceil((scroll_top + viewport_height) / row_height)`, each widened
/// by [`OVERSCAN`] and clamped to the list bounds. `None` when there is
/// nothing to draw.
pub fn visible_range(
    scroll_top: usize,
    viewport_height: usize,
    row_height: usize,
    count: usize,
) -> Option<RangeInclusive<usize>> {
    if count == 0 || row_height == 0 {
        return None;
    }
    let start = (scroll_top / row_height).saturating_sub(OVERSCAN);
    let end = ((scroll_top + viewport_height).div_ceil(row_height) + OVERSCAN).min(count - 1);
    if start > end {
        return None;
    }
    Some(start..=end)
}

/// Virtualized renderer for the flattened tree.
///
/// Holds the complete ordered node list but only builds [`RenderedRow`]s
/// for the slice intersecting the viewport. Every render pass throws the
/// previous rows away.
#[derive(Debug)]
pub struct TreeView {
    row_height: usize,
    indent_width: usize,
    use_icons: bool,
    nodes: Vec<VisibleNode>,
    active_path: Option<PathBuf>,
    scroll_top: usize,
    viewport_height: usize,
    /// Total scrollable height: `nodes.len() * row_height`.
    content_height: usize,
    rows: Vec<RenderedRow>,
    area: Rect,
}

impl TreeView {
    pub fn new(row_height: usize, indent_width: usize, use_icons: bool) -> Self {
        Self {
            row_height: row_height.max(1),
            indent_width,
            use_icons,
            nodes: Vec::new(),
            active_path: None,
            scroll_top: 0,
            viewport_height: 0,
            content_height: 0,
            rows: Vec::new(),
            area: Rect::default(),
        }
    }

    /// Replace the node list and active path, then re-render the window.
    pub fn update_nodes(&mut self, nodes: Vec<VisibleNode>, active_path: Option<&Path>) {
        self.nodes = nodes;
        self.active_path = active_path.map(Path::to_path_buf);
        self.content_height = self.nodes.len() * self.row_height;
        self.scroll_top = self.scroll_top.min(self.max_scroll());
        self.render_window();
    }

    /// Scroll to an absolute offset (clamped to the content).
    pub fn scroll_to(&mut self, scroll_top: usize) {
        self.scroll_top = scroll_top.min(self.max_scroll());
        self.render_window();
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll_top.saturating_add_signed(delta);
        self.scroll_to(target);
    }

    /// Change the viewport height, re-rendering if it differs.
    pub fn resize(&mut self, viewport_height: usize) {
        if viewport_height == self.viewport_height {
            return;
        }
        self.viewport_height = viewport_height;
        self.scroll_top = self.scroll_top.min(self.max_scroll());
        self.render_window();
    }

    /// Record the screen area rows are drawn into (used for hit testing).
    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
        self.resize(area.height as usize);
    }

    /// Scroll the minimum amount that brings row `index` fully into view.
    pub fn ensure_visible(&mut self, index: usize) {
        if self.viewport_height == 0 || index >= self.nodes.len() {
            return;
        }
        let top = index * self.row_height;
        let bottom = top + self.row_height;
        if top < self.scroll_top {
            self.scroll_to(top);
        } else if bottom > self.scroll_top + self.viewport_height {
            self.scroll_to(bottom.saturating_sub(self.viewport_height));
        }
    }

    fn max_scroll(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    fn render_window(&mut self) {
        self.rows.clear();
        let Some(range) = visible_range(
            self.scroll_top,
            self.viewport_height,
            self.row_height,
            self.nodes.len(),
        ) else {
            return;
        };

        for index in range {
            let node = &self.nodes[index];
            self.rows.push(RenderedRow {
                index,
                top: index * self.row_height,
                indent: BASE_INDENT + node.depth * self.indent_width,
                icon: resolve_icon_tag(&node.name, node.is_directory, node.is_expanded),
                name: node.name.clone(),
                path: node.path.clone(),
                is_directory: node.is_directory,
                is_active: self.active_path.as_deref() == Some(node.path.as_path()),
            });
        }
    }

    /// Keys are handed to the owner untouched.
    pub fn handle_key(&self, key: KeyEvent) -> ViewAction {
        ViewAction::Key(key)
    }

    /// Translate a mouse event into an action. Wheel events scroll the view.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<ViewAction> {
        match mouse.kind {
            MouseEventKind::ScrollDown => {
                self.scroll_by((WHEEL_STEP * self.row_height) as isize);
                None
            }
            MouseEventKind::ScrollUp => {
                self.scroll_by(-((WHEEL_STEP * self.row_height) as isize));
                None
            }
            MouseEventKind::Down(MouseButton::Left) => self
                .hit_test(mouse.column, mouse.row)
                .map(|p| ViewAction::Activate(p.to_path_buf())),
            MouseEventKind::Down(MouseButton::Right) => self
                .hit_test(mouse.column, mouse.row)
                .map(|p| ViewAction::ContextMenu(p.to_path_buf())),
            _ => None,
        }
    }

    /// Path of the materialized row under a screen cell, if any.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<&Path> {
        if !self.area.contains(Position::new(column, row)) {
            return None;
        }
        let offset = self.scroll_top + (row - self.area.y) as usize;
        let index = offset / self.row_height;
        self.rows
            .iter()
            .find(|r| r.index == index)
            .map(|r| r.path.as_path())
    }

    /// Position of `path` in the full node list.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.nodes.iter().position(|n| n.path == path)
    }

    pub fn nodes(&self) -> &[VisibleNode] {
        &self.nodes
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    #[cfg(test)]
    pub fn content_height(&self) -> usize {
        self.content_height
    }

    #[cfg(test)]
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }
}

/// Draws the materialized rows of a [`TreeView`].
pub struct TreeViewWidget<'a> {
    view: &'a TreeView,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> TreeViewWidget<'a> {
    pub fn new(view: &'a TreeView, theme: &'a ThemeColors) -> Self {
        Self {
            view,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn row_style(&self, row: &RenderedRow) -> Style {
        if row.is_active {
            Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else if row.is_directory {
            Style::default()
                .fg(self.theme.tree_dir_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.tree_file_fg)
        }
    }
}

impl<'a> Widget for TreeViewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let view = self.view;
        let scroll_top = view.scroll_top;
        let bottom = scroll_top + inner.height as usize;

        for row in &view.rows {
            // Overscan rows are built but fall outside the viewport.
            let row_end = row.top + view.row_height;
            if row_end <= scroll_top || row.top >= bottom {
                continue;
            }
            let style = self.row_style(row);
            let icon = if view.use_icons {
                row.icon.glyph()
            } else {
                row.icon.ascii()
            };

            for line_offset in 0..view.row_height {
                let unit = row.top + line_offset;
                if unit < scroll_top || unit >= bottom {
                    continue;
                }
                let y = inner.y + (unit - scroll_top) as u16;
                if row.is_active {
                    buf.set_style(Rect::new(inner.x, y, inner.width, 1), style);
                }
                if line_offset == 0 {
                    let line = Line::from(vec![
                        Span::raw(" ".repeat(row.indent)),
                        Span::styled(icon, style),
                        Span::styled(row.name.as_str(), style),
                    ]);
                    buf.set_line(inner.x, y, &line, inner.width);
                }
            }
        }

        if view.content_height > inner.height as usize {
            let mut state = ScrollbarState::new(view.max_scroll())
                .viewport_content_length(inner.height as usize)
                .position(scroll_top);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .render(inner, buf, &mut state);
        }
    }
}
