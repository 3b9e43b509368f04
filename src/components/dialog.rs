use std::path::Path;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, ContextAction, DialogKind, DialogState};
use crate::fs::tree::base_name;
use crate::theme::ThemeColors;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
    theme: &'a ThemeColors,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState, theme: &'a ThemeColors) -> Self {
        Self {
            mode,
            dialog_state,
            theme,
        }
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }

    fn frame(&self, title: &str, rect: Rect, buf: &mut Buffer) -> Rect {
        Clear.render(rect, buf);
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        inner
    }

    fn hint(&self, text: &str) -> Line<'static> {
        Line::from(Span::styled(
            text.to_string(),
            Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM),
        ))
    }

    fn render_open_folder(&self, area: Rect, buf: &mut Buffer) {
        let dialog_width = 60.min(area.width.saturating_sub(4));
        let rect = Self::centered_rect(dialog_width, 5, area);
        let inner = self.frame("Open Folder", rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let line = input_line(
            &self.dialog_state.input,
            self.dialog_state.cursor_position,
            inner.width as usize,
            self.theme,
        );
        buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);

        if inner.height > 1 {
            let hint = self.hint("[Enter] Open  [Esc] Cancel");
            buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
        }
    }

    fn render_context_menu(&self, target: &Path, area: Rect, buf: &mut Buffer) {
        let title = base_name(target);
        let dialog_width = (title.chars().count() as u16 + 6)
            .max(24)
            .min(area.width.saturating_sub(4));
        let dialog_height = ContextAction::ALL.len() as u16 + 2;
        let rect = Self::centered_rect(dialog_width, dialog_height, area);
        let inner = self.frame(&title, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        for (i, action) in ContextAction::ALL.iter().enumerate().take(inner.height as usize) {
            let style = if i == self.dialog_state.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };
            let label = format!("{:<width$}", action.label(), width = inner.width as usize);
            let line = Line::from(Span::styled(label, style));
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let kind = match &self.mode {
            AppMode::Dialog(kind) => kind,
            _ => return,
        };

        match kind {
            DialogKind::OpenFolder => self.render_open_folder(area, buf),
            DialogKind::ContextMenu { target } => self.render_context_menu(target, area, buf),
        }
    }
}

/// Input text with a block cursor, scrolled so the cursor stays visible.
fn input_line(input: &str, cursor: usize, max_width: usize, theme: &ThemeColors) -> Line<'static> {
    let before = &input[..cursor];
    let mut rest = input[cursor..].chars();
    let cursor_char = rest.next().map(String::from).unwrap_or_else(|| " ".into());
    let after: String = rest.collect();

    // Keep the tail of `before` when the line overflows.
    let room = max_width.saturating_sub(2);
    let before_len = before.chars().count();
    let before_display: String = if before_len > room {
        before.chars().skip(before_len - room).collect()
    } else {
        before.to_string()
    };

    let input_style = Style::default().fg(theme.tree_file_fg);
    let cursor_style = Style::default()
        .bg(theme.tree_file_fg)
        .fg(theme.dialog_bg)
        .add_modifier(Modifier::BOLD);

    Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::dark_theme;
    use std::path::PathBuf;

    fn render(mode: &AppMode, state: &DialogState) -> (Buffer, Rect) {
        let theme = dark_theme();
        let widget = DialogWidget::new(mode, state, &theme);
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (buf, area)
    }

    #[test]
    fn open_folder_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::OpenFolder);
        let state = DialogState {
            input: "/home/user/projects".to_string(),
            cursor_position: 19,
            selected: 0,
        };
        let (buf, area) = render(&mode, &state);
        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Open Folder"));
        assert!(content.contains("/home/user/projects"));
        assert!(content.contains("[Esc] Cancel"));
    }

    #[test]
    fn long_input_keeps_cursor_end_visible() {
        let mode = AppMode::Dialog(DialogKind::OpenFolder);
        let input = format!("/{}/tail-end", "x".repeat(120));
        let state = DialogState {
            cursor_position: input.len(),
            input,
            selected: 0,
        };
        let (buf, area) = render(&mode, &state);
        assert!(buffer_to_string(&buf, area).contains("tail-end"));
    }

    #[test]
    fn context_menu_renders_all_entries() {
        let mode = AppMode::Dialog(DialogKind::ContextMenu {
            target: PathBuf::from("/w/notes.md"),
        });
        let state = DialogState {
            selected: 1,
            ..Default::default()
        };
        let (buf, area) = render(&mode, &state);
        let content = buffer_to_string(&buf, area);
        assert!(content.contains("notes.md"));
        for action in ContextAction::ALL {
            assert!(content.contains(action.label()));
        }

        // The highlighted entry uses the selection background.
        let theme = dark_theme();
        let row = (0..area.height)
            .find(|&y| {
                (0..area.width)
                    .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<String>()
                    .contains("New Folder")
            })
            .unwrap();
        let x = (0..area.width)
            .find(|&x| buf.cell((x, row)).unwrap().symbol() == "N")
            .unwrap();
        assert_eq!(buf.cell((x, row)).unwrap().bg, theme.tree_selected_bg);
    }

    #[test]
    fn normal_mode_draws_nothing() {
        let (buf, area) = render(&AppMode::Normal, &DialogState::default());
        assert!(buffer_to_string(&buf, area).trim().is_empty());
    }

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }
}
