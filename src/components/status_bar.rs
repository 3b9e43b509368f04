use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " \u{2191}\u{2193}:move  \u{2190}\u{2192}:fold  o:open  q:quit ";

/// Status bar widget that displays the active path, node count, key hints,
/// or a transient status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    watcher_status: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            info,
            theme,
            status_message: None,
            is_error: false,
            watcher_status: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn watcher_status(mut self, status: &'a str) -> Self {
        self.watcher_status = Some(status);
        self
    }
}

/// Keep the last `budget` characters, prefixed with `...` when cut.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().take(budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        let bar_style = Style::default()
            .bg(self.theme.status_bg)
            .fg(self.theme.status_fg);
        buf.set_style(area, bar_style);

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_bg)
            } else {
                bar_style.fg(self.theme.success_fg)
            };

            let display: String = msg.chars().take(width).collect();
            let display = format!("{:<width$}", display, width = width);
            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [path] ... [info] [watcher] [key_hints]
        let hints_len = KEY_HINTS.chars().count();
        let watcher = self.watcher_status.unwrap_or("");
        let watcher_len = if watcher.is_empty() {
            0
        } else {
            watcher.chars().count() + 1
        };
        let remaining = width.saturating_sub(hints_len + watcher_len);

        let info_len = self.info.chars().count();
        let path_budget = remaining.saturating_sub(info_len + 1);
        let path_display = truncate_left(self.path_str, path_budget);
        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_len);

        let mut spans = vec![
            Span::styled(path_display, bar_style),
            Span::raw(" ".repeat(gap)),
            Span::styled(self.info.to_string(), bar_style.fg(self.theme.dim_fg)),
        ];

        if !watcher.is_empty() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                watcher.to_string(),
                bar_style
                    .fg(self.theme.warning_fg)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        spans.push(Span::styled(
            KEY_HINTS,
            bar_style.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
        ));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn test_theme() -> ThemeColors {
        theme::dark_theme()
    }

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect()
    }

    #[test]
    fn status_message_success() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "3 items", &tc)
            .status_message("Rename: notes.md", false);

        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        assert!(row(&buf, 80).contains("Rename: notes.md"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, tc.success_fg);
    }

    #[test]
    fn status_message_error() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "3 items", &tc)
            .status_message("Invalid path: /nope does not exist", true);

        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        assert!(row(&buf, 80).contains("Invalid path"));
        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.bg, tc.error_fg);
        assert_eq!(cell.fg, tc.status_bg);
    }

    #[test]
    fn normal_bar_rendering() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/home/user/project/src", "42 items", &tc);

        let area = Rect::new(0, 0, 100, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        let content = row(&buf, 100);
        assert!(content.contains("/home/user/project/src"));
        assert!(content.contains("42 items"));
        assert!(content.contains("o:open"));
        assert!(content.contains("q:quit"));
    }

    #[test]
    fn watcher_status_displayed() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/w", "1 item", &tc).watcher_status("[watch off]");

        let area = Rect::new(0, 0, 100, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 100).contains("[watch off]"));
    }

    #[test]
    fn long_path_is_cut_from_the_left() {
        assert_eq!(truncate_left("/a/b/c/file.rs", 20), "/a/b/c/file.rs");
        assert_eq!(truncate_left("/very/long/path/file.rs", 10), "...file.rs");
        assert_eq!(truncate_left("/abc", 2), "/a");
    }

    #[test]
    fn zero_area_does_not_panic() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "info", &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}
