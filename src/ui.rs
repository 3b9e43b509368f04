use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode};
use crate::components::dialog::DialogWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeViewWidget;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let title = match app.model.root_path() {
        Some(root) => format!(" {} ", root.display()),
        None => " (no folder) ".to_string(),
    };
    let border_fg = if app.mode == AppMode::Normal {
        app.theme.border_focused_fg
    } else {
        app.theme.border_fg
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_fg));

    // Hit testing and windowing need the area rows are drawn into.
    app.tree_view.set_area(block.inner(chunks[0]));

    let tree_widget = TreeViewWidget::new(&app.tree_view, &app.theme).block(block);
    frame.render_widget(tree_widget, chunks[0]);

    let path_str = app
        .model
        .active_node_path()
        .or(app.model.root_path())
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let count = app.tree_view.nodes().len();
    let info = if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    };

    let mut status = StatusBarWidget::new(&path_str, &info, &app.theme);
    if let Some(msg) = &app.status_message {
        status = status.status_message(&msg.text, msg.is_error);
    }
    if let Some(watcher) = app.watcher_status() {
        status = status.watcher_status(watcher);
    }
    frame.render_widget(status, chunks[1]);

    if app.mode != AppMode::Normal {
        let dialog = DialogWidget::new(&app.mode, &app.dialog_state, &app.theme);
        frame.render_widget(dialog, frame.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DialogKind;
    use crate::config::{AppConfig, WatcherConfig};
    use crate::fs::listing::DirEntry;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::path::Path;
    use tokio::sync::mpsc;

    fn setup_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut app = App::new(&config, tx);
        let root = Path::new("/w");
        let entries = (0..50)
            .map(|i| {
                let name = format!("file{:02}.txt", i);
                DirEntry::new(name.clone(), root.join(name), false)
            })
            .collect();
        app.model.install_root(root, entries);
        app.sync_view();
        app
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let area = buf.area;
        let mut s = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }

    #[test]
    fn renders_tree_title_and_status() {
        let mut app = setup_app();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let content = screen(&terminal);
        assert!(content.contains(" /w "));
        assert!(content.contains("file00.txt"));
        assert!(content.contains("50 items"));
        assert!(content.contains("[watch off]"));
        // Only the rows that fit are drawn.
        assert!(!content.contains("file30.txt"));
    }

    #[test]
    fn tree_area_is_recorded_for_hit_testing() {
        let mut app = setup_app();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        // Border takes the first row and column.
        assert_eq!(
            app.tree_view.hit_test(2, 1),
            Some(Path::new("/w/file00.txt"))
        );
        assert_eq!(app.tree_view.hit_test(2, 0), None);
    }

    #[test]
    fn dialog_overlays_tree() {
        let mut app = setup_app();
        app.open_dialog(DialogKind::OpenFolder);
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(screen(&terminal).contains("Open Folder"));
    }
}
