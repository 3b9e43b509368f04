use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Windows reports releases too.
    if key.kind == KeyEventKind::Release {
        return;
    }

    match app.mode {
        AppMode::Dialog(DialogKind::OpenFolder) => handle_open_folder_key(app, key),
        AppMode::Dialog(DialogKind::ContextMenu { .. }) => handle_context_menu_key(app, key),
        AppMode::Normal => handle_normal_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Char('o') => app.open_dialog(DialogKind::OpenFolder),
        KeyCode::Enter if app.model.active_node_path().is_some() => app.activate_selected(),
        _ => {
            let action = app.tree_view.handle_key(key);
            app.handle_view_action(action);
        }
    }
}

fn handle_open_folder_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.confirm_open_folder(),
        KeyCode::Backspace => app.dialog_delete_char(),
        KeyCode::Left => app.dialog_move_cursor_left(),
        KeyCode::Right => app.dialog_move_cursor_right(),
        KeyCode::Home => app.dialog_cursor_home(),
        KeyCode::End => app.dialog_cursor_end(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.close_dialog(),
        KeyCode::Char(c) => app.dialog_input_char(c),
        _ => {}
    }
}

fn handle_context_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_dialog(),
        KeyCode::Up | KeyCode::Char('k') => app.menu_select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.menu_select_next(),
        KeyCode::Enter => app.confirm_context_action(),
        _ => {}
    }
}

/// Handle a mouse event. Any click closes an open dialog.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.mode != AppMode::Normal {
        if matches!(mouse.kind, MouseEventKind::Down(_)) {
            app.close_dialog();
        }
        return;
    }
    if let Some(action) = app.tree_view.handle_mouse(mouse) {
        app.handle_view_action(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, WatcherConfig};
    use crate::fs::listing::DirEntry;
    use crossterm::event::MouseButton;
    use ratatui::layout::Rect;
    use std::path::{Path, PathBuf};
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
        app.model.install_root(
            root,
            vec![
                DirEntry::new("a.txt", root.join("a.txt"), false),
                DirEntry::new("b.txt", root.join("b.txt"), false),
            ],
        );
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn q_quits_in_normal_mode() {
        let mut app = setup_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = setup_app();
        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn arrows_reach_tree_navigation() {
        let mut app = setup_app();
        press(&mut app, KeyCode::Down);
        assert_eq!(app.model.active_node_path(), Some(Path::new("/w/a.txt")));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.model.active_node_path(), Some(Path::new("/w/b.txt")));
    }

    #[test]
    fn o_opens_folder_prompt_and_typing_goes_to_input() {
        let mut app = setup_app();
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.mode, AppMode::Dialog(DialogKind::OpenFolder));

        // 'q' is text while the prompt is open.
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.dialog_state.input, "/wq");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[test]
    fn context_menu_keys() {
        let mut app = setup_app();
        app.request_context_menu(PathBuf::from("/w/b.txt"));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.dialog_state.selected, 2);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(
            app.status_message.as_ref().map(|m| m.text.as_str()),
            Some("New Folder: b.txt")
        );
    }

    #[test]
    fn click_while_menu_open_closes_it() {
        let mut app = setup_app();
        app.request_context_menu(PathBuf::from("/w/a.txt"));
        handle_mouse_event(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            },
        );
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[test]
    fn right_click_on_row_opens_menu() {
        let mut app = setup_app();
        app.tree_view.set_area(Rect::new(0, 0, 20, 5));
        app.sync_view();
        handle_mouse_event(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Right),
                column: 3,
                row: 1,
                modifiers: KeyModifiers::NONE,
            },
        );
        assert_eq!(
            app.mode,
            AppMode::Dialog(DialogKind::ContextMenu {
                target: PathBuf::from("/w/b.txt")
            })
        );
    }
}
