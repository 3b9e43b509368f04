use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;
use crate::error::Result;
use crate::ui;

/// Owns the terminal for the lifetime of the explorer.
///
/// The alternate screen and raw mode are left again on [`restore`](Self::restore)
/// or, failing that, when the value is dropped, so an early `?` out of the
/// event loop does not leave the shell in raw mode.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse_enabled: bool,
    active: bool,
}

impl Tui {
    /// Enter raw mode and the alternate screen. Mouse capture drives row
    /// clicks, the context menu and wheel scrolling.
    pub fn new(enable_mouse: bool) -> Result<Self> {
        install_panic_hook(enable_mouse);

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        if enable_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            mouse_enabled: enable_mouse,
            active: true,
        })
    }

    /// Render one frame of the explorer.
    pub fn draw(&mut self, app: &mut App) -> Result<()> {
        self.terminal.draw(|frame| ui::render(app, frame))?;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<()> {
        if !std::mem::replace(&mut self.active, false) {
            return Ok(());
        }
        terminal::disable_raw_mode()?;
        leave_screen(self.terminal.backend_mut(), self.mouse_enabled)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "terminal restore failed");
        }
    }
}

/// Queue the escape sequences that undo [`Tui::new`] and flush them.
fn leave_screen<W: Write>(out: &mut W, mouse_enabled: bool) -> io::Result<()> {
    if mouse_enabled {
        queue!(out, DisableMouseCapture)?;
    }
    queue!(out, LeaveAlternateScreen, Show)?;
    out.flush()
}

/// Leave the alternate screen before the default hook prints the panic.
fn install_panic_hook(mouse_enabled: bool) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = terminal::disable_raw_mode();
        let _ = leave_screen(&mut io::stdout(), mouse_enabled);
        tracing::error!(%panic_info, "panic");
        previous(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAVE_ALT_SCREEN: &str = "\x1b[?1049l";
    const SHOW_CURSOR: &str = "\x1b[?25h";
    const MOUSE_OFF: &str = "\x1b[?1000l";

    #[test]
    fn leave_screen_with_mouse() {
        let mut out = Vec::new();
        leave_screen(&mut out, true).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(MOUSE_OFF));
        assert!(out.contains(LEAVE_ALT_SCREEN));
        assert!(out.ends_with(SHOW_CURSOR));
    }

    #[test]
    fn leave_screen_without_mouse_keeps_mouse_untouched() {
        let mut out = Vec::new();
        leave_screen(&mut out, false).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains(MOUSE_OFF));
        assert!(out.contains(LEAVE_ALT_SCREEN));
    }
}
