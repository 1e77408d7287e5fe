#![forbid(unsafe_code)]

pub mod app;
pub mod input;

use std::io;
use std::io::IsTerminal as _;

use crate::error::TodogenError;

pub type Terminal = ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>;

#[must_use]
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
}

pub fn init_terminal() -> Result<Terminal, TodogenError> {
    use crossterm::terminal::enable_raw_mode;
    use ratatui::backend::CrosstermBackend;

    enable_raw_mode()
        .map_err(|e| TodogenError::Other(format!("failed to enable raw mode: {e}")))?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)
        .map_err(|e| TodogenError::Other(format!("failed to enter alt screen: {e}")))?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = ratatui::Terminal::new(backend)
        .map_err(|e| TodogenError::Other(format!("failed to create terminal: {e}")))?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal) -> Result<(), TodogenError> {
    use crossterm::terminal::disable_raw_mode;

    disable_raw_mode()
        .map_err(|e| TodogenError::Other(format!("failed to disable raw mode: {e}")))?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )
    .map_err(|e| TodogenError::Other(format!("failed to leave alt screen: {e}")))?;
    terminal
        .show_cursor()
        .map_err(|e| TodogenError::Other(format!("failed to show cursor: {e}")))?;
    Ok(())
}

/// Restores the terminal on drop, including on early returns and panics
/// that unwind through the session.
pub struct TerminalGuard {
    terminal: Option<Terminal>,
}

impl TerminalGuard {
    #[must_use]
    pub fn new(terminal: Terminal) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }

    pub fn terminal_mut(&mut self) -> Option<&mut Terminal> {
        self.terminal.as_mut()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = restore_terminal(terminal);
        }
    }
}
