//! Terminal setup and teardown for the TUI.

use std::io;
use std::path::Path;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::tui::app::App;

/// Run the TUI against the given plan file.
///
/// Puts the terminal into raw mode and the alternate screen for the
/// duration of the session, restoring it afterwards even if the app
/// loop returns an error.
pub fn run_tui(db_path: &Path) -> io::Result<()> {
    let mut app = App::new(db_path)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
