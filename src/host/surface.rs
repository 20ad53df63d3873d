//! Render surface lifecycle.
//!
//! The surface is created exactly once per process and stays mounted across
//! every reload; only the wrapper's referent changes. Raw mode and the
//! alternate screen belong to this module alone.

use std::io::{Stdout, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::wrapper::RootWrapper;

/// Frame cadence while idle; input is polled at this interval, and external
/// shutdown requests are noticed within it.
const TICK: Duration = Duration::from_millis(100);

pub struct Surface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Surface {
    /// Enter raw mode and the alternate screen. Done once; reloads never
    /// touch the terminal again.
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Drive the wrapper until Ctrl+C or an external shutdown request.
    pub fn run(&mut self, wrapper: &RootWrapper) -> Result<()> {
        loop {
            if crate::core::is_shutdown() {
                break;
            }

            self.terminal.draw(|frame| wrapper.render(frame))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    // Raw mode swallows SIGINT, so Ctrl+C arrives here
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }
                    wrapper.handle_key(key);
                }
            }
        }
        Ok(())
    }

    /// Restore the terminal. Safe on every exit path.
    pub fn restore(&mut self) {
        disable_raw_mode().ok();
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen).ok();
        self.terminal.show_cursor().ok();
    }
}

/// One best-effort frame for a non-interactive host: no raw mode, no
/// alternate screen, no event loop. Size queries can fail off-terminal;
/// that only costs the frame, never the process.
pub fn render_once(wrapper: &RootWrapper) {
    match Terminal::new(CrosstermBackend::new(stdout())) {
        Ok(mut terminal) => {
            if let Err(e) = terminal.draw(|frame| wrapper.render(frame)) {
                crate::debug!("host"; "render skipped: {}", e);
            }
        }
        Err(e) => crate::debug!("host"; "render skipped: {}", e),
    }
}
