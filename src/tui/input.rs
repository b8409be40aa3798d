use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;

use chromatty::pipeline::Decision;
use chromatty::shared::Symbol;

// Keys the command line cares about while a run is going
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Skip,
    Abort,
    Cancel,
}

pub fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

// raw mode only while we're reading keys, so log lines still print normally
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

// poll for one keypress, None if nothing relevant arrived in `timeout`
pub fn poll_input(timeout: Duration) -> anyhow::Result<Option<KeyInput>> {
    let _guard = RawModeGuard::enable()?;
    if !event::poll(timeout)? {
        return Ok(None);
    }
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        return Ok(handle_key(key.code));
    }
    Ok(None)
}

fn handle_key(code: KeyCode) -> Option<KeyInput> {
    match code {
        KeyCode::Char('s' | 'S') => Some(KeyInput::Skip),
        KeyCode::Char('a' | 'A') => Some(KeyInput::Abort),
        KeyCode::Esc | KeyCode::Char('q' | 'Q') => Some(KeyInput::Cancel),
        _ => None,
    }
}

// Ask what to do about a position whose symbol has no samples.
// Gives up with Abort once `timeout` runs out, same as the asking side.
pub fn ask_missing(symbol: Symbol, position: usize, timeout: Option<Duration>) -> anyhow::Result<Decision> {
    print!("note #{}: no samples tagged {symbol}. [s]kip or [a]bort? ", position + 1);
    std::io::stdout().flush()?;

    let decision = if interactive() {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            match poll_input(Duration::from_millis(100))? {
                Some(KeyInput::Skip) => break Decision::Skip,
                Some(KeyInput::Abort | KeyInput::Cancel) => break Decision::Abort,
                None => {}
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break Decision::Abort;
            }
        }
    } else {
        // piped: one answer per line
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        match line.trim() {
            "s" | "S" | "skip" => Decision::Skip,
            _ => Decision::Abort,
        }
    };
    println!("{}", if decision == Decision::Skip { "skip" } else { "abort" });
    Ok(decision)
}
