//! Console implementation of the core `Reporter`.

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use relbin_core::Reporter;

use super::format_size;
use super::progress::format_progress;

/// Minimum gap between two progress redraws.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Prints install progress to stdout and problems to stderr.
#[derive(Debug)]
pub struct ConsoleReporter {
    quiet: bool,
    live: bool,
    last_draw: Mutex<Option<Instant>>,
}

impl ConsoleReporter {
    /// Create a reporter. A live progress line is only drawn on a terminal.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            live: !quiet && std::io::stdout().is_terminal(),
            last_draw: Mutex::new(None),
        }
    }

    fn clear_line(&self) {
        let drawn = self
            .last_draw
            .lock()
            .map(|mut last| last.take().is_some())
            .unwrap_or(false);
        if self.live && drawn {
            let _ = redraw_line(&mut io::stdout(), None);
        }
    }
}

/// Return to column 0, clear the current line and optionally print `line`
/// in its place.
pub(crate) fn redraw_line<W: Write>(out: &mut W, line: Option<&str>) -> io::Result<()> {
    out.queue(MoveToColumn(0))?;
    out.queue(Clear(ClearType::CurrentLine))?;
    if let Some(line) = line {
        out.queue(Print(format!("  {}", line.dark_grey())))?;
    }
    out.flush()
}

impl Reporter for ConsoleReporter {
    fn installing(&self, name: &str, version: &str) {
        if !self.quiet {
            println!("Installing {name} v{version}");
        }
    }

    fn downloading(&self, name: &str, url: &str) {
        if !self.quiet {
            println!("Downloading {name} from {}", url.dark_grey());
        }
    }

    fn progress(&self, current: u64, total: Option<u64>) {
        if !self.live {
            return;
        }
        let Ok(mut last) = self.last_draw.lock() else {
            return;
        };
        let finished = total.is_some_and(|t| current >= t);
        if last.is_some_and(|t| t.elapsed() < REDRAW_INTERVAL) && !finished {
            return;
        }
        *last = Some(Instant::now());
        let _ = redraw_line(&mut io::stdout(), Some(&format_progress(current, total)));
    }

    fn extracting(&self, archive: &Path, dest: &Path) {
        self.clear_line();
        if !self.quiet {
            let size = std::fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
            println!(
                "Extracting {} into {}",
                format_size(size),
                dest.display()
            );
        }
    }

    fn done(&self, name: &str, version: &str, executable: &Path) {
        if !self.quiet {
            println!(
                "{} {} v{} -> {}",
                "✓".green(),
                name,
                version,
                executable.display()
            );
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    fn warning(&self, msg: &str) {
        self.clear_line();
        eprintln!("{} {msg}", "warning:".yellow().bold());
    }

    fn error(&self, msg: &str) {
        self.clear_line();
        eprintln!("{}", msg.red());
    }
}
