// Human-readable console output.
//
// Progress goes to stdout, warnings and errors to stderr. Labels are
// coloured only when the stream is a terminal.

use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Console sink for progress and diagnostics.
///
/// Write failures are ignored: a closed pipe must not turn a successful
/// commit into a failed run.
pub struct Console<O, E> {
    out: O,
    err: E,
    out_is_tty: bool,
    err_is_tty: bool,
}

impl Console<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        let out = io::stdout();
        let err = io::stderr();
        let out_is_tty = out.is_terminal();
        let err_is_tty = err.is_terminal();
        Self { out, err, out_is_tty, err_is_tty }
    }
}

impl<O: Write, E: Write> Console<O, E> {
    /// Uncoloured console over arbitrary writers.
    pub fn new(out: O, err: E) -> Self {
        Self { out, err, out_is_tty: false, err_is_tty: false }
    }

    pub fn info(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
    }

    pub fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    pub fn success(&mut self, message: &str) {
        let line = render_human_line("ok", message, self.out_is_tty, ANSI_GREEN);
        let _ = writeln!(self.out, "{line}");
    }

    pub fn warning(&mut self, message: &str) {
        let line = render_human_line("warning", message, self.err_is_tty, ANSI_YELLOW);
        let _ = writeln!(self.err, "{line}");
    }

    pub fn error(&mut self, message: &str) {
        let line = render_human_line("error", message, self.err_is_tty, ANSI_RED);
        let _ = writeln!(self.err, "{line}");
    }

    /// Indented continuation line on stderr, used under an error.
    pub fn hint(&mut self, message: &str) {
        let _ = writeln!(self.err, "  {message}");
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

fn render_human_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
pub(crate) fn captured(console: Console<Vec<u8>, Vec<u8>>) -> (String, String) {
    let (out, err) = console.into_inner();
    (
        String::from_utf8(out).expect("stdout should be utf-8"),
        String::from_utf8(err).expect("stderr should be utf-8"),
    )
}
