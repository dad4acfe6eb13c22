//! Colored terminal output for the interactive front end.
//!
//! Library code reports through `log`; this is only for what the operator
//! reads: the menu, prompts, progress lines and the final summary.

use std::io::{IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Writes styled messages to stdout/stderr, honoring `--verbose`/`--quiet`.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    stdout_color: ColorChoice,
    stderr_color: ColorChoice,
}

#[derive(Clone, Copy)]
enum Target {
    Stdout,
    Stderr,
}

impl OutputManager {
    /// Create an output manager. Colors are used only on terminals.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let choice = |tty: bool| {
            if tty {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        };
        Self {
            verbose,
            quiet,
            stdout_color: choice(std::io::stdout().is_terminal()),
            stderr_color: choice(std::io::stderr().is_terminal()),
        }
    }

    fn write(&self, target: Target, spec: Option<ColorSpec>, prefix: &str, message: &str) {
        let mut stream = match target {
            Target::Stdout => StandardStream::stdout(self.stdout_color),
            Target::Stderr => StandardStream::stderr(self.stderr_color),
        };
        // Terminal write failures (closed pipe) are not worth aborting a build over.
        if let Some(spec) = &spec {
            let _ = stream.set_color(spec);
        }
        let _ = write!(stream, "{prefix}");
        if spec.is_some() {
            let _ = stream.reset();
        }
        let _ = writeln!(stream, "{message}");
        let _ = stream.flush();
    }

    fn colored(color: Color, bold: bool) -> Option<ColorSpec> {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(bold);
        Some(spec)
    }

    /// Plain line on stdout, always shown.
    pub fn println(&self, message: &str) {
        self.write(Target::Stdout, None, "", message);
    }

    /// Informational line, hidden by `--quiet`.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.write(Target::Stdout, None, "", message);
        }
    }

    /// Detail shown only with `--verbose`.
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.write(Target::Stdout, Self::colored(Color::Cyan, false), "  ", message);
        }
    }

    /// Progress step.
    pub fn progress(&self, message: &str) {
        if !self.quiet {
            self.write(Target::Stdout, Self::colored(Color::Blue, true), "→ ", message);
        }
    }

    /// Success line.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.write(Target::Stdout, Self::colored(Color::Green, true), "✓ ", message);
        }
    }

    /// Warning on stderr, hidden by `--quiet`.
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            self.write(Target::Stderr, Self::colored(Color::Yellow, true), "⚠ ", message);
        }
    }

    /// Error on stderr, always shown.
    pub fn error(&self, message: &str) {
        self.write(Target::Stderr, Self::colored(Color::Red, true), "✗ ", message);
    }

    /// Section header, always shown.
    pub fn section(&self, title: &str) {
        self.write(Target::Stdout, Self::colored(Color::White, true), "", "");
        self.write(Target::Stdout, Self::colored(Color::White, true), "", title);
    }

    /// Indented line, hidden by `--quiet`.
    pub fn indent(&self, message: &str) {
        if !self.quiet {
            self.write(Target::Stdout, None, "    ", message);
        }
    }
}
