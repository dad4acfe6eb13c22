//! External process execution with captured, logged output.
//!
//! Every packaging tool runs through [`run_logged`], which streams both
//! output pipes into the job's [`BuildLog`] and returns a [`ProcessResult`].
//! Success is decided by [`ProcessResult::check`], never at the call site.

use crate::bundler::{
    build_log::BuildLog,
    error::{Error, Result},
};
use regex::Regex;
use std::{
    process::{ExitStatus, Stdio},
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc,
};

/// Outcome of one external command.
#[derive(Debug)]
pub struct ProcessResult {
    /// Rendered command line.
    pub command: String,
    /// Exit status.
    pub status: ExitStatus,
    /// Captured stdout lines.
    pub stdout: Vec<String>,
    /// Captured stderr lines.
    pub stderr: Vec<String>,
    /// Wall-clock time.
    pub elapsed: Duration,
}

impl ProcessResult {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Human description of the exit status.
    pub fn status_description(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// First stderr line matching any of `patterns`.
    pub fn fatal_line(&self, patterns: &[Regex]) -> Option<&str> {
        self.stderr
            .iter()
            .find(|line| patterns.iter().any(|p| p.is_match(line)))
            .map(String::as_str)
    }

    /// Fail unless the process exited zero and printed no fatal diagnostic.
    pub fn check(&self, fatal_patterns: &[&str]) -> Result<()> {
        if !self.success() {
            let detail = self
                .stderr
                .last()
                .map(|line| format!(": {line}"))
                .unwrap_or_default();
            return Err(Error::Invocation {
                command: self.command.clone(),
                status: self.status_description(),
                detail,
            });
        }

        let patterns = compile_patterns(fatal_patterns)?;
        if let Some(line) = self.fatal_line(&patterns) {
            return Err(Error::Invocation {
                command: self.command.clone(),
                status: self.status_description(),
                detail: format!(": fatal diagnostic `{line}`"),
            });
        }

        Ok(())
    }
}

fn compile_patterns(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| Error::GenericError(format!("invalid fatal pattern `{p}`: {e}")))
        })
        .collect()
}

/// Render a command line for logs and error messages.
pub fn describe_command(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let mut parts = vec![std_cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(std_cmd.get_args().map(|a| {
        let arg = a.to_string_lossy();
        if arg.contains(' ') {
            format!("'{arg}'")
        } else {
            arg.into_owned()
        }
    }));
    parts.join(" ")
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `cmd` to completion, writing every output line to `log`.
///
/// Stdout lines are written verbatim, stderr lines with a `STDERR: ` prefix.
/// There is no timeout: packaging tools legitimately run for many minutes.
/// The child is killed if the returned future is dropped (Ctrl-C).
pub async fn run_logged(mut cmd: Command, log: &mut BuildLog) -> Result<ProcessResult> {
    let command = describe_command(&cmd);
    log.line(&format!("$ {command}")).await?;
    log::debug!("Running: {}", command);

    let started = Instant::now();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| Error::CommandFailed {
            command: command.clone(),
            error,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<(Stream, String)>();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_tx = tx.clone();
    let stderr_tx = tx;

    // Readers and the log writer run concurrently so neither pipe can fill up
    // and stall the child.
    let (_, _, (stdout_lines, stderr_lines, write_error)) = tokio::join!(
        async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = stdout_tx.send((Stream::Stdout, line));
                }
            }
        },
        async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = stderr_tx.send((Stream::Stderr, line));
                }
            }
        },
        async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let mut write_error = None;
            while let Some((stream, line)) = rx.recv().await {
                let rendered = match stream {
                    Stream::Stdout => line.clone(),
                    Stream::Stderr => format!("STDERR: {line}"),
                };
                log::trace!("  {}", rendered);
                if write_error.is_none() {
                    if let Err(e) = log.line(&rendered).await {
                        write_error = Some(e);
                    }
                }
                match stream {
                    Stream::Stdout => out.push(line),
                    Stream::Stderr => err.push(line),
                }
            }
            (out, err, write_error)
        }
    );

    let status = child.wait().await.map_err(|error| Error::CommandFailed {
        command: command.clone(),
        error,
    })?;
    let elapsed = started.elapsed();

    if let Some(e) = write_error {
        return Err(e);
    }

    let result = ProcessResult {
        command,
        status,
        stdout: stdout_lines,
        stderr: stderr_lines,
        elapsed,
    };
    log.line(&format!(
        "<== {} after {:.1}s",
        result.status_description(),
        elapsed.as_secs_f64()
    ))
    .await?;

    Ok(result)
}
