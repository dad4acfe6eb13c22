//! Host tool detection and guided installation.
//!
//! Every target lists the commands it shells out to. Before a run starts the
//! union of those lists is probed; missing required tools are either
//! installed through the host package manager (after asking) or end the run
//! with an [`Error::Environment`].

mod package_manager;

pub use package_manager::PackageManager;

use crate::bundler::error::{Error, Result};
use regex::Regex;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::LazyLock,
};

/// Whether a run can proceed without the tool.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Requirement {
    /// Missing means the run cannot start.
    Required,
    /// Missing only degrades the build (a warning is logged).
    Optional,
}

/// A host command a target depends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ToolSpec {
    /// Executable name looked up on `PATH`.
    pub command: &'static str,
    /// Distribution-neutral package name providing the command.
    pub package: &'static str,
    /// Required or optional.
    pub requirement: Requirement,
}

impl ToolSpec {
    /// A tool the run cannot do without.
    pub const fn required(command: &'static str, package: &'static str) -> Self {
        Self {
            command,
            package,
            requirement: Requirement::Required,
        }
    }

    /// A tool that is used when present.
    pub const fn optional(command: &'static str, package: &'static str) -> Self {
        Self {
            command,
            package,
            requirement: Requirement::Optional,
        }
    }
}

/// Probe result for one tool.
#[derive(Clone, Debug)]
pub struct ToolStatus {
    /// What was looked for.
    pub spec: ToolSpec,
    /// Where it was found.
    pub path: Option<PathBuf>,
}

/// Presence of a set of tools.
#[derive(Clone, Debug, Default)]
pub struct ProbeReport {
    /// One entry per probed tool, in probe order.
    pub tools: Vec<ToolStatus>,
}

impl ProbeReport {
    /// Required tools that were not found.
    pub fn missing_required(&self) -> Vec<ToolSpec> {
        self.missing(Requirement::Required)
    }

    /// Optional tools that were not found.
    pub fn missing_optional(&self) -> Vec<ToolSpec> {
        self.missing(Requirement::Optional)
    }

    /// Location of `command`, if it was probed and found.
    pub fn path_of(&self, command: &str) -> Option<&Path> {
        self.tools
            .iter()
            .find(|t| t.spec.command == command)
            .and_then(|t| t.path.as_deref())
    }

    fn missing(&self, requirement: Requirement) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .filter(|t| t.path.is_none() && t.spec.requirement == requirement)
            .map(|t| t.spec)
            .collect()
    }
}

/// Check if a command exists on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Look every tool up on `PATH`. Duplicate commands are probed once.
pub fn probe_tools(specs: &[ToolSpec]) -> ProbeReport {
    let mut tools: Vec<ToolStatus> = Vec::new();

    for spec in specs {
        if let Some(existing) = tools.iter_mut().find(|t| t.spec.command == spec.command) {
            // A tool optional for one target and required for another is required.
            if spec.requirement == Requirement::Required {
                existing.spec.requirement = Requirement::Required;
            }
            continue;
        }

        let path = match which::which(spec.command) {
            Ok(path) => {
                log::debug!("Found {} at: {}", spec.command, path.display());
                Some(path)
            }
            Err(e) => {
                log::debug!("{} not found in PATH: {}", spec.command, e);
                None
            }
        };
        tools.push(ToolStatus { spec: *spec, path });
    }

    ProbeReport { tools }
}

/// Operator consent for actions with side effects.
pub trait Confirm {
    /// Ask a yes/no question. `Ok(false)` means declined.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Consent given up front (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        log::info!("{} [assumed yes]", question);
        Ok(true)
    }
}

/// A Python interpreter version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct PythonVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component (0 when absent).
    pub patch: u32,
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("static version regex")
});

impl FromStr for PythonVersion {
    type Err = Error;

    /// Accepts `3.8`, `3.11.4` and `Python 3.11.4` (the `--version` output).
    fn from_str(s: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| Error::GenericError(format!("no version number in `{}`", s.trim())))?;
        let part = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>().unwrap_or(0))
                .unwrap_or(0)
        };
        Ok(Self {
            major: part(1),
            minor: part(2),
            patch: part(3),
        })
    }
}

/// Run `<python> --version` and parse the result.
///
/// Python 2 printed its version on stderr, so both streams are consulted.
pub async fn probe_python(python: &Path) -> Result<PythonVersion> {
    let output = tokio::process::Command::new(python)
        .arg("--version")
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: format!("{} --version", python.display()),
            error,
        })?;

    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    text.parse()
}

/// Make sure every required tool is present, offering an install through the
/// detected host package manager otherwise.
///
/// Returns the final probe report. When `python3` is among the required
/// tools its version must be at least `min_python`.
pub async fn ensure_tools(
    specs: &[ToolSpec],
    min_python: PythonVersion,
    confirm: &mut dyn Confirm,
) -> Result<ProbeReport> {
    ensure_tools_with(specs, min_python, PackageManager::detect(), confirm).await
}

/// [`ensure_tools`] with an explicit package manager; `None` means the host
/// has none and missing tools cannot be installed.
pub async fn ensure_tools_with(
    specs: &[ToolSpec],
    min_python: PythonVersion,
    manager: Option<PackageManager>,
    confirm: &mut dyn Confirm,
) -> Result<ProbeReport> {
    let mut report = probe_tools(specs);

    for spec in report.missing_optional() {
        log::warn!(
            "Optional tool `{}` not found (package: {}); continuing without it",
            spec.command,
            spec.package
        );
    }

    let missing = report.missing_required();
    if !missing.is_empty() {
        install_missing(&missing, manager, confirm).await?;

        report = probe_tools(specs);
        let still_missing = report.missing_required();
        if !still_missing.is_empty() {
            return Err(Error::Environment(format!(
                "required tools still missing after install: {}",
                describe(&still_missing)
            )));
        }
    }

    let needs_python = report
        .tools
        .iter()
        .any(|t| t.spec.command == "python3" && t.spec.requirement == Requirement::Required);
    if let Some(python) = report.path_of("python3").filter(|_| needs_python) {
        let found = probe_python(python).await?;
        if found < min_python {
            return Err(Error::Environment(format!(
                "python3 {} found at {}, but at least {} is required",
                found,
                python.display(),
                min_python
            )));
        }
        log::info!("✓ python3 {} at {}", found, python.display());
    }

    Ok(report)
}

async fn install_missing(
    missing: &[ToolSpec],
    manager: Option<PackageManager>,
    confirm: &mut dyn Confirm,
) -> Result<()> {
    let Some(manager) = manager else {
        return Err(Error::Environment(format!(
            "missing required tools: {}.\n\
             No supported package manager (apt-get, dnf, yum, pacman, zypper) was found; \
             install them manually and re-run.",
            describe(missing)
        )));
    };

    let (program, args) = manager.install_command(missing, is_root());
    let command_line = format!("{} {}", program, args.join(" "));
    let question = format!(
        "Missing required tools: {}. Install with `{}`?",
        describe(missing),
        command_line
    );

    let accepted = confirm
        .confirm(&question)
        .map_err(|e| Error::Environment(format!("could not read install confirmation: {e}")))?;
    if !accepted {
        return Err(Error::Environment(format!(
            "missing required tools: {} (install declined)",
            describe(missing)
        )));
    }

    log::info!("Running: {}", command_line);
    let status = tokio::process::Command::new(&program)
        .args(&args)
        .status()
        .await
        .map_err(|e| Error::Environment(format!("failed to run `{command_line}`: {e}")))?;

    if !status.success() {
        return Err(Error::Environment(format!(
            "`{}` failed with exit code {:?}",
            command_line,
            status.code()
        )));
    }

    Ok(())
}

fn describe(specs: &[ToolSpec]) -> String {
    specs
        .iter()
        .map(|s| format!("{} (package: {})", s.command, s.package))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
