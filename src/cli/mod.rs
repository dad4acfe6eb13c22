//! Command line interface for the StemWeaver bundler.
//!
//! Resolves the selection (menu or `--select`), prepares the scratch
//! workspace, checks host tools once for the whole selection and then hands
//! the request to [`Bundler`].

mod args;
pub mod dispatch;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::{
    bundler::{
        BuildContext, BuildRequest, Bundler, DriverJobRunner, Provisioner, Settings,
        WorkspaceResolver,
        probe::{AssumeYes, Confirm, PythonVersion, ToolSpec, ensure_tools},
        workspace::{BUILD_DIR_ENV, LOG_RETENTION, prune_after_run, prune_logs},
    },
    error::{CliError, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK, Result},
    metadata,
};
use anyhow::Context as _;
use dispatch::{Prompter, Selection, describe_targets, parse_selection};
use path_absolutize::Absolutize;
use std::{
    borrow::Cow,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

/// Main CLI entry point. Returns the process exit status.
pub async fn run(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let output = OutputManager::new(args.verbose, args.quiet);

    let source = args.source.absolutize()?.into_owned();
    let out_dir = args
        .output
        .as_deref()
        .map(|p| p.absolutize().map(Cow::into_owned))
        .transpose()?;
    let settings = metadata::load_settings(&source, args.config.as_deref(), out_dir.as_deref())?;
    output.info(&format!(
        "{} {} from {}",
        settings.product_name(),
        settings.version_string(),
        settings.source_dir().display()
    ));

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    let targets = match select_targets(&args, &settings, &output, &mut prompter)? {
        Selection::Exit => {
            output.info("Nothing to build.");
            return Ok(EXIT_OK);
        }
        Selection::Targets(targets) => targets,
    };

    let workspace = WorkspaceResolver::new(settings.preferred_workspace())
        .with_override(std::env::var_os(BUILD_DIR_ENV).map(PathBuf::from))
        .resolve()?;
    workspace.create_layout()?;
    let pruned = prune_logs(&workspace.logs_dir(), LOG_RETENTION, &[])?;
    if !pruned.removed.is_empty() {
        output.verbose(&format!("Pruned {} old build logs", pruned.removed.len()));
    }

    let ctx = BuildContext::new(settings, workspace).with_keep_staging(args.keep_staging);
    let request = BuildRequest::new(targets, &ctx);
    output.verbose(&format!("Scratch directory: {}", ctx.workspace().root().display()));
    output.verbose(&format!("Tool cache: {}", ctx.tools_dir().display()));

    preflight(&request, &ctx, &args, &mut prompter).await?;

    output.progress(&format!(
        "Building {} target(s); logs in {}",
        request.len(),
        request.log_dir().display()
    ));
    let mut runner = DriverJobRunner::new(Provisioner::new(ctx.tools_dir()));
    let bundler = Bundler::new(&ctx);
    let summary = tokio::select! {
        summary = bundler.run(&request, &mut runner) => summary,
        _ = tokio::signal::ctrl_c() => {
            output.error("Interrupted; the running job's staging tree and log were left in place");
            return Ok(EXIT_INTERRUPTED);
        }
    };

    output.section("Summary");
    output.println(&summary.render_plain());

    let failed_logs: Vec<PathBuf> = summary
        .failed()
        .filter_map(|job| job.log_path().map(Path::to_path_buf))
        .collect();
    if let Err(e) = prune_after_run(&ctx.logs_dir(), LOG_RETENTION, &failed_logs) {
        log::warn!("Could not prune build logs: {}", e);
    }

    if summary.all_succeeded() {
        output.success("All targets built");
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_FAILURE)
    }
}

fn select_targets<R: BufRead, W: Write>(
    args: &Args,
    settings: &Settings,
    output: &OutputManager,
    prompter: &mut Prompter<R, W>,
) -> Result<Selection> {
    let all = settings.dispatch_all();
    let Some(select) = &args.select else {
        return Ok(prompter
            .choose_targets(all)
            .context("reading target selection")?);
    };

    let parsed = parse_selection(select, all);
    for warning in &parsed.warnings {
        output.warn(warning);
    }

    match parsed.selection {
        Selection::Exit => Ok(Selection::Exit),
        Selection::Targets(targets) if targets.is_empty() => Err(CliError::EmptySelection {
            selection: select.clone(),
        }
        .into()),
        Selection::Targets(targets) => {
            output.info(&describe_targets(&targets));
            let proceed = args.yes
                || prompter
                    .ask_yes_no("Proceed?")
                    .context("reading confirmation")?;
            Ok(if proceed {
                Selection::Targets(targets)
            } else {
                Selection::Exit
            })
        }
    }
}

/// Probe the union of the selected targets' tools once, offering to install
/// what is missing.
async fn preflight<R: BufRead, W: Write>(
    request: &BuildRequest,
    ctx: &BuildContext,
    args: &Args,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let specs: Vec<ToolSpec> = request
        .targets()
        .iter()
        .flat_map(|t| t.spec().tools.iter().copied())
        .collect();
    if specs.is_empty() {
        return Ok(());
    }

    let min_python: PythonVersion = ctx.settings().bundle_settings().min_python.parse()?;
    let mut assume_yes = AssumeYes;
    let confirm: &mut dyn Confirm = if args.yes {
        &mut assume_yes
    } else {
        prompter
    };
    ensure_tools(&specs, min_python, confirm).await?;
    Ok(())
}
