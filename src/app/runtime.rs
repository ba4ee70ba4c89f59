use std::fs;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mediafetch_core::backend::YtDlpBackend;
use mediafetch_core::batch::{BatchDispatcher, FanoutObserver, RetrievalTask, TracingObserver};
use mediafetch_core::policy::{PolicyResolver, PolicyTable};
use mediafetch_core::source::read_url_file;
use tracing::{debug, info};

use super::config_file;
use super::exit_handler;
use super::output;
use super::progress::ProgressObserver;
use super::settings::{InputSource, RunSettings};
use super::terminal;
use crate::ProcessExit;
use crate::cli::Args;

pub(crate) async fn run_mediafetch() -> Result<ProcessExit> {
    let args = Args::parse();
    let file_config = config_file::load_default_file_config()?;

    let file_verbosity = file_config.as_ref().and_then(|(_, cfg)| cfg.verbosity);
    terminal::init_tracing(
        terminal::resolve_default_log_level(&args, file_verbosity),
        terminal::should_force_cli_log_level(&args),
    );
    if let Some((path, _)) = &file_config {
        debug!(path = %path.display(), "loaded config file");
    }

    let settings = RunSettings::resolve(&args, file_config.as_ref().map(|(_, cfg)| cfg));
    debug!(?settings, "run settings resolved");

    let urls = collect_urls(&settings.input)?;
    let dispatcher = build_dispatcher(&settings)?;

    if settings.info_only {
        let outcomes = dispatcher.inspect_all(&urls).await;
        for (url, outcome) in &outcomes {
            output::print_media_info(url, outcome);
        }
        let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();
        return Ok(exit_handler::determine_info_outcome(failed));
    }

    let use_progress_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let observer = FanoutObserver::new()
        .with(Arc::new(TracingObserver))
        .with(Arc::new(ProgressObserver::new(use_progress_bar, urls.len())));
    let dispatcher = dispatcher.with_observer(Arc::new(observer));

    info!(
        urls = urls.len(),
        workers = settings.workers,
        output_dir = %settings.output_dir.display(),
        "starting retrieval"
    );
    let report = dispatcher
        .run_batch(RetrievalTask::from_urls(urls), settings.workers)
        .await;

    output::print_summary(&report);
    Ok(exit_handler::determine_exit_outcome(
        report.successful(),
        report.failed(),
    ))
}

fn collect_urls(input: &InputSource) -> Result<Vec<String>> {
    match input {
        InputSource::Single(url) => Ok(vec![url.clone()]),
        InputSource::BatchFile(path) => {
            let list = read_url_file(path)?.require_non_empty(&path.display().to_string())?;
            info!("{list}");
            Ok(list.urls)
        }
    }
}

fn build_dispatcher(settings: &RunSettings) -> Result<BatchDispatcher> {
    let table = match &settings.policies_file {
        Some(path) => PolicyTable::load(path)
            .with_context(|| format!("Failed to load policy file '{}'", path.display()))?,
        None => PolicyTable::builtin(),
    };
    debug!(policies = table.len(), "policy table ready");
    let resolver = PolicyResolver::new(table).with_overrides(settings.caller_overrides());

    if !settings.info_only && !settings.output_dir.exists() {
        fs::create_dir_all(&settings.output_dir).with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;
        info!(dir = %settings.output_dir.display(), "created output directory");
    }

    let backend = match &settings.yt_dlp_path {
        Some(path) => YtDlpBackend::with_executable(path, &settings.output_dir)?,
        None => YtDlpBackend::from_path(&settings.output_dir)?,
    };
    debug!(binary = %backend.binary().display(), "using yt-dlp");

    Ok(
        BatchDispatcher::new(Arc::new(backend), Arc::new(resolver))
            .with_options(settings.dispatcher_options()),
    )
}
