pub mod analytics;
pub mod calendar;
pub mod cli;
pub mod collection;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod domain;
pub mod error;
pub mod filter;
pub mod render;
pub mod task;
pub mod validate;
pub mod window;

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<ExitCode> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting almanac"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.almanacrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let tz = cfg.timezone()?;
  let domain = cfg
    .domain()
    .context("failed to load category domain")?;
  let mut renderer =
    render::Renderer::new(&cfg)?;

  let command = match cli.command {
    | Some(command) => command,
    | None => {
      cli::Command::from_config(&cfg)?
    }
  };

  let tasks = if command.needs_tasks() {
    let source =
      cli.tasks.or_else(|| cfg.tasks_file());
    commands::load_tasks(source.as_deref())?
  } else {
    collection::TaskCollection::default()
  };

  let mut session = commands::Session {
    cfg:      &cfg,
    domain:   &domain,
    renderer: &mut renderer,
    now:      Utc::now().with_timezone(&tz)
  };
  let code = commands::dispatch(
    &mut session,
    &tasks,
    command
  )?;

  info!("done");
  Ok(code)
}
