use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::window::TimeWindow;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "almanac",
    version,
    about = "Almanac: calendar, list and statistics views over a JSON task list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "almanacrc")]
    pub almanacrc: Option<PathBuf>,

    /// JSON task array; `-` reads stdin.
    #[arg(long = "tasks")]
    pub tasks: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// all, day, month or year.
    #[arg(
        long = "window",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<TimeWindow>())
    )]
    pub window: Option<TimeWindow>,

    /// Anchor date expression (today, 2025-08-01, +3d, ...).
    #[arg(long = "date")]
    pub date: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Tasks in a time window, narrowed by search and category.
    List {
        #[command(flatten)]
        period: PeriodArgs,

        #[arg(long = "search", default_value = "")]
        search: String,

        #[arg(long = "category", default_value = crate::domain::ALL_CATEGORIES)]
        category: String,
    },

    /// Counts by status, category and priority.
    Stats {
        #[command(flatten)]
        period: PeriodArgs,

        #[arg(long = "json")]
        json: bool,
    },

    /// Calendar events as JSON.
    Calendar,

    /// Tasks covering one day.
    Day { date: String },

    /// Report validation errors for every task.
    Validate,

    /// Apply a calendar drag or resize to a task.
    Move {
        id: u64,
        start: String,
        #[arg(long = "end")]
        end: Option<String>,
        #[arg(long = "all-day")]
        all_day: bool,
    },

    /// Draft a task from a calendar selection.
    Select {
        start: String,
        #[arg(long = "end")]
        end: Option<String>,
        #[arg(long = "all-day")]
        all_day: bool,
    },

    /// Flip a task between completed and in progress.
    Toggle { id: u64 },

    Remove { id: u64 },
}

impl Command {
    /// Command run when none is given, from `default.command`.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let name = cfg
            .get("default.command")
            .unwrap_or_else(|| "list".to_string());
        debug!(command = %name, "no explicit command, using default");
        match name.trim() {
            "list" => Ok(Self::List {
                period: PeriodArgs::default(),
                search: String::new(),
                category: crate::domain::ALL_CATEGORIES.to_string(),
            }),
            "stats" => Ok(Self::Stats {
                period: PeriodArgs::default(),
                json: false,
            }),
            "calendar" => Ok(Self::Calendar),
            "validate" => Ok(Self::Validate),
            other => Err(anyhow!(
                "default.command must be list, stats, calendar or validate, got: {other}"
            )),
        }
    }

    pub fn needs_tasks(&self) -> bool {
        !matches!(self, Self::Select { .. })
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of
/// the argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
