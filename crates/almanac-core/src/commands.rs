use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::analytics::aggregate;
use crate::calendar::{draft_from_selection, project_events, tasks_on_day};
use crate::cli::{Command, PeriodArgs};
use crate::collection::TaskCollection;
use crate::config::Config;
use crate::datetime::parse_date_expr;
use crate::domain::Domain;
use crate::filter::{ViewState, list_view};
use crate::render::Renderer;
use crate::task::Task;
use crate::validate::validate;
use crate::window::filter_by_window;

/// Everything a command needs besides its own arguments.
pub struct Session<'a> {
    pub cfg: &'a Config,
    pub domain: &'a Domain,
    pub renderer: &'a mut Renderer,
    pub now: DateTime<Tz>,
}

/// Reads a JSON task array from `source` (`-` is stdin). With no source
/// the collection is empty.
#[instrument]
pub fn load_tasks(source: Option<&Path>) -> anyhow::Result<TaskCollection> {
    let Some(path) = source else {
        warn!("no task file given (--tasks or tasks.file); using an empty list");
        return Ok(TaskCollection::default());
    };

    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read tasks from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    parse_tasks(&raw).with_context(|| format!("invalid task file {}", path.display()))
}

pub fn parse_tasks(raw: &str) -> anyhow::Result<TaskCollection> {
    if raw.trim().is_empty() {
        return Ok(TaskCollection::default());
    }
    let tasks: TaskCollection = serde_json::from_str(raw)?;
    info!(count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

#[instrument(skip(session, tasks, command))]
pub fn dispatch(
    session: &mut Session<'_>,
    tasks: &TaskCollection,
    command: Command,
) -> anyhow::Result<ExitCode> {
    debug!(?command, "dispatching command");

    match command {
        Command::List {
            period,
            search,
            category,
        } => cmd_list(session, tasks, &period, search, category),
        Command::Stats { period, json } => cmd_stats(session, tasks, &period, json),
        Command::Calendar => {
            print_json(&project_events(tasks.tasks(), session.domain))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Day { date } => {
            let day = parse_date_expr(&date, session.now)?.date_naive();
            let rows = tasks_on_day(tasks.tasks(), day);
            session.renderer.print_agenda(day, &rows)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate => cmd_validate(session, tasks),
        Command::Move {
            id,
            start,
            end,
            all_day,
        } => {
            let start = parse_date_expr(&start, session.now)?;
            let end = end
                .map(|raw| parse_date_expr(&raw, session.now))
                .transpose()?;
            let next = tasks.apply_calendar_edit(id, &start, end.as_ref(), all_day, session.domain)?;
            print_json(&next)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Select {
            start,
            end,
            all_day,
        } => {
            let start = parse_date_expr(&start, session.now)?;
            let end = end
                .map(|raw| parse_date_expr(&raw, session.now))
                .transpose()?;
            let mut draft = Task::draft(session.domain.default_category());
            draft_from_selection(&start, end.as_ref(), all_day).apply_to(&mut draft);
            print_json(&draft)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Toggle { id } => {
            print_json(&tasks.toggle_status(id)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { id } => {
            print_json(&tasks.remove(id)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_view(session: &Session<'_>, period: &PeriodArgs) -> anyhow::Result<ViewState> {
    let window = match period.window {
        Some(window) => window,
        None => session.cfg.default_window()?,
    };
    let anchor = match period.date.as_deref() {
        Some(expr) => parse_date_expr(expr, session.now)?,
        None => session.now,
    };

    let mut view = ViewState::new(anchor.date_naive());
    view.window = window;
    Ok(view)
}

#[instrument(skip(session, tasks, period))]
fn cmd_list(
    session: &mut Session<'_>,
    tasks: &TaskCollection,
    period: &PeriodArgs,
    search: String,
    category: String,
) -> anyhow::Result<ExitCode> {
    info!("command list");

    let mut view = resolve_view(session, period)?;
    view.search = search;
    view.category = category;

    let rows = list_view(tasks.tasks(), &view);
    let heading = view.window.label(view.anchor);
    session.renderer.print_task_table(&heading, &rows)?;
    Ok(ExitCode::SUCCESS)
}

#[instrument(skip(session, tasks, period))]
fn cmd_stats(
    session: &mut Session<'_>,
    tasks: &TaskCollection,
    period: &PeriodArgs,
    json: bool,
) -> anyhow::Result<ExitCode> {
    info!("command stats");

    let view = resolve_view(session, period)?;
    let windowed = filter_by_window(tasks.tasks(), view.window, view.anchor);
    let snapshot = aggregate(&windowed, session.domain);

    if json {
        print_json(&snapshot)?;
    } else {
        let heading = view.window.label(view.anchor);
        session.renderer.print_stats(&heading, &snapshot)?;
    }
    Ok(ExitCode::SUCCESS)
}

#[instrument(skip(session, tasks))]
fn cmd_validate(session: &mut Session<'_>, tasks: &TaskCollection) -> anyhow::Result<ExitCode> {
    info!("command validate");

    let results = tasks
        .tasks()
        .iter()
        .map(|task| (task.clone(), validate(task, session.domain)))
        .collect::<Vec<_>>();
    let invalid = results.iter().filter(|(_, errors)| !errors.is_empty()).count();

    session.renderer.print_validation(&results)?;
    if invalid > 0 {
        warn!(invalid, "tasks failed validation");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
