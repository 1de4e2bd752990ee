pub mod bridge;

use chrono::{
  DateTime,
  NaiveDate,
  TimeZone
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  add_days,
  days_between,
  format_task_date,
  format_task_time,
  parse_task_date,
  require_task_date,
  require_task_time,
  to_local_date_string,
  to_local_time_string
};
use crate::domain::Domain;
use crate::error::ScheduleError;
use crate::task::{
  DEFAULT_END_TIME,
  Priority,
  Status,
  Task
};
use crate::validate::{
  FIELD_END_DATE,
  FIELD_END_TIME,
  FIELD_START_DATE,
  FIELD_START_TIME
};

pub const EVENT_TEXT_COLOR: &str =
  "#ffffff";

/// Display model pushed to the calendar
/// widget. Regenerated from the task
/// collection on every change.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
  pub id:               String,
  pub title:            String,
  pub start:            String,
  pub end:              String,
  pub all_day:          bool,
  pub background_color: String,
  pub border_color:     String,
  pub text_color:       String,
  pub extended_props:   EventProps
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct EventProps {
  pub description:     String,
  pub category:        String,
  pub priority:        Priority,
  pub status:          Status,
  pub estimated_hours: f64,
  pub actual_hours:    f64,
  pub original_task:   Task
}

/// Date and time fields for a draft
/// created from a calendar selection.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct DraftSchedule {
  pub start_date: String,
  pub end_date:   String,
  pub start_time: String,
  pub end_time:   String
}

impl DraftSchedule {
  pub fn apply_to(
    &self,
    task: &mut Task
  ) {
    task.start_date =
      self.start_date.clone();
    task.end_date = self.end_date.clone();
    task.start_time =
      self.start_time.clone();
    task.end_time = self.end_time.clone();
  }
}

pub fn status_icon(
  status: Status
) -> &'static str {
  match status {
    | Status::Completed => "✅",
    | Status::InProgress => "🔄",
    | _ => "⏳"
  }
}

fn projection_error(
  task: &Task,
  reason: impl Into<String>
) -> ScheduleError {
  ScheduleError::Projection {
    id:     task.id,
    reason: reason.into()
  }
}

/// Forward mapping from a task to its
/// calendar event.
///
/// Multi-day tasks become all-day bars
/// whose `end` is the day after the
/// stored end date, because the widget
/// treats event ends as exclusive. Single
/// day tasks with both times become timed
/// events; everything else is a one-day
/// all-day event.
pub fn task_to_event(
  task: &Task,
  domain: &Domain
) -> Result<CalendarEvent, ScheduleError>
{
  let start_day = require_task_date(
    FIELD_START_DATE,
    &task.start_date
  )
  .map_err(|err| {
    projection_error(task, err.to_string())
  })?;

  let (start, end, all_day) = if task
    .is_multi_day()
  {
    let end_day = require_task_date(
      FIELD_END_DATE,
      &task.end_date
    )
    .map_err(|err| {
      projection_error(task, err.to_string())
    })?;
    if end_day < start_day {
      return Err(projection_error(
        task,
        "end date is before start date"
      ));
    }
    (
      format_task_date(start_day),
      format_task_date(add_days(
        end_day, 1
      )),
      true
    )
  } else if task.has_times() {
    let start_time = require_task_time(
      FIELD_START_TIME,
      &task.start_time
    )
    .map_err(|err| {
      projection_error(task, err.to_string())
    })?;
    let end_time = require_task_time(
      FIELD_END_TIME,
      &task.end_time
    )
    .map_err(|err| {
      projection_error(task, err.to_string())
    })?;
    let day = format_task_date(start_day);
    (
      format!(
        "{day}T{}",
        format_task_time(start_time)
      ),
      format!(
        "{day}T{}",
        format_task_time(end_time)
      ),
      false
    )
  } else {
    let day = format_task_date(start_day);
    (day.clone(), day, true)
  };

  let color =
    domain.color_for(&task.category);

  Ok(CalendarEvent {
    id: task.id.to_string(),
    title: task.title.clone(),
    start,
    end,
    all_day,
    background_color: color.to_string(),
    border_color: color.to_string(),
    text_color: EVENT_TEXT_COLOR
      .to_string(),
    extended_props: EventProps {
      description:     task
        .description
        .clone(),
      category:        task
        .category
        .clone(),
      priority:        task.priority,
      status:          task.status,
      estimated_hours: task
        .estimated_hours,
      actual_hours:    task.actual_hours,
      original_task:   task.clone()
    }
  })
}

/// Projects every task, dropping the
/// ones that fail without affecting the
/// rest.
#[tracing::instrument(skip(tasks, domain), fields(total = tasks.len()))]
pub fn project_events(
  tasks: &[Task],
  domain: &Domain
) -> Vec<CalendarEvent> {
  let events = tasks
    .iter()
    .filter_map(|task| {
      match task_to_event(task, domain) {
        | Ok(event) => Some(event),
        | Err(error) => {
          warn!(
            id = task.id,
            %error,
            "dropping task from calendar"
          );
          None
        }
      }
    })
    .collect::<Vec<_>>();

  debug!(
    events = events.len(),
    "calendar events projected"
  );
  events
}

/// Day span of a multi-day task; zero
/// for single-day or unparseable ones.
fn span_days(task: &Task) -> i64 {
  if !task.is_multi_day() {
    return 0;
  }
  match (
    parse_task_date(&task.start_date),
    parse_task_date(&task.end_date)
  ) {
    | (Some(start), Some(end)) => {
      days_between(start, end).max(0)
    }
    | _ => 0
  }
}

/// Reverse mapping for a drag, drop or
/// resize reported by the widget. Pure:
/// the caller commits the result and
/// reverts the widget if that fails.
pub fn apply_calendar_edit<
  Z: TimeZone
>(
  original: &Task,
  new_start: &DateTime<Z>,
  new_end: Option<&DateTime<Z>>,
  is_all_day: bool
) -> Task {
  let mut updated = original.clone();
  let start_day = new_start.date_naive();

  if is_all_day {
    updated.start_date =
      format_task_date(start_day);
    updated.end_date =
      format_task_date(add_days(
        start_day,
        span_days(original)
      ));
    updated.start_time.clear();
    updated.end_time.clear();
  } else {
    let day =
      to_local_date_string(new_start);
    updated.start_date = day.clone();
    updated.end_date = day;
    updated.start_time =
      to_local_time_string(new_start);
    if let Some(end) = new_end {
      updated.end_time =
        to_local_time_string(end);
    }
  }

  debug!(
    id = original.id,
    start = %updated.start_date,
    end = %updated.end_date,
    is_all_day,
    "calendar edit mapped"
  );
  updated
}

/// Draft fields for an empty-slot
/// selection `[start, end)`. The end
/// date is the last day covered, never
/// earlier than the start date. Only an
/// all-day end is exclusive; a timed end
/// keeps its own calendar day.
pub fn draft_from_selection<
  Z: TimeZone
>(
  start: &DateTime<Z>,
  end: Option<&DateTime<Z>>,
  is_all_day: bool
) -> DraftSchedule {
  let start_day = start.date_naive();
  let end_day = end
    .map(|end| {
      let last = if is_all_day {
        add_days(end.date_naive(), -1)
      } else {
        end.date_naive()
      };
      last.max(start_day)
    })
    .unwrap_or(start_day);

  let (start_time, end_time) =
    if is_all_day {
      (String::new(), String::new())
    } else {
      (
        to_local_time_string(start),
        end
          .map(to_local_time_string)
          .unwrap_or_else(|| {
            DEFAULT_END_TIME.to_string()
          })
      )
    };

  DraftSchedule {
    start_date: format_task_date(
      start_day
    ),
    end_date: format_task_date(end_day),
    start_time,
    end_time
  }
}

/// Tasks whose inclusive date range
/// covers `day`, for the "more events"
/// popover.
pub fn tasks_on_day(
  tasks: &[Task],
  day: NaiveDate
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| {
      let Some(start) =
        parse_task_date(&task.start_date)
      else {
        return false;
      };
      let Some(end) = parse_task_date(
        task.effective_end_date()
      ) else {
        return false;
      };
      start <= day && day <= end
    })
    .cloned()
    .collect()
}
