//! Glue between the task collection and
//! an interactive calendar widget.

use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  TimeZone,
  Utc
};
use serde::Serialize;
use tracing::{
  debug,
  warn
};

use super::{
  CalendarEvent,
  draft_from_selection,
  project_events,
  tasks_on_day
};
use crate::collection::TaskCollection;
use crate::domain::Domain;
use crate::error::ScheduleError;
use crate::task::Task;

pub const NOTICE_TTL_SECS: i64 = 5;

/// The widget side of the calendar. The
/// bridge only ever pushes a full event
/// list or asks it to undo the last
/// drag.
pub trait CalendarWidget {
  fn render(
    &mut self,
    events: &[CalendarEvent]
  );

  fn revert_last_edit(&mut self);
}

/// A drag, drop or resize reported by the
/// widget. `id` is the event id string.
#[derive(Debug, Clone)]
pub struct EventChange<Z: TimeZone> {
  pub id:      String,
  pub start:   DateTime<Z>,
  pub end:     Option<DateTime<Z>>,
  pub all_day: bool
}

/// An empty-slot selection `[start, end)`.
#[derive(Debug, Clone)]
pub struct DateSelection<Z: TimeZone> {
  pub start:   DateTime<Z>,
  pub end:     Option<DateTime<Z>>,
  pub all_day: bool
}

/// Click on a day cell's "+N more" link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoreLinkClick {
  pub date: NaiveDate
}

/// Transient user-facing message.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
  pub message:   String,
  pub raised_at: DateTime<Utc>
}

impl Notice {
  pub fn new(
    message: impl Into<String>,
    raised_at: DateTime<Utc>
  ) -> Self {
    Self {
      message: message.into(),
      raised_at
    }
  }

  pub fn is_expired(
    &self,
    now: DateTime<Utc>
  ) -> bool {
    now - self.raised_at
      >= Duration::seconds(NOTICE_TTL_SECS)
  }
}

/// Contents of the "more events" popover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAgenda {
  pub date:  NaiveDate,
  pub tasks: Vec<Task>
}

pub struct CalendarBridge<W> {
  widget: W,
  domain: Domain
}

impl<W: CalendarWidget> CalendarBridge<W> {
  pub fn new(
    widget: W,
    domain: Domain
  ) -> Self {
    Self {
      widget,
      domain
    }
  }

  pub fn widget(&self) -> &W {
    &self.widget
  }

  pub fn domain(&self) -> &Domain {
    &self.domain
  }

  /// Re-projects the whole collection
  /// into the widget.
  pub fn refresh(
    &mut self,
    tasks: &TaskCollection
  ) {
    let events = project_events(
      tasks.tasks(),
      &self.domain
    );
    self.widget.render(&events);
  }

  /// Commits a drag or resize. On failure
  /// the widget is told to undo the move
  /// and the collection stays as it was.
  #[tracing::instrument(skip(self, tasks, change), fields(id = %change.id))]
  pub fn on_event_change<Z: TimeZone>(
    &mut self,
    tasks: &TaskCollection,
    change: &EventChange<Z>,
    now: DateTime<Utc>
  ) -> Result<TaskCollection, Notice> {
    let result = change
      .id
      .parse::<u64>()
      .map_err(|_| {
        ScheduleError::EditRejected {
          id:     0,
          reason: format!(
            "unknown event id {:?}",
            change.id
          )
        }
      })
      .and_then(|id| {
        tasks.apply_calendar_edit(
          id,
          &change.start,
          change.end.as_ref(),
          change.all_day,
          &self.domain
        )
      });

    match result {
      | Ok(next) => {
        self.refresh(&next);
        Ok(next)
      }
      | Err(error) => {
        warn!(%error, "reverting calendar edit");
        self.widget.revert_last_edit();
        Err(Notice::new(
          error.user_message(),
          now
        ))
      }
    }
  }

  /// Task behind a clicked event, for the
  /// edit form.
  pub fn on_event_click(
    &self,
    tasks: &TaskCollection,
    event_id: &str
  ) -> Option<Task> {
    let task = event_id
      .parse::<u64>()
      .ok()
      .and_then(|id| tasks.get(id))
      .cloned();
    if task.is_none() {
      debug!(event_id, "click on unknown event");
    }
    task
  }

  /// Blank draft pre-filled from an empty
  /// slot selection.
  pub fn on_select<Z: TimeZone>(
    &self,
    selection: &DateSelection<Z>
  ) -> Task {
    let mut draft = Task::draft(
      self.domain.default_category()
    );
    draft_from_selection(
      &selection.start,
      selection.end.as_ref(),
      selection.all_day
    )
    .apply_to(&mut draft);
    draft
  }

  pub fn on_more_link(
    &self,
    tasks: &TaskCollection,
    click: MoreLinkClick
  ) -> DayAgenda {
    DayAgenda {
      date:  click.date,
      tasks: tasks_on_day(
        tasks.tasks(),
        click.date
      )
    }
  }
}
