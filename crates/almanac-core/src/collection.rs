use std::sync::Arc;
use std::time::{
  SystemTime,
  UNIX_EPOCH
};

use chrono::{
  DateTime,
  TimeZone
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar;
use crate::domain::Domain;
use crate::error::ScheduleError;
use crate::task::Task;
use crate::validate::validate;

/// The canonical task list. Writes never
/// mutate in place: each one returns a
/// fresh collection, so holders of the
/// old one keep a stable snapshot.
#[derive(Debug, Clone, Default)]
pub struct TaskCollection(Arc<[Task]>);

impl TaskCollection {
  pub fn new(tasks: Vec<Task>) -> Self {
    Self(tasks.into())
  }

  pub fn tasks(&self) -> &[Task] {
    &self.0
  }

  pub fn get(
    &self,
    id: u64
  ) -> Option<&Task> {
    self.0.iter().find(|t| t.id == id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// True when both handles share one
  /// allocation, i.e. nothing was
  /// written in between.
  pub fn ptr_eq(
    &self,
    other: &Self
  ) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  fn position(
    &self,
    id: u64
  ) -> Result<usize, ScheduleError> {
    self
      .0
      .iter()
      .position(|t| t.id == id)
      .ok_or(ScheduleError::TaskNotFound(
        id
      ))
  }

  fn replaced(
    &self,
    index: usize,
    task: Task
  ) -> Self {
    let mut tasks = self.0.to_vec();
    tasks[index] = task;
    Self::new(tasks)
  }

  /// Validates and appends a draft.
  /// Returns the new collection and the
  /// assigned id.
  #[tracing::instrument(skip(self, draft, domain))]
  pub fn add(
    &self,
    mut draft: Task,
    domain: &Domain,
    now_ms: u64
  ) -> Result<(Self, u64), ScheduleError> {
    validate(&draft, domain)
      .into_result()?;

    let next_free = match self
      .0
      .iter()
      .map(|t| t.id)
      .max()
    {
      | Some(max) => max
        .checked_add(1)
        .ok_or(ScheduleError::IdsExhausted(
          max
        ))?,
      | None => 0
    };
    let id = now_ms.max(next_free);
    draft.id = id;

    let mut tasks = self.0.to_vec();
    tasks.push(draft);
    info!(id, "task added");
    Ok((Self::new(tasks), id))
  }

  /// Replaces the task stored under `id`
  /// with `edited`, keeping the id.
  #[tracing::instrument(skip(self, edited, domain))]
  pub fn update(
    &self,
    id: u64,
    mut edited: Task,
    domain: &Domain
  ) -> Result<Self, ScheduleError> {
    let index = self.position(id)?;
    edited.id = id;
    validate(&edited, domain)
      .into_result()?;
    info!(id, "task updated");
    Ok(self.replaced(index, edited))
  }

  #[tracing::instrument(skip(self))]
  pub fn remove(
    &self,
    id: u64
  ) -> Result<Self, ScheduleError> {
    let index = self.position(id)?;
    let mut tasks = self.0.to_vec();
    tasks.remove(index);
    info!(id, "task removed");
    Ok(Self::new(tasks))
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle_status(
    &self,
    id: u64
  ) -> Result<Self, ScheduleError> {
    let index = self.position(id)?;
    let mut task = self.0[index].clone();
    task.status = task.status.toggled();
    debug!(
      id,
      status = task.status.as_key(),
      "status toggled"
    );
    Ok(self.replaced(index, task))
  }

  /// Commits a drag, drop or resize on
  /// the stored task. Any failure is an
  /// `EditRejected` and leaves `self`
  /// untouched.
  #[tracing::instrument(skip(self, start, end, domain))]
  pub fn apply_calendar_edit<
    Z: TimeZone
  >(
    &self,
    id: u64,
    start: &DateTime<Z>,
    end: Option<&DateTime<Z>>,
    is_all_day: bool,
    domain: &Domain
  ) -> Result<Self, ScheduleError> {
    let reject = |reason: String| {
      warn!(id, %reason, "calendar edit rejected");
      ScheduleError::EditRejected {
        id,
        reason
      }
    };

    let index = self
      .position(id)
      .map_err(|err| reject(err.to_string()))?;
    let updated =
      calendar::apply_calendar_edit(
        &self.0[index],
        start,
        end,
        is_all_day
      );
    validate(&updated, domain)
      .into_result()
      .map_err(|err| reject(err.to_string()))?;

    Ok(self.replaced(index, updated))
  }
}

impl From<Vec<Task>> for TaskCollection {
  fn from(tasks: Vec<Task>) -> Self {
    Self::new(tasks)
  }
}

impl Serialize for TaskCollection {
  fn serialize<S: Serializer>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.0.iter())
  }
}

impl<'de> Deserialize<'de> for TaskCollection {
  fn deserialize<D: Deserializer<'de>>(
    deserializer: D
  ) -> Result<Self, D::Error> {
    Vec::<Task>::deserialize(deserializer)
      .map(Self::new)
  }
}

/// Wall-clock milliseconds, used as the
/// id seed for new tasks.
pub fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| {
      u64::try_from(elapsed.as_millis())
        .unwrap_or(u64::MAX)
    })
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;
  use crate::task::Status;

  fn task(
    id: u64,
    title: &str,
    start: &str
  ) -> Task {
    let mut task = Task::draft("work");
    task.id = id;
    task.title = title.to_string();
    task.start_date = start.to_string();
    task
  }

  fn sample() -> TaskCollection {
    TaskCollection::new(vec![
      task(10, "One", "2025-08-01"),
      task(20, "Two", "2025-08-02"),
    ])
  }

  #[test]
  fn add_assigns_unique_increasing_ids() {
    let domain = Domain::default();
    let tasks = sample();

    let (with_one, first) = tasks
      .add(
        task(0, "Three", "2025-08-03"),
        &domain,
        5
      )
      .expect("add");
    assert_eq!(first, 21);

    let (with_two, second) = with_one
      .add(
        task(0, "Four", "2025-08-04"),
        &domain,
        1_700_000_000_000
      )
      .expect("add");
    assert_eq!(second, 1_700_000_000_000);
    assert_eq!(with_two.len(), 4);
    assert!(!with_two.ptr_eq(&with_one));
    assert_eq!(tasks.len(), 2);
  }

  #[test]
  fn add_fails_when_ids_run_out() {
    let domain = Domain::default();
    let full = TaskCollection::new(vec![
      task(u64::MAX, "Last", "2025-08-01"),
    ]);

    let err = full
      .add(
        task(0, "Extra", "2025-08-02"),
        &domain,
        u64::MAX
      )
      .expect_err("no id left");
    assert_eq!(
      err,
      ScheduleError::IdsExhausted(u64::MAX)
    );
    assert_eq!(
      err.user_message(),
      "No more tasks can be added."
    );
    assert_eq!(full.len(), 1);
  }

  #[test]
  fn add_rejects_invalid_draft() {
    let tasks = sample();
    let err = tasks
      .add(
        task(0, "  ", "2025-08-03"),
        &Domain::default(),
        1
      )
      .expect_err("blank title");
    assert!(matches!(
      err,
      ScheduleError::Validation(_)
    ));
  }

  #[test]
  fn update_keeps_id_and_copies_on_write() {
    let tasks = sample();
    let mut edited = task(999, "Renamed", "2025-08-05");
    edited.description = "moved".to_string();

    let next = tasks
      .update(20, edited, &Domain::default())
      .expect("update");
    let stored = next.get(20).expect("task 20");
    assert_eq!(stored.title, "Renamed");
    assert!(next.get(999).is_none());
    assert_eq!(
      tasks.get(20).map(|t| t.title.as_str()),
      Some("Two")
    );
    assert!(!next.ptr_eq(&tasks));
  }

  #[test]
  fn missing_ids_are_reported() {
    let tasks = sample();
    assert_eq!(
      tasks.remove(7).expect_err("missing"),
      ScheduleError::TaskNotFound(7)
    );
    assert_eq!(
      tasks.toggle_status(7).expect_err("missing"),
      ScheduleError::TaskNotFound(7)
    );
  }

  #[test]
  fn toggle_and_remove() {
    let tasks = sample();
    let toggled =
      tasks.toggle_status(10).expect("toggle");
    assert_eq!(
      toggled.get(10).map(|t| t.status),
      Some(Status::Completed)
    );
    let back =
      toggled.toggle_status(10).expect("toggle");
    assert_eq!(
      back.get(10).map(|t| t.status),
      Some(Status::InProgress)
    );

    let removed = back.remove(10).expect("remove");
    assert_eq!(removed.len(), 1);
    assert!(removed.get(10).is_none());
  }

  #[test]
  fn calendar_edit_commits_or_rejects() {
    let domain = Domain::default();
    let tasks = sample();
    let start = Utc
      .with_ymd_and_hms(2025, 8, 9, 14, 0, 0)
      .single()
      .expect("valid time");
    let end = Utc
      .with_ymd_and_hms(2025, 8, 9, 15, 0, 0)
      .single()
      .expect("valid time");

    let moved = tasks
      .apply_calendar_edit(
        10,
        &start,
        Some(&end),
        false,
        &domain
      )
      .expect("edit");
    let stored = moved.get(10).expect("task 10");
    assert_eq!(stored.start_date, "2025-08-09");
    assert_eq!(stored.start_time, "14:00");
    assert_eq!(stored.end_time, "15:00");

    // Resizing the end before the start.
    let bad_end = Utc
      .with_ymd_and_hms(2025, 8, 9, 13, 0, 0)
      .single()
      .expect("valid time");
    let err = tasks
      .apply_calendar_edit(
        10,
        &start,
        Some(&bad_end),
        false,
        &domain
      )
      .expect_err("end before start");
    assert!(matches!(
      err,
      ScheduleError::EditRejected { id: 10, .. }
    ));

    let err = tasks
      .apply_calendar_edit(
        42, &start, None, true, &domain
      )
      .expect_err("missing task");
    assert!(matches!(
      err,
      ScheduleError::EditRejected { id: 42, .. }
    ));
  }

  #[test]
  fn serializes_as_a_plain_array() {
    let tasks = sample();
    let json = serde_json::to_string(&tasks)
      .expect("serialize");
    let back: TaskCollection =
      serde_json::from_str(&json)
        .expect("deserialize");
    assert_eq!(back.tasks(), tasks.tasks());
    assert!(json.starts_with('['));
  }
}
