use std::collections::BTreeMap;
use std::fmt;

use chrono::{
  NaiveDate,
  NaiveTime
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::datetime::{
  parse_task_date,
  parse_task_time
};
use crate::domain::Domain;
use crate::error::ScheduleError;
use crate::task::Task;

pub const FIELD_TITLE: &str = "title";
pub const FIELD_CATEGORY: &str =
  "category";
pub const FIELD_START_DATE: &str =
  "startDate";
pub const FIELD_END_DATE: &str =
  "endDate";
pub const FIELD_START_TIME: &str =
  "startTime";
pub const FIELD_END_TIME: &str =
  "endTime";
pub const FIELD_ESTIMATED_HOURS: &str =
  "estimatedHours";
pub const FIELD_ACTUAL_HOURS: &str =
  "actualHours";

/// Form order, used when a single
/// message has to be picked.
const FIELD_ORDER: [&str; 8] = [
  FIELD_TITLE,
  FIELD_CATEGORY,
  FIELD_START_DATE,
  FIELD_END_DATE,
  FIELD_START_TIME,
  FIELD_END_TIME,
  FIELD_ESTIMATED_HOURS,
  FIELD_ACTUAL_HOURS
];

/// Field name to message. Empty means
/// the task may be committed.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ValidationErrors(
  BTreeMap<String, String>
);

impl ValidationErrors {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn contains(
    &self,
    field: &str
  ) -> bool {
    self.0.contains_key(field)
  }

  pub fn get(
    &self,
    field: &str
  ) -> Option<&str> {
    self.0.get(field).map(String::as_str)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&str, &str)>
  {
    self
      .0
      .iter()
      .map(|(k, v)| {
        (k.as_str(), v.as_str())
      })
  }

  pub fn first_message(
    &self
  ) -> Option<&str> {
    FIELD_ORDER
      .iter()
      .find_map(|field| self.get(field))
      .or_else(|| {
        self
          .0
          .values()
          .next()
          .map(String::as_str)
      })
  }

  pub fn into_result(
    self
  ) -> Result<(), ScheduleError> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(ScheduleError::Validation(
        self
      ))
    }
  }

  fn insert(
    &mut self,
    field: &str,
    message: impl Into<String>
  ) {
    self
      .0
      .entry(field.to_string())
      .or_insert_with(|| message.into());
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let mut first = true;
    for (field, message) in self.iter() {
      if !first {
        f.write_str("; ")?;
      }
      first = false;
      write!(f, "{field}: {message}")?;
    }
    Ok(())
  }
}

/// Checks a candidate task. Every rule
/// runs; a date or time that is present
/// but malformed gets its own error and
/// the ordering checks that need it are
/// skipped.
#[tracing::instrument(skip(task, domain), fields(id = task.id))]
pub fn validate(
  task: &Task,
  domain: &Domain
) -> ValidationErrors {
  let mut errors =
    ValidationErrors::default();

  if task.title.trim().is_empty() {
    errors.insert(
      FIELD_TITLE,
      "Please enter a title."
    );
  }

  if !domain.contains(&task.category) {
    errors.insert(
      FIELD_CATEGORY,
      "Please choose one of the \
       configured categories."
    );
  }

  let start = if task
    .start_date
    .trim()
    .is_empty()
  {
    errors.insert(
      FIELD_START_DATE,
      "Please choose a start date."
    );
    None
  } else {
    checked_date(
      &mut errors,
      FIELD_START_DATE,
      &task.start_date
    )
  };
  let end = checked_date(
    &mut errors,
    FIELD_END_DATE,
    &task.end_date
  );

  if let (Some(start), Some(end)) =
    (start, end)
    && end < start
  {
    errors.insert(
      FIELD_END_DATE,
      "The end date must not be \
       before the start date."
    );
  }

  let start_time = checked_time(
    &mut errors,
    FIELD_START_TIME,
    &task.start_time
  );
  let end_time = checked_time(
    &mut errors,
    FIELD_END_TIME,
    &task.end_time
  );

  let single_day = task
    .end_date
    .trim()
    .is_empty()
    || task.end_date.trim()
      == task.start_date.trim();
  if single_day
    && let (Some(start_time), Some(end_time)) =
      (start_time, end_time)
    && end_time <= start_time
  {
    errors.insert(
      FIELD_END_TIME,
      "The end time must be later \
       than the start time."
    );
  }

  // NaN fails `>=` too.
  if !(task.estimated_hours >= 0.0) {
    errors.insert(
      FIELD_ESTIMATED_HOURS,
      "Estimated hours must be 0 or \
       more."
    );
  }
  if !(task.actual_hours >= 0.0) {
    errors.insert(
      FIELD_ACTUAL_HOURS,
      "Actual hours must be 0 or more."
    );
  }

  debug!(
    errors = errors.len(),
    "validated task"
  );
  errors
}

fn checked_date(
  errors: &mut ValidationErrors,
  field: &str,
  raw: &str
) -> Option<NaiveDate> {
  if raw.trim().is_empty() {
    return None;
  }
  let parsed = parse_task_date(raw);
  if parsed.is_none() {
    errors.insert(
      field,
      format!(
        "{raw:?} is not a valid date \
         (YYYY-MM-DD)."
      )
    );
  }
  parsed
}

fn checked_time(
  errors: &mut ValidationErrors,
  field: &str,
  raw: &str
) -> Option<NaiveTime> {
  if raw.trim().is_empty() {
    return None;
  }
  let parsed = parse_task_time(raw);
  if parsed.is_none() {
    errors.insert(
      field,
      format!(
        "{raw:?} is not a valid time \
         (HH:MM)."
      )
    );
  }
  parsed
}
