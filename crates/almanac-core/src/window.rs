use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::datetime::{
  add_days,
  parse_task_date,
  same_calendar_day,
  shift_months,
  shift_years
};
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
  #[default]
  All,
  Day,
  Month,
  Year
}

impl TimeWindow {
  pub fn all() -> [Self; 4] {
    [
      Self::All,
      Self::Day,
      Self::Month,
      Self::Year
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Day => "day",
      | Self::Month => "month",
      | Self::Year => "year"
    }
  }

  /// Whether `date` lies in this window
  /// around `anchor`.
  pub fn contains(
    self,
    date: NaiveDate,
    anchor: NaiveDate
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Day => {
        same_calendar_day(&date, &anchor)
      }
      | Self::Month => {
        date.year() == anchor.year()
          && date.month() == anchor.month()
      }
      | Self::Year => {
        date.year() == anchor.year()
      }
    }
  }

  /// Anchor moved `step` windows
  /// forward (negative for back).
  pub fn navigate(
    self,
    anchor: NaiveDate,
    step: i32
  ) -> NaiveDate {
    match self {
      | Self::All => anchor,
      | Self::Day => {
        add_days(anchor, i64::from(step))
      }
      | Self::Month => {
        shift_months(anchor, step)
      }
      | Self::Year => {
        shift_years(anchor, step)
      }
    }
  }

  /// Period heading for list and
  /// analytics views.
  pub fn label(
    self,
    anchor: NaiveDate
  ) -> String {
    match self {
      | Self::All => {
        "All time".to_string()
      }
      | Self::Day => {
        anchor
          .format("%B %-d, %Y")
          .to_string()
      }
      | Self::Month => {
        anchor.format("%B %Y").to_string()
      }
      | Self::Year => {
        anchor.year().to_string()
      }
    }
  }
}

impl fmt::Display for TimeWindow {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for TimeWindow {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let key = s.trim().to_ascii_lowercase();
    Self::all()
      .into_iter()
      .find(|window| {
        window.as_key() == key
      })
      .ok_or_else(|| {
        anyhow!(
          "unknown time window {s:?} \
           (expected all, day, month \
           or year)"
        )
      })
  }
}

/// Tasks whose start date falls in the
/// window, in input order. Tasks with an
/// unparseable start date only survive
/// the `All` window.
#[tracing::instrument(skip(tasks), fields(total = tasks.len()))]
pub fn filter_by_window(
  tasks: &[Task],
  window: TimeWindow,
  anchor: NaiveDate
) -> Vec<Task> {
  if window == TimeWindow::All {
    return tasks.to_vec();
  }

  let kept = tasks
    .iter()
    .filter(|task| {
      parse_task_date(&task.start_date)
        .is_some_and(|start| {
          window.contains(start, anchor)
        })
    })
    .cloned()
    .collect::<Vec<_>>();

  debug!(
    kept = kept.len(),
    window = %window,
    %anchor,
    "time window applied"
  );
  kept
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn task_on(
    id: u64,
    start: &str
  ) -> Task {
    let mut task = Task::draft("work");
    task.id = id;
    task.title = format!("task {id}");
    task.start_date = start.to_string();
    task
  }

  fn sample() -> Vec<Task> {
    vec![
      task_on(1, "2025-08-01"),
      task_on(2, "2025-08-15"),
      task_on(3, "2025-09-01"),
      task_on(4, "2024-08-01"),
      task_on(5, "not a date"),
      task_on(6, ""),
      task_on(7, "2025-08-01"),
    ]
  }

  fn ids(tasks: &[Task]) -> Vec<u64> {
    tasks.iter().map(|t| t.id).collect()
  }

  #[test]
  fn all_window_is_identity() {
    let tasks = sample();
    let anchor = date(1999, 1, 1);
    assert_eq!(
      filter_by_window(
        &tasks,
        TimeWindow::All,
        anchor
      ),
      tasks
    );
    assert!(
      filter_by_window(
        &[],
        TimeWindow::All,
        anchor
      )
      .is_empty()
    );
  }

  #[test]
  fn day_window_matches_only_the_same_calendar_day()
   {
    let anchor = date(2025, 8, 1);
    assert!(
      TimeWindow::Day
        .contains(date(2025, 8, 1), anchor)
    );
    for other in [
      date(2025, 8, 2),
      date(2025, 7, 1),
      date(2024, 8, 1)
    ] {
      assert!(
        !TimeWindow::Day.contains(other, anchor),
        "{other}"
      );
    }
  }

  #[test]
  fn windows_keep_order_and_drop_unparseable()
   {
    let tasks = sample();
    let anchor = date(2025, 8, 1);

    assert_eq!(
      ids(&filter_by_window(
        &tasks,
        TimeWindow::Day,
        anchor
      )),
      vec![1, 7]
    );
    assert_eq!(
      ids(&filter_by_window(
        &tasks,
        TimeWindow::Month,
        anchor
      )),
      vec![1, 2, 7]
    );
    assert_eq!(
      ids(&filter_by_window(
        &tasks,
        TimeWindow::Year,
        anchor
      )),
      vec![1, 2, 3, 7]
    );
  }

  #[test]
  fn every_kept_task_satisfies_the_window()
  {
    let tasks = sample();
    for anchor in [
      date(2025, 8, 1),
      date(2025, 9, 30),
      date(2024, 8, 1)
    ] {
      for window in [
        TimeWindow::Day,
        TimeWindow::Month,
        TimeWindow::Year
      ] {
        for task in filter_by_window(
          &tasks, window, anchor
        ) {
          let start =
            parse_task_date(&task.start_date)
              .expect("kept task has a date");
          assert!(
            window.contains(start, anchor)
          );
        }
      }
    }
  }

  #[test]
  fn navigation_and_labels() {
    let anchor = date(2025, 1, 31);
    assert_eq!(
      TimeWindow::Month.navigate(anchor, 1),
      date(2025, 2, 28)
    );
    assert_eq!(
      TimeWindow::Day.navigate(anchor, 1),
      date(2025, 2, 1)
    );
    assert_eq!(
      TimeWindow::Year.navigate(anchor, -1),
      date(2024, 1, 31)
    );
    assert_eq!(
      TimeWindow::All.navigate(anchor, 5),
      anchor
    );

    let anchor = date(2025, 8, 1);
    assert_eq!(
      TimeWindow::Day.label(anchor),
      "August 1, 2025"
    );
    assert_eq!(
      TimeWindow::Month.label(anchor),
      "August 2025"
    );
    assert_eq!(
      TimeWindow::Year.label(anchor),
      "2025"
    );
    assert_eq!(
      TimeWindow::All.label(anchor),
      "All time"
    );
  }

  #[test]
  fn parses_window_keys() {
    assert_eq!(
      "Month"
        .parse::<TimeWindow>()
        .expect("parse window"),
      TimeWindow::Month
    );
    assert!(
      "week".parse::<TimeWindow>().is_err()
    );
  }
}
