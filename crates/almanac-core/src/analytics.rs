use serde::Serialize;
use tracing::debug;

use crate::domain::Domain;
use crate::task::{
  Status,
  Task
};

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct CategoryStat {
  pub name:      String,
  pub count:     usize,
  pub completed: usize,
  pub color:     String
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct CountStat {
  pub name:  String,
  pub count: usize
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
  pub total:          usize,
  pub completed:      usize,
  pub in_progress:    usize,
  pub pending:        usize,
  pub category_stats: Vec<CategoryStat>,
  pub status_stats:   Vec<CountStat>,
  pub priority_stats: Vec<CountStat>
}

impl AnalyticsSnapshot {
  /// Zeroed snapshot with one entry per
  /// domain value.
  fn empty(domain: &Domain) -> Self {
    Self {
      category_stats: domain
        .categories
        .iter()
        .map(|def| CategoryStat {
          name:      def.name.clone(),
          count:     0,
          completed: 0,
          color:     def.color.clone()
        })
        .collect(),
      status_stats: domain
        .statuses()
        .iter()
        .map(|status| CountStat {
          name:  status.as_key().to_string(),
          count: 0
        })
        .collect(),
      priority_stats: domain
        .priorities()
        .iter()
        .map(|priority| CountStat {
          name:  priority.as_key().to_string(),
          count: 0
        })
        .collect(),
      ..Self::default()
    }
  }

  fn push(&mut self, task: &Task) {
    self.total =
      self.total.saturating_add(1);
    match task.status {
      | Status::Completed => {
        self.completed = self
          .completed
          .saturating_add(1);
      }
      | Status::InProgress => {
        self.in_progress = self
          .in_progress
          .saturating_add(1);
      }
      | Status::Pending => {
        self.pending = self
          .pending
          .saturating_add(1);
      }
      | Status::OnHold => {}
    }

    if let Some(stat) = self
      .category_stats
      .iter_mut()
      .find(|stat| stat.name == task.category)
    {
      stat.count =
        stat.count.saturating_add(1);
      if task.status == Status::Completed {
        stat.completed =
          stat.completed.saturating_add(1);
      }
    }

    bump(
      &mut self.status_stats,
      task.status.as_key()
    );
    bump(
      &mut self.priority_stats,
      task.priority.as_key()
    );
  }

  /// Completed share of all tasks, in
  /// `0.0..=1.0`.
  pub fn completion_rate(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    self.completed as f64
      / self.total as f64
  }
}

fn bump(
  stats: &mut [CountStat],
  name: &str
) {
  if let Some(stat) = stats
    .iter_mut()
    .find(|stat| stat.name == name)
  {
    stat.count =
      stat.count.saturating_add(1);
  }
}

/// Summary counts for a (usually already
/// filtered) task list.
#[tracing::instrument(skip(tasks, domain), fields(total = tasks.len()))]
pub fn aggregate(
  tasks: &[Task],
  domain: &Domain
) -> AnalyticsSnapshot {
  let mut snapshot =
    AnalyticsSnapshot::empty(domain);
  for task in tasks {
    snapshot.push(task);
  }
  debug!(
    completed = snapshot.completed,
    "analytics aggregated"
  );
  snapshot
}
