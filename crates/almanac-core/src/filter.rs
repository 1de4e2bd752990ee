use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::domain::ALL_CATEGORIES;
use crate::task::Task;
use crate::window::{
  TimeWindow,
  filter_by_window
};

/// Filter inputs owned by the host and
/// passed in on every derivation.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct ViewState {
  pub window:   TimeWindow,
  pub anchor:   NaiveDate,
  #[serde(default)]
  pub search:   String,
  #[serde(default = "all_categories")]
  pub category: String
}

fn all_categories() -> String {
  ALL_CATEGORIES.to_string()
}

impl ViewState {
  pub fn new(anchor: NaiveDate) -> Self {
    Self {
      window: TimeWindow::All,
      anchor,
      search: String::new(),
      category: all_categories()
    }
  }
}

/// Free-text and category narrowing. A
/// blank term and the `all` category
/// both match everything.
#[tracing::instrument(skip(tasks), fields(total = tasks.len()))]
pub fn filter_by_search_and_category(
  tasks: &[Task],
  term: &str,
  category: &str
) -> Vec<Task> {
  let needle =
    term.trim().to_lowercase();
  let any_category =
    category == ALL_CATEGORIES;

  tasks
    .iter()
    .filter(|task| {
      if !needle.is_empty() {
        let title_match = task
          .title
          .to_lowercase()
          .contains(&needle);
        let description_match = task
          .description
          .to_lowercase()
          .contains(&needle);
        if !title_match
          && !description_match
        {
          trace!(id = task.id, "search term did not match");
          return false;
        }
      }

      any_category
        || task.category == category
    })
    .cloned()
    .collect()
}

/// The list view pipeline: time window
/// first, then search and category.
pub fn list_view(
  tasks: &[Task],
  view: &ViewState
) -> Vec<Task> {
  let windowed = filter_by_window(
    tasks,
    view.window,
    view.anchor
  );
  filter_by_search_and_category(
    &windowed,
    &view.search,
    &view.category
  )
}
