use serde::{Deserialize, Serialize};

pub const DRAFT_ID: u64 = 0;
pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_END_TIME: &str = "10:00";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Completed,
        Status::OnHold,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
            Status::OnHold => "on-hold",
        }
    }

    /// Status after a list-row toggle: completed flips back to in progress,
    /// anything else is marked completed.
    pub fn toggled(self) -> Status {
        match self {
            Status::Completed => Status::InProgress,
            _ => Status::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_key(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A schedule item. Dates are local `YYYY-MM-DD` strings and times local
/// `HH:MM` strings, kept as entered so that half-typed drafts survive a
/// round trip through the form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub category: String,

    pub priority: Priority,

    pub status: Status,

    #[serde(default)]
    pub start_date: String,

    #[serde(default)]
    pub end_date: String,

    #[serde(default)]
    pub start_time: String,

    #[serde(default)]
    pub end_time: String,

    #[serde(default)]
    pub estimated_hours: f64,

    #[serde(default)]
    pub actual_hours: f64,
}

impl Task {
    /// Blank form state used for "add task".
    pub fn draft(category: impl Into<String>) -> Self {
        Self {
            id: DRAFT_ID,
            title: String::new(),
            description: String::new(),
            category: category.into(),
            priority: Priority::Medium,
            status: Status::Pending,
            start_date: String::new(),
            end_date: String::new(),
            start_time: DEFAULT_START_TIME.to_string(),
            end_time: DEFAULT_END_TIME.to_string(),
            estimated_hours: 1.0,
            actual_hours: 0.0,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id == DRAFT_ID
    }

    /// End date with the empty-means-start rule applied.
    pub fn effective_end_date(&self) -> &str {
        if self.end_date.trim().is_empty() {
            &self.start_date
        } else {
            &self.end_date
        }
    }

    pub fn is_multi_day(&self) -> bool {
        !self.end_date.trim().is_empty() && self.end_date != self.start_date
    }

    pub fn has_times(&self) -> bool {
        !self.start_time.trim().is_empty() && !self.end_time.trim().is_empty()
    }
}
