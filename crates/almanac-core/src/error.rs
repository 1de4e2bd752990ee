use crate::validate::ValidationErrors;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
  #[error("task failed validation: {0}")]
  Validation(ValidationErrors),

  #[error(
    "task {id} cannot be shown on the \
     calendar: {reason}"
  )]
  Projection { id: u64, reason: String },

  #[error(
    "calendar edit for task {id} was \
     rejected: {reason}"
  )]
  EditRejected { id: u64, reason: String },

  #[error(
    "{field} is not a valid date or \
     time: {value:?}"
  )]
  UnparseableDate {
    field: &'static str,
    value: String
  },

  #[error("task not found: {0}")]
  TaskNotFound(u64),

  #[error(
    "no task id is free after {0}"
  )]
  IdsExhausted(u64)
}

impl ScheduleError {
  /// Message suitable for a transient notice.
  pub fn user_message(&self) -> String {
    match self {
      | Self::Validation(errors) => {
        errors
          .first_message()
          .unwrap_or("The task is invalid.")
          .to_string()
      }
      | Self::Projection { .. } => {
        "The task cannot be shown on the \
         calendar."
          .to_string()
      }
      | Self::EditRejected { .. } => {
        "The task cannot be moved."
          .to_string()
      }
      | Self::UnparseableDate {
        ..
      } => "The date is not valid."
        .to_string(),
      | Self::TaskNotFound(_) => {
        "The task no longer exists."
          .to_string()
      }
      | Self::IdsExhausted(_) => {
        "No more tasks can be added."
          .to_string()
      }
    }
  }
}
