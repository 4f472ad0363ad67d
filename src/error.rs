use thiserror::Error;

/// Failure taxonomy for the dashboard. Render problems are not errors:
/// a cell that cannot be produced degrades to its raw or empty value
/// instead of aborting the row.
#[derive(Error, Debug)]
pub enum DashboardError {
  /// Malformed user input caught before any request is sent.
  #[error("Invalid input: {0}")]
  Validation(String),

  /// Network failure, non-2xx status, or a body that is not valid JSON.
  #[error("An error occurred: {0}")]
  Transport(String),

  /// An in-flight fetch resolved after being superseded. Discarded
  /// silently, never surfaced to the operator.
  #[error("stale response for generation {got}, table is at {current}")]
  Stale { got: u64, current: u64 },
}

impl From<reqwest::Error> for DashboardError {
  fn from(err: reqwest::Error) -> Self {
    DashboardError::Transport(err.to_string())
  }
}
