use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// One worker row as returned by `GET {prefix}/workers?json=1`. The whole
/// set is replaced on every refresh; the hostname is the only identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
  pub hostname: String,
  #[serde(default)]
  pub status: bool,
  #[serde(default)]
  pub active: u64,
  #[serde(rename = "task-received", default)]
  pub task_received: u64,
  #[serde(rename = "task-failed", default)]
  pub task_failed: u64,
  #[serde(rename = "task-succeeded", default)]
  pub task_succeeded: u64,
  #[serde(rename = "task-retried", default)]
  pub task_retried: u64,
  #[serde(default)]
  pub loadavg: Option<Vec<f64>>,
}

/// One task row from the paginated datatable endpoint. Timestamps are
/// epoch seconds; `timestamp` is the completion stamp the duration column
/// derives from, while `runtime` is the server-reported execution time.
/// The two may disagree and both are shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
  pub uuid: Uuid,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub args: Option<serde_json::Value>,
  #[serde(default)]
  pub kwargs: Option<serde_json::Value>,
  #[serde(default)]
  pub result: Option<serde_json::Value>,
  #[serde(default)]
  pub received: Option<f64>,
  #[serde(default)]
  pub started: Option<f64>,
  #[serde(default)]
  pub timestamp: Option<f64>,
  #[serde(default)]
  pub runtime: Option<f64>,
  #[serde(default)]
  pub worker: Option<String>,
  #[serde(default)]
  pub exchange: Option<String>,
  #[serde(default)]
  pub routing_key: Option<String>,
  #[serde(default)]
  pub retries: u32,
  #[serde(default)]
  pub revoked: Option<f64>,
  #[serde(default)]
  pub exception: Option<String>,
  #[serde(default)]
  pub expires: Option<f64>,
  #[serde(default)]
  pub eta: Option<f64>,
}

/// Styling class for a task state badge. States are otherwise opaque
/// backend strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
  Success,
  Failure,
  Other,
}

pub fn state_class(state: &str) -> StateClass {
  match state {
    "SUCCESS" => StateClass::Success,
    "FAILURE" => StateClass::Failure,
    _ => StateClass::Other,
  }
}

/// Client-chosen task filters. Any mutation resets the table to page 1
/// and triggers a server-side re-fetch; rows are never filtered locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
  pub taskname: String,
  pub workername: String,
  pub search: String,
}

impl FilterState {
  /// Seeds the free-text search with a structured `state:<STATE>` term
  /// from the deep-link query parameter.
  pub fn with_initial_state(state: Option<&str>) -> Self {
    Self {
      search: state.map(|s| format!("state:{s}")).unwrap_or_default(),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
  Asc,
  Desc,
}

impl SortDir {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortDir::Asc => "asc",
      SortDir::Desc => "desc",
    }
  }
}

/// One page request against the server-side datatable. Serialized with
/// the wire names the datatable endpoint expects.
#[derive(Debug, Clone)]
pub struct PageRequest {
  pub draw: u64,
  pub start: u64,
  pub length: u64,
  pub sort_column: usize,
  pub sort_dir: SortDir,
}

/// Page sizes offered by the length menu.
pub const PAGE_LENGTHS: [u64; 4] = [15, 30, 50, 100];

/// Task-table columns the server can order by. Sorting on anything else
/// falls back to the default order.
pub const SORTABLE_COLUMNS: [usize; 10] = [0, 1, 2, 6, 7, 8, 9, 10, 13, 14];

/// Default order: started timestamp, newest first.
pub const DEFAULT_SORT: (usize, SortDir) = (7, SortDir::Desc);

impl Default for PageRequest {
  fn default() -> Self {
    Self {
      draw: 0,
      start: 0,
      length: PAGE_LENGTHS[0],
      sort_column: DEFAULT_SORT.0,
      sort_dir: DEFAULT_SORT.1,
    }
  }
}

impl PageRequest {
  /// Wire body for `POST {prefix}/tasks/datatable`, merged with the
  /// current filters.
  pub fn to_body(&self, filters: &FilterState) -> serde_json::Value {
    serde_json::json!({
      "draw": self.draw,
      "start": self.start,
      "length": self.length,
      "order[0][column]": self.sort_column,
      "order[0][dir]": self.sort_dir.as_str(),
      "search[value]": filters.search,
      "taskname": filters.taskname,
      "workername": filters.workername,
    })
  }
}

/// Server reply to one datatable page request.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
  #[serde(default)]
  pub draw: u64,
  #[serde(default)]
  pub data: Vec<TaskRecord>,
  #[serde(rename = "recordsTotal", default)]
  pub records_total: u64,
  #[serde(rename = "recordsFiltered", default)]
  pub records_filtered: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn worker_counters_default_to_zero() {
    let worker: WorkerRecord =
      serde_json::from_value(serde_json::json!({ "hostname": "celery@w1" })).unwrap();
    assert_eq!(worker.active, 0);
    assert_eq!(worker.task_received, 0);
    assert_eq!(worker.task_failed, 0);
    assert!(!worker.status);
    assert!(worker.loadavg.is_none());
  }

  #[test]
  fn worker_wire_names_round_trip() {
    let worker: WorkerRecord = serde_json::from_value(serde_json::json!({
      "hostname": "celery@w1",
      "status": true,
      "active": 2,
      "task-received": 10,
      "task-failed": 1,
      "task-succeeded": 7,
      "task-retried": 2,
      "loadavg": [0.1, 0.2, 0.3],
    }))
    .unwrap();
    assert_eq!(worker.task_received, 10);
    assert_eq!(worker.task_succeeded, 7);
    assert_eq!(worker.loadavg.as_deref(), Some(&[0.1, 0.2, 0.3][..]));
  }

  #[test]
  fn task_tolerates_missing_fields() {
    let task: TaskRecord = serde_json::from_value(serde_json::json!({
      "uuid": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
      "state": "STARTED",
    }))
    .unwrap();
    assert!(task.name.is_none());
    assert!(task.started.is_none());
    assert_eq!(task.retries, 0);
  }

  #[test]
  fn state_classes() {
    assert_eq!(state_class("SUCCESS"), StateClass::Success);
    assert_eq!(state_class("FAILURE"), StateClass::Failure);
    assert_eq!(state_class("RETRY"), StateClass::Other);
    assert_eq!(state_class("SOME_CUSTOM_STATE"), StateClass::Other);
  }

  #[test]
  fn page_request_body_uses_wire_names() {
    let filters = FilterState {
      taskname: "add".into(),
      workername: "celery@w1".into(),
      search: "state:FAILURE".into(),
    };
    let body = PageRequest::default().to_body(&filters);
    assert_eq!(body["order[0][column]"], 7);
    assert_eq!(body["order[0][dir]"], "desc");
    assert_eq!(body["search[value]"], "state:FAILURE");
    assert_eq!(body["length"], 15);
    assert_eq!(body["taskname"], "add");
  }

  #[test]
  fn initial_state_seeds_search() {
    assert_eq!(FilterState::with_initial_state(Some("FAILURE")).search, "state:FAILURE");
    assert_eq!(FilterState::with_initial_state(None).search, "");
  }
}
