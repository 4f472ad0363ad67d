use tracing::debug;

use crate::columns::{encode_segment, RenderedCell};
use crate::error::DashboardError;
use crate::models::WorkerRecord;
use crate::tasks_table::Phase;

/// One footer aggregate: the column total and, when non-zero, a link to
/// the task table pre-filtered by the matching state. A zero total is
/// plain text since the filtered list would be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterCell {
  pub total: u64,
  pub href: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken(u64);

/// Periodically refreshed full view of the worker collection. Every
/// refresh replaces the whole set; overlapping refreshes resolve
/// latest-wins via the generation token, never queued.
#[derive(Debug)]
pub struct WorkerTable {
  phase: Phase,
  generation: u64,
  rows: Vec<WorkerRecord>,
  last_error: Option<String>,
}

/// Counter columns aggregated in the footer, with the task state each
/// total links to. Active and received carry no state filter.
const FOOTER_COLUMNS: [(&str, &str); 5] = [
  ("active", ""),
  ("task-received", ""),
  ("task-failed", "FAILURE"),
  ("task-succeeded", "SUCCESS"),
  ("task-retried", "RETRY"),
];

impl WorkerTable {
  pub fn new() -> Self {
    Self { phase: Phase::Idle, generation: 0, rows: Vec::new(), last_error: None }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn rows(&self) -> &[WorkerRecord] {
    &self.rows
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn begin_refresh(&mut self) -> RefreshToken {
    self.generation += 1;
    if self.rows.is_empty() {
      self.phase = Phase::Fetching;
    }
    RefreshToken(self.generation)
  }

  /// Applies a resolved refresh in place, keeping the same table
  /// instance so scroll and selection survive. A refresh superseded by a
  /// newer one is dropped.
  pub fn apply_refresh(
    &mut self,
    token: RefreshToken,
    result: Result<Vec<WorkerRecord>, DashboardError>,
  ) -> Result<(), DashboardError> {
    if token.0 != self.generation {
      debug!(got = token.0, current = self.generation, "discarding stale worker refresh");
      return Err(DashboardError::Stale { got: token.0, current: self.generation });
    }
    match result {
      Ok(mut workers) => {
        // Online workers first, then by hostname.
        workers.sort_by(|a, b| b.status.cmp(&a.status).then(a.hostname.cmp(&b.hostname)));
        self.rows = workers;
        self.phase = Phase::Rendered;
        self.last_error = None;
      }
      Err(err) => {
        self.phase = Phase::Failed;
        self.last_error = Some(err.to_string());
      }
    }
    Ok(())
  }

  /// Renders one worker row: hostname link, online badge, counters and
  /// load average.
  pub fn render_row(&self, worker: &WorkerRecord, base: &str) -> Vec<RenderedCell> {
    let loadavg = if !worker.status {
      "N/A".to_string()
    } else {
      match &worker.loadavg {
        Some(values) => values
          .iter()
          .map(|v| v.to_string())
          .collect::<Vec<_>>()
          .join(", "),
        None => "N/A".to_string(),
      }
    };
    vec![
      RenderedCell::link(
        worker.hostname.clone(),
        format!("{base}/worker/{}", encode_segment(&worker.hostname)),
      ),
      RenderedCell::text(if worker.status { "Online" } else { "Offline" }),
      RenderedCell::text(worker.active.to_string()),
      RenderedCell::text(worker.task_received.to_string()),
      RenderedCell::text(worker.task_failed.to_string()),
      RenderedCell::text(worker.task_succeeded.to_string()),
      RenderedCell::text(worker.task_retried.to_string()),
      RenderedCell::text(loadavg),
    ]
  }

  /// Footer totals over the currently loaded rows, cross-linked to the
  /// filtered task view.
  pub fn footer(&self, base: &str) -> Vec<FooterCell> {
    FOOTER_COLUMNS
      .iter()
      .map(|(column, state)| {
        let total: u64 = self
          .rows
          .iter()
          .map(|w| match *column {
            "active" => w.active,
            "task-received" => w.task_received,
            "task-failed" => w.task_failed,
            "task-succeeded" => w.task_succeeded,
            _ => w.task_retried,
          })
          .sum();
        let href = if total == 0 {
          None
        } else if state.is_empty() {
          Some(format!("{base}/tasks"))
        } else {
          Some(format!("{base}/tasks?state={state}"))
        };
        FooterCell { total, href }
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn worker(hostname: &str, status: bool, failed: u64, succeeded: u64) -> WorkerRecord {
    serde_json::from_value(serde_json::json!({
      "hostname": hostname,
      "status": status,
      "active": 1,
      "task-failed": failed,
      "task-succeeded": succeeded,
      "loadavg": [0.5, 0.25, 0.1],
    }))
    .unwrap()
  }

  #[test]
  fn refresh_replaces_whole_set_online_first() {
    let mut table = WorkerTable::new();
    let token = table.begin_refresh();
    table
      .apply_refresh(token, Ok(vec![worker("b", false, 0, 0), worker("a", true, 0, 0)]))
      .unwrap();
    assert_eq!(table.rows()[0].hostname, "a");
    let token = table.begin_refresh();
    table.apply_refresh(token, Ok(vec![worker("c", true, 0, 0)])).unwrap();
    assert_eq!(table.rows().len(), 1);
  }

  #[test]
  fn overlapping_refreshes_latest_wins() {
    let mut table = WorkerTable::new();
    let slow = table.begin_refresh();
    let fast = table.begin_refresh();
    table.apply_refresh(fast, Ok(vec![worker("new", true, 0, 0)])).unwrap();
    assert!(table.apply_refresh(slow, Ok(vec![worker("old", true, 0, 0)])).is_err());
    assert_eq!(table.rows()[0].hostname, "new");
  }

  #[test]
  fn offline_worker_loadavg_is_na() {
    let table = WorkerTable::new();
    let mut offline = worker("w1", false, 0, 0);
    offline.loadavg = Some(vec![0.5, 0.5, 0.5]);
    let row = table.render_row(&offline, "");
    assert_eq!(row[1].text, "Offline");
    assert_eq!(row[7].text, "N/A");
    let online = worker("w2", true, 0, 0);
    let row = table.render_row(&online, "");
    assert_eq!(row[1].text, "Online");
    assert_eq!(row[7].text, "0.5, 0.25, 0.1");
  }

  #[test]
  fn footer_links_only_non_zero_totals() {
    let mut table = WorkerTable::new();
    let token = table.begin_refresh();
    table
      .apply_refresh(token, Ok(vec![worker("a", true, 2, 5), worker("b", true, 1, 0)]))
      .unwrap();
    let footer = table.footer("/monitor");
    // active total is 2, linked without a state filter
    assert_eq!(footer[0].total, 2);
    assert_eq!(footer[0].href.as_deref(), Some("/monitor/tasks"));
    // received total is 0, plain text
    assert_eq!(footer[1].total, 0);
    assert!(footer[1].href.is_none());
    assert_eq!(footer[2].total, 3);
    assert_eq!(footer[2].href.as_deref(), Some("/monitor/tasks?state=FAILURE"));
    assert_eq!(footer[3].total, 5);
    assert_eq!(footer[3].href.as_deref(), Some("/monitor/tasks?state=SUCCESS"));
    assert_eq!(footer[4].total, 0);
    assert!(footer[4].href.is_none());
  }
}
