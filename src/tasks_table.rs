use tracing::debug;

use crate::columns::{self, RenderedCell, TaskColumn};
use crate::error::DashboardError;
use crate::models::{
  FilterState, PageRequest, PageResponse, SortDir, TaskRecord, DEFAULT_SORT, PAGE_LENGTHS,
  SORTABLE_COLUMNS,
};
use crate::timefmt::{DurationStyle, TimeDisplay};

/// Fetch lifecycle of the one live page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Fetching,
  Rendered,
  Failed,
}

/// Identifies one in-flight fetch. A response is applied only while its
/// token still matches the table's generation; anything older is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(u64);

/// Server-driven paginated task view. The server is the sole source of
/// truth for filtering, sorting and paging; rows already on screen are
/// never re-filtered locally.
#[derive(Debug)]
pub struct TaskTable {
  pub filters: FilterState,
  pub page: PageRequest,
  phase: Phase,
  generation: u64,
  rows: Vec<TaskRecord>,
  records_total: u64,
  records_filtered: u64,
  last_error: Option<String>,
  configured_columns: String,
  time: TimeDisplay,
  duration_style: DurationStyle,
}

impl TaskTable {
  pub fn new(
    configured_columns: String,
    time: TimeDisplay,
    duration_style: DurationStyle,
    initial_state: Option<&str>,
  ) -> Self {
    Self {
      filters: FilterState::with_initial_state(initial_state),
      page: PageRequest::default(),
      phase: Phase::Idle,
      generation: 0,
      rows: Vec::new(),
      records_total: 0,
      records_filtered: 0,
      last_error: None,
      configured_columns,
      time,
      duration_style,
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn rows(&self) -> &[TaskRecord] {
    &self.rows
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  /// Marks a new fetch as the current one. Any response carrying an
  /// older token is discarded when it eventually resolves.
  pub fn begin_fetch(&mut self) -> FetchToken {
    self.generation += 1;
    self.page.draw += 1;
    self.phase = Phase::Fetching;
    FetchToken(self.generation)
  }

  /// Reconciles a resolved fetch. Stale responses, successful or not,
  /// leave the table untouched.
  pub fn apply_page(
    &mut self,
    token: FetchToken,
    result: Result<PageResponse, DashboardError>,
  ) -> Result<(), DashboardError> {
    if token.0 != self.generation {
      debug!(got = token.0, current = self.generation, "discarding stale task page");
      return Err(DashboardError::Stale { got: token.0, current: self.generation });
    }
    match result {
      Ok(response) => {
        self.rows = response.data;
        self.records_total = response.records_total;
        self.records_filtered = response.records_filtered;
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

  fn reset_to_first_page(&mut self) {
    self.page.start = 0;
  }

  pub fn set_taskname_filter(&mut self, taskname: &str) {
    if self.filters.taskname != taskname {
      self.filters.taskname = taskname.to_string();
      self.reset_to_first_page();
    }
  }

  pub fn set_workername_filter(&mut self, workername: &str) {
    if self.filters.workername != workername {
      self.filters.workername = workername.to_string();
      self.reset_to_first_page();
    }
  }

  pub fn set_search(&mut self, search: &str) {
    if self.filters.search != search {
      self.filters.search = search.to_string();
      self.reset_to_first_page();
    }
  }

  /// Orders by a column, falling back to the default order when the
  /// column is not server-sortable.
  pub fn set_sort(&mut self, column: usize, dir: SortDir) {
    if SORTABLE_COLUMNS.contains(&column) {
      self.page.sort_column = column;
      self.page.sort_dir = dir;
    } else {
      self.page.sort_column = DEFAULT_SORT.0;
      self.page.sort_dir = DEFAULT_SORT.1;
    }
    self.reset_to_first_page();
  }

  pub fn set_page_length(&mut self, length: u64) {
    if PAGE_LENGTHS.contains(&length) && self.page.length != length {
      self.page.length = length;
      self.reset_to_first_page();
    }
  }

  pub fn next_page(&mut self) {
    if self.page.start + self.page.length < self.records_filtered {
      self.page.start += self.page.length;
    }
  }

  pub fn prev_page(&mut self) {
    self.page.start = self.page.start.saturating_sub(self.page.length);
  }

  /// "Showing X to Y of Z tasks (filtered from N total tasks)".
  pub fn page_info(&self) -> String {
    let first = if self.rows.is_empty() { 0 } else { self.page.start + 1 };
    let last = self.page.start + self.rows.len() as u64;
    let mut info = format!("Showing {first} to {last} of {} tasks", self.records_filtered);
    if self.records_filtered != self.records_total {
      info.push_str(&format!(" (filtered from {} total tasks)", self.records_total));
    }
    info
  }

  pub fn visible_columns(&self) -> Vec<TaskColumn> {
    TaskColumn::ALL
      .into_iter()
      .filter(|c| columns::is_visible(c.key(), &self.configured_columns))
      .collect()
  }

  /// Renders the current page against the resolved mount prefix. Each
  /// cell degrades independently; one bad field never drops the row.
  pub fn render_rows(&self, base: &str) -> Vec<Vec<RenderedCell>> {
    let visible = self.visible_columns();
    self
      .rows
      .iter()
      .map(|task| {
        visible
          .iter()
          .map(|column| column.render(task, base, self.time, self.duration_style))
          .collect()
      })
      .collect()
  }
}
