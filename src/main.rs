//! Terminal dashboard for a distributed task queue:
//! Workers (auto-refreshing table with footer totals)
//! Tasks (server-side paginated, filterable table)

use std::{
  io,
  sync::mpsc,
  time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
  event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode},
  execute,
  terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::runtime::Runtime;
use tui::{
  backend::{Backend, CrosstermBackend},
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Span, Spans},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
  Terminal,
};

use taskwatch::client::ApiClient;
use taskwatch::commands::{self, Outcome, SuccessEffect};
use taskwatch::config::Config;
use taskwatch::error::DashboardError;
use taskwatch::models::{
  PageResponse, SortDir, StateClass, WorkerRecord, PAGE_LENGTHS, SORTABLE_COLUMNS,
};
use taskwatch::notify::{Alert, AlertFeed, AlertLevel};
use taskwatch::tasks_table::{FetchToken, Phase, TaskTable};
use taskwatch::timefmt::{DurationStyle, TimeDisplay};
use taskwatch::workers_table::{RefreshToken, WorkerTable};

#[derive(Clone, Copy, PartialEq)]
enum DashboardTab {
  Workers,
  Tasks,
}

/// An open input prompt. Worker and task commands capture their target
/// when the prompt opens, so a refresh landing mid-edit cannot retarget
/// them.
enum Prompt {
  TaskNameFilter,
  WorkerNameFilter,
  Search,
  PoolGrow { workername: String },
  PoolShrink { workername: String },
  Autoscale { workername: String },
  AddConsumer { workername: String },
  CancelConsumer { workername: String },
  TaskTimeout { label: String, workername: String, limit_label: &'static str },
  RateLimit { label: String, workername: String },
}

impl Prompt {
  fn hint(&self) -> String {
    match self {
      Prompt::TaskNameFilter => "task name filter".into(),
      Prompt::WorkerNameFilter => "worker filter".into(),
      Prompt::Search => "search".into(),
      Prompt::PoolGrow { workername } => format!("grow pool of {workername} by"),
      Prompt::PoolShrink { workername } => format!("shrink pool of {workername} by"),
      Prompt::Autoscale { workername } => format!("autoscale {workername} (min max)"),
      Prompt::AddConsumer { workername } => format!("queue to consume on {workername}"),
      Prompt::CancelConsumer { workername } => format!("queue to cancel on {workername}"),
      Prompt::TaskTimeout { label, limit_label, .. } => {
        format!("{limit_label} for {label} (seconds)")
      }
      Prompt::RateLimit { label, .. } => format!("rate limit for {label}"),
    }
  }
}

/// A rejected input becomes a danger notification; no request goes out.
fn command_or_alert(
  result: Result<commands::Command, DashboardError>,
) -> Result<commands::Command, Alert> {
  result.map_err(|err| Alert::danger(err.to_string()))
}

/// Splits an autoscale prompt into its min and max bounds.
fn parse_autoscale(buffer: &str) -> Option<(&str, &str)> {
  let mut parts = buffer.split([' ', ',']).filter(|s| !s.is_empty());
  match (parts.next(), parts.next(), parts.next()) {
    (Some(min), Some(max), None) => Some((min, max)),
    _ => None,
  }
}

/// Resolved network results delivered back to the UI thread.
enum NetEvent {
  Workers(RefreshToken, Result<Vec<WorkerRecord>, DashboardError>),
  Tasks(FetchToken, Result<PageResponse, DashboardError>),
  CommandDone(Outcome),
}

struct App {
  tab: DashboardTab,
  workers: WorkerTable,
  tasks: TaskTable,
  alerts: AlertFeed,
  selected_task: usize,
  selected_worker: usize,
  editing: Option<(Prompt, String)>,
  disabled_controls: Vec<&'static str>,
  pending_reload: Option<Instant>,
}

impl App {
  fn new(config: &Config) -> Self {
    let time = TimeDisplay::parse(&config.time_display);
    let tasks = TaskTable::new(
      config.tasks_columns.clone(),
      time,
      DurationStyle::Compact,
      config.initial_state().as_deref(),
    );
    Self {
      tab: DashboardTab::Workers,
      workers: WorkerTable::new(),
      tasks,
      alerts: AlertFeed::default(),
      selected_task: 0,
      selected_worker: 0,
      editing: None,
      disabled_controls: Vec::new(),
      pending_reload: None,
    }
  }

  fn next_tab(&mut self) {
    self.tab = match self.tab {
      DashboardTab::Workers => DashboardTab::Tasks,
      DashboardTab::Tasks => DashboardTab::Workers,
    }
  }

  fn selected_hostname(&self) -> Option<String> {
    self.workers.rows().get(self.selected_worker).map(|w| w.hostname.clone())
  }

  /// Label and worker of the selected task, as the per-task commands
  /// need them.
  fn selected_task_target(&self) -> Option<(String, String)> {
    self.tasks.rows().get(self.selected_task).map(|task| {
      (task.name.clone().unwrap_or_default(), task.worker.clone().unwrap_or_default())
    })
  }
}

struct Net {
  runtime: Runtime,
  client: ApiClient,
  tx: mpsc::Sender<NetEvent>,
}

impl Net {
  fn refresh_workers(&self, app: &mut App) {
    let token = app.workers.begin_refresh();
    let client = self.client.clone();
    let tx = self.tx.clone();
    self.runtime.spawn(async move {
      let result = client.fetch_workers().await;
      let _ = tx.send(NetEvent::Workers(token, result));
    });
  }

  fn fetch_tasks(&self, app: &mut App) {
    let token = app.tasks.begin_fetch();
    let page = app.tasks.page.clone();
    let filters = app.tasks.filters.clone();
    let client = self.client.clone();
    let tx = self.tx.clone();
    self.runtime.spawn(async move {
      let result = client.fetch_tasks_page(&page, &filters).await;
      let _ = tx.send(NetEvent::Tasks(token, result));
    });
  }

  fn dispatch(&self, command: commands::Command) {
    let client = self.client.clone();
    let tx = self.tx.clone();
    self.runtime.spawn(async move {
      let outcome = commands::dispatch(&client, command).await;
      let _ = tx.send(NetEvent::CommandDone(outcome));
    });
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();
  let config = Config::from_env();
  let autorefresh = config.autorefresh_secs();
  let client = ApiClient::new(config.clone());

  enable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;

  let (tx, rx) = mpsc::channel::<NetEvent>();
  let net = Net { runtime: Runtime::new()?, client, tx };
  let mut app = App::new(&config);

  net.refresh_workers(&mut app);
  net.fetch_tasks(&mut app);

  // Fixed-interval worker refresh; overlapping fetches resolve
  // latest-wins inside the controller.
  let refresh_every = Duration::from_secs(autorefresh);
  let mut next_refresh = Instant::now() + refresh_every;

  let tick_rate = Duration::from_millis(250);
  let result = run(&mut terminal, &mut app, &net, rx, autorefresh, &mut next_refresh, refresh_every, tick_rate);

  disable_raw_mode()?;
  execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
  terminal.show_cursor()?;
  result
}

#[allow(clippy::too_many_arguments)]
fn run<B: Backend>(
  terminal: &mut Terminal<B>,
  app: &mut App,
  net: &Net,
  rx: mpsc::Receiver<NetEvent>,
  autorefresh: u64,
  next_refresh: &mut Instant,
  refresh_every: Duration,
  tick_rate: Duration,
) -> Result<()> {
  loop {
    while let Ok(event) = rx.try_recv() {
      match event {
        NetEvent::Workers(token, result) => {
          let _ = app.workers.apply_refresh(token, result);
        }
        NetEvent::Tasks(token, result) => {
          let _ = app.tasks.apply_page(token, result);
        }
        NetEvent::CommandDone(outcome) => {
          app.alerts.push(outcome.alert);
          if let SuccessEffect::DisableAndReload { control, delay_ms } = outcome.effect {
            app.disabled_controls.push(control);
            app.pending_reload = Some(Instant::now() + Duration::from_millis(delay_ms));
          }
        }
      }
    }

    if autorefresh != 0 && Instant::now() >= *next_refresh {
      net.refresh_workers(app);
      *next_refresh += refresh_every;
    }

    if app.pending_reload.is_some_and(|at| Instant::now() >= at) {
      app.pending_reload = None;
      app.disabled_controls.clear();
      net.refresh_workers(app);
      net.fetch_tasks(app);
    }

    terminal.draw(|f| ui(f, app, &net.client.nav_base()))?;

    if event::poll(tick_rate)? {
      if let CEvent::Key(key) = event::read()? {
        if app.editing.is_some() {
          match key.code {
            KeyCode::Enter => {
              if let Some((prompt, buffer)) = app.editing.take() {
                submit_prompt(app, net, prompt, buffer);
              }
            }
            KeyCode::Esc => app.editing = None,
            KeyCode::Backspace => {
              if let Some((_, buffer)) = &mut app.editing {
                buffer.pop();
              }
            }
            KeyCode::Char(c) => {
              if let Some((_, buffer)) = &mut app.editing {
                buffer.push(c);
              }
            }
            _ => {}
          }
          continue;
        }
        match key.code {
          KeyCode::Char('q') => return Ok(()),
          KeyCode::Right | KeyCode::Left => app.next_tab(),
          KeyCode::Char('R') => net.dispatch(commands::worker_refresh_all()),
          KeyCode::Char('r') => match app.tab {
            DashboardTab::Workers => net.refresh_workers(app),
            DashboardTab::Tasks => net.fetch_tasks(app),
          },
          KeyCode::Char('n') if app.tab == DashboardTab::Tasks => {
            app.tasks.next_page();
            net.fetch_tasks(app);
          }
          KeyCode::Char('p') if app.tab == DashboardTab::Tasks => {
            app.tasks.prev_page();
            net.fetch_tasks(app);
          }
          KeyCode::Char('l') if app.tab == DashboardTab::Tasks => {
            let at =
              PAGE_LENGTHS.iter().position(|&l| l == app.tasks.page.length).unwrap_or(0);
            app.tasks.set_page_length(PAGE_LENGTHS[(at + 1) % PAGE_LENGTHS.len()]);
            net.fetch_tasks(app);
          }
          KeyCode::Char('t') if app.tab == DashboardTab::Tasks => {
            app.editing = Some((Prompt::TaskNameFilter, app.tasks.filters.taskname.clone()));
          }
          KeyCode::Char('w') if app.tab == DashboardTab::Tasks => {
            app.editing = Some((Prompt::WorkerNameFilter, app.tasks.filters.workername.clone()));
          }
          KeyCode::Char('/') if app.tab == DashboardTab::Tasks => {
            app.editing = Some((Prompt::Search, app.tasks.filters.search.clone()));
          }
          KeyCode::Char('s') if app.tab == DashboardTab::Tasks => {
            let at = SORTABLE_COLUMNS
              .iter()
              .position(|&c| c == app.tasks.page.sort_column)
              .unwrap_or(0);
            let column = SORTABLE_COLUMNS[(at + 1) % SORTABLE_COLUMNS.len()];
            app.tasks.set_sort(column, app.tasks.page.sort_dir);
            net.fetch_tasks(app);
          }
          KeyCode::Char('S') if app.tab == DashboardTab::Tasks => {
            let dir = match app.tasks.page.sort_dir {
              SortDir::Asc => SortDir::Desc,
              SortDir::Desc => SortDir::Asc,
            };
            app.tasks.set_sort(app.tasks.page.sort_column, dir);
            net.fetch_tasks(app);
          }
          KeyCode::Char('o') if app.tab == DashboardTab::Tasks => {
            if let Some((label, workername)) = app.selected_task_target() {
              let prompt = Prompt::TaskTimeout { label, workername, limit_label: "Time_limit" };
              app.editing = Some((prompt, String::new()));
            }
          }
          KeyCode::Char('O') if app.tab == DashboardTab::Tasks => {
            if let Some((label, workername)) = app.selected_task_target() {
              let prompt =
                Prompt::TaskTimeout { label, workername, limit_label: "Soft_time_limit" };
              app.editing = Some((prompt, String::new()));
            }
          }
          KeyCode::Char('m') if app.tab == DashboardTab::Tasks => {
            if let Some((label, workername)) = app.selected_task_target() {
              app.editing = Some((Prompt::RateLimit { label, workername }, String::new()));
            }
          }
          KeyCode::Down if app.tab == DashboardTab::Tasks => {
            if app.selected_task + 1 < app.tasks.rows().len() {
              app.selected_task += 1;
            }
          }
          KeyCode::Up if app.tab == DashboardTab::Tasks => {
            app.selected_task = app.selected_task.saturating_sub(1);
          }
          KeyCode::Down if app.tab == DashboardTab::Workers => {
            if app.selected_worker + 1 < app.workers.rows().len() {
              app.selected_worker += 1;
            }
          }
          KeyCode::Up if app.tab == DashboardTab::Workers => {
            app.selected_worker = app.selected_worker.saturating_sub(1);
          }
          KeyCode::Char('f') if app.tab == DashboardTab::Workers => {
            if let Some(hostname) = app.selected_hostname() {
              net.dispatch(commands::worker_refresh(&hostname));
            }
          }
          KeyCode::Char('P') if app.tab == DashboardTab::Workers => {
            if let Some(hostname) = app.selected_hostname() {
              net.dispatch(commands::pool_restart(&hostname));
            }
          }
          KeyCode::Char('S') if app.tab == DashboardTab::Workers => {
            if let Some(hostname) = app.selected_hostname() {
              net.dispatch(commands::shutdown(&hostname));
            }
          }
          KeyCode::Char('g') if app.tab == DashboardTab::Workers => {
            if let Some(workername) = app.selected_hostname() {
              app.editing = Some((Prompt::PoolGrow { workername }, String::new()));
            }
          }
          KeyCode::Char('G') if app.tab == DashboardTab::Workers => {
            if let Some(workername) = app.selected_hostname() {
              app.editing = Some((Prompt::PoolShrink { workername }, String::new()));
            }
          }
          KeyCode::Char('a') if app.tab == DashboardTab::Workers => {
            if let Some(workername) = app.selected_hostname() {
              app.editing = Some((Prompt::Autoscale { workername }, String::new()));
            }
          }
          KeyCode::Char('c') if app.tab == DashboardTab::Workers => {
            if let Some(workername) = app.selected_hostname() {
              app.editing = Some((Prompt::AddConsumer { workername }, String::new()));
            }
          }
          KeyCode::Char('C') if app.tab == DashboardTab::Workers => {
            if let Some(workername) = app.selected_hostname() {
              app.editing = Some((Prompt::CancelConsumer { workername }, String::new()));
            }
          }
          KeyCode::Char('d') => {
            let len = app.alerts.len();
            if len > 0 {
              app.alerts.dismiss(len - 1);
            }
          }
          KeyCode::Char('x') if app.tab == DashboardTab::Tasks => {
            if !app.disabled_controls.contains(&"task-revoke") {
              if let Some(task) = app.tasks.rows().get(app.selected_task) {
                net.dispatch(commands::revoke(&task.uuid.to_string()));
              }
            }
          }
          KeyCode::Char('X') if app.tab == DashboardTab::Tasks => {
            if !app.disabled_controls.contains(&"task-terminate") {
              if let Some(task) = app.tasks.rows().get(app.selected_task) {
                net.dispatch(commands::terminate(&task.uuid.to_string()));
              }
            }
          }
          _ => {}
        }
      }
    }
  }
}

/// Resolves a confirmed prompt: filters re-fetch the table, commands go
/// out fire-and-forget, and a rejected value lands in the alert feed
/// without any request.
fn submit_prompt(app: &mut App, net: &Net, prompt: Prompt, buffer: String) {
  match prompt {
    Prompt::TaskNameFilter => {
      app.tasks.set_taskname_filter(&buffer);
      net.fetch_tasks(app);
    }
    Prompt::WorkerNameFilter => {
      app.tasks.set_workername_filter(&buffer);
      net.fetch_tasks(app);
    }
    Prompt::Search => {
      app.tasks.set_search(&buffer);
      net.fetch_tasks(app);
    }
    Prompt::PoolGrow { workername } => {
      net.dispatch(commands::pool_grow(&workername, buffer.trim()));
    }
    Prompt::PoolShrink { workername } => {
      net.dispatch(commands::pool_shrink(&workername, buffer.trim()));
    }
    Prompt::Autoscale { workername } => match parse_autoscale(&buffer) {
      Some((min, max)) => net.dispatch(commands::autoscale(&workername, min, max)),
      None => app.alerts.push(Alert::danger("Invalid input: expected min and max")),
    },
    Prompt::AddConsumer { workername } => {
      net.dispatch(commands::add_consumer(&workername, buffer.trim()));
    }
    Prompt::CancelConsumer { workername } => {
      net.dispatch(commands::cancel_consumer(&workername, buffer.trim()));
    }
    Prompt::TaskTimeout { label, workername, limit_label } => {
      match command_or_alert(commands::task_timeout(&label, &workername, limit_label, &buffer)) {
        Ok(command) => net.dispatch(command),
        Err(alert) => app.alerts.push(alert),
      }
    }
    Prompt::RateLimit { label, workername } => {
      match command_or_alert(commands::rate_limit(&label, &workername, &buffer)) {
        Ok(command) => net.dispatch(command),
        Err(alert) => app.alerts.push(alert),
      }
    }
  }
}

fn ui<B: Backend>(f: &mut tui::Frame<B>, app: &App, base: &str) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .margin(1)
    .constraints([
      Constraint::Length(3),
      Constraint::Min(0),
      Constraint::Length(5),
      Constraint::Length(3),
    ].as_ref())
    .split(f.size());

  let tabs = Tabs::new(
    ["Workers", "Tasks"]
      .iter()
      .map(|t| Spans::from(Span::styled(*t, Style::default().fg(Color::Yellow))))
      .collect(),
  )
    .block(Block::default().borders(Borders::ALL).title("taskwatch"))
    .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .select(match app.tab {
      DashboardTab::Workers => 0,
      DashboardTab::Tasks => 1,
    });
  f.render_widget(tabs, chunks[0]);

  match app.tab {
    DashboardTab::Workers => render_workers(f, app, base, chunks[1]),
    DashboardTab::Tasks => render_tasks(f, app, base, chunks[1]),
  }

  render_alerts(f, app, chunks[2]);

  let hint = match &app.editing {
    Some((prompt, buffer)) => format!("{}: {buffer}_", prompt.hint()),
    None => match app.tab {
      DashboardTab::Workers => {
        "←/→: tabs | ↑/↓: select | r/R: refresh | f: refresh worker | P: restart pool | S: shutdown | g/G: grow/shrink pool | a: autoscale | c/C: add/cancel consumer | d: dismiss | q: quit".into()
      }
      DashboardTab::Tasks => {
        "←/→: tabs | ↑/↓: select | r: reload | n/p: page | l: page size | t/w: filters | /: search | s/S: sort | o/O: time limits | m: rate limit | x/X: revoke/terminate | d: dismiss | q: quit".into()
      }
    },
  };
  let footer = Paragraph::new(hint)
    .style(Style::default().fg(Color::White))
    .block(Block::default().borders(Borders::ALL));
  f.render_widget(footer, chunks[3]);
}

fn render_workers<B: Backend>(f: &mut tui::Frame<B>, app: &App, base: &str, area: Rect) {
  let header = Row::new(vec![
    "Worker", "Status", "Active", "Received", "Failed", "Succeeded", "Retried", "Load Average",
  ])
    .style(Style::default().add_modifier(Modifier::BOLD));

  let mut rows: Vec<Row> = app
    .workers
    .rows()
    .iter()
    .enumerate()
    .map(|(at, worker)| {
      let cells = app.workers.render_row(worker, base);
      let status_style = if worker.status {
        Style::default().fg(Color::Green)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let row = Row::new(
        cells
          .into_iter()
          .enumerate()
          .map(|(i, cell)| {
            if i == 1 {
              Cell::from(cell.text).style(status_style)
            } else {
              Cell::from(cell.text)
            }
          })
          .collect::<Vec<_>>(),
      );
      if at == app.selected_worker {
        row.style(Style::default().bg(Color::Blue))
      } else {
        row
      }
    })
    .collect();

  let footer_cells: Vec<Cell> = std::iter::once(Cell::from("Total"))
    .chain(std::iter::once(Cell::from("")))
    .chain(app.workers.footer(base).into_iter().map(|cell| {
      let text = cell.total.to_string();
      match cell.href {
        Some(_) => Cell::from(text).style(
          Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        ),
        None => Cell::from(text),
      }
    }))
    .chain(std::iter::once(Cell::from("")))
    .collect();
  rows.push(Row::new(footer_cells).style(Style::default().add_modifier(Modifier::BOLD)));

  let title = match app.workers.last_error() {
    Some(err) => format!("Workers — {err}"),
    None => format!("Workers ({})", app.workers.rows().len()),
  };
  let widths = [Constraint::Percentage(30); 8];
  let table = Table::new(rows)
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .widths(&widths);
  f.render_widget(table, area);
}

fn render_tasks<B: Backend>(f: &mut tui::Frame<B>, app: &App, base: &str, area: Rect) {
  let columns = app.tasks.visible_columns();
  let header = Row::new(columns.iter().map(|c| c.key()).collect::<Vec<_>>())
    .style(Style::default().add_modifier(Modifier::BOLD));

  let rows: Vec<Row> = app
    .tasks
    .render_rows(base)
    .into_iter()
    .enumerate()
    .map(|(i, cells)| {
      let row = Row::new(
        cells
          .into_iter()
          .map(|cell| {
            let style = match cell.badge {
              Some(StateClass::Success) => Style::default().fg(Color::Green),
              Some(StateClass::Failure) => Style::default().fg(Color::Red),
              Some(StateClass::Other) => Style::default().fg(Color::Gray),
              None if cell.href.is_some() => Style::default().fg(Color::Cyan),
              None => Style::default(),
            };
            Cell::from(cell.text).style(style)
          })
          .collect::<Vec<_>>(),
      );
      if i == app.selected_task {
        row.style(Style::default().bg(Color::Blue))
      } else {
        row
      }
    })
    .collect();

  let title = match (app.tasks.phase(), app.tasks.last_error()) {
    (Phase::Failed, Some(err)) => format!("Tasks — {err}"),
    (Phase::Fetching, _) => format!("Tasks — loading… | {}", app.tasks.page_info()),
    _ => format!("Tasks — {}", app.tasks.page_info()),
  };
  let widths = vec![Constraint::Percentage(12); columns.len()];
  let table = Table::new(rows)
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .widths(&widths);
  f.render_widget(table, area);
}

fn render_alerts<B: Backend>(f: &mut tui::Frame<B>, app: &App, area: Rect) {
  let lines: Vec<Spans> = app
    .alerts
    .iter()
    .rev()
    .take(3)
    .map(|alert| {
      let style = match alert.level {
        AlertLevel::Success => Style::default().fg(Color::Green),
        AlertLevel::Danger => Style::default().fg(Color::Red),
      };
      Spans::from(Span::styled(alert.message.clone(), style))
    })
    .collect();
  let block = Paragraph::new(lines)
    .block(Block::default().borders(Borders::ALL).title("Notifications"));
  f.render_widget(block, area);
}
