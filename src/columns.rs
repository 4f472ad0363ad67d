use serde_json::Value;

use crate::models::{state_class, StateClass, TaskRecord};
use crate::timefmt::{self, DurationStyle, TimeDisplay};

/// Decides whether a configured column is shown. `configured` is either
/// the sentinel "all", empty (fail-open), or a comma-separated list
/// matched case-sensitively after trimming.
pub fn is_visible(column: &str, configured: &str) -> bool {
  if configured.is_empty() || configured == "all" {
    return true;
  }
  configured.split(',').any(|entry| entry.trim() == column)
}

/// Escapes HTML metacharacters in string values. Non-string values pass
/// through unchanged; task payloads are the only fields that can smuggle
/// markup into a cell.
pub fn escape_entities(value: &Value) -> Value {
  match value {
    Value::String(s) => Value::String(
      s.replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;"),
    ),
    other => other.clone(),
  }
}

/// Flattens a JSON value into cell text: strings lose their quotes,
/// everything else keeps its compact JSON form.
pub fn display_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// Percent-encodes one path segment for a detail-view link.
pub fn encode_segment(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for byte in raw.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
        out.push(byte as char)
      }
      _ => out.push_str(&format!("%{byte:02X}")),
    }
  }
  out
}

/// One rendered table cell: display text plus an optional navigation
/// target and state badge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedCell {
  pub text: String,
  pub href: Option<String>,
  pub badge: Option<StateClass>,
}

impl RenderedCell {
  pub fn text(text: impl Into<String>) -> Self {
    Self { text: text.into(), ..Self::default() }
  }

  pub fn link(text: impl Into<String>, href: String) -> Self {
    Self { text: text.into(), href: Some(href), badge: None }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskColumn {
  Name,
  Uuid,
  State,
  Args,
  Kwargs,
  Result,
  Received,
  Started,
  Duration,
  Runtime,
  Worker,
  Exchange,
  RoutingKey,
  Retries,
  Revoked,
  Exception,
  Expires,
  Eta,
}

impl TaskColumn {
  pub const ALL: [TaskColumn; 18] = [
    TaskColumn::Name,
    TaskColumn::Uuid,
    TaskColumn::State,
    TaskColumn::Args,
    TaskColumn::Kwargs,
    TaskColumn::Result,
    TaskColumn::Received,
    TaskColumn::Started,
    TaskColumn::Duration,
    TaskColumn::Runtime,
    TaskColumn::Worker,
    TaskColumn::Exchange,
    TaskColumn::RoutingKey,
    TaskColumn::Retries,
    TaskColumn::Revoked,
    TaskColumn::Exception,
    TaskColumn::Expires,
    TaskColumn::Eta,
  ];

  pub fn key(&self) -> &'static str {
    match self {
      TaskColumn::Name => "name",
      TaskColumn::Uuid => "uuid",
      TaskColumn::State => "state",
      TaskColumn::Args => "args",
      TaskColumn::Kwargs => "kwargs",
      TaskColumn::Result => "result",
      TaskColumn::Received => "received",
      TaskColumn::Started => "started",
      TaskColumn::Duration => "duration",
      TaskColumn::Runtime => "runtime",
      TaskColumn::Worker => "worker",
      TaskColumn::Exchange => "exchange",
      TaskColumn::RoutingKey => "routing_key",
      TaskColumn::Retries => "retries",
      TaskColumn::Revoked => "revoked",
      TaskColumn::Exception => "exception",
      TaskColumn::Expires => "expires",
      TaskColumn::Eta => "eta",
    }
  }

  /// Renders one cell for `task`. A missing field degrades to an empty
  /// cell; nothing here can abort the row.
  pub fn render(
    &self,
    task: &TaskRecord,
    base: &str,
    time: TimeDisplay,
    duration_style: DurationStyle,
  ) -> RenderedCell {
    let escaped = |value: &Option<Value>| {
      value
        .as_ref()
        .map(|v| display_value(&escape_entities(v)))
        .unwrap_or_default()
    };
    let stamp = |value: Option<f64>| time.format(value).unwrap_or_default();
    match self {
      TaskColumn::Name => RenderedCell::text(task.name.clone().unwrap_or_default()),
      TaskColumn::Uuid => {
        let id = task.uuid.to_string();
        RenderedCell::link(id.clone(), format!("{base}/task/{}", encode_segment(&id)))
      }
      TaskColumn::State => RenderedCell {
        text: task.state.clone(),
        href: None,
        badge: Some(state_class(&task.state)),
      },
      TaskColumn::Args => RenderedCell::text(escaped(&task.args)),
      TaskColumn::Kwargs => RenderedCell::text(escaped(&task.kwargs)),
      TaskColumn::Result => RenderedCell::text(escaped(&task.result)),
      TaskColumn::Received => RenderedCell::text(stamp(task.received)),
      TaskColumn::Started => RenderedCell::text(stamp(task.started)),
      TaskColumn::Duration => RenderedCell::text(timefmt::format_duration(
        task.started,
        task.timestamp,
        duration_style,
      )),
      TaskColumn::Runtime => RenderedCell::text(
        task.runtime.map(|r| format!("{r:.2}")).unwrap_or_default(),
      ),
      TaskColumn::Worker => match &task.worker {
        Some(worker) => RenderedCell::link(
          worker.clone(),
          format!("{base}/worker/{}", encode_segment(worker)),
        ),
        None => RenderedCell::default(),
      },
      TaskColumn::Exchange => RenderedCell::text(task.exchange.clone().unwrap_or_default()),
      TaskColumn::RoutingKey => RenderedCell::text(task.routing_key.clone().unwrap_or_default()),
      TaskColumn::Retries => RenderedCell::text(task.retries.to_string()),
      TaskColumn::Revoked => RenderedCell::text(stamp(task.revoked)),
      TaskColumn::Exception => RenderedCell::text(escaped(
        &task.exception.as_ref().map(|e| Value::String(e.clone())),
      )),
      TaskColumn::Expires => RenderedCell::text(stamp(task.expires)),
      TaskColumn::Eta => RenderedCell::text(stamp(task.eta)),
    }
  }
}
