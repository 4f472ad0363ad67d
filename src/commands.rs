use serde_json::{json, Value};
use tracing::{error, info};

use crate::client::{ApiClient, Method};
use crate::error::DashboardError;
use crate::notify::Alert;

/// Follow-up applied after a command succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessEffect {
  None,
  /// Disable the triggering control and reload the whole view after the
  /// given delay.
  DisableAndReload { control: &'static str, delay_ms: u64 },
}

pub const RELOAD_DELAY_MS: u64 = 5000;

/// One administrative command: verb, control-API path, payload, the
/// fallback notification when the server sends no message, and the
/// follow-up effect. Built by the constructors below, interpreted by
/// [`dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  pub method: Method,
  pub path: String,
  pub payload: Value,
  pub fallback: &'static str,
  pub effect: SuccessEffect,
}

impl Command {
  fn post(path: String, payload: Value, fallback: &'static str) -> Self {
    Self { method: Method::Post, path, payload, fallback, effect: SuccessEffect::None }
  }
}

pub fn worker_refresh(workername: &str) -> Command {
  Command {
    method: Method::Get,
    path: "/api/workers".into(),
    payload: json!({ "workername": workername, "refresh": 1 }),
    fallback: "Successfully refreshed",
    effect: SuccessEffect::None,
  }
}

pub fn worker_refresh_all() -> Command {
  Command {
    method: Method::Get,
    path: "/api/workers".into(),
    payload: json!({ "refresh": 1 }),
    fallback: "Refreshed All Workers",
    effect: SuccessEffect::None,
  }
}

pub fn pool_restart(workername: &str) -> Command {
  Command::post(
    format!("/api/worker/pool/restart/{workername}"),
    json!({ "workername": workername }),
    "Pool restart requested",
  )
}

pub fn shutdown(workername: &str) -> Command {
  Command::post(
    format!("/api/worker/shutdown/{workername}"),
    json!({ "workername": workername }),
    "Shutdown requested",
  )
}

pub fn pool_grow(workername: &str, n: &str) -> Command {
  Command::post(
    format!("/api/worker/pool/grow/{workername}"),
    json!({ "workername": workername, "n": n }),
    "Pool grow requested",
  )
}

pub fn pool_shrink(workername: &str, n: &str) -> Command {
  Command::post(
    format!("/api/worker/pool/shrink/{workername}"),
    json!({ "workername": workername, "n": n }),
    "Pool shrink requested",
  )
}

pub fn autoscale(workername: &str, min: &str, max: &str) -> Command {
  Command::post(
    format!("/api/worker/pool/autoscale/{workername}"),
    json!({ "workername": workername, "min": min, "max": max }),
    "Autoscale updated",
  )
}

pub fn add_consumer(workername: &str, queue: &str) -> Command {
  Command::post(
    format!("/api/worker/queue/add-consumer/{workername}"),
    json!({ "workername": workername, "queue": queue }),
    "Consumer added",
  )
}

pub fn cancel_consumer(workername: &str, queue: &str) -> Command {
  Command::post(
    format!("/api/worker/queue/cancel-consumer/{workername}"),
    json!({ "workername": workername, "queue": queue }),
    "Consumer cancelled",
  )
}

/// Strips the ` [rate_limit=...]` suffix a rendered task label may carry.
fn task_name(label: &str) -> &str {
  label.split(' ').next().unwrap_or(label)
}

/// Sets a task's soft or hard time limit. The payload key is the clicked
/// control's label, lower-cased ("Time_limit" → `time_limit`). The value
/// must parse as an integer or the command is rejected before dispatch.
pub fn task_timeout(
  task_label: &str,
  workername: &str,
  limit_label: &str,
  value: &str,
) -> Result<Command, DashboardError> {
  let timeout: i64 = value
    .trim()
    .parse()
    .map_err(|_| DashboardError::Validation("Invalid timeout value".into()))?;
  let mut payload = serde_json::Map::new();
  payload.insert("workername".into(), json!(workername));
  payload.insert(limit_label.to_lowercase(), json!(timeout));
  Ok(Command::post(
    format!("/api/task/timeout/{}", task_name(task_label)),
    Value::Object(payload),
    "Timeout updated",
  ))
}

/// Parses the leading integer of a value, so the common "10/m" rate
/// syntax yields 10. Anything without a leading integer is rejected.
fn leading_int(value: &str) -> Option<i64> {
  let trimmed = value.trim_start();
  let end = trimmed
    .char_indices()
    .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
    .map(|(i, c)| i + c.len_utf8())
    .last()?;
  trimmed[..end].parse().ok()
}

pub fn rate_limit(
  task_label: &str,
  workername: &str,
  value: &str,
) -> Result<Command, DashboardError> {
  let ratelimit = leading_int(value)
    .ok_or_else(|| DashboardError::Validation("Invalid rate limit value".into()))?;
  Ok(Command::post(
    format!("/api/task/rate-limit/{}", task_name(task_label)),
    json!({ "workername": workername, "ratelimit": ratelimit }),
    "Rate limit updated",
  ))
}

pub fn revoke(taskid: &str) -> Command {
  Command {
    method: Method::Post,
    path: format!("/api/task/revoke/{taskid}"),
    payload: json!({ "terminate": false }),
    fallback: "Revoked",
    effect: SuccessEffect::DisableAndReload { control: "task-revoke", delay_ms: RELOAD_DELAY_MS },
  }
}

pub fn terminate(taskid: &str) -> Command {
  Command {
    method: Method::Post,
    path: format!("/api/task/revoke/{taskid}"),
    payload: json!({ "terminate": true }),
    fallback: "Terminated",
    effect: SuccessEffect::DisableAndReload {
      control: "task-terminate",
      delay_ms: RELOAD_DELAY_MS,
    },
  }
}

/// Result of a dispatch: the notification to show and the effect to
/// apply. Dispatch never fails past this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
  pub alert: Alert,
  pub effect: SuccessEffect,
}

/// Fire-and-forget dispatch of one command. Success produces a success
/// alert carrying the server's `message` field (or the command's
/// fallback) plus the command's effect; any transport failure produces a
/// danger alert and no effect. There is no retry.
pub async fn dispatch(client: &ApiClient, command: Command) -> Outcome {
  match client.request(command.method, &command.path, &command.payload).await {
    Ok(body) => {
      let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| command.fallback.to_string());
      info!(path = %command.path, %message, "command succeeded");
      Outcome { alert: Alert::success(message), effect: command.effect }
    }
    Err(err) => {
      error!(path = %command.path, %err, "command failed");
      Outcome { alert: Alert::danger(err.to_string()), effect: SuccessEffect::None }
    }
  }
}
