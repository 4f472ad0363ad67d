//! Control-API and query-API integration tests against a mock backend.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskwatch::client::ApiClient;
use taskwatch::commands::{self, SuccessEffect};
use taskwatch::config::Config;
use taskwatch::models::{FilterState, PageRequest};
use taskwatch::notify::AlertLevel;
use taskwatch::tasks_table::TaskTable;
use taskwatch::timefmt::{DurationStyle, TimeDisplay};

fn config_for(server: &MockServer, prefix: &str) -> Config {
  Config {
    api_url: server.uri(),
    url_prefix: prefix.to_string(),
    time_display: "time:UTC".into(),
    tasks_columns: "all".into(),
    query: String::new(),
  }
}

#[tokio::test]
async fn pool_grow_posts_command_and_reports_server_message() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/worker/pool/grow/w1"))
    .and(body_json(json!({ "workername": "w1", "n": "3" })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
    .expect(1)
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let outcome = commands::dispatch(&client, commands::pool_grow("w1", "3")).await;
  assert_eq!(outcome.alert.level, AlertLevel::Success);
  assert!(outcome.alert.message.contains("ok"));
  assert_eq!(outcome.effect, SuccessEffect::None);
}

#[tokio::test]
async fn revoke_disables_control_and_schedules_reload() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/task/revoke/abc-123"))
    .and(body_json(json!({ "terminate": false })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Revoked abc-123" })))
    .expect(1)
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let outcome = commands::dispatch(&client, commands::revoke("abc-123")).await;
  assert_eq!(outcome.alert.level, AlertLevel::Success);
  assert_eq!(
    outcome.effect,
    SuccessEffect::DisableAndReload { control: "task-revoke", delay_ms: 5000 }
  );
}

#[tokio::test]
async fn refresh_worker_sends_query_parameters() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/workers"))
    .and(query_param("workername", "celery@w1"))
    .and(query_param("refresh", "1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
    .expect(1)
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let outcome = commands::dispatch(&client, commands::worker_refresh("celery@w1")).await;
  // No message field in the reply, so the fallback is used.
  assert_eq!(outcome.alert.message, "Successfully refreshed");
}

#[tokio::test]
async fn failed_command_surfaces_danger_alert_without_effect() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/worker/shutdown/w1"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let outcome = commands::dispatch(&client, commands::shutdown("w1")).await;
  assert_eq!(outcome.alert.level, AlertLevel::Danger);
  assert!(outcome.alert.message.contains("An error occurred"));
  assert_eq!(outcome.effect, SuccessEffect::None);
}

#[tokio::test]
async fn malformed_json_reply_is_a_transport_failure() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/task/revoke/abc"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let outcome = commands::dispatch(&client, commands::terminate("abc")).await;
  assert_eq!(outcome.alert.level, AlertLevel::Danger);
  assert_eq!(outcome.effect, SuccessEffect::None);
}

#[tokio::test]
async fn worker_fetch_honors_mount_prefix() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/monitor/workers"))
    .and(query_param("json", "1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      { "hostname": "celery@w1", "status": true, "active": 2, "task-succeeded": 5 },
      { "hostname": "celery@w2" },
    ])))
    .expect(1)
    .mount(&server)
    .await;

  // Trailing slashes and the missing leading slash are normalized away.
  let client = ApiClient::new(config_for(&server, "monitor///"));
  let workers = client.fetch_workers().await.unwrap();
  assert_eq!(workers.len(), 2);
  assert_eq!(workers[0].task_succeeded, 5);
  assert_eq!(workers[1].active, 0);
}

#[tokio::test]
async fn task_page_fetch_posts_datatable_body() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/tasks/datatable"))
    .and(body_json(json!({
      "draw": 0,
      "start": 0,
      "length": 15,
      "order[0][column]": 7,
      "order[0][dir]": "desc",
      "search[value]": "state:FAILURE",
      "taskname": "",
      "workername": "",
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "draw": 0,
      "recordsTotal": 1,
      "recordsFiltered": 1,
      "data": [{
        "uuid": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
        "name": "tasks.add",
        "state": "FAILURE",
        "exception": "ValueError()",
      }],
    })))
    .expect(1)
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let filters = FilterState::with_initial_state(Some("FAILURE"));
  let page = client.fetch_tasks_page(&PageRequest::default(), &filters).await.unwrap();
  assert_eq!(page.records_filtered, 1);
  assert_eq!(page.data[0].name.as_deref(), Some("tasks.add"));
}

#[tokio::test]
async fn late_response_for_superseded_filter_is_ignored() {
  let server = MockServer::start().await;
  let page_body = |name: &str| {
    json!({
      "draw": 0,
      "recordsTotal": 1,
      "recordsFiltered": 1,
      "data": [{ "uuid": uuid::Uuid::new_v4().to_string(), "name": name, "state": "STARTED" }],
    })
  };
  Mock::given(method("POST"))
    .and(path("/tasks/datatable"))
    .respond_with(ResponseTemplate::new(200).set_body_json(page_body("tasks.stale")))
    .mount(&server)
    .await;

  let client = ApiClient::new(config_for(&server, ""));
  let mut table = TaskTable::new(
    "all".into(),
    TimeDisplay::parse("time:UTC"),
    DurationStyle::Compact,
    None,
  );

  // First fetch goes out, then the operator edits the worker filter
  // before it resolves.
  let stale_token = table.begin_fetch();
  let stale_result = client.fetch_tasks_page(&table.page, &table.filters).await;

  table.set_workername_filter("celery@w2");
  server.reset().await;
  Mock::given(method("POST"))
    .and(path("/tasks/datatable"))
    .and(body_json(json!({
      "draw": 2,
      "start": 0,
      "length": 15,
      "order[0][column]": 7,
      "order[0][dir]": "desc",
      "search[value]": "",
      "taskname": "",
      "workername": "celery@w2",
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(page_body("tasks.fresh")))
    .mount(&server)
    .await;

  let fresh_token = table.begin_fetch();
  let fresh_result = client.fetch_tasks_page(&table.page, &table.filters).await;

  // Fresh response lands first, stale one afterwards.
  table.apply_page(fresh_token, fresh_result).unwrap();
  assert!(table.apply_page(stale_token, stale_result).is_err());
  assert_eq!(table.rows()[0].name.as_deref(), Some("tasks.fresh"));
}
