use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::DashboardError;
use crate::models::{FilterState, PageRequest, PageResponse, WorkerRecord};
use crate::urlprefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

/// HTTP client for the backend query and control APIs. The mount prefix
/// is re-resolved on every call rather than cached at construction.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  config: Config,
}

impl ApiClient {
  pub fn new(config: Config) -> Self {
    Self { http: reqwest::Client::new(), config }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Navigation base: the resolved mount prefix. Hrefs rendered into
  /// cells are relative to the deployment, not to this process.
  pub fn nav_base(&self) -> String {
    urlprefix::resolve(&self.config.url_prefix)
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}{}", self.config.api_url, self.nav_base(), path)
  }

  /// Full worker collection, `GET {prefix}/workers?json=1`.
  pub async fn fetch_workers(&self) -> Result<Vec<WorkerRecord>, DashboardError> {
    let url = self.url("/workers");
    debug!(%url, "fetching workers");
    let response = self
      .http
      .get(&url)
      .query(&[("json", "1")])
      .send()
      .await?
      .error_for_status()?;
    Ok(response.json().await?)
  }

  /// One task page, `POST {prefix}/tasks/datatable`.
  pub async fn fetch_tasks_page(
    &self,
    page: &PageRequest,
    filters: &FilterState,
  ) -> Result<PageResponse, DashboardError> {
    let url = self.url("/tasks/datatable");
    debug!(%url, start = page.start, length = page.length, "fetching task page");
    let response = self
      .http
      .post(&url)
      .json(&page.to_body(filters))
      .send()
      .await?
      .error_for_status()?;
    Ok(response.json().await?)
  }

  /// Raw control-API request used by the command dispatcher. GET payloads
  /// travel as query parameters, POST payloads as a JSON body; the reply
  /// must be JSON.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    payload: &Value,
  ) -> Result<Value, DashboardError> {
    let url = self.url(path);
    debug!(%url, ?method, "control request");
    let request = match method {
      Method::Get => {
        let pairs: Vec<(String, String)> = payload
          .as_object()
          .map(|map| {
            map
              .iter()
              .map(|(k, v)| (k.clone(), crate::columns::display_value(v)))
              .collect()
          })
          .unwrap_or_default();
        self.http.get(&url).query(&pairs)
      }
      Method::Post => self.http.post(&url).json(payload),
    };
    let response = request.send().await?.error_for_status()?;
    Ok(response.json().await?)
  }
}
