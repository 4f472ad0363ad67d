use std::env;

use regex::Regex;

/// Dashboard configuration. Mirrors the values the monitored deployment
/// embeds for its UI: API base URL, mount prefix, time display mode,
/// enabled columns, and an optional deep-link query string carrying
/// `autorefresh` and `state` parameters.
#[derive(Debug, Clone)]
pub struct Config {
  pub api_url: String,
  pub url_prefix: String,
  pub time_display: String,
  pub tasks_columns: String,
  pub query: String,
}

impl Config {
  pub fn from_env() -> Self {
    Self {
      api_url: env::var("TASKWATCH_API_URL").unwrap_or_else(|_| "http://localhost:5555".into()),
      url_prefix: env::var("TASKWATCH_URL_PREFIX").unwrap_or_default(),
      time_display: env::var("TASKWATCH_TIME").unwrap_or_else(|_| "time:UTC".into()),
      tasks_columns: env::var("TASKWATCH_COLUMNS").unwrap_or_else(|_| "all".into()),
      query: env::var("TASKWATCH_QUERY").unwrap_or_default(),
    }
  }

  /// Auto-refresh interval for the worker table, in seconds. Defaults to 1,
  /// `autorefresh=0` disables the timer.
  pub fn autorefresh_secs(&self) -> u64 {
    url_param(&self.query, "autorefresh")
      .and_then(|v| v.parse().ok())
      .unwrap_or(1)
  }

  /// Initial task state filter carried by the deep link, if any.
  pub fn initial_state(&self) -> Option<String> {
    url_param(&self.query, "state").filter(|s| !s.is_empty())
  }
}

/// Extracts a single parameter from a `?a=1&b=2` style query string.
pub fn url_param(query: &str, name: &str) -> Option<String> {
  let query = if query.starts_with('?') || query.starts_with('&') {
    query.to_string()
  } else {
    format!("?{query}")
  };
  let re = Regex::new(&format!(r"[\?&]{}=([^&#]*)", regex::escape(name))).ok()?;
  re.captures(&query).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_param_extracts_named_value() {
    assert_eq!(url_param("?autorefresh=5&state=FAILURE", "autorefresh"), Some("5".into()));
    assert_eq!(url_param("autorefresh=5&state=FAILURE", "state"), Some("FAILURE".into()));
    assert_eq!(url_param("?state=FAILURE", "autorefresh"), None);
  }

  #[test]
  fn autorefresh_defaults_and_disables() {
    let mut config = Config {
      api_url: "http://localhost:5555".into(),
      url_prefix: String::new(),
      time_display: "time:UTC".into(),
      tasks_columns: "all".into(),
      query: String::new(),
    };
    assert_eq!(config.autorefresh_secs(), 1);
    config.query = "autorefresh=0".into();
    assert_eq!(config.autorefresh_secs(), 0);
    config.query = "autorefresh=30".into();
    assert_eq!(config.autorefresh_secs(), 30);
  }

  #[test]
  fn initial_state_ignores_empty() {
    let mut config = Config {
      api_url: String::new(),
      url_prefix: String::new(),
      time_display: String::new(),
      tasks_columns: String::new(),
      query: "state=RETRY".into(),
    };
    assert_eq!(config.initial_state(), Some("RETRY".into()));
    config.query = "state=".into();
    assert_eq!(config.initial_state(), None);
  }
}
