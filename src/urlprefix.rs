/// Normalizes the operator-configured mount prefix. Every API call and
/// navigation URL is built as `resolve(prefix) + path` with `path` always
/// starting with `/`. Empty input stays empty; otherwise trailing slashes
/// are stripped and a leading slash is guaranteed.
pub fn resolve(raw: &str) -> String {
  if raw.is_empty() {
    return String::new();
  }
  let trimmed = raw.trim_end_matches('/');
  if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{trimmed}")
  }
}
