use std::collections::VecDeque;

/// Bootstrap-style alert levels. Success for completed commands, danger
/// for validation and transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
  Success,
  Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub level: AlertLevel,
  pub message: String,
}

impl Alert {
  pub fn success(message: impl Into<String>) -> Self {
    Self { level: AlertLevel::Success, message: message.into() }
  }

  pub fn danger(message: impl Into<String>) -> Self {
    Self { level: AlertLevel::Danger, message: message.into() }
  }
}

/// Dismissible alert list shown in the dashboard footer. Oldest entries
/// fall off once the feed is full.
#[derive(Debug, Default)]
pub struct AlertFeed {
  alerts: VecDeque<Alert>,
}

const MAX_ALERTS: usize = 20;

impl AlertFeed {
  pub fn push(&mut self, alert: Alert) {
    if self.alerts.len() == MAX_ALERTS {
      self.alerts.pop_front();
    }
    self.alerts.push_back(alert);
  }

  pub fn dismiss(&mut self, index: usize) {
    if index < self.alerts.len() {
      self.alerts.remove(index);
    }
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Alert> {
    self.alerts.iter()
  }

  pub fn len(&self) -> usize {
    self.alerts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.alerts.is_empty()
  }
}
