use std::collections::VecDeque;

use tracing::{error, info};

const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Success,
  Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub message: String,
  pub level: Level,
  ttl: u32,
}

/// Short-lived toasts plus the error popup queue.
#[derive(Debug)]
pub struct Notices {
  toasts: VecDeque<Toast>,
  errors: Vec<String>,
  ttl: u32,
}

impl Notices {
  pub fn new(ttl: u32) -> Self {
    Self { toasts: VecDeque::new(), errors: Vec::new(), ttl: ttl.max(1) }
  }

  pub fn set_ttl(&mut self, ttl: u32) {
    self.ttl = ttl.max(1);
  }

  pub fn toast(&mut self, level: Level, message: impl Into<String>) {
    let message = message.into();
    info!(event = "notice.toast", message = %message);
    if self.toasts.len() == MAX_TOASTS {
      self.toasts.pop_front();
    }
    self.toasts.push_back(Toast { message, level, ttl: self.ttl });
  }

  pub fn info(&mut self, message: impl Into<String>) {
    self.toast(Level::Info, message);
  }

  pub fn success(&mut self, message: impl Into<String>) {
    self.toast(Level::Success, message);
  }

  pub fn warning(&mut self, message: impl Into<String>) {
    self.toast(Level::Warning, message);
  }

  /// Whole-operation failure; shown in the popup until dismissed.
  pub fn error(&mut self, message: impl Into<String>) {
    let message = message.into();
    error!(event = "notice.error", message = %message);
    self.errors.push(message);
  }

  pub fn extend_errors(&mut self, messages: impl IntoIterator<Item = String>) {
    for m in messages {
      self.error(m);
    }
  }

  pub fn errors(&self) -> &[String] {
    &self.errors
  }

  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn dismiss_errors(&mut self) {
    self.errors.clear();
  }

  pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
    self.toasts.iter()
  }

  /// Ages toasts by one tick. Returns whether any expired.
  pub fn tick(&mut self) -> bool {
    let before = self.toasts.len();
    for t in &mut self.toasts {
      t.ttl = t.ttl.saturating_sub(1);
    }
    self.toasts.retain(|t| t.ttl > 0);
    self.toasts.len() != before
  }
}
