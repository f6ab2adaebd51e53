pub mod process;
pub mod protocol;

pub use process::ProcessBackend;
pub use protocol::{BackendEvent, BackendMessage, Call, ConflictStrategy};

use thiserror::Error;

/// Identifier the backend echoes back in its reply to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("failed to start backend {command:?}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },
  #[error("backend command line is empty")]
  EmptyCommand,
  #[error("failed to encode {call}: {source}")]
  Encode {
    call: &'static str,
    #[source]
    source: serde_json::Error,
  },
  #[error("backend i/o error: {0}")]
  Io(#[from] std::io::Error),
  #[error("backend is not running")]
  Disconnected,
}

/// The command side of the native backend.
///
/// Replies and events travel back through the event loop; `invoke` only
/// reports whether the call could be handed over.
pub trait Backend {
  fn invoke(&mut self, call: Call) -> Result<CallId, BackendError>;
}

/// Backend stand-in that records every call. Clones share one log, so a
/// test can keep a handle after boxing the backend into the app.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
  log: std::rc::Rc<std::cell::RefCell<Vec<(CallId, Call)>>>,
  fail: std::rc::Rc<std::cell::Cell<bool>>,
}

#[cfg(test)]
impl RecordingBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_fail(&self, fail: bool) {
    self.fail.set(fail);
  }

  pub fn calls(&self) -> Vec<(CallId, Call)> {
    self.log.borrow().clone()
  }

  pub fn calls_named(&self, name: &str) -> Vec<Call> {
    self.log.borrow().iter().map(|(_, c)| c).filter(|c| c.name() == name).cloned().collect()
  }

  /// Id of the most recent call named `name`.
  pub fn last_id_of(&self, name: &str) -> Option<CallId> {
    self.log.borrow().iter().rev().find(|(_, c)| c.name() == name).map(|(id, _)| *id)
  }
}

#[cfg(test)]
impl Backend for RecordingBackend {
  fn invoke(&mut self, call: Call) -> Result<CallId, BackendError> {
    if self.fail.get() {
      return Err(BackendError::Disconnected);
    }
    let mut log = self.log.borrow_mut();
    let id = CallId(log.len() as u64 + 1);
    log.push((id, call));
    Ok(id)
  }
}
