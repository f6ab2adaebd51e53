use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::backend::protocol::{
  BackendEvent, Call, ConflictStrategy, FileError, PasteComplete, PasteConflict, PasteFile, PasteScan,
  ResolveCopyPayload,
};
use crate::tab::RequestIds;

/// Backend events that belong to a paste.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteEvent {
  Scan(PasteScan),
  File(PasteFile),
  FileError(FileError),
  Conflict(PasteConflict),
  Complete(PasteComplete),
}

impl PasteEvent {
  pub fn request_id(&self) -> u64 {
    match self {
      PasteEvent::Scan(e) => e.request_id,
      PasteEvent::File(e) => e.request_id,
      PasteEvent::FileError(e) => e.request_id,
      PasteEvent::Conflict(e) => e.request_id,
      PasteEvent::Complete(e) => e.request_id,
    }
  }

  pub fn from_backend(event: BackendEvent) -> Result<PasteEvent, BackendEvent> {
    match event {
      BackendEvent::PasteScan(e) => Ok(PasteEvent::Scan(e)),
      BackendEvent::PasteFile(e) => Ok(PasteEvent::File(e)),
      BackendEvent::PasteFileError(e) => Ok(PasteEvent::FileError(e)),
      BackendEvent::PasteConflict(e) => Ok(PasteEvent::Conflict(e)),
      BackendEvent::PasteComplete(e) => Ok(PasteEvent::Complete(e)),
      other => Err(other),
    }
  }
}

/// A destination file already exists; the backend waits for a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictPrompt {
  pub request_id: u64,
  pub src: String,
  pub dest: String,
  choice: usize,
  pub repeat_for_all: bool,
}

impl ConflictPrompt {
  fn new(conflict: PasteConflict) -> Self {
    Self {
      request_id: conflict.request_id,
      src: conflict.src,
      dest: conflict.dest,
      choice: 0,
      repeat_for_all: false,
    }
  }

  pub fn strategy(&self) -> ConflictStrategy {
    ConflictStrategy::ALL[self.choice]
  }

  pub fn next(&mut self) {
    self.choice = (self.choice + 1) % ConflictStrategy::ALL.len();
  }

  pub fn prev(&mut self) {
    let n = ConflictStrategy::ALL.len();
    self.choice = (self.choice + n - 1) % n;
  }

  pub fn toggle_repeat(&mut self) {
    self.repeat_for_all = !self.repeat_for_all;
  }

  fn answer(&self, strategy: ConflictStrategy, repeat_for_all: bool) -> Call {
    Call::ResolveCopyConflict {
      payload: ResolveCopyPayload { request_id: self.request_id, strategy, repeat_for_all },
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteOperation {
  pub request_id: u64,
  pub dest: String,
  /// Files to copy, once the scan reported it.
  pub total: Option<u64>,
  pub done: u64,
  pub errors: Vec<FileError>,
}

impl PasteOperation {
  pub fn percent(&self) -> Option<u8> {
    let total = self.total?;
    if total == 0 {
      return Some(100);
    }
    Some(((self.done.min(total) * 100) / total) as u8)
  }
}

/// What a paste event did.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteUpdate {
  Stale,
  Progress,
  /// A conflict is waiting for the user.
  Conflict,
  Completed(PasteOperation),
}

/// Tracks the paste in flight and its pending conflicts.
#[derive(Debug, Default)]
pub struct PasteTracker {
  ids: RequestIds,
  current: Option<PasteOperation>,
  conflicts: VecDeque<ConflictPrompt>,
}

impl PasteTracker {
  pub fn new(ids: RequestIds) -> Self {
    Self { ids, current: None, conflicts: VecDeque::new() }
  }

  pub fn current(&self) -> Option<&PasteOperation> {
    self.current.as_ref()
  }

  pub fn conflict(&self) -> Option<&ConflictPrompt> {
    self.conflicts.front()
  }

  pub fn conflict_mut(&mut self) -> Option<&mut ConflictPrompt> {
    self.conflicts.front_mut()
  }

  /// Conflicts waiting behind the one shown.
  pub fn queued_conflicts(&self) -> usize {
    self.conflicts.len().saturating_sub(1)
  }

  /// Begins pasting into `dest`. A paste still in flight is abandoned.
  pub fn start(&mut self, dest: impl Into<String>) -> Call {
    let dest = dest.into();
    let request_id = self.ids.next_id();
    if let Some(old) = self.current.take() {
      debug!(event = "paste.superseded", request_id = old.request_id);
    }
    self.conflicts.clear();
    self.current = Some(PasteOperation {
      request_id,
      dest: dest.clone(),
      total: None,
      done: 0,
      errors: Vec::new(),
    });
    debug!(event = "paste.started", request_id, dest = %dest);
    Call::PasteItemsFromClipboard { dest, request_id }
  }

  /// The backend rejected the paste call.
  pub fn fail(&mut self, request_id: u64) -> bool {
    if self.current.as_ref().map(|op| op.request_id) != Some(request_id) {
      return false;
    }
    self.current = None;
    self.conflicts.clear();
    true
  }

  pub fn apply(&mut self, event: PasteEvent) -> PasteUpdate {
    let request_id = event.request_id();
    let Some(op) = self.current.as_mut().filter(|op| op.request_id == request_id) else {
      trace!(event = "paste.dropped_stale", request_id);
      return PasteUpdate::Stale;
    };

    match event {
      PasteEvent::Scan(scan) => {
        op.total = Some(scan.total);
        PasteUpdate::Progress
      }
      PasteEvent::File(_) => {
        op.done += 1;
        PasteUpdate::Progress
      }
      PasteEvent::FileError(err) => {
        warn!(event = "paste.file_error", request_id, path = %err.path, error = %err.message);
        op.errors.push(err);
        PasteUpdate::Progress
      }
      PasteEvent::Conflict(conflict) => {
        debug!(event = "paste.conflict", request_id, dest = %conflict.dest);
        self.conflicts.push_back(ConflictPrompt::new(conflict));
        PasteUpdate::Conflict
      }
      PasteEvent::Complete(complete) => {
        let mut finished = self.current.take().unwrap_or_else(|| PasteOperation {
          request_id,
          dest: String::new(),
          total: None,
          done: 0,
          errors: Vec::new(),
        });
        if !complete.dest.is_empty() {
          finished.dest = complete.dest;
        }
        self.conflicts.clear();
        debug!(
          event = "paste.completed",
          request_id,
          done = finished.done,
          errors = finished.errors.len()
        );
        PasteUpdate::Completed(finished)
      }
    }
  }

  /// Confirms the front conflict with the highlighted strategy.
  pub fn resolve(&mut self) -> Option<Call> {
    let prompt = self.conflicts.pop_front()?;
    Some(prompt.answer(prompt.strategy(), prompt.repeat_for_all))
  }

  /// Dismisses the front conflict: skip this one file only.
  pub fn dismiss(&mut self) -> Option<Call> {
    let prompt = self.conflicts.pop_front()?;
    Some(prompt.answer(ConflictStrategy::Ignore, false))
  }
}

/// `copy_items_to_clipboard` for the given paths, if there are any.
pub fn copy_call(paths: Vec<String>) -> Option<Call> {
  if paths.is_empty() {
    return None;
  }
  Some(Call::CopyItemsToClipboard { paths })
}

/// `cut_items_to_clipboard`: the next paste moves these paths instead of
/// copying them.
pub fn cut_call(paths: Vec<String>) -> Option<Call> {
  if paths.is_empty() {
    return None;
  }
  Some(Call::CutItemsToClipboard { paths })
}
