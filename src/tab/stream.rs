use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace, warn};

use super::entry::{FileEntry, compare};
use super::history::{is_drive, is_separator};
use super::progress::Progress;
use crate::backend::protocol::{
  BackendEvent, Call, FileError, FileMetadata, FileThumbnail, StreamMarker,
};
use crate::layout::SortKey;

/// Hands out strictly increasing request ids.
///
/// One counter is shared by every session that can receive events on the
/// same channel, so an id identifies exactly one listing.
#[derive(Debug, Clone)]
pub struct RequestIds {
  next: u64,
}

impl RequestIds {
  pub fn starting_at(first: u64) -> Self {
    Self { next: first }
  }

  pub fn next_id(&mut self) -> u64 {
    let id = self.next;
    self.next += 1;
    id
  }
}

impl Default for RequestIds {
  fn default() -> Self {
    Self::starting_at(1)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
  pub sort_key: SortKey,
  pub ascending: bool,
  pub show_hidden: bool,
}

impl Default for StreamOptions {
  fn default() -> Self {
    Self { sort_key: SortKey::Name, ascending: true, show_hidden: false }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Scanning,
  Streaming,
  Complete,
  Error,
}

impl Phase {
  pub fn is_loading(self) -> bool {
    matches!(self, Phase::Scanning | Phase::Streaming)
  }
}

/// Backend events that belong to a directory listing.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
  Metadata(FileMetadata),
  MetadataComplete(StreamMarker),
  Thumbnail(FileThumbnail),
  Complete(StreamMarker),
  FileError(FileError),
}

impl StreamEvent {
  pub fn request_id(&self) -> u64 {
    match self {
      StreamEvent::Metadata(m) => m.request_id,
      StreamEvent::MetadataComplete(m) | StreamEvent::Complete(m) => m.request_id,
      StreamEvent::Thumbnail(t) => t.request_id,
      StreamEvent::FileError(e) => e.request_id,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      StreamEvent::Metadata(_) => "metadata",
      StreamEvent::MetadataComplete(_) => "metadata_complete",
      StreamEvent::Thumbnail(_) => "thumbnail",
      StreamEvent::Complete(_) => "complete",
      StreamEvent::FileError(_) => "file_error",
    }
  }

  /// Splits stream events from the rest of the backend's traffic.
  pub fn from_backend(event: BackendEvent) -> Result<StreamEvent, BackendEvent> {
    match event {
      BackendEvent::FileMetadata(m) => Ok(StreamEvent::Metadata(m)),
      BackendEvent::MetadataComplete(m) => Ok(StreamEvent::MetadataComplete(m)),
      BackendEvent::FileThumbnail(t) => Ok(StreamEvent::Thumbnail(t)),
      BackendEvent::StreamComplete(m) => Ok(StreamEvent::Complete(m)),
      BackendEvent::FileError(e) => Ok(StreamEvent::FileError(e)),
      other => Err(other),
    }
  }
}

/// What applying an event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// Tagged with a request id that is not live. Nothing changed.
  Stale,
  /// Live, but had nothing to act on.
  Ignored,
  /// The session changed and needs to be shown again.
  Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamWarning {
  pub path: String,
  pub message: String,
}

/// One "list this directory" operation and its reconciled results.
#[derive(Debug, Clone)]
pub struct StreamSession {
  request_id: Option<u64>,
  path: String,
  options: StreamOptions,
  drive_root: bool,
  entries: IndexMap<String, FileEntry>,
  thumbnailed: IndexSet<String>,
  phase: Phase,
  progress: Progress,
  completed: bool,
  warnings: Vec<StreamWarning>,
  error: Option<String>,
}

impl StreamSession {
  pub fn new(progress_time_constant: Duration) -> Self {
    Self {
      request_id: None,
      path: String::new(),
      options: StreamOptions::default(),
      drive_root: false,
      entries: IndexMap::new(),
      thumbnailed: IndexSet::new(),
      phase: Phase::Idle,
      progress: Progress::new(progress_time_constant),
      completed: false,
      warnings: Vec::new(),
      error: None,
    }
  }

  /// Replaces any previous listing and returns the call that starts the
  /// new one. Events for older ids are inert from here on.
  pub fn start(
    &mut self,
    path: impl Into<String>,
    options: StreamOptions,
    request_id: u64,
    now: Instant,
  ) -> Call {
    self.cancel();

    let path = path.into();
    self.drive_root = is_drive_root(&path);
    self.request_id = Some(request_id);
    self.path = path.clone();
    self.options = options;
    self.entries.clear();
    self.thumbnailed.clear();
    self.phase = Phase::Scanning;
    self.progress.start(now);
    self.completed = false;
    self.warnings.clear();
    self.error = None;

    debug!(event = "stream.started", request_id, path = %self.path, drive_root = self.drive_root);

    Call::StreamDirectoryContents {
      path,
      sort_key: options.sort_key,
      ascending: options.ascending,
      show_hidden: options.show_hidden,
      request_id,
    }
  }

  /// Stops listening. Safe to call with nothing in flight.
  pub fn cancel(&mut self) {
    let Some(request_id) = self.request_id.take() else { return };
    self.progress.halt();
    if self.phase.is_loading() {
      self.phase = Phase::Idle;
    }
    debug!(event = "stream.cancelled", request_id);
  }

  /// The backend rejected the request that started `request_id`.
  pub fn fail(&mut self, request_id: u64, message: impl Into<String>) -> Applied {
    if self.request_id != Some(request_id) {
      trace!(event = "stream.dropped_stale", request_id, current = ?self.request_id, kind = "failure");
      return Applied::Stale;
    }
    let message = message.into();
    warn!(event = "stream.failed", request_id, path = %self.path, error = %message);
    self.phase = Phase::Error;
    self.progress.halt();
    self.error = Some(message);
    Applied::Changed
  }

  pub fn apply(&mut self, event: StreamEvent) -> Applied {
    let request_id = event.request_id();
    if self.request_id != Some(request_id) {
      trace!(
        event = "stream.dropped_stale",
        request_id,
        current = ?self.request_id,
        kind = event.kind()
      );
      return Applied::Stale;
    }

    match event {
      StreamEvent::Metadata(meta) => {
        match self.entries.get_mut(&meta.path) {
          Some(existing) => existing.merge_metadata(meta),
          None => {
            let entry = FileEntry::from_metadata(meta);
            self.entries.insert(entry.path.clone(), entry);
          }
        }
        Applied::Changed
      }
      StreamEvent::MetadataComplete(_) => {
        self.progress.set_total(self.entries.len());
        if self.drive_root {
          self.complete();
        } else if !self.completed {
          self.phase = Phase::Streaming;
        }
        debug!(event = "stream.metadata_complete", request_id, entries = self.entries.len());
        Applied::Changed
      }
      StreamEvent::Thumbnail(thumb) => match self.entries.get_mut(&thumb.path) {
        Some(entry) => {
          entry.thumbnail = thumb.thumbnail;
          if self.thumbnailed.insert(thumb.path) {
            self.progress.item_done();
          }
          Applied::Changed
        }
        None => Applied::Ignored,
      },
      StreamEvent::Complete(_) => {
        if self.completed {
          Applied::Ignored
        } else {
          self.complete();
          Applied::Changed
        }
      }
      StreamEvent::FileError(err) => {
        warn!(event = "stream.file_error", request_id, path = %err.path, error = %err.message);
        self.warnings.push(StreamWarning { path: err.path, message: err.message });
        Applied::Changed
      }
    }
  }

  /// Advances simulated progress. Returns whether the shown value moved.
  pub fn tick(&mut self, now: Instant) -> bool {
    let before = self.progress.percent();
    self.progress.tick(now);
    self.progress.percent() != before
  }

  pub fn request_id(&self) -> Option<u64> {
    self.request_id
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn options(&self) -> StreamOptions {
    self.options
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn progress(&self) -> u8 {
    self.progress.percent()
  }

  pub fn warnings(&self) -> &[StreamWarning] {
    &self.warnings
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, path: &str) -> Option<&FileEntry> {
    self.entries.get(path)
  }

  /// Entries in display order.
  pub fn sorted(&self, key: SortKey, ascending: bool) -> Vec<&FileEntry> {
    let mut list: Vec<&FileEntry> = self.entries.values().collect();
    list.sort_by(|a, b| compare(a, b, key, ascending));
    list
  }

  fn complete(&mut self) {
    self.completed = true;
    self.phase = Phase::Complete;
    self.progress.finish();
    debug!(event = "stream.completed", request_id = ?self.request_id, entries = self.entries.len());
  }
}

/// A bare root or drive marker such as `/`, `\`, `C:` or `C:\`.
pub fn is_drive_root(path: &str) -> bool {
  let trimmed = path.trim_end_matches(is_separator);
  trimmed.is_empty() || is_drive(trimmed)
}
