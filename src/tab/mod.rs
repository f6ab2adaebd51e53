pub mod entry;
pub mod history;
pub mod progress;
pub mod selection;
pub mod stream;

use std::time::{Duration, Instant};

use tracing::{debug, trace};

pub use entry::FileEntry;
pub use history::{HOME_VIEW, NavigationHistory, containing_dir, file_name, is_home_view, join_path};
pub use selection::{GestureEnd, ItemBounds, Modifiers, Point, Rect, SelectionController};
pub use stream::{Applied, Phase, RequestIds, StreamEvent, StreamOptions, StreamSession};

use crate::backend::Call;
use crate::layout::SortKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Per-tab tuning taken from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct TabSettings {
  pub progress_time_constant: Duration,
  pub drag_threshold: f32,
}

impl Default for TabSettings {
  fn default() -> Self {
    Self {
      progress_time_constant: Duration::from_millis(1200),
      drag_threshold: selection::DEFAULT_DRAG_THRESHOLD,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Tab {
  id: TabId,
  history: NavigationHistory,
  pub session: StreamSession,
  pub selection: SelectionController,
  /// First visible row (list) or tile row (grid).
  pub scroll: usize,
}

impl Tab {
  fn new(id: TabId, path: String, settings: TabSettings) -> Self {
    Self {
      id,
      history: NavigationHistory::new(path),
      session: StreamSession::new(settings.progress_time_constant),
      selection: SelectionController::new(settings.drag_threshold),
      scroll: 0,
    }
  }

  pub fn id(&self) -> TabId {
    self.id
  }

  pub fn history(&self) -> &NavigationHistory {
    &self.history
  }

  pub fn working_dir(&self) -> &str {
    self.history.working_dir()
  }

  /// Last path segment, or the whole path at a root.
  pub fn title(&self) -> &str {
    history::segments(self.working_dir())
      .last()
      .copied()
      .unwrap_or_else(|| self.working_dir())
  }

  pub fn navigate(&mut self, path: impl Into<String>) {
    self.history = self.history.navigate_to(path);
  }

  pub fn back(&mut self) -> bool {
    self.transition(NavigationHistory::go_back)
  }

  pub fn forward(&mut self) -> bool {
    self.transition(NavigationHistory::go_forward)
  }

  pub fn up(&mut self) -> bool {
    self.transition(NavigationHistory::go_up)
  }

  fn transition(&mut self, step: fn(&NavigationHistory) -> Option<NavigationHistory>) -> bool {
    match step(&self.history) {
      Some(next) => {
        self.history = next;
        true
      }
      None => false,
    }
  }

  /// Entries in display order.
  pub fn sorted(&self, key: SortKey, ascending: bool) -> Vec<&FileEntry> {
    self.session.sorted(key, ascending)
  }

  /// Paths in display order; the sequence selection indices refer to.
  pub fn sequence(&self, key: SortKey, ascending: bool) -> Vec<String> {
    self.sorted(key, ascending).into_iter().map(|e| e.path.clone()).collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
  /// Removed; `active` is the tab now active.
  Removed { active: TabId },
  /// The last tab was removed.
  Empty,
  /// No tab with that id.
  Missing,
}

/// Open tabs, in display order, plus the active pointer.
#[derive(Debug)]
pub struct TabRegistry {
  tabs: Vec<Tab>,
  active: Option<TabId>,
  default_path: String,
  next_tab: u64,
  request_ids: RequestIds,
  settings: TabSettings,
}

impl TabRegistry {
  pub fn with_settings(
    default_path: impl Into<String>,
    settings: TabSettings,
    request_ids: RequestIds,
  ) -> Self {
    Self {
      tabs: Vec::new(),
      active: None,
      default_path: default_path.into(),
      next_tab: 1,
      request_ids,
      settings,
    }
  }

  pub fn default_path(&self) -> &str {
    &self.default_path
  }

  pub fn set_default_path(&mut self, path: impl Into<String>) {
    self.default_path = path.into();
  }

  /// New settings apply to future tabs; open tabs pick up the drag threshold.
  pub fn set_settings(&mut self, settings: TabSettings) {
    self.settings = settings;
    for tab in &mut self.tabs {
      tab.selection.set_threshold(settings.drag_threshold);
    }
  }

  /// Opens a tab at `path` (or the default path) and activates it.
  pub fn add_tab(&mut self, path: Option<String>) -> TabId {
    let id = TabId(self.next_tab);
    self.next_tab += 1;
    let path = path.unwrap_or_else(|| self.default_path.clone());
    debug!(event = "tab.added", tab = id.0, path = %path);
    self.tabs.push(Tab::new(id, path, self.settings));
    self.active = Some(id);
    id
  }

  pub fn remove_tab(&mut self, id: TabId) -> RemoveOutcome {
    let Some(pos) = self.position(id) else { return RemoveOutcome::Missing };
    let mut tab = self.tabs.remove(pos);
    tab.session.cancel();
    debug!(event = "tab.removed", tab = id.0);

    let Some(first) = self.tabs.first().map(Tab::id) else {
      self.active = None;
      return RemoveOutcome::Empty;
    };
    if self.active == Some(id) {
      self.active = Some(first);
    }
    RemoveOutcome::Removed { active: self.active.unwrap_or(first) }
  }

  /// New tab at the source's working directory, with fresh history and an
  /// empty selection.
  pub fn duplicate_tab(&mut self, id: TabId) -> Option<TabId> {
    let path = self.get(id)?.working_dir().to_string();
    Some(self.add_tab(Some(path)))
  }

  pub fn activate(&mut self, id: TabId) -> bool {
    if self.position(id).is_none() {
      return false;
    }
    self.active = Some(id);
    true
  }

  pub fn activate_next(&mut self) -> Option<TabId> {
    self.cycle(1)
  }

  pub fn activate_prev(&mut self) -> Option<TabId> {
    self.cycle(-1)
  }

  fn cycle(&mut self, delta: isize) -> Option<TabId> {
    let len = self.tabs.len() as isize;
    if len == 0 {
      return None;
    }
    let current = self.active.and_then(|id| self.position(id)).unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(len) as usize;
    let id = self.tabs[next].id;
    self.active = Some(id);
    Some(id)
  }

  pub fn active_id(&self) -> Option<TabId> {
    self.active
  }

  pub fn active(&self) -> Option<&Tab> {
    self.active.and_then(|id| self.get(id))
  }

  pub fn active_mut(&mut self) -> Option<&mut Tab> {
    let id = self.active?;
    self.get_mut(id)
  }

  pub fn get(&self, id: TabId) -> Option<&Tab> {
    self.tabs.iter().find(|t| t.id == id)
  }

  pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
    self.tabs.iter_mut().find(|t| t.id == id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Tab> {
    self.tabs.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.tabs.is_empty()
  }

  fn position(&self, id: TabId) -> Option<usize> {
    self.tabs.iter().position(|t| t.id == id)
  }

  /// (Re)lists the tab's working directory under a fresh request id. The
  /// selection is rebuilt (the shift anchor survives) and scroll reset.
  /// Returns the call to send.
  pub fn start_stream(&mut self, id: TabId, options: StreamOptions, now: Instant) -> Option<Call> {
    let request_id = self.request_ids.next_id();
    let tab = self.tabs.iter_mut().find(|t| t.id == id)?;
    tab.selection.rebuild();
    tab.scroll = 0;
    let path = tab.working_dir().to_string();
    Some(tab.session.start(path, options, request_id, now))
  }

  /// Delivers `event` to the one tab whose live request id matches it.
  pub fn route_stream_event(&mut self, event: StreamEvent) -> Option<(TabId, Applied)> {
    let request_id = event.request_id();
    let Some(tab) = self.tabs.iter_mut().find(|t| t.session.request_id() == Some(request_id)) else {
      trace!(event = "stream.unrouted", request_id);
      return None;
    };
    Some((tab.id, tab.session.apply(event)))
  }

  /// The backend rejected the stream call for `request_id`.
  pub fn fail_stream(&mut self, request_id: u64, message: &str) -> Option<(TabId, Applied)> {
    let tab = self.tabs.iter_mut().find(|t| t.session.request_id() == Some(request_id))?;
    Some((tab.id, tab.session.fail(request_id, message)))
  }

  /// Advances every loading tab's simulated progress.
  pub fn tick(&mut self, now: Instant) -> bool {
    let mut moved = false;
    for tab in &mut self.tabs {
      moved |= tab.session.tick(now);
    }
    moved
  }

  /// Tabs currently showing `dir`.
  pub fn showing(&self, dir: &str) -> Vec<TabId> {
    self.tabs.iter().filter(|t| same_dir(t.working_dir(), dir)).map(Tab::id).collect()
  }
}

/// Path equality ignoring trailing separators.
pub fn same_dir(a: &str, b: &str) -> bool {
  let trim = |p: &str| -> String {
    let t = p.trim_end_matches(history::is_separator);
    if t.is_empty() { p.chars().take(1).collect() } else { t.to_string() }
  };
  trim(a) == trim(b)
}
