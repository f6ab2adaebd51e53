use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, info, trace, warn};

use crate::action::Action;
use crate::backend::protocol::{FileChange, FileItem, FileNode, QuickAccess, Reply, ResolveKind, ResolveResult};
use crate::backend::{Backend, BackendEvent, BackendMessage, Call, CallId};
use crate::clipboard::{self, PasteEvent, PasteTracker, PasteUpdate};
use crate::config::Config;
use crate::event::{InputMode, map_key};
use crate::layout::LayoutCache;
use crate::notice::Notices;
use crate::sidebar::Sidebar;
use crate::tab::history::{is_drive, is_separator, segments};
use crate::tab::{
  self, FileEntry, GestureEnd, HOME_VIEW, ItemBounds, Modifiers, Phase, Point, RemoveOutcome, RequestIds,
  StreamEvent, StreamOptions, TabId, TabRegistry, containing_dir, file_name, is_home_view, join_path, same_dir,
};

/// Nominal size of one terminal cell in logical pixels.
pub const CELL_WIDTH_PX: f32 = 8.0;
pub const CELL_HEIGHT_PX: f32 = 16.0;

/// Centre of a terminal cell, in logical pixels.
pub fn cell_point(column: u16, row: u16) -> Point {
  Point::new(
    column as f32 * CELL_WIDTH_PX + CELL_WIDTH_PX / 2.0,
    row as f32 * CELL_HEIGHT_PX + CELL_HEIGHT_PX / 2.0,
  )
}

/// Pixel bounds of a block of cells.
pub fn cell_bounds(area: Rect) -> tab::Rect {
  tab::Rect::new(
    area.x as f32 * CELL_WIDTH_PX,
    area.y as f32 * CELL_HEIGHT_PX,
    area.width as f32 * CELL_WIDTH_PX,
    area.height as f32 * CELL_HEIGHT_PX,
  )
}

fn cell_in(area: Rect, column: u16, row: u16) -> bool {
  column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// What a reply belongs to.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
  Stream { request_id: u64, path: String },
  Tree,
  Children,
  QuickAccess,
  User,
  FetchLayout,
  SaveLayout,
  PathCommand,
  Open { path: String },
  Copy { count: usize, cut: bool },
  Paste { request_id: u64 },
  ResolveConflict,
  /// A create, rename, delete or move; `dirs` are reloaded on success.
  FileAction { verb: &'static str, dirs: Vec<String> },
}

/// What the text prompt is collecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PromptPurpose {
  #[default]
  Command,
  NewFile { dir: String },
  NewDirectory { dir: String },
  Rename { path: String },
  Delete { paths: Vec<String> },
  MoveTo { dir: String, paths: Vec<String> },
}

impl PromptPurpose {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Command => ":",
      Self::NewFile { .. } => "New file:",
      Self::NewDirectory { .. } => "New folder:",
      Self::Rename { .. } => "Rename to:",
      Self::Delete { .. } => "Delete selection? (y/N)",
      Self::MoveTo { .. } => "Move to:",
    }
  }
}

/// Clickable regions recorded by the last draw.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
  pub tabs: Vec<(Rect, TabId)>,
  pub breadcrumb: Vec<(Rect, String)>,
  pub sidebar: Vec<(Rect, usize)>,
  pub files: Rect,
  pub items: Vec<ItemBounds>,
}

/// Geometry of the file pane from the last draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileView {
  /// Tiles per row; 1 in list mode.
  pub columns: usize,
  /// Visible rows of items.
  pub rows: usize,
}

impl Default for FileView {
  fn default() -> Self {
    Self { columns: 1, rows: 20 }
  }
}

pub struct App {
  pub tabs: TabRegistry,
  pub layout: LayoutCache,
  pub sidebar: Sidebar,
  pub paste: PasteTracker,
  pub notices: Notices,
  pub sidebar_ratio: u16,
  pub min_sidebar_ratio: u16,
  pub max_sidebar_ratio: u16,
  pub ratio_step: u16,
  pub prompt_input: String,
  pub prompt: PromptPurpose,
  pub should_quit: bool,
  pub home: Option<String>,
  pub hits: HitMap,
  pub view: FileView,
  mode: InputMode,
  backend: Box<dyn Backend>,
  backend_alive: bool,
  pending: HashMap<CallId, Pending>,
  double_click: Duration,
  pointer_in_files: bool,
  last_click: Option<(Instant, String)>,
}

impl App {
  pub fn new(config: &Config, backend: Box<dyn Backend>, start: Option<String>) -> Self {
    let mut app = Self {
      tabs: TabRegistry::with_settings(
        start.clone().unwrap_or_default(),
        config.tab_settings(),
        RequestIds::default(),
      ),
      layout: LayoutCache::default(),
      sidebar: Sidebar::default(),
      paste: PasteTracker::new(RequestIds::default()),
      notices: Notices::new(config.toast_ticks),
      sidebar_ratio: config.sidebar_ratio,
      min_sidebar_ratio: config.min_sidebar_ratio,
      max_sidebar_ratio: config.max_sidebar_ratio,
      ratio_step: config.ratio_step,
      prompt_input: String::new(),
      prompt: PromptPurpose::Command,
      should_quit: false,
      home: None,
      hits: HitMap::default(),
      view: FileView::default(),
      mode: InputMode::Normal,
      backend,
      backend_alive: true,
      pending: HashMap::new(),
      double_click: Duration::from_millis(config.double_click_ms),
      pointer_in_files: false,
      last_click: None,
    };

    app.send(Call::FetchLayoutSettings, Pending::FetchLayout);
    app.send(Call::ResolveQuickAccess, Pending::QuickAccess);
    app.send(Call::ResolveUser, Pending::User);
    if let Some(path) = start {
      app.open_tab(Some(path));
    }
    app
  }

  /// Settings that can change while running.
  pub fn apply_config(&mut self, config: &Config) {
    self.min_sidebar_ratio = config.min_sidebar_ratio;
    self.max_sidebar_ratio = config.max_sidebar_ratio;
    self.ratio_step = config.ratio_step;
    self.sidebar_ratio = config.sidebar_ratio;
    self.double_click = Duration::from_millis(config.double_click_ms);
    self.notices.set_ttl(config.toast_ticks);
    self.tabs.set_settings(config.tab_settings());
  }

  /// Which layer receives keys. Popups win over the stored mode.
  pub fn input_mode(&self) -> InputMode {
    if self.notices.has_errors() {
      InputMode::Error
    } else if self.paste.conflict().is_some() {
      InputMode::Conflict
    } else {
      self.mode
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent, config: &Config) -> Result<()> {
    let mode = self.input_mode();
    let action = map_key(key, mode, config);
    if mode == InputMode::GPrefix {
      self.mode = InputMode::Normal;
    }
    self.update(action)
  }

  pub fn update(&mut self, action: Action) -> Result<()> {
    match action {
      Action::Quit => self.should_quit = true,
      Action::MoveUp => self.move_vertical(-1, false),
      Action::MoveDown => self.move_vertical(1, false),
      Action::ExtendUp => self.move_vertical(-1, true),
      Action::ExtendDown => self.move_vertical(1, true),
      Action::MoveLeft => {
        if self.sidebar.focused {
          if !self.sidebar.collapse() {
            self.go_up();
          }
        } else if self.is_list_view() {
          self.go_up();
        } else {
          self.step(-1, false);
        }
      }
      Action::MoveRight => {
        if self.sidebar.focused {
          self.expand_sidebar();
        } else if self.is_list_view() {
          self.open_focused();
        } else {
          self.step(1, false);
        }
      }
      Action::GoToTop => self.jump(0),
      Action::GoToBottom => self.jump(usize::MAX),
      Action::PageUp => self.page(-1),
      Action::PageDown => self.page(1),
      Action::Open => self.open_focused(),
      Action::HistoryBack => {
        if let Some(tab) = self.tabs.active_mut()
          && tab.back()
        {
          self.reload_active();
        }
      }
      Action::HistoryForward => {
        if let Some(tab) = self.tabs.active_mut()
          && tab.forward()
        {
          self.reload_active();
        }
      }
      Action::GoUp => self.go_up(),
      Action::GoHome => self.navigate(HOME_VIEW.to_string()),
      Action::Refresh => {
        self.sidebar.invalidate();
        self.reload_active();
      }
      Action::NewTab => self.open_tab(None),
      Action::CloseTab => {
        if let Some(id) = self.tabs.active_id() {
          self.close_tab(id);
        }
      }
      Action::DuplicateTab => {
        if let Some(id) = self.tabs.active_id().and_then(|id| self.tabs.duplicate_tab(id)) {
          self.load(id);
        }
      }
      Action::NextTab => {
        if self.tabs.activate_next().is_some() {
          self.after_activate();
        }
      }
      Action::PrevTab => {
        if self.tabs.activate_prev().is_some() {
          self.after_activate();
        }
      }
      Action::SelectAll => {
        let seq = self.active_sequence();
        if let Some(tab) = self.tabs.active_mut() {
          tab.selection.select_all(&seq);
        }
      }
      Action::ClearSelection => {
        if self.sidebar.focused {
          self.sidebar.focused = false;
        } else if let Some(tab) = self.tabs.active_mut() {
          tab.selection.clear();
        }
      }
      Action::Copy => self.copy_selection(false),
      Action::Cut => {
        if self.editable_dir().is_some() {
          self.copy_selection(true);
        }
      }
      Action::Paste => self.paste(),
      Action::NewFile => {
        if let Some(dir) = self.editable_dir() {
          self.begin_prompt(PromptPurpose::NewFile { dir }, String::new());
        }
      }
      Action::NewDirectory => {
        if let Some(dir) = self.editable_dir() {
          self.begin_prompt(PromptPurpose::NewDirectory { dir }, String::new());
        }
      }
      Action::Rename => self.begin_rename(),
      Action::Delete => {
        if self.editable_dir().is_some()
          && let Some(paths) = self.selection_or_notice()
        {
          self.begin_prompt(PromptPurpose::Delete { paths }, String::new());
        }
      }
      Action::MoveTo => {
        if let Some(dir) = self.editable_dir()
          && let Some(paths) = self.selection_or_notice()
        {
          self.begin_prompt(PromptPurpose::MoveTo { dir, paths }, String::new());
        }
      }
      Action::CycleSort => {
        self.layout.sort_key = self.layout.sort_key.next();
        self.layout_changed();
      }
      Action::ToggleSortDirection => {
        self.layout.ascending = !self.layout.ascending;
        self.layout_changed();
      }
      Action::ToggleHidden => {
        self.layout.show_hidden = !self.layout.show_hidden;
        self.layout_changed();
      }
      Action::ToggleExtensions => {
        self.layout.show_extensions = !self.layout.show_extensions;
        self.layout_changed();
      }
      Action::ToggleViewMode => {
        self.layout.view_mode = self.layout.view_mode.toggled();
        self.layout_changed();
      }
      Action::CycleIconSize => {
        self.layout.icon_size = self.layout.icon_size.next();
        self.layout_changed();
      }
      Action::FocusSidebar => {
        self.sidebar.focused = !self.sidebar.focused;
        if let Some(dir) = self.tabs.active().map(|t| t.working_dir().to_string()) {
          self.sidebar.reveal(&dir);
        }
      }
      Action::ShrinkSidebar => {
        self.sidebar_ratio = self.sidebar_ratio.saturating_sub(self.ratio_step).max(self.min_sidebar_ratio);
      }
      Action::GrowSidebar => {
        self.sidebar_ratio = (self.sidebar_ratio + self.ratio_step).min(self.max_sidebar_ratio);
      }
      Action::CommandStart => self.begin_prompt(PromptPurpose::Command, String::new()),
      Action::GPress => self.mode = InputMode::GPrefix,
      Action::PromptInput(c) => self.prompt_input.push(c),
      Action::PromptBackspace => {
        self.prompt_input.pop();
      }
      Action::PromptConfirm => {
        self.mode = InputMode::Normal;
        let input = std::mem::take(&mut self.prompt_input);
        let purpose = std::mem::take(&mut self.prompt);
        self.confirm_prompt(purpose, input.trim());
      }
      Action::PromptCancel => {
        self.mode = InputMode::Normal;
        self.prompt_input.clear();
        self.prompt = PromptPurpose::Command;
      }
      Action::ConflictNext => {
        if let Some(prompt) = self.paste.conflict_mut() {
          prompt.next();
        }
      }
      Action::ConflictPrev => {
        if let Some(prompt) = self.paste.conflict_mut() {
          prompt.prev();
        }
      }
      Action::ConflictToggleRepeat => {
        if let Some(prompt) = self.paste.conflict_mut() {
          prompt.toggle_repeat();
        }
      }
      Action::ConflictConfirm => {
        if let Some(call) = self.paste.resolve() {
          self.send(call, Pending::ResolveConflict);
        }
      }
      Action::ConflictEscape => {
        if let Some(call) = self.paste.dismiss() {
          self.send(call, Pending::ResolveConflict);
        }
      }
      Action::ErrorClose => self.notices.dismiss_errors(),
      Action::Resize(_, _) => {}
      Action::Tick => {
        self.tabs.tick(Instant::now());
        self.notices.tick();
      }
      Action::None => {}
    }
    Ok(())
  }

  // --- backend ---

  fn send(&mut self, call: Call, pending: Pending) -> Option<CallId> {
    let name = call.name();
    match self.backend.invoke(call) {
      Ok(id) => {
        trace!(event = "backend.call", call = name, id = id.0);
        self.pending.insert(id, pending);
        Some(id)
      }
      Err(e) => {
        warn!(event = "backend.call_failed", call = name, error = %e);
        if self.backend_alive {
          self.notices.error(format!("{name}: {e}"));
        }
        None
      }
    }
  }

  pub fn handle_backend(&mut self, message: BackendMessage) {
    match message {
      BackendMessage::Reply(reply) => self.handle_reply(reply),
      BackendMessage::Event(event) => self.handle_event(event),
    }
  }

  fn handle_reply(&mut self, reply: Reply) {
    let id = CallId(reply.reply);
    let Some(pending) = self.pending.remove(&id) else {
      trace!(event = "backend.unexpected_reply", id = id.0);
      return;
    };

    match pending {
      Pending::Stream { request_id, path } => {
        if let Some(err) = reply.err
          && let Some((_, tab::Applied::Changed)) = self.tabs.fail_stream(request_id, &err)
        {
          self.notices.error(format!("Cannot open {path}: {err}"));
        }
      }
      Pending::Tree => match reply.into_result::<FileNode>() {
        Ok(tree) => {
          self.sidebar.set_tree(id.0, tree);
        }
        Err(e) => warn!(event = "sidebar.tree_failed", error = %e),
      },
      Pending::Children => match reply.into_result::<Vec<FileItem>>() {
        Ok(items) => {
          self.sidebar.set_children(id.0, items);
        }
        Err(e) => warn!(event = "sidebar.children_failed", error = %e),
      },
      Pending::QuickAccess => match reply.into_result::<QuickAccess>() {
        Ok(entries) => self.sidebar.set_quick_access(entries),
        Err(e) => warn!(event = "sidebar.quick_access_failed", error = %e),
      },
      Pending::User => {
        match reply.into_result::<String>() {
          Ok(home) => {
            info!(event = "app.home_resolved", home = %home);
            self.tabs.set_default_path(home.clone());
            self.home = Some(home);
          }
          Err(e) => {
            self.notices.error(format!("Cannot resolve home directory: {e}"));
            if self.tabs.default_path().is_empty() {
              self.tabs.set_default_path("/");
            }
          }
        }
        if self.tabs.is_empty() {
          self.open_tab(None);
        }
      }
      Pending::FetchLayout => match reply.into_result::<LayoutCache>() {
        Ok(layout) => self.apply_layout(layout),
        Err(e) => warn!(event = "layout.fetch_failed", error = %e),
      },
      Pending::SaveLayout => {
        if let Some(err) = reply.err {
          warn!(event = "layout.save_failed", error = %err);
        }
      }
      Pending::PathCommand => match reply.into_result::<ResolveResult>() {
        Ok(ResolveResult { kind: ResolveKind::Path, value }) => self.navigate(value),
        Ok(ResolveResult { kind: ResolveKind::Action, value }) => self.notices.info(value),
        Err(e) => self.notices.error(e),
      },
      Pending::Open { path } => {
        if let Some(err) = reply.err {
          self.notices.error(format!("Cannot open {path}: {err}"));
        }
      }
      Pending::Copy { count, cut } => match (reply.err, cut) {
        (Some(err), false) => self.notices.error(format!("Copy failed: {err}")),
        (Some(err), true) => self.notices.error(format!("Cut failed: {err}")),
        (None, false) => self.notices.success(format!("Copied {count} item{}", plural(count))),
        (None, true) => self.notices.success(format!("Cut {count} item{}", plural(count))),
      },
      Pending::Paste { request_id } => {
        if let Some(err) = reply.err
          && self.paste.fail(request_id)
        {
          self.notices.error(format!("Paste failed: {err}"));
        }
      }
      Pending::ResolveConflict => {
        if let Some(err) = reply.err {
          warn!(event = "paste.resolve_failed", error = %err);
        }
      }
      Pending::FileAction { verb, dirs } => match reply.err {
        Some(err) => self.notices.error(format!("{verb} failed: {err}")),
        None => self.refresh_dirs(&dirs),
      },
    }
  }

  fn handle_event(&mut self, event: BackendEvent) {
    let event = match StreamEvent::from_backend(event) {
      Ok(stream) => {
        if let Some((id, applied)) = self.tabs.route_stream_event(stream) {
          trace!(event = "stream.applied", tab = id.0, ?applied);
        }
        return;
      }
      Err(other) => other,
    };

    let event = match PasteEvent::from_backend(event) {
      Ok(paste) => {
        self.handle_paste_event(paste);
        return;
      }
      Err(other) => other,
    };

    match event {
      BackendEvent::FileChange(change) => self.handle_file_change(change),
      BackendEvent::WindowFocus => debug!(event = "window.focus"),
      BackendEvent::WindowBlur => debug!(event = "window.blur"),
      other => trace!(event = "backend.unhandled_event", ?other),
    }
  }

  fn handle_paste_event(&mut self, event: PasteEvent) {
    match self.paste.apply(event) {
      PasteUpdate::Stale | PasteUpdate::Progress | PasteUpdate::Conflict => {}
      PasteUpdate::Completed(op) => {
        let failed = op.errors.len();
        if failed == 0 {
          self.notices.success(format!("Pasted {} item{}", op.done, plural(op.done as usize)));
        } else {
          self.notices.warning(format!("Pasted {}, {failed} failed", op.done));
        }
        for id in self.tabs.showing(&op.dest) {
          self.load(id);
        }
      }
    }
  }

  /// Reloads every tab showing a directory a changed path belongs to, or the
  /// changed path itself.
  fn handle_file_change(&mut self, change: FileChange) {
    debug!(event = "fs.changed", paths = change.paths.len());
    let mut dirs = Vec::new();
    for path in change.paths {
      dirs.extend(containing_dir(&path));
      dirs.push(path);
    }
    if let Some(home) = &self.home
      && dirs.iter().any(|d| same_dir(d, home))
    {
      dirs.push(HOME_VIEW.to_string());
    }
    self.refresh_dirs(&dirs);
  }

  fn refresh_dirs(&mut self, dirs: &[String]) {
    let mut ids: Vec<TabId> = Vec::new();
    for dir in dirs {
      for id in self.tabs.showing(dir) {
        if !ids.contains(&id) {
          ids.push(id);
        }
      }
    }
    self.sidebar.invalidate();
    for id in ids {
      self.load(id);
    }
    self.sync_sidebar();
  }

  /// The backend process is gone. Loading tabs fail; nothing is retried.
  pub fn backend_exited(&mut self) {
    if !self.backend_alive {
      return;
    }
    self.backend_alive = false;
    warn!(event = "backend.exited", pending = self.pending.len());
    for pending in std::mem::take(&mut self.pending).into_values() {
      if let Pending::Stream { request_id, .. } = pending {
        self.tabs.fail_stream(request_id, "backend exited");
      }
    }
    self.notices.error("The backend exited. Restart fexp to reconnect.");
  }

  // --- tabs and navigation ---

  fn open_tab(&mut self, path: Option<String>) {
    let id = self.tabs.add_tab(path);
    self.load(id);
  }

  fn close_tab(&mut self, id: TabId) {
    match self.tabs.remove_tab(id) {
      RemoveOutcome::Removed { .. } => self.after_activate(),
      RemoveOutcome::Empty => self.should_quit = true,
      RemoveOutcome::Missing => {}
    }
  }

  fn after_activate(&mut self) {
    let Some(tab) = self.tabs.active() else { return };
    let (id, stale) = (tab.id(), tab.session.options() != self.stream_options());
    if stale || tab.session.phase() == Phase::Idle {
      self.load(id);
    } else {
      self.sync_sidebar();
    }
  }

  pub fn stream_options(&self) -> StreamOptions {
    StreamOptions {
      sort_key: self.layout.sort_key,
      ascending: self.layout.ascending,
      show_hidden: self.layout.show_hidden,
    }
  }

  /// Starts a fresh listing of the tab's working directory.
  fn load(&mut self, id: TabId) {
    let options = self.stream_options();
    let Some(call) = self.tabs.start_stream(id, options, Instant::now()) else { return };
    let Some(tab) = self.tabs.get(id) else { return };
    let path = tab.session.path().to_string();
    let request_id = tab.session.request_id().unwrap_or_default();
    if self.send(call, Pending::Stream { request_id, path }).is_none() {
      self.tabs.fail_stream(request_id, "backend unavailable");
    }
    if self.tabs.active_id() == Some(id) {
      self.last_click = None;
      self.sync_sidebar();
    }
  }

  fn reload_active(&mut self) {
    if let Some(id) = self.tabs.active_id() {
      self.load(id);
    }
  }

  fn sync_sidebar(&mut self) {
    let Some(dir) = self.tabs.active().map(|t| t.working_dir().to_string()) else { return };
    if let Some(call) = self.sidebar.request_tree(&dir) {
      if let Some(id) = self.send(call, Pending::Tree) {
        self.sidebar.set_tree_call(id.0);
      }
    } else {
      self.sidebar.reveal(&dir);
    }
  }

  pub fn navigate(&mut self, path: String) {
    let Some(tab) = self.tabs.active_mut() else { return };
    tab.navigate(path);
    self.reload_active();
  }

  fn go_up(&mut self) {
    if let Some(tab) = self.tabs.active_mut()
      && tab.up()
    {
      self.reload_active();
    }
  }

  fn open_entry(&mut self, path: String, is_dir: bool) {
    if is_dir {
      self.navigate(path);
    } else {
      self.send(Call::OpenFromPath { path: path.clone() }, Pending::Open { path });
    }
  }

  /// Lists the sidebar row's children, or opens it when there is nothing to
  /// expand.
  fn expand_sidebar(&mut self) {
    let Some(call) = self.sidebar.expand() else {
      self.open_focused();
      return;
    };
    let Some(path) = self.sidebar.selected().map(|r| r.path.clone()) else { return };
    if let Some(id) = self.send(call, Pending::Children) {
      self.sidebar.set_children_call(id.0, path);
    }
  }

  fn open_focused(&mut self) {
    if self.sidebar.focused {
      if let Some(path) = self.sidebar.selected().map(|r| r.path.clone()) {
        self.navigate(path);
      }
      return;
    }
    let Some(tab) = self.tabs.active() else { return };
    let Some(index) = tab.selection.focus() else { return };
    let sorted = tab.sorted(self.layout.sort_key, self.layout.ascending);
    let Some(entry) = sorted.get(index) else { return };
    let (path, is_dir) = (entry.path.clone(), entry.is_dir);
    self.open_entry(path, is_dir);
  }

  // --- selection ---

  /// Entries of the active tab in display order.
  pub fn display_entries(&self) -> Vec<&FileEntry> {
    self
      .tabs
      .active()
      .map(|t| t.sorted(self.layout.sort_key, self.layout.ascending))
      .unwrap_or_default()
  }

  fn active_sequence(&self) -> Vec<String> {
    self
      .tabs
      .active()
      .map(|t| t.sequence(self.layout.sort_key, self.layout.ascending))
      .unwrap_or_default()
  }

  fn is_list_view(&self) -> bool {
    self.layout.view_mode == crate::layout::ViewMode::List
  }

  fn move_vertical(&mut self, direction: isize, extend: bool) {
    if self.sidebar.focused {
      self.sidebar.move_cursor(direction);
      self.sidebar.adjust_scroll(self.view.rows);
      return;
    }
    let columns = self.view.columns.max(1) as isize;
    self.step(direction * columns, extend);
  }

  fn page(&mut self, direction: isize) {
    if self.sidebar.focused {
      self.sidebar.move_cursor(direction * self.view.rows.max(1) as isize);
      self.sidebar.adjust_scroll(self.view.rows);
      return;
    }
    let stride = (self.view.columns.max(1) * self.view.rows.max(1)) as isize;
    self.step(direction * stride, false);
  }

  fn step(&mut self, delta: isize, extend: bool) {
    let seq = self.active_sequence();
    if let Some(tab) = self.tabs.active_mut() {
      tab.selection.step(delta, extend, &seq);
    }
    self.ensure_focus_visible();
  }

  fn jump(&mut self, index: usize) {
    if self.sidebar.focused {
      self.sidebar.cursor = index.min(self.sidebar.rows().len().saturating_sub(1));
      self.sidebar.adjust_scroll(self.view.rows);
      return;
    }
    let seq = self.active_sequence();
    if let Some(tab) = self.tabs.active_mut() {
      tab.selection.jump(index, false, &seq);
    }
    self.ensure_focus_visible();
  }

  fn ensure_focus_visible(&mut self) {
    let columns = self.view.columns.max(1);
    let rows = self.view.rows.max(1);
    let Some(tab) = self.tabs.active_mut() else { return };
    let Some(focus) = tab.selection.focus() else { return };
    let row = focus / columns;
    if row < tab.scroll {
      tab.scroll = row;
    } else if row >= tab.scroll + rows {
      tab.scroll = row + 1 - rows;
    }
  }

  fn scroll_files(&mut self, delta: isize) {
    let total = self.display_entries().len();
    let columns = self.view.columns.max(1);
    let max = total.div_ceil(columns).saturating_sub(self.view.rows);
    if let Some(tab) = self.tabs.active_mut() {
      tab.scroll = tab.scroll.saturating_add_signed(delta).min(max);
    }
  }

  // --- clipboard ---

  fn selected_paths(&self) -> Vec<String> {
    let seq = self.active_sequence();
    self.tabs.active().map(|t| t.selection.selected_in_order(&seq)).unwrap_or_default()
  }

  fn selection_or_notice(&mut self) -> Option<Vec<String>> {
    let paths = self.selected_paths();
    if paths.is_empty() {
      self.notices.info("Nothing selected");
      return None;
    }
    Some(paths)
  }

  fn copy_selection(&mut self, cut: bool) {
    let paths = self.selected_paths();
    let count = paths.len();
    let call = if cut { clipboard::cut_call(paths) } else { clipboard::copy_call(paths) };
    match call {
      Some(call) => {
        self.send(call, Pending::Copy { count, cut });
      }
      None => self.notices.info("Nothing selected"),
    }
  }

  fn paste(&mut self) {
    let Some(dest) = self.editable_dir() else { return };
    let call = self.paste.start(dest);
    let Call::PasteItemsFromClipboard { request_id, .. } = &call else { return };
    let request_id = *request_id;
    if self.send(call, Pending::Paste { request_id }).is_none() {
      self.paste.fail(request_id);
    }
  }

  // --- file actions ---

  /// Working directory of the active tab, when its contents can be changed.
  /// The home view lists shortcuts, not a real directory.
  fn editable_dir(&mut self) -> Option<String> {
    let dir = self.tabs.active()?.working_dir().to_string();
    if is_home_view(&dir) {
      self.notices.info("The home view cannot be changed");
      return None;
    }
    Some(dir)
  }

  fn begin_prompt(&mut self, purpose: PromptPurpose, input: String) {
    self.prompt = purpose;
    self.prompt_input = input;
    self.mode = InputMode::Prompt;
  }

  fn begin_rename(&mut self) {
    if self.editable_dir().is_none() {
      return;
    }
    let paths = self.selected_paths();
    let [path] = paths.as_slice() else {
      self.notices.info("Select one item to rename");
      return;
    };
    let name = file_name(path).to_string();
    self.begin_prompt(PromptPurpose::Rename { path: path.clone() }, name);
  }

  fn confirm_prompt(&mut self, purpose: PromptPurpose, input: &str) {
    match purpose {
      PromptPurpose::Command => {
        if !input.is_empty() {
          self.send(Call::ResolvePathCommand { command: input.to_string() }, Pending::PathCommand);
        }
      }
      PromptPurpose::NewFile { dir } => {
        if let Some(name) = self.valid_name(input) {
          let call = Call::CreateNewFile { path: join_path(&dir, name) };
          self.file_action(call, "Create file", vec![dir]);
        }
      }
      PromptPurpose::NewDirectory { dir } => {
        if let Some(name) = self.valid_name(input) {
          let call = Call::CreateNewDirectory { path: join_path(&dir, name) };
          self.file_action(call, "Create folder", vec![dir]);
        }
      }
      PromptPurpose::Rename { path } => {
        if let Some(name) = self.valid_name(input)
          && name != file_name(&path)
        {
          let dirs = containing_dir(&path).into_iter().collect();
          self.file_action(Call::RenameItem { path, new_name: name.to_string() }, "Rename", dirs);
        }
      }
      PromptPurpose::Delete { paths } => {
        if !matches!(input.to_lowercase().as_str(), "y" | "yes") {
          return;
        }
        for path in paths {
          let dirs = containing_dir(&path).into_iter().collect();
          self.file_action(Call::DeleteItem { path }, "Delete", dirs);
        }
      }
      PromptPurpose::MoveTo { dir, paths } => {
        if input.is_empty() {
          return;
        }
        let dest_dir = if is_absolute(input) { input.to_string() } else { join_path(&dir, input) };
        for src in paths {
          let dest = join_path(&dest_dir, file_name(&src));
          let mut dirs: Vec<String> = containing_dir(&src).into_iter().collect();
          dirs.push(dest_dir.clone());
          self.file_action(Call::MoveItem { src, dest }, "Move", dirs);
        }
      }
    }
  }

  /// A single path segment, or `None` after telling the user why not.
  fn valid_name<'a>(&mut self, input: &'a str) -> Option<&'a str> {
    if input.is_empty() || input == "." || input == ".." || input.contains(is_separator) {
      if !input.is_empty() {
        self.notices.warning(format!("Invalid name: {input}"));
      }
      return None;
    }
    Some(input)
  }

  fn file_action(&mut self, call: Call, verb: &'static str, dirs: Vec<String>) {
    info!(event = "file.action", call = call.name(), dirs = ?dirs);
    self.send(call, Pending::FileAction { verb, dirs });
  }

  // --- layout ---

  fn apply_layout(&mut self, layout: LayoutCache) {
    debug!(event = "layout.applied", ?layout);
    self.layout = layout;
    if let Some(tab) = self.tabs.active()
      && tab.session.options() != self.stream_options()
    {
      self.reload_active();
    }
  }

  fn layout_changed(&mut self) {
    if let Some(tab) = self.tabs.active()
      && tab.session.options() != self.stream_options()
    {
      self.reload_active();
    }
    self.send(Call::UpdateLayoutSettings { new_settings: self.layout.clone() }, Pending::SaveLayout);
  }

  // --- pointer ---

  pub fn handle_mouse(&mut self, mouse: MouseEvent) {
    if !matches!(self.input_mode(), InputMode::Normal | InputMode::GPrefix) {
      return;
    }
    let (column, row) = (mouse.column, mouse.row);
    let point = cell_point(column, row);
    let modifiers = Modifiers {
      ctrl: mouse.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER),
      shift: mouse.modifiers.contains(KeyModifiers::SHIFT),
    };

    match mouse.kind {
      MouseEventKind::Down(MouseButton::Left) => self.pointer_down(column, row, point, modifiers),
      MouseEventKind::Down(MouseButton::Middle) => {
        if let Some(id) = self.tab_at(column, row) {
          self.close_tab(id);
        }
      }
      MouseEventKind::Drag(MouseButton::Left) => {
        if self.pointer_in_files
          && let Some(tab) = self.tabs.active_mut()
        {
          tab.selection.pointer_move(point, &self.hits.items);
        }
      }
      MouseEventKind::Up(MouseButton::Left) => self.pointer_up(point, modifiers),
      MouseEventKind::ScrollDown => self.scroll_at(column, row, 1),
      MouseEventKind::ScrollUp => self.scroll_at(column, row, -1),
      _ => {}
    }
  }

  fn tab_at(&self, column: u16, row: u16) -> Option<TabId> {
    self.hits.tabs.iter().find(|(area, _)| cell_in(*area, column, row)).map(|(_, id)| *id)
  }

  fn item_at(&self, point: Point) -> Option<usize> {
    self.hits.items.iter().find(|item| item.rect.contains(point)).map(|item| item.index)
  }

  fn pointer_down(&mut self, column: u16, row: u16, point: Point, modifiers: Modifiers) {
    if let Some(id) = self.tab_at(column, row) {
      if self.tabs.activate(id) {
        self.after_activate();
      }
      return;
    }
    if let Some(path) =
      self.hits.breadcrumb.iter().find(|(area, _)| cell_in(*area, column, row)).map(|(_, p)| p.clone())
    {
      self.navigate(path);
      return;
    }
    if let Some(index) =
      self.hits.sidebar.iter().find(|(area, _)| cell_in(*area, column, row)).map(|(_, i)| *i)
    {
      self.sidebar.cursor = index;
      if let Some(path) = self.sidebar.selected().map(|r| r.path.clone()) {
        self.navigate(path);
      }
      return;
    }
    if cell_in(self.hits.files, column, row) {
      self.sidebar.focused = false;
      self.pointer_in_files = true;
      let hit = self.item_at(point);
      if let Some(tab) = self.tabs.active_mut() {
        tab.selection.pointer_down(point, modifiers, hit);
      }
    }
  }

  fn pointer_up(&mut self, point: Point, modifiers: Modifiers) {
    if !std::mem::take(&mut self.pointer_in_files) {
      return;
    }
    let hit = self.item_at(point);
    let seq = self.active_sequence();
    let Some(tab) = self.tabs.active_mut() else { return };
    let end = tab.selection.pointer_up();
    if end == GestureEnd::None {
      return;
    }
    tab.selection.click(hit, modifiers, &seq);

    if end == GestureEnd::Drag || modifiers != Modifiers::NONE {
      self.last_click = None;
      return;
    }
    let Some(path) = hit.and_then(|i| seq.get(i)).cloned() else {
      self.last_click = None;
      return;
    };
    let now = Instant::now();
    let double = self
      .last_click
      .as_ref()
      .is_some_and(|(at, last)| *last == path && now.duration_since(*at) <= self.double_click);
    if double {
      self.last_click = None;
      let is_dir = self.tabs.active().and_then(|t| t.session.get(&path)).is_some_and(|e| e.is_dir);
      self.open_entry(path, is_dir);
    } else {
      self.last_click = Some((now, path));
    }
  }

  fn scroll_at(&mut self, column: u16, row: u16, delta: isize) {
    if cell_in(self.hits.files, column, row) {
      self.scroll_files(delta);
    } else if self.hits.sidebar.iter().any(|(area, _)| area.x <= column && column < area.x + area.width) {
      let max = self.sidebar.rows().len().saturating_sub(self.hits.sidebar.len());
      self.sidebar.scroll = self.sidebar.scroll.saturating_add_signed(delta).min(max);
    }
  }
}

fn is_absolute(path: &str) -> bool {
  path.starts_with(is_separator) || segments(path).first().is_some_and(|s| is_drive(s))
}

fn plural(n: usize) -> &'static str {
  if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::RecordingBackend;
  use crate::backend::protocol::{
    ConflictStrategy, FileThumbnail, PasteComplete, PasteConflict, ResolveCopyPayload, StreamMarker,
  };
  use crate::layout::SortKey;
  use crate::tab::entry::meta;
  use crossterm::event::{KeyCode, KeyEventKind, KeyEventState};
  use serde_json::{Value, json};

  fn app_at(path: &str) -> (App, RecordingBackend) {
    let backend = RecordingBackend::new();
    let app = App::new(&Config::default(), Box::new(backend.clone()), Some(path.to_string()));
    (app, backend)
  }

  fn ok(app: &mut App, id: CallId, value: Value) {
    app.handle_backend(BackendMessage::Reply(Reply { reply: id.0, ok: Some(value), err: None }));
  }

  fn err(app: &mut App, id: CallId, message: &str) {
    app.handle_backend(BackendMessage::Reply(Reply { reply: id.0, ok: None, err: Some(message.into()) }));
  }

  fn event(app: &mut App, event: BackendEvent) {
    app.handle_backend(BackendMessage::Event(event));
  }

  fn stream_request_ids(backend: &RecordingBackend) -> Vec<u64> {
    backend
      .calls_named("stream_directory_contents")
      .into_iter()
      .filter_map(|c| match c {
        Call::StreamDirectoryContents { request_id, .. } => Some(request_id),
        _ => None,
      })
      .collect()
  }

  fn live_request(app: &App) -> u64 {
    app.tabs.active().and_then(|t| t.session.request_id()).unwrap()
  }

  /// Streams `names` into the active tab as files under its working dir.
  fn fill(app: &mut App, names: &[&str]) {
    let rid = live_request(app);
    let dir = app.tabs.active().unwrap().working_dir().to_string();
    for name in names {
      event(app, BackendEvent::FileMetadata(meta(rid, &format!("{dir}/{name}"))));
    }
  }

  /// One list row per entry, starting at terminal row 2.
  fn lay_out_rows(app: &mut App) {
    app.hits.files = Rect::new(0, 2, 40, 20);
    app.hits.items = app
      .display_entries()
      .iter()
      .enumerate()
      .map(|(i, e)| ItemBounds {
        index: i,
        path: e.path.clone(),
        rect: cell_bounds(Rect::new(0, 2 + i as u16, 40, 1)),
      })
      .collect();
  }

  fn mouse(kind: MouseEventKind, column: u16, row: u16, modifiers: KeyModifiers) -> MouseEvent {
    MouseEvent { kind, column, row, modifiers }
  }

  fn click(app: &mut App, column: u16, row: u16, modifiers: KeyModifiers) {
    app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row, modifiers));
    app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), column, row, modifiers));
  }

  fn selected(app: &App) -> Vec<String> {
    let seq = app.active_sequence();
    app.tabs.active().unwrap().selection.selected_in_order(&seq)
  }

  #[test]
  fn test_startup_calls() {
    let (app, backend) = app_at("/data");
    let names: Vec<&str> = backend.calls().iter().map(|(_, c)| c.name()).collect();
    assert_eq!(
      names,
      vec![
        "fetch_layout_settings",
        "resolve_quick_access",
        "resolve_user",
        "stream_directory_contents",
        "get_tree_from_root",
      ]
    );
    assert_eq!(app.tabs.iter().count(), 1);
    assert_eq!(app.tabs.active().unwrap().session.phase(), Phase::Scanning);
  }

  #[test]
  fn test_without_start_path_waits_for_home() {
    let backend = RecordingBackend::new();
    let mut app = App::new(&Config::default(), Box::new(backend.clone()), None);
    assert!(app.tabs.is_empty());
    let user = backend.last_id_of("resolve_user").unwrap();
    ok(&mut app, user, json!("/home/me"));
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/home/me");
    assert_eq!(app.home.as_deref(), Some("/home/me"));
    assert_eq!(stream_request_ids(&backend), vec![1]);
  }

  #[test]
  fn test_home_failure_falls_back_to_root() {
    let backend = RecordingBackend::new();
    let mut app = App::new(&Config::default(), Box::new(backend.clone()), None);
    let user = backend.last_id_of("resolve_user").unwrap();
    err(&mut app, user, "no home");
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/");
    assert_eq!(app.input_mode(), InputMode::Error);
  }

  #[test]
  fn test_navigation_supersedes_stream() {
    let (mut app, backend) = app_at("/a");
    let first = live_request(&app);
    app.navigate("/a/b".to_string());
    let second = live_request(&app);
    assert_ne!(first, second);

    event(&mut app, BackendEvent::FileMetadata(meta(first, "/a/old.txt")));
    event(&mut app, BackendEvent::FileMetadata(meta(second, "/a/b/new.txt")));
    let paths: Vec<String> = app.display_entries().iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec!["/a/b/new.txt".to_string()]);
    assert_eq!(stream_request_ids(&backend), vec![first, second]);
    assert_eq!(backend.calls_named("get_tree_from_root").len(), 2);
  }

  #[test]
  fn test_history_actions_restart_stream() {
    let (mut app, backend) = app_at("/a/b");
    app.update(Action::GoUp).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/a");
    app.update(Action::HistoryBack).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/a/b");
    app.update(Action::HistoryForward).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/a");
    app.update(Action::HistoryForward).unwrap();
    assert_eq!(stream_request_ids(&backend).len(), 4);
  }

  #[test]
  fn test_stream_rejection_sets_error() {
    let (mut app, backend) = app_at("/locked");
    let id = backend.last_id_of("stream_directory_contents").unwrap();
    err(&mut app, id, "permission denied");
    let tab = app.tabs.active().unwrap();
    assert_eq!(tab.session.phase(), Phase::Error);
    assert_eq!(app.input_mode(), InputMode::Error);
    app.update(Action::ErrorClose).unwrap();
    assert_eq!(app.input_mode(), InputMode::Normal);
  }

  #[test]
  fn test_stale_rejection_ignored() {
    let (mut app, backend) = app_at("/a");
    let old = backend.last_id_of("stream_directory_contents").unwrap();
    app.navigate("/b".to_string());
    err(&mut app, old, "gone");
    assert_eq!(app.tabs.active().unwrap().session.phase(), Phase::Scanning);
    assert!(!app.notices.has_errors());
  }

  #[test]
  fn test_full_stream_through_app() {
    let (mut app, _backend) = app_at("/d");
    let rid = live_request(&app);
    fill(&mut app, &["a.png", "b.txt"]);
    event(&mut app, BackendEvent::MetadataComplete(StreamMarker { request_id: rid, path: "/d".into() }));
    assert_eq!(app.tabs.active().unwrap().session.phase(), Phase::Streaming);
    event(
      &mut app,
      BackendEvent::FileThumbnail(FileThumbnail { request_id: rid, path: "/d/a.png".into(), thumbnail: Some("x".into()) }),
    );
    event(&mut app, BackendEvent::StreamComplete(StreamMarker { request_id: rid, path: "/d".into() }));
    let tab = app.tabs.active().unwrap();
    assert_eq!(tab.session.phase(), Phase::Complete);
    assert_eq!(tab.session.progress(), 100);
  }

  #[test]
  fn test_keyboard_selection_and_copy() {
    let (mut app, backend) = app_at("/d");
    app.layout.view_mode = crate::layout::ViewMode::List;
    fill(&mut app, &["c", "a", "b"]);
    app.update(Action::MoveDown).unwrap();
    app.update(Action::ExtendDown).unwrap();
    app.update(Action::ExtendDown).unwrap();
    assert_eq!(selected(&app), vec!["/d/a", "/d/b", "/d/c"]);

    app.update(Action::Copy).unwrap();
    assert_eq!(
      backend.calls_named("copy_items_to_clipboard"),
      vec![Call::CopyItemsToClipboard { paths: vec!["/d/a".into(), "/d/b".into(), "/d/c".into()] }]
    );
    let id = backend.last_id_of("copy_items_to_clipboard").unwrap();
    ok(&mut app, id, Value::Null);
    assert_eq!(app.notices.toasts().last().map(|t| t.message.as_str()), Some("Copied 3 items"));
  }

  #[test]
  fn test_copy_nothing_selected() {
    let (mut app, backend) = app_at("/d");
    app.update(Action::Copy).unwrap();
    assert!(backend.calls_named("copy_items_to_clipboard").is_empty());
  }

  #[test]
  fn test_open_directory_navigates_and_file_opens() {
    let (mut app, backend) = app_at("/d");
    let rid = live_request(&app);
    let mut dir = meta(rid, "/d/sub");
    dir.is_dir = true;
    event(&mut app, BackendEvent::FileMetadata(dir));
    fill(&mut app, &["z.txt"]);

    app.update(Action::GoToBottom).unwrap();
    app.update(Action::Open).unwrap();
    assert_eq!(backend.calls_named("open_from_path"), vec![Call::OpenFromPath { path: "/d/z.txt".into() }]);

    app.update(Action::GoToTop).unwrap();
    app.update(Action::Open).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/d/sub");
    assert!(app.tabs.active().unwrap().selection.is_empty());
  }

  #[test]
  fn test_open_failure_shows_error() {
    let (mut app, backend) = app_at("/d");
    fill(&mut app, &["x.bin"]);
    app.update(Action::MoveDown).unwrap();
    app.update(Action::Open).unwrap();
    let id = backend.last_id_of("open_from_path").unwrap();
    err(&mut app, id, "no handler");
    assert_eq!(app.notices.errors(), &["Cannot open /d/x.bin: no handler".to_string()]);
  }

  #[test]
  fn test_paste_conflict_flow() {
    let (mut app, backend) = app_at("/dst");
    app.update(Action::Paste).unwrap();
    let Some(Call::PasteItemsFromClipboard { dest, request_id }) = backend.calls_named("paste_items_from_clipboard").pop() else {
      panic!("paste not sent");
    };
    assert_eq!(dest, "/dst");

    event(
      &mut app,
      BackendEvent::PasteConflict(PasteConflict { request_id, src: "/src/a".into(), dest: "/dst/a".into() }),
    );
    assert_eq!(app.input_mode(), InputMode::Conflict);
    app.update(Action::ConflictNext).unwrap();
    app.update(Action::ConflictNext).unwrap();
    app.update(Action::ConflictConfirm).unwrap();
    assert_eq!(
      backend.calls_named("resolve_copy_conflict"),
      vec![Call::ResolveCopyConflict {
        payload: ResolveCopyPayload { request_id, strategy: ConflictStrategy::Index, repeat_for_all: false }
      }]
    );
    assert_eq!(app.input_mode(), InputMode::Normal);

    let streams_before = stream_request_ids(&backend).len();
    event(&mut app, BackendEvent::PasteComplete(PasteComplete { request_id, dest: "/dst".into() }));
    assert_eq!(stream_request_ids(&backend).len(), streams_before + 1);
  }

  #[test]
  fn test_conflict_escape_skips_one() {
    let (mut app, backend) = app_at("/dst");
    app.update(Action::Paste).unwrap();
    let rid = match backend.calls_named("paste_items_from_clipboard").pop() {
      Some(Call::PasteItemsFromClipboard { request_id, .. }) => request_id,
      _ => panic!("paste not sent"),
    };
    event(&mut app, BackendEvent::PasteConflict(PasteConflict { request_id: rid, src: "/s/a".into(), dest: "/dst/a".into() }));
    app.update(Action::ConflictToggleRepeat).unwrap();
    app.update(Action::ConflictEscape).unwrap();
    assert_eq!(
      backend.calls_named("resolve_copy_conflict"),
      vec![Call::ResolveCopyConflict {
        payload: ResolveCopyPayload { request_id: rid, strategy: ConflictStrategy::Ignore, repeat_for_all: false }
      }]
    );
  }

  #[test]
  fn test_paste_refreshes_only_matching_tabs() {
    let (mut app, backend) = app_at("/dst");
    app.open_tab(Some("/elsewhere".into()));
    app.update(Action::PrevTab).unwrap();
    app.update(Action::Paste).unwrap();
    let rid = match backend.calls_named("paste_items_from_clipboard").pop() {
      Some(Call::PasteItemsFromClipboard { request_id, .. }) => request_id,
      _ => panic!("paste not sent"),
    };
    let before = backend.calls_named("stream_directory_contents");
    event(&mut app, BackendEvent::PasteComplete(PasteComplete { request_id: rid, dest: "/dst/".into() }));
    let after = backend.calls_named("stream_directory_contents");
    assert_eq!(after.len(), before.len() + 1);
    assert!(matches!(after.last(), Some(Call::StreamDirectoryContents { path, .. }) if path == "/dst"));
  }

  #[test]
  fn test_layout_reply_restarts_when_stream_options_change() {
    let (mut app, backend) = app_at("/d");
    let id = backend.last_id_of("fetch_layout_settings").unwrap();
    ok(&mut app, id, json!({"view_mode": "list"}));
    assert_eq!(stream_request_ids(&backend).len(), 1);

    let (mut app, backend) = app_at("/d");
    let id = backend.last_id_of("fetch_layout_settings").unwrap();
    ok(&mut app, id, json!({"sort_key": "size", "ascending": false}));
    assert_eq!(app.layout.sort_key, SortKey::Size);
    assert_eq!(stream_request_ids(&backend).len(), 2);
  }

  #[test]
  fn test_cycle_sort_persists_and_restarts() {
    let (mut app, backend) = app_at("/d");
    app.update(Action::CycleSort).unwrap();
    assert_eq!(stream_request_ids(&backend).len(), 2);
    let saved = backend.calls_named("update_layout_settings");
    assert!(matches!(&saved[..], [Call::UpdateLayoutSettings { new_settings }] if new_settings.sort_key == SortKey::Size));

    app.update(Action::ToggleViewMode).unwrap();
    assert_eq!(stream_request_ids(&backend).len(), 2);
    assert_eq!(backend.calls_named("update_layout_settings").len(), 2);
  }

  #[test]
  fn test_path_command() {
    let (mut app, backend) = app_at("/d");
    app.update(Action::CommandStart).unwrap();
    assert_eq!(app.input_mode(), InputMode::Prompt);
    for c in "/tmp".chars() {
      app.update(Action::PromptInput(c)).unwrap();
    }
    app.update(Action::PromptConfirm).unwrap();
    assert_eq!(backend.calls_named("resolve_path_command"), vec![Call::ResolvePathCommand { command: "/tmp".into() }]);
    let id = backend.last_id_of("resolve_path_command").unwrap();
    ok(&mut app, id, json!({"kind": "path", "value": "/tmp"}));
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/tmp");

    app.update(Action::CommandStart).unwrap();
    app.update(Action::PromptInput('x')).unwrap();
    app.update(Action::PromptConfirm).unwrap();
    let id = backend.last_id_of("resolve_path_command").unwrap();
    ok(&mut app, id, json!({"kind": "action", "value": "Opened terminal"}));
    assert_eq!(app.notices.toasts().last().map(|t| t.message.as_str()), Some("Opened terminal"));

    app.update(Action::CommandStart).unwrap();
    app.update(Action::PromptInput('?')).unwrap();
    app.update(Action::PromptConfirm).unwrap();
    let id = backend.last_id_of("resolve_path_command").unwrap();
    err(&mut app, id, "unknown command");
    assert!(app.notices.has_errors());
  }

  #[test]
  fn test_path_command_home() {
    let (mut app, backend) = app_at("/d");
    let user = backend.last_id_of("resolve_user").unwrap();
    ok(&mut app, user, json!("/home/me"));
    app.update(Action::CommandStart).unwrap();
    app.update(Action::PromptInput('h')).unwrap();
    app.update(Action::PromptConfirm).unwrap();
    let id = backend.last_id_of("resolve_path_command").unwrap();
    ok(&mut app, id, json!({"kind": "path", "value": "Home"}));
    assert_eq!(app.tabs.active().unwrap().working_dir(), HOME_VIEW);
    assert!(matches!(
      stream_request_ids_with_paths(&backend).last(),
      Some((_, path)) if path == HOME_VIEW
    ));
  }

  fn stream_request_ids_with_paths(backend: &RecordingBackend) -> Vec<(u64, String)> {
    backend
      .calls_named("stream_directory_contents")
      .into_iter()
      .filter_map(|c| match c {
        Call::StreamDirectoryContents { request_id, path, .. } => Some((request_id, path)),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn test_go_home_opens_home_view_without_tree() {
    let (mut app, backend) = app_at("/d");
    let trees = backend.calls_named("get_tree_from_root").len();
    app.update(Action::GoHome).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), HOME_VIEW);
    assert_eq!(backend.calls_named("get_tree_from_root").len(), trees);
    assert!(!app.tabs.active_mut().unwrap().up());

    app.update(Action::Paste).unwrap();
    app.update(Action::NewFile).unwrap();
    assert!(backend.calls_named("paste_items_from_clipboard").is_empty());
    assert_eq!(app.input_mode(), InputMode::Normal);
    assert_eq!(app.notices.toasts().last().map(|t| t.message.as_str()), Some("The home view cannot be changed"));
  }

  #[test]
  fn test_home_view_lists_pinned_first() {
    let (mut app, _backend) = app_at("/d");
    app.update(Action::GoHome).unwrap();
    let rid = live_request(&app);
    let mut desktop = meta(rid, "/home/me/Desktop");
    desktop.is_dir = true;
    event(&mut app, BackendEvent::FileMetadata(desktop));
    let mut notes = meta(rid, "/home/me/notes.txt");
    notes.pinned = true;
    event(&mut app, BackendEvent::FileMetadata(notes));
    let paths: Vec<&str> = app.display_entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/home/me/notes.txt", "/home/me/Desktop"]);
  }

  #[test]
  fn test_tabs_lifecycle() {
    let (mut app, backend) = app_at("/d");
    let user = backend.last_id_of("resolve_user").unwrap();
    ok(&mut app, user, json!("/home/me"));

    app.update(Action::NewTab).unwrap();
    assert_eq!(app.tabs.iter().count(), 2);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/home/me");

    app.update(Action::DuplicateTab).unwrap();
    assert_eq!(app.tabs.iter().count(), 3);

    app.update(Action::CloseTab).unwrap();
    app.update(Action::CloseTab).unwrap();
    assert!(!app.should_quit);
    app.update(Action::CloseTab).unwrap();
    assert!(app.should_quit);
    let ids = stream_request_ids(&backend);
    let mut unique = ids.clone();
    unique.dedup();
    assert_eq!(ids, unique);
  }

  #[test]
  fn test_mouse_click_ctrl_and_shift() {
    let (mut app, _backend) = app_at("/d");
    app.layout.view_mode = crate::layout::ViewMode::List;
    fill(&mut app, &["0", "1", "2", "3", "4", "5", "6", "7", "8"]);
    lay_out_rows(&mut app);

    click(&mut app, 5, 2 + 3, KeyModifiers::NONE);
    click(&mut app, 5, 2 + 7, KeyModifiers::SHIFT);
    assert_eq!(selected(&app), vec!["/d/3", "/d/4", "/d/5", "/d/6", "/d/7"]);

    click(&mut app, 5, 2 + 5, KeyModifiers::CONTROL);
    assert_eq!(selected(&app), vec!["/d/3", "/d/4", "/d/6", "/d/7"]);
  }

  #[test]
  fn test_mouse_drag_selects_and_swallows_click() {
    let (mut app, _backend) = app_at("/d");
    fill(&mut app, &["0", "1", "2", "3", "4"]);
    lay_out_rows(&mut app);

    app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 5, 3, KeyModifiers::NONE));
    app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 6, 5, KeyModifiers::NONE));
    app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 6, 5, KeyModifiers::NONE));
    assert_eq!(selected(&app), vec!["/d/1", "/d/2", "/d/3"]);
  }

  #[test]
  fn test_click_on_background_clears() {
    let (mut app, _backend) = app_at("/d");
    fill(&mut app, &["0", "1"]);
    lay_out_rows(&mut app);
    click(&mut app, 5, 2, KeyModifiers::NONE);
    assert_eq!(selected(&app).len(), 1);
    click(&mut app, 5, 15, KeyModifiers::NONE);
    assert!(selected(&app).is_empty());
  }

  #[test]
  fn test_double_click_opens_directory() {
    let (mut app, _backend) = app_at("/d");
    let rid = live_request(&app);
    let mut dir = meta(rid, "/d/sub");
    dir.is_dir = true;
    event(&mut app, BackendEvent::FileMetadata(dir));
    lay_out_rows(&mut app);
    click(&mut app, 5, 2, KeyModifiers::NONE);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/d");
    click(&mut app, 5, 2, KeyModifiers::NONE);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/d/sub");
  }

  #[test]
  fn test_breadcrumb_and_tab_clicks() {
    let (mut app, _backend) = app_at("/a/b");
    app.open_tab(Some("/c".into()));
    let first = app.tabs.iter().next().unwrap().id();
    app.hits.tabs = vec![(Rect::new(0, 0, 10, 1), first)];
    app.hits.breadcrumb = vec![(Rect::new(0, 1, 3, 1), "/".to_string())];

    click(&mut app, 2, 0, KeyModifiers::NONE);
    assert_eq!(app.tabs.active_id(), Some(first));
    click(&mut app, 1, 1, KeyModifiers::NONE);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/");
  }

  #[test]
  fn test_popup_blocks_mouse() {
    let (mut app, _backend) = app_at("/d");
    fill(&mut app, &["0"]);
    lay_out_rows(&mut app);
    app.notices.error("boom");
    click(&mut app, 5, 2, KeyModifiers::NONE);
    assert!(selected(&app).is_empty());
  }

  #[test]
  fn test_sidebar_tree_reply_and_navigation() {
    let (mut app, backend) = app_at("/home");
    let id = backend.last_id_of("get_tree_from_root").unwrap();
    ok(
      &mut app,
      id,
      json!({"name": "/", "path": "/", "is_dir": true, "children": [
        {"name": "home", "path": "/home", "is_dir": true, "children": []},
        {"name": "tmp", "path": "/tmp", "is_dir": true}
      ]}),
    );
    assert_eq!(app.sidebar.rows().len(), 3);
    app.update(Action::FocusSidebar).unwrap();
    app.update(Action::MoveDown).unwrap();
    app.update(Action::Open).unwrap();
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/tmp");
  }

  #[test]
  fn test_backend_exit_fails_loading_tabs() {
    let (mut app, backend) = app_at("/d");
    app.backend_exited();
    assert_eq!(app.tabs.active().unwrap().session.phase(), Phase::Error);
    assert_eq!(app.notices.errors().len(), 1);
    backend.set_fail(true);
    app.update(Action::ErrorClose).unwrap();
    app.update(Action::Refresh).unwrap();
    assert!(!app.notices.has_errors());
    assert_eq!(app.tabs.active().unwrap().session.phase(), Phase::Error);
  }

  #[test]
  fn test_g_prefix_resets_after_one_key() {
    let (mut app, _backend) = app_at("/d");
    let config = Config::default();
    let key = |c| KeyEvent { code: KeyCode::Char(c), modifiers: KeyModifiers::NONE, kind: KeyEventKind::Press, state: KeyEventState::NONE };
    app.handle_key(key('g'), &config).unwrap();
    assert_eq!(app.input_mode(), InputMode::GPrefix);
    app.handle_key(key('x'), &config).unwrap();
    assert_eq!(app.input_mode(), InputMode::Normal);
  }

  #[test]
  fn test_sidebar_resize_clamped() {
    let (mut app, _backend) = app_at("/d");
    for _ in 0..20 {
      app.update(Action::GrowSidebar).unwrap();
    }
    assert_eq!(app.sidebar_ratio, app.max_sidebar_ratio);
    for _ in 0..20 {
      app.update(Action::ShrinkSidebar).unwrap();
    }
    assert_eq!(app.sidebar_ratio, app.min_sidebar_ratio);
  }

  fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
      app.update(Action::PromptInput(c)).unwrap();
    }
  }

  #[test]
  fn test_resort_keeps_shift_anchor() {
    let (mut app, _backend) = app_at("/d");
    app.layout.view_mode = crate::layout::ViewMode::List;
    fill(&mut app, &["0", "1", "2", "3", "4", "5", "6", "7"]);
    lay_out_rows(&mut app);
    click(&mut app, 5, 2 + 3, KeyModifiers::NONE);
    app.update(Action::ToggleSortDirection).unwrap();
    let tab = app.tabs.active().unwrap();
    assert!(tab.selection.is_empty());
    assert_eq!(tab.selection.anchor(), Some(3));
  }

  #[test]
  fn test_cut_selection() {
    let (mut app, backend) = app_at("/d");
    fill(&mut app, &["a"]);
    app.update(Action::MoveDown).unwrap();
    app.update(Action::Cut).unwrap();
    assert_eq!(
      backend.calls_named("cut_items_to_clipboard"),
      vec![Call::CutItemsToClipboard { paths: vec!["/d/a".into()] }]
    );
    let id = backend.last_id_of("cut_items_to_clipboard").unwrap();
    ok(&mut app, id, Value::Null);
    assert_eq!(app.notices.toasts().last().map(|t| t.message.as_str()), Some("Cut 1 item"));
  }

  #[test]
  fn test_new_file_and_folder_prompts() {
    let (mut app, backend) = app_at("/d");
    app.update(Action::NewFile).unwrap();
    assert_eq!(app.input_mode(), InputMode::Prompt);
    assert_eq!(app.prompt.label(), "New file:");
    type_text(&mut app, "a.txt");
    app.update(Action::PromptConfirm).unwrap();
    assert_eq!(backend.calls_named("create_new_file"), vec![Call::CreateNewFile { path: "/d/a.txt".into() }]);
    let streams = stream_request_ids(&backend).len();
    let id = backend.last_id_of("create_new_file").unwrap();
    ok(&mut app, id, Value::Null);
    assert_eq!(stream_request_ids(&backend).len(), streams + 1);

    app.update(Action::NewDirectory).unwrap();
    type_text(&mut app, "a/b");
    app.update(Action::PromptConfirm).unwrap();
    assert!(backend.calls_named("create_new_directory").is_empty());

    app.update(Action::NewDirectory).unwrap();
    type_text(&mut app, "sub");
    app.update(Action::PromptConfirm).unwrap();
    let id = backend.last_id_of("create_new_directory").unwrap();
    err(&mut app, id, "exists");
    assert_eq!(app.notices.errors(), &["Create folder failed: exists".to_string()]);
  }

  #[test]
  fn test_rename_prefills_current_name() {
    let (mut app, backend) = app_at("/d");
    app.layout.view_mode = crate::layout::ViewMode::List;
    fill(&mut app, &["old.txt"]);
    app.update(Action::MoveDown).unwrap();
    app.update(Action::Rename).unwrap();
    assert_eq!(app.prompt_input, "old.txt");
    for _ in 0..3 {
      app.update(Action::PromptBackspace).unwrap();
    }
    type_text(&mut app, "md");
    app.update(Action::PromptConfirm).unwrap();
    assert_eq!(
      backend.calls_named("rename_item"),
      vec![Call::RenameItem { path: "/d/old.txt".into(), new_name: "old.md".into() }]
    );
  }

  #[test]
  fn test_rename_needs_single_item() {
    let (mut app, backend) = app_at("/d");
    fill(&mut app, &["a", "b"]);
    app.update(Action::SelectAll).unwrap();
    app.update(Action::Rename).unwrap();
    assert_eq!(app.input_mode(), InputMode::Normal);
    assert!(backend.calls_named("rename_item").is_empty());
  }

  #[test]
  fn test_delete_requires_confirmation() {
    let (mut app, backend) = app_at("/d");
    fill(&mut app, &["a", "b"]);
    app.update(Action::SelectAll).unwrap();
    app.update(Action::Delete).unwrap();
    type_text(&mut app, "n");
    app.update(Action::PromptConfirm).unwrap();
    assert!(backend.calls_named("delete_item").is_empty());

    app.update(Action::Delete).unwrap();
    type_text(&mut app, "Y");
    app.update(Action::PromptConfirm).unwrap();
    assert_eq!(
      backend.calls_named("delete_item"),
      vec![Call::DeleteItem { path: "/d/a".into() }, Call::DeleteItem { path: "/d/b".into() }]
    );
  }

  #[test]
  fn test_move_to_absolute_and_relative() {
    let (mut app, backend) = app_at("/d");
    fill(&mut app, &["a.txt"]);
    app.update(Action::MoveDown).unwrap();
    app.update(Action::MoveTo).unwrap();
    type_text(&mut app, "/e");
    app.update(Action::PromptConfirm).unwrap();
    app.update(Action::MoveTo).unwrap();
    type_text(&mut app, "sub");
    app.update(Action::PromptConfirm).unwrap();
    assert_eq!(
      backend.calls_named("move_item"),
      vec![
        Call::MoveItem { src: "/d/a.txt".into(), dest: "/e/a.txt".into() },
        Call::MoveItem { src: "/d/a.txt".into(), dest: "/d/sub/a.txt".into() },
      ]
    );
  }

  #[test]
  fn test_prompt_cancel_resets_purpose() {
    let (mut app, backend) = app_at("/d");
    app.update(Action::NewFile).unwrap();
    type_text(&mut app, "x");
    app.update(Action::PromptCancel).unwrap();
    assert_eq!(app.prompt, PromptPurpose::Command);
    assert!(app.prompt_input.is_empty());
    assert!(backend.calls_named("create_new_file").is_empty());
  }

  #[test]
  fn test_file_change_reloads_matching_tabs() {
    let (mut app, backend) = app_at("/d");
    app.open_tab(Some("/other".into()));
    let before = stream_request_ids_with_paths(&backend).len();
    event(&mut app, BackendEvent::FileChange(FileChange { paths: vec!["/d/new.txt".into()] }));
    let after = stream_request_ids_with_paths(&backend);
    assert_eq!(after.len(), before + 1);
    assert_eq!(after.last().map(|(_, p)| p.as_str()), Some("/d"));
  }

  #[test]
  fn test_file_change_in_home_reloads_home_view() {
    let (mut app, backend) = app_at("/d");
    let user = backend.last_id_of("resolve_user").unwrap();
    ok(&mut app, user, json!("/home/me"));
    app.update(Action::GoHome).unwrap();
    let before = stream_request_ids_with_paths(&backend).len();
    event(&mut app, BackendEvent::FileChange(FileChange { paths: vec!["/home/me/Desktop".into()] }));
    let after = stream_request_ids_with_paths(&backend);
    assert_eq!(after.len(), before + 1);
    assert_eq!(after.last().map(|(_, p)| p.as_str()), Some(HOME_VIEW));
  }

  #[test]
  fn test_sidebar_expand_and_collapse() {
    let (mut app, backend) = app_at("/home");
    let id = backend.last_id_of("get_tree_from_root").unwrap();
    ok(
      &mut app,
      id,
      json!({"name": "/", "path": "/", "is_dir": true, "children": [
        {"name": "home", "path": "/home", "is_dir": true, "children": []},
        {"name": "tmp", "path": "/tmp", "is_dir": true}
      ]}),
    );
    app.update(Action::FocusSidebar).unwrap();
    app.update(Action::MoveDown).unwrap();
    app.update(Action::MoveRight).unwrap();
    assert_eq!(
      backend.calls_named("list_directory_contents"),
      vec![Call::ListDirectoryContents { path: "/tmp".into() }]
    );
    let id = backend.last_id_of("list_directory_contents").unwrap();
    ok(&mut app, id, json!([{"name": "x", "path": "/tmp/x", "is_dir": true}]));
    assert_eq!(app.sidebar.rows().len(), 4);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/home");

    app.update(Action::MoveLeft).unwrap();
    assert_eq!(app.sidebar.rows().len(), 3);
    assert_eq!(app.tabs.active().unwrap().working_dir(), "/home");
  }
}
