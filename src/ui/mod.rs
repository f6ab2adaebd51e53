pub mod breadcrumb;
pub mod conflict;
pub mod error;
pub mod file_list;
pub mod sidebar;
pub mod status_bar;
pub mod tabs;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::App;
use crate::config::Config;
use crate::event::InputMode;

/// Draws one frame and records the clickable regions and file pane
/// geometry back into `app`.
pub fn draw(frame: &mut Frame, app: &mut App, config: &Config) {
  let theme = config.theme();
  let area = frame.area();

  // Vertical layout: tabs, path bar, main, status bar
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),
      Constraint::Length(1),
      Constraint::Min(3),
      Constraint::Length(1),
    ])
    .split(area);

  let ratio = app.sidebar_ratio.min(100);
  let main = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(ratio), Constraint::Percentage(100 - ratio)])
    .split(chunks[2]);

  // Geometry first so scroll offsets are valid before anything is drawn.
  let files_inner = file_list::inner_area(main[1]);
  let view = file_list::view_for(&app.layout, files_inner);
  if let Some(tab) = app.tabs.active_mut() {
    let total = tab.session.len();
    let max_scroll = total.div_ceil(view.columns.max(1)).saturating_sub(view.rows);
    tab.scroll = tab.scroll.min(max_scroll);
  }
  app.view = view;
  app.sidebar.adjust_scroll(file_list::inner_area(main[0]).height as usize);

  let buf = frame.buffer_mut();
  let tab_hits = tabs::render_tabs(&app.tabs, &theme, chunks[0], buf);

  let working_dir = app.tabs.active().map(|t| t.working_dir().to_string());
  let crumb_hits = if app.input_mode() == InputMode::Prompt {
    breadcrumb::render_prompt(app.prompt.label(), &app.prompt_input, &theme, chunks[1], buf);
    Vec::new()
  } else {
    let bar = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Length(breadcrumb::NAV_WIDTH), Constraint::Min(0)])
      .split(chunks[1]);
    if let Some(tab) = app.tabs.active() {
      breadcrumb::render_nav(tab.history(), &theme, bar[0], buf);
    }
    let path = working_dir.as_deref().unwrap_or_default();
    breadcrumb::render_breadcrumb(path, app.home.as_deref(), &theme, bar[1], buf)
  };

  let sidebar_hits = sidebar::render_sidebar(&app.sidebar, working_dir.as_deref(), &theme, main[0], buf);
  let items = file_list::render_file_list(app, &theme, main[1], buf);
  status_bar::render_status_bar(app, config, &theme, chunks[3], buf);

  // Overlays
  if let Some(prompt) = app.paste.conflict() {
    conflict::render_conflict(prompt, app.paste.queued_conflicts(), &theme, area, buf);
  }
  if app.notices.has_errors() {
    error::render_error(app.notices.errors(), &theme, area, buf);
  }

  app.hits.tabs = tab_hits;
  app.hits.breadcrumb = crumb_hits;
  app.hits.sidebar = sidebar_hits;
  app.hits.files = files_inner;
  app.hits.items = items;
}
