use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, CELL_HEIGHT_PX, CELL_WIDTH_PX, FileView, cell_bounds};
use crate::layout::{IconSize, LayoutCache, ViewMode};
use crate::tab::entry::format_size;
use crate::tab::{self, FileEntry, ItemBounds, Phase, Tab};
use crate::theme::Theme;

const SIZE_COLUMN: usize = 10;
const TYPE_COLUMN: usize = 8;

/// Rows per grid tile: icon rows plus one name row.
fn tile_height(size: IconSize) -> u16 {
  match size {
    IconSize::Small => 2,
    IconSize::Medium => 3,
    IconSize::Large => 4,
  }
}

/// Items per row and rows of items that fit in `inner`.
pub fn view_for(layout: &LayoutCache, inner: Rect) -> FileView {
  match layout.view_mode {
    ViewMode::List => FileView { columns: 1, rows: inner.height as usize },
    ViewMode::Grid => FileView {
      columns: (inner.width / layout.icon_size.tile_width()).max(1) as usize,
      rows: (inner.height / tile_height(layout.icon_size)) as usize,
    },
  }
}

pub fn inner_area(area: Rect) -> Rect {
  Block::default().borders(Borders::ALL).inner(area)
}

fn display_name<'a>(entry: &'a FileEntry, layout: &LayoutCache) -> &'a str {
  if layout.show_extensions || entry.is_dir { &entry.name } else { entry.stem() }
}

fn glyph(entry: &FileEntry) -> &'static str {
  if entry.pinned {
    "★"
  } else if entry.is_dir {
    "▸"
  } else if entry.thumbnail.is_some() {
    "▣"
  } else {
    "·"
  }
}

fn truncate(s: &str, max: usize) -> String {
  if s.width() <= max {
    return s.to_string();
  }
  let mut out = String::new();
  for c in s.chars() {
    if out.width() + 1 >= max {
      break;
    }
    out.push(c);
  }
  out.push('…');
  out
}

fn entry_style(entry: &FileEntry, selected: bool, focused: bool, theme: &Theme) -> Style {
  let base = if entry.is_dir { Style::default().fg(theme.directory) } else { Style::default().fg(theme.text) };
  let base = if entry.is_hidden() { base.add_modifier(Modifier::DIM) } else { base };
  match (selected, focused) {
    (true, true) => base.bg(theme.bg_selected).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    (true, false) => base.bg(theme.bg_selected).add_modifier(Modifier::BOLD),
    (false, true) => base.bg(theme.bg_cursor),
    (false, false) => base,
  }
}

/// Draws the active tab's entries. Returns the pixel bounds of every
/// visible item, for hit testing and rubber-band selection.
pub fn render_file_list(app: &App, theme: &Theme, area: Rect, buf: &mut Buffer) -> Vec<ItemBounds> {
  let Some(tab) = app.tabs.active() else {
    Block::default().borders(Borders::ALL).border_style(Style::default().fg(theme.border)).render(area, buf);
    return Vec::new();
  };
  let layout = &app.layout;

  let mut title = vec![Span::styled(format!(" {} ", tab.title()), Style::default().fg(theme.accent))];
  if layout.show_hidden {
    title.push(Span::styled("[hidden] ", Style::default().fg(theme.text_dim)));
  }
  let arrow = if layout.ascending { "↑" } else { "↓" };
  let sort = Line::from(format!(" {} {arrow} ", layout.sort_key.label())).right_aligned();

  let border = if app.sidebar.focused { theme.border } else { theme.accent };
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border))
    .title(Line::from(title))
    .title(sort);
  let inner = block.inner(area);
  block.render(area, buf);

  if tab.session.is_empty() {
    render_placeholder(tab, theme, inner, buf);
    return Vec::new();
  }
  let entries = tab.sorted(layout.sort_key, layout.ascending);

  let items = match layout.view_mode {
    ViewMode::List => render_list(tab, &entries, layout, theme, inner, buf),
    ViewMode::Grid => render_grid(tab, &entries, layout, theme, inner, buf),
  };

  if let Some(band) = tab.selection.drag_rect() {
    render_rubber_band(band, theme, inner, buf);
  }
  items
}

fn render_placeholder(tab: &Tab, theme: &Theme, inner: Rect, buf: &mut Buffer) {
  let (text, color) = match tab.session.phase() {
    Phase::Scanning | Phase::Streaming => ("Loading…".to_string(), theme.text_dim),
    Phase::Error => (tab.session.error().unwrap_or("Cannot read this folder").to_string(), theme.error),
    Phase::Complete => ("This folder is empty".to_string(), theme.text_dim),
    Phase::Idle => (String::new(), theme.text_dim),
  };
  Paragraph::new(Line::from(Span::styled(format!(" {text}"), Style::default().fg(color)))).render(inner, buf);
}

fn render_list(
  tab: &Tab,
  entries: &[&FileEntry],
  layout: &LayoutCache,
  theme: &Theme,
  inner: Rect,
  buf: &mut Buffer,
) -> Vec<ItemBounds> {
  let rows = inner.height as usize;
  let start = tab.scroll.min(entries.len());
  let end = (start + rows).min(entries.len());
  let focus = tab.selection.focus();
  let name_width = (inner.width as usize).saturating_sub(SIZE_COLUMN + TYPE_COLUMN + 4);

  let mut items = Vec::with_capacity(end - start);
  for (row, index) in (start..end).enumerate() {
    let entry = entries[index];
    let style = entry_style(entry, tab.selection.is_selected(&entry.path), focus == Some(index), theme);
    let size = if entry.is_dir { String::new() } else { entry.size.map(format_size).unwrap_or_default() };
    let name = truncate(display_name(entry, layout), name_width);
    let pad = name_width.saturating_sub(name.width());

    let line = Line::from(vec![
      Span::styled(format!(" {} ", glyph(entry)), style),
      Span::styled(name, style),
      Span::styled(" ".repeat(pad), style),
      Span::styled(format!("{size:>SIZE_COLUMN$} "), style.fg(theme.text_dim)),
      Span::styled(format!("{:<TYPE_COLUMN$}", truncate(&entry.filetype, TYPE_COLUMN)), style.fg(theme.text_dim)),
    ]);
    let cells = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
    Paragraph::new(line).render(cells, buf);
    items.push(ItemBounds { index, path: entry.path.clone(), rect: cell_bounds(cells) });
  }
  items
}

fn render_grid(
  tab: &Tab,
  entries: &[&FileEntry],
  layout: &LayoutCache,
  theme: &Theme,
  inner: Rect,
  buf: &mut Buffer,
) -> Vec<ItemBounds> {
  let view = view_for(layout, inner);
  let tile_w = layout.icon_size.tile_width();
  let tile_h = tile_height(layout.icon_size);
  let focus = tab.selection.focus();

  let start = (tab.scroll * view.columns).min(entries.len());
  let end = (start + view.columns * view.rows).min(entries.len());

  let mut items = Vec::with_capacity(end - start);
  for (slot, index) in (start..end).enumerate() {
    let entry = entries[index];
    let col = (slot % view.columns) as u16;
    let row = (slot / view.columns) as u16;
    let cells = Rect::new(inner.x + col * tile_w, inner.y + row * tile_h, tile_w.saturating_sub(1), tile_h);
    let style = entry_style(entry, tab.selection.is_selected(&entry.path), focus == Some(index), theme);

    let width = cells.width as usize;
    let mut lines: Vec<Line> = (0..tile_h - 1)
      .map(|i| {
        let icon = if i == (tile_h - 1) / 2 { glyph(entry) } else { "" };
        Line::from(Span::styled(format!("{icon:^width$}"), style))
      })
      .collect();
    let name = truncate(display_name(entry, layout), width);
    lines.push(Line::from(Span::styled(format!("{name:^width$}"), style)));
    Paragraph::new(lines).render(cells, buf);

    items.push(ItemBounds { index, path: entry.path.clone(), rect: cell_bounds(cells) });
  }
  items
}

/// Tints the cells under the drag rectangle.
fn render_rubber_band(band: tab::Rect, theme: &Theme, inner: Rect, buf: &mut Buffer) {
  let x0 = (band.x / CELL_WIDTH_PX).floor().max(0.0) as u16;
  let y0 = (band.y / CELL_HEIGHT_PX).floor().max(0.0) as u16;
  let x1 = (band.right() / CELL_WIDTH_PX).ceil().max(0.0) as u16;
  let y1 = (band.bottom() / CELL_HEIGHT_PX).ceil().max(0.0) as u16;
  let cells = Rect::new(x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1)).intersection(inner);
  if cells.is_empty() {
    return;
  }
  buf.set_style(cells, Style::default().bg(theme.rubber_band));
}
