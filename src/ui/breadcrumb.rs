use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use unicode_width::UnicodeWidthStr;

use crate::tab::NavigationHistory;
use crate::tab::history::{is_drive, is_separator, segments};
use crate::tab::same_dir;
use crate::theme::Theme;

const SEPARATOR: &str = " > ";
const ELLIPSIS: &str = "...";

/// Cells taken by the back/forward/up indicators.
pub const NAV_WIDTH: u16 = 7;

/// A segment of the breadcrumb path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbSegment {
  /// Display name for this segment
  pub name: String,
  /// Full path up to and including this segment
  pub path: String,
  /// Start position (column) in the rendered breadcrumb
  pub start_col: u16,
  /// Width of this segment in cells
  pub width: u16,
}

/// Splits `path` into clickable segments. A `/` root and `C:\` drives become
/// their own first segment; `home` and everything above it collapse to `~`.
pub fn parse_breadcrumb_segments(path: &str, home: Option<&str>) -> Vec<BreadcrumbSegment> {
  let sep = if path.contains('\\') && !path.contains('/') { '\\' } else { '/' };
  let mut raw: Vec<(String, String)> = Vec::new();
  let mut acc = String::new();

  if path.starts_with(is_separator) {
    raw.push((sep.to_string(), sep.to_string()));
    acc.push(sep);
  }
  for part in segments(path) {
    if !acc.is_empty() && !acc.ends_with(sep) {
      acc.push(sep);
    }
    acc.push_str(part);
    let full = if raw.is_empty() && is_drive(part) { format!("{acc}{sep}") } else { acc.clone() };
    raw.push((part.to_string(), full));
  }

  if let Some(home) = home.filter(|h| !h.is_empty())
    && let Some(i) = raw.iter().position(|(_, p)| same_dir(p, home))
  {
    let home_path = raw[i].1.clone();
    raw.splice(..=i, [("~".to_string(), home_path)]);
  }

  let mut col: u16 = 0;
  raw
    .into_iter()
    .map(|(name, path)| {
      let width = name.width() as u16;
      let segment = BreadcrumbSegment { name, path, start_col: col, width };
      col += width + SEPARATOR.len() as u16;
      segment
    })
    .collect()
}

/// Truncates breadcrumb segments to fit within the given width
/// Returns the segments to display and whether truncation occurred
pub fn truncate_breadcrumbs(segments: &[BreadcrumbSegment], max_width: u16) -> (Vec<BreadcrumbSegment>, bool) {
  let Some(last) = segments.last() else {
    return (Vec::new(), false);
  };

  let sep = SEPARATOR.len() as u16;
  let ellipsis = ELLIPSIS.len() as u16;
  let total_width: u16 = segments.iter().map(|s| s.width + sep).sum::<u16>().saturating_sub(sep);
  if total_width <= max_width {
    return (segments.to_vec(), false);
  }

  if max_width < ellipsis + sep + last.width {
    let mut only = last.clone();
    only.start_col = 0;
    return (vec![only], true);
  }

  // "first > ... > last"
  let first = &segments[0];
  if segments.len() > 2 && first.width + sep + ellipsis + sep + last.width <= max_width {
    let mut first_seg = first.clone();
    first_seg.start_col = 0;
    let mut last_seg = last.clone();
    last_seg.start_col = first.width + sep + ellipsis + sep;
    return (vec![first_seg, last_seg], true);
  }

  // "... > last"
  let mut last_seg = last.clone();
  last_seg.start_col = ellipsis + sep;
  (vec![last_seg], true)
}

/// Draws the path bar and returns the clickable area of each segment.
pub fn render_breadcrumb(
  path: &str,
  home: Option<&str>,
  theme: &Theme,
  area: Rect,
  buf: &mut Buffer,
) -> Vec<(Rect, String)> {
  let all = parse_breadcrumb_segments(path, home);
  let (shown, _) = truncate_breadcrumbs(&all, area.width.saturating_sub(2));

  let name_style = Style::default().fg(theme.text);
  let last_style = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
  let sep_style = Style::default().fg(theme.text_dim);

  let mut spans = vec![Span::raw(" ")];
  let mut col: u16 = 0;
  for (i, seg) in shown.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(SEPARATOR, sep_style));
      col += SEPARATOR.len() as u16;
    }
    // Elided segments leave a gap before this one.
    if seg.start_col > col {
      spans.push(Span::styled(ELLIPSIS, sep_style));
      spans.push(Span::styled(SEPARATOR, sep_style));
      col = seg.start_col;
    }
    let style = if i + 1 == shown.len() { last_style } else { name_style };
    spans.push(Span::styled(seg.name.clone(), style));
    col += seg.width;
  }

  Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_bar)).render(area, buf);

  let origin = area.x + 1;
  shown
    .into_iter()
    .filter(|s| origin + s.start_col < area.x + area.width)
    .map(|s| {
      let x = origin + s.start_col;
      let width = s.width.min(area.x + area.width - x);
      (Rect::new(x, area.y, width, 1), s.path)
    })
    .collect()
}

/// Back, forward and up indicators, lit when the move is possible.
pub fn render_nav(history: &NavigationHistory, theme: &Theme, area: Rect, buf: &mut Buffer) {
  let lit = |on: bool| Style::default().fg(if on { theme.accent } else { theme.text_dim });
  let line = Line::from(vec![
    Span::styled(" ‹", lit(history.can_go_back())),
    Span::styled(" ›", lit(history.can_go_forward())),
    Span::styled(" ↑", lit(history.can_go_up())),
  ]);
  Paragraph::new(line).style(Style::default().bg(theme.bg_bar)).render(area, buf);
}

/// Draws the text prompt in place of the path bar.
pub fn render_prompt(label: &str, input: &str, theme: &Theme, area: Rect, buf: &mut Buffer) {
  let line = Line::from(vec![
    Span::styled(format!(" {label} "), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(input.to_string(), Style::default().fg(theme.text)),
    Span::styled("▌", Style::default().fg(theme.accent)),
  ]);
  Paragraph::new(line).style(Style::default().bg(theme.bg_bar)).render(area, buf);
}
