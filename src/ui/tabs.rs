use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use unicode_width::UnicodeWidthStr;

use crate::tab::{TabId, TabRegistry};
use crate::theme::Theme;

const MAX_TITLE_WIDTH: usize = 24;

fn clip(title: &str, max: usize) -> String {
  if title.width() <= max {
    return title.to_string();
  }
  let mut out = String::new();
  for c in title.chars() {
    if out.width() + 1 >= max {
      break;
    }
    out.push(c);
  }
  out.push('…');
  out
}

/// Tab strip across the top row. Returns the clickable area of each tab.
pub fn render_tabs(tabs: &TabRegistry, theme: &Theme, area: Rect, buf: &mut Buffer) -> Vec<(Rect, TabId)> {
  let active = tabs.active_id();
  let mut spans = Vec::new();
  let mut hits = Vec::new();
  let mut x = area.x;
  let end = area.x + area.width;

  for tab in tabs.iter() {
    if x >= end {
      break;
    }
    let marker = if tab.session.phase().is_loading() { "◌ " } else { "" };
    let label = format!(" {marker}{} ", clip(tab.title(), MAX_TITLE_WIDTH));
    let width = (label.width() as u16).min(end - x);

    let style = if Some(tab.id()) == active {
      Style::default().fg(theme.bg_bar).bg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.title_inactive)
    };
    spans.push(Span::styled(label, style));
    spans.push(Span::styled("│", Style::default().fg(theme.border)));
    hits.push((Rect::new(x, area.y, width, 1), tab.id()));
    x = x.saturating_add(width + 1);
  }

  Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_bar)).render(area, buf);
  hits
}
