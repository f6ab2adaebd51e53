use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::theme::Theme;

pub fn render_error(messages: &[String], theme: &Theme, area: Rect, buf: &mut Buffer) {
  let width = 60.min(area.width.saturating_sub(4));
  let inner_width = width.saturating_sub(2) as usize;

  // Estimate line count with word-wrapping
  let line_count: u16 = messages.iter().map(|m| (m.width() / inner_width.max(1)) as u16 + 1).sum();
  // borders, blank line and hint
  let height = (line_count + 4).min(area.height.saturating_sub(2));

  if width < 10 || height < 3 {
    return;
  }

  let x = area.x + (area.width.saturating_sub(width)) / 2;
  let y = area.y + (area.height.saturating_sub(height)) / 2;
  let popup = Rect::new(x, y, width, height);

  Clear.render(popup, buf);

  let mut lines: Vec<Line> = messages
    .iter()
    .map(|msg| Line::from(Span::styled(format!(" {msg}"), Style::default().fg(theme.text))))
    .collect();

  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(" [Esc] dismiss", Style::default().fg(theme.text_dim))));

  let title = if messages.len() > 1 { format!(" Errors ({}) ", messages.len()) } else { " Error ".to_string() };
  let block = Block::default()
    .borders(Borders::ALL)
    .title(title)
    .border_style(Style::default().fg(theme.error))
    .style(Style::default().bg(theme.bg_overlay));

  let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
  paragraph.render(popup, buf);
}
