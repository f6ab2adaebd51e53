use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

use crate::backend::ConflictStrategy;
use crate::clipboard::ConflictPrompt;
use crate::theme::Theme;

pub fn render_conflict(prompt: &ConflictPrompt, queued: usize, theme: &Theme, area: Rect, buf: &mut Buffer) {
  let width = 64.min(area.width.saturating_sub(4));
  let height = 10.min(area.height.saturating_sub(2));
  if width < 20 || height < 6 {
    return;
  }
  let popup = Rect::new(
    area.x + area.width.saturating_sub(width) / 2,
    area.y + area.height.saturating_sub(height) / 2,
    width,
    height,
  );
  Clear.render(popup, buf);

  let text = Style::default().fg(theme.text);
  let dim = Style::default().fg(theme.text_dim);

  let mut choices = vec![Span::raw(" ")];
  for strategy in ConflictStrategy::ALL {
    let style = if strategy == prompt.strategy() {
      Style::default().fg(theme.bg_overlay).bg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
      text
    };
    choices.push(Span::styled(format!(" {} ", strategy.label()), style));
    choices.push(Span::raw("  "));
  }

  let check = if prompt.repeat_for_all { "[x]" } else { "[ ]" };
  let mut lines = vec![
    Line::from(Span::styled(" A file with this name already exists:", text)),
    Line::from(Span::styled(format!(" {}", prompt.dest), Style::default().fg(theme.warning))),
    Line::from(Span::styled(format!(" from {}", prompt.src), dim)),
    Line::from(""),
    Line::from(choices),
    Line::from(Span::styled(format!(" {check} Do this for all remaining conflicts"), text)),
  ];
  if queued > 0 {
    lines.push(Line::from(Span::styled(format!(" {queued} more waiting"), dim)));
  }
  lines.push(Line::from(Span::styled(" [←/→] choose  [Space] all  [Enter] confirm  [Esc] skip", dim)));

  let block = Block::default()
    .borders(Borders::ALL)
    .title(" File exists ")
    .border_style(Style::default().fg(theme.warning))
    .style(Style::default().bg(theme.bg_overlay));

  Paragraph::new(lines).block(block).wrap(Wrap { trim: false }).render(popup, buf);
}
