use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::sidebar::{RowKind, Sidebar};
use crate::tab::same_dir;
use crate::theme::Theme;

/// Quick access and the folder tree. Returns the area of each visible row
/// with its row index.
pub fn render_sidebar(
  sidebar: &Sidebar,
  working_dir: Option<&str>,
  theme: &Theme,
  area: Rect,
  buf: &mut Buffer,
) -> Vec<(Rect, usize)> {
  let border = if sidebar.focused { theme.accent } else { theme.border };
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border))
    .title(if sidebar.pending_tree_call().is_some() { " Places … " } else { " Places " })
    .title_style(Style::default().fg(if sidebar.focused { theme.accent } else { theme.title_inactive }));
  let inner = block.inner(area);
  block.render(area, buf);

  let rows = sidebar.rows();
  let start = sidebar.scroll.min(rows.len());
  let end = (start + inner.height as usize).min(rows.len());
  let mut hits = Vec::with_capacity(end - start);

  for (line_no, index) in (start..end).enumerate() {
    let row = &rows[index];
    let current = row.kind == RowKind::Tree && working_dir.is_some_and(|d| same_dir(&row.path, d));
    let marker = match row.kind {
      RowKind::QuickAccess => "★ ",
      RowKind::Tree if row.expanded => "▾ ",
      RowKind::Tree => "▸ ",
    };

    let mut style = match row.kind {
      RowKind::QuickAccess => Style::default().fg(theme.text),
      RowKind::Tree => Style::default().fg(theme.directory),
    };
    if current {
      style = style.fg(theme.accent).add_modifier(Modifier::BOLD);
    }
    if sidebar.focused && index == sidebar.cursor {
      style = style.bg(theme.bg_cursor);
    }

    let cells = Rect::new(inner.x, inner.y + line_no as u16, inner.width, 1);
    let line = Line::from(vec![
      Span::styled("  ".repeat(row.depth), style),
      Span::styled(marker, style),
      Span::styled(row.name.clone(), style),
    ]);
    Paragraph::new(line).style(style).render(cells, buf);
    hits.push((cells, index));
  }
  hits
}
