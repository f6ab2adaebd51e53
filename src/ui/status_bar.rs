use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::action::Action;
use crate::app::App;
use crate::config::Config;
use crate::event::InputMode;
use crate::notice::Level;
use crate::tab::Phase;
use crate::theme::Theme;

fn g_hint_label(action: &Action) -> Option<&'static str> {
  match action {
    Action::GoToTop => Some("top"),
    Action::GoToBottom => Some("bottom"),
    Action::GoHome => Some("home"),
    Action::NextTab => Some("next tab"),
    Action::PrevTab => Some("prev tab"),
    Action::Refresh => Some("refresh"),
    _ => None,
  }
}

/// `g`-prefix bindings as "key label" pairs, sorted by key.
pub fn g_prefix_hint(config: &Config) -> String {
  let mut pairs: Vec<(String, &'static str)> = Vec::new();
  for (action, keys) in config.reverse_lookup() {
    let Some(label) = g_hint_label(&action) else { continue };
    for key in keys {
      if let Some(rest) = key.strip_prefix('g').filter(|r| !r.is_empty()) {
        pairs.push((rest.to_string(), label));
      }
    }
  }
  pairs.sort();
  pairs.iter().map(|(key, label)| format!("{key} {label}")).collect::<Vec<_>>().join("  ")
}

pub fn render_status_bar(app: &App, config: &Config, theme: &Theme, area: Rect, buf: &mut Buffer) {
  let dim = Style::default().fg(theme.text_dim);

  if app.input_mode() == InputMode::GPrefix {
    let line = Line::from(vec![
      Span::styled(" g", Style::default().fg(theme.warning).add_modifier(Modifier::BOLD)),
      Span::styled(format!("  {}", g_prefix_hint(config)), dim),
    ]);
    Paragraph::new(line).style(Style::default().bg(theme.bg_bar)).render(area, buf);
    return;
  }

  let mut spans = Vec::new();
  if let Some(tab) = app.tabs.active() {
    let session = &tab.session;
    match session.phase() {
      Phase::Scanning => spans.push(Span::styled(" Scanning…", Style::default().fg(theme.info))),
      Phase::Streaming => {
        spans.push(Span::styled(format!(" Loading {}%", session.progress()), Style::default().fg(theme.info)))
      }
      Phase::Error => spans.push(Span::styled(" Error", Style::default().fg(theme.error))),
      Phase::Complete | Phase::Idle => {}
    }
    let count = session.len();
    spans.push(Span::styled(format!(" {count} item{}", if count == 1 { "" } else { "s" }), dim));
    if !tab.selection.is_empty() {
      spans.push(Span::styled(
        format!(" | {} selected", tab.selection.len()),
        Style::default().fg(theme.text),
      ));
    }
    if !session.warnings().is_empty() {
      spans.push(Span::styled(format!(" | {} unreadable", session.warnings().len()), Style::default().fg(theme.warning)));
    }
  }

  if let Some(op) = app.paste.current() {
    let progress = match (op.percent(), op.total) {
      (Some(pct), Some(total)) => format!(" | Pasting {}/{total} ({pct}%)", op.done),
      _ => " | Preparing paste…".to_string(),
    };
    spans.push(Span::styled(progress, Style::default().fg(theme.info)));
  }

  if let Some(toast) = app.notices.toasts().last() {
    let color = match toast.level {
      Level::Info => theme.info,
      Level::Success => theme.success,
      Level::Warning => theme.warning,
    };
    spans.push(Span::styled(format!("  {}", toast.message), Style::default().fg(color)));
  }

  Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_bar)).render(area, buf);
}
