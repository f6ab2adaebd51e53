use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseEvent};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::action::Action;
use crate::backend::BackendMessage;
use crate::config::{Config, normalize_key_event};

pub enum Event {
  Key(KeyEvent),
  Mouse(MouseEvent),
  Resize(u16, u16),
  Tick,
  Backend(BackendMessage),
  /// The backend closed its stdout.
  BackendExited,
  ConfigChanged,
}

pub struct EventLoop {
  tx: mpsc::Sender<Event>,
  rx: mpsc::Receiver<Event>,
}

impl EventLoop {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::channel();

    let input_tx = tx.clone();
    thread::spawn(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        let sent = match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind != KeyEventKind::Release => input_tx.send(Event::Key(key)),
          Ok(CrosstermEvent::Mouse(mouse)) => input_tx.send(Event::Mouse(mouse)),
          Ok(CrosstermEvent::Resize(w, h)) => input_tx.send(Event::Resize(w, h)),
          _ => Ok(()),
        };
        if sent.is_err() {
          break;
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for other producers (the backend reader, the config watcher).
  pub fn sender(&self) -> mpsc::Sender<Event> {
    self.tx.clone()
  }

  pub fn next(&self) -> Result<Event> {
    Ok(self.rx.recv()?)
  }

  /// Drains whatever else is already queued, without blocking.
  pub fn try_next(&self) -> Option<Event> {
    self.rx.try_recv().ok()
  }
}

/// Watches the directory holding the config file and reports writes to it.
/// The watcher stops when the returned handle is dropped.
pub fn watch_config(path: &Path, tx: mpsc::Sender<Event>) -> Option<RecommendedWatcher> {
  let dir = path.parent()?;
  let file_name = path.file_name()?.to_os_string();
  let mut watcher = match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
    let Ok(ev) = res else { return };
    let touches_config = ev.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str()));
    if touches_config && (ev.kind.is_modify() || ev.kind.is_create()) {
      let _ = tx.send(Event::ConfigChanged);
    }
  }) {
    Ok(w) => w,
    Err(e) => {
      warn!(event = "config.watch_unavailable", error = %e);
      return None;
    }
  };
  if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
    debug!(event = "config.watch_unavailable", dir = %dir.display(), error = %e);
    return None;
  }
  Some(watcher)
}

/// Which layer of the UI receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
  Normal,
  GPrefix,
  Prompt,
  Conflict,
  Error,
}

pub fn map_key(key: KeyEvent, mode: InputMode, config: &Config) -> Action {
  match mode {
    InputMode::Prompt => match key.code {
      KeyCode::Esc => Action::PromptCancel,
      KeyCode::Enter => Action::PromptConfirm,
      KeyCode::Backspace => Action::PromptBackspace,
      KeyCode::Char(c) => Action::PromptInput(c),
      _ => Action::None,
    },
    InputMode::Conflict => match key.code {
      KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => Action::ConflictPrev,
      KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => Action::ConflictNext,
      KeyCode::Char(' ') | KeyCode::Char('a') => Action::ConflictToggleRepeat,
      KeyCode::Enter => Action::ConflictConfirm,
      KeyCode::Esc => Action::ConflictEscape,
      _ => Action::None,
    },
    InputMode::Error => match key.code {
      KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Action::ErrorClose,
      _ => Action::None,
    },
    InputMode::GPrefix => {
      let kb = normalize_key_event(key);
      config.g_prefix_keys.get(&kb).cloned().unwrap_or(Action::None)
    }
    InputMode::Normal => {
      let kb = normalize_key_event(key);
      config.normal_keys.get(&kb).cloned().unwrap_or(Action::None)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    key_with_mod(code, KeyModifiers::NONE)
  }

  fn key_with_mod(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent { code, modifiers, kind: KeyEventKind::Press, state: KeyEventState::NONE }
  }

  fn cfg() -> Config {
    Config::default()
  }

  #[test]
  fn test_normal_mode_navigation() {
    let c = cfg();
    assert_eq!(map_key(key(KeyCode::Char('j')), InputMode::Normal, &c), Action::MoveDown);
    assert_eq!(map_key(key(KeyCode::Up), InputMode::Normal, &c), Action::MoveUp);
    assert_eq!(map_key(key(KeyCode::Enter), InputMode::Normal, &c), Action::Open);
    assert_eq!(map_key(key(KeyCode::Backspace), InputMode::Normal, &c), Action::HistoryBack);
    assert_eq!(
      map_key(key_with_mod(KeyCode::Right, KeyModifiers::ALT), InputMode::Normal, &c),
      Action::HistoryForward
    );
  }

  #[test]
  fn test_shift_arrows_extend() {
    let c = cfg();
    assert_eq!(
      map_key(key_with_mod(KeyCode::Down, KeyModifiers::SHIFT), InputMode::Normal, &c),
      Action::ExtendDown
    );
    assert_eq!(
      map_key(key_with_mod(KeyCode::Char('K'), KeyModifiers::SHIFT), InputMode::Normal, &c),
      Action::ExtendUp
    );
  }

  #[test]
  fn test_backtab_prev_tab() {
    let c = cfg();
    assert_eq!(
      map_key(key_with_mod(KeyCode::BackTab, KeyModifiers::SHIFT), InputMode::Normal, &c),
      Action::PrevTab
    );
  }

  #[test]
  fn test_ctrl_c_copies() {
    let c = cfg();
    assert_eq!(
      map_key(key_with_mod(KeyCode::Char('c'), KeyModifiers::CONTROL), InputMode::Normal, &c),
      Action::Copy
    );
  }

  #[test]
  fn test_prompt_mode() {
    let c = cfg();
    assert_eq!(map_key(key(KeyCode::Char('q')), InputMode::Prompt, &c), Action::PromptInput('q'));
    assert_eq!(map_key(key(KeyCode::Enter), InputMode::Prompt, &c), Action::PromptConfirm);
    assert_eq!(map_key(key(KeyCode::Esc), InputMode::Prompt, &c), Action::PromptCancel);
    assert_eq!(map_key(key(KeyCode::Backspace), InputMode::Prompt, &c), Action::PromptBackspace);
  }

  #[test]
  fn test_conflict_mode() {
    let c = cfg();
    assert_eq!(map_key(key(KeyCode::Right), InputMode::Conflict, &c), Action::ConflictNext);
    assert_eq!(map_key(key(KeyCode::Left), InputMode::Conflict, &c), Action::ConflictPrev);
    assert_eq!(map_key(key(KeyCode::Char(' ')), InputMode::Conflict, &c), Action::ConflictToggleRepeat);
    assert_eq!(map_key(key(KeyCode::Enter), InputMode::Conflict, &c), Action::ConflictConfirm);
    assert_eq!(map_key(key(KeyCode::Esc), InputMode::Conflict, &c), Action::ConflictEscape);
    assert_eq!(map_key(key(KeyCode::Char('q')), InputMode::Conflict, &c), Action::None);
  }

  #[test]
  fn test_error_mode() {
    let c = cfg();
    assert_eq!(map_key(key(KeyCode::Esc), InputMode::Error, &c), Action::ErrorClose);
    assert_eq!(map_key(key(KeyCode::Char('j')), InputMode::Error, &c), Action::None);
  }

  #[test]
  fn test_g_prefix_mode() {
    let c = cfg();
    assert_eq!(map_key(key(KeyCode::Char('g')), InputMode::GPrefix, &c), Action::GoToTop);
    assert_eq!(map_key(key(KeyCode::Char('x')), InputMode::GPrefix, &c), Action::None);
  }

  #[test]
  fn test_custom_config_remaps_key() {
    let mut c = cfg();
    let kb = crate::config::KeyBinding { code: KeyCode::Char('j'), modifiers: KeyModifiers::NONE };
    c.normal_keys.insert(kb, Action::Quit);
    assert_eq!(map_key(key(KeyCode::Char('j')), InputMode::Normal, &c), Action::Quit);
  }
}
