use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;

use crate::action::Action;
use crate::tab::TabSettings;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
  pub code: KeyCode,
  pub modifiers: KeyModifiers,
}

impl KeyBinding {
  pub fn display_key(&self) -> String {
    let key_name = match self.code {
      KeyCode::Char(' ') => "Space".to_string(),
      KeyCode::Char(c) => c.to_string(),
      KeyCode::Enter => "Enter".to_string(),
      KeyCode::Esc => "Esc".to_string(),
      KeyCode::Backspace => "Backspace".to_string(),
      KeyCode::Delete => "Delete".to_string(),
      KeyCode::Tab => "Tab".to_string(),
      KeyCode::BackTab => "Shift+Tab".to_string(),
      KeyCode::PageUp => "PageUp".to_string(),
      KeyCode::PageDown => "PageDown".to_string(),
      KeyCode::Up => "Up".to_string(),
      KeyCode::Down => "Down".to_string(),
      KeyCode::Left => "Left".to_string(),
      KeyCode::Right => "Right".to_string(),
      KeyCode::F(n) => format!("F{n}"),
      _ => format!("{:?}", self.code),
    };

    if self.modifiers.contains(KeyModifiers::CONTROL) {
      format!("Ctrl+{key_name}")
    } else if self.modifiers.contains(KeyModifiers::ALT) {
      format!("Alt+{key_name}")
    } else if self.modifiers.contains(KeyModifiers::SHIFT) {
      format!("Shift+{key_name}")
    } else {
      key_name
    }
  }
}

pub struct Config {
  pub sidebar_ratio: u16,
  pub min_sidebar_ratio: u16,
  pub max_sidebar_ratio: u16,
  pub ratio_step: u16,
  pub tick_rate_ms: u64,
  pub drag_threshold_px: f32,
  pub progress_time_constant_ms: u64,
  pub toast_ticks: u32,
  pub double_click_ms: u64,
  pub theme: String,
  pub backend: String,
  pub normal_keys: HashMap<KeyBinding, Action>,
  pub g_prefix_keys: HashMap<KeyBinding, Action>,
}

#[derive(Deserialize, Default)]
struct TomlConfig {
  general: Option<GeneralConfig>,
  keys: Option<KeysConfig>,
}

#[derive(Deserialize, Default)]
struct GeneralConfig {
  sidebar_ratio: Option<u16>,
  tick_rate_ms: Option<u64>,
  drag_threshold_px: Option<f32>,
  progress_time_constant_ms: Option<u64>,
  toast_ticks: Option<u32>,
  double_click_ms: Option<u64>,
  theme: Option<String>,
  backend: Option<String>,
}

#[derive(Deserialize, Default)]
struct KeysConfig {
  normal: Option<HashMap<String, String>>,
  g_prefix: Option<HashMap<String, String>>,
}

pub fn parse_key_binding(s: &str) -> Option<KeyBinding> {
  if s.is_empty() {
    return None;
  }

  let parts: Vec<&str> = s.split('+').collect();

  if parts.len() == 1 {
    let key = parts[0];
    if let Some(code) = named_key(key) {
      return Some(KeyBinding { code, modifiers: KeyModifiers::NONE });
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() == 1 {
      return Some(KeyBinding { code: KeyCode::Char(chars[0]), modifiers: KeyModifiers::NONE });
    }
    return None;
  }

  if parts.len() == 2 {
    let modifier_str = parts[0].to_lowercase();
    let key_str = parts[1];

    let modifiers = match modifier_str.as_str() {
      "ctrl" => KeyModifiers::CONTROL,
      "shift" => {
        let chars: Vec<char> = key_str.chars().collect();
        if chars.len() == 1 {
          let c = chars[0].to_uppercase().next().unwrap_or(chars[0]);
          return Some(KeyBinding { code: KeyCode::Char(c), modifiers: KeyModifiers::NONE });
        }
        if key_str.eq_ignore_ascii_case("tab") {
          return Some(KeyBinding { code: KeyCode::BackTab, modifiers: KeyModifiers::SHIFT });
        }
        if let Some(code) = named_key(key_str) {
          return Some(KeyBinding { code, modifiers: KeyModifiers::SHIFT });
        }
        return None;
      }
      "alt" => KeyModifiers::ALT,
      _ => return None,
    };

    if let Some(code) = named_key(key_str) {
      return Some(KeyBinding { code, modifiers });
    }
    let chars: Vec<char> = key_str.chars().collect();
    if chars.len() == 1 {
      return Some(KeyBinding { code: KeyCode::Char(chars[0]), modifiers });
    }
    return None;
  }

  None
}

fn named_key(s: &str) -> Option<KeyCode> {
  match s.to_lowercase().as_str() {
    "enter" => Some(KeyCode::Enter),
    "space" => Some(KeyCode::Char(' ')),
    "esc" => Some(KeyCode::Esc),
    "up" => Some(KeyCode::Up),
    "down" => Some(KeyCode::Down),
    "left" => Some(KeyCode::Left),
    "right" => Some(KeyCode::Right),
    "backspace" => Some(KeyCode::Backspace),
    "delete" => Some(KeyCode::Delete),
    "tab" => Some(KeyCode::Tab),
    "home" => Some(KeyCode::Home),
    "end" => Some(KeyCode::End),
    "pageup" => Some(KeyCode::PageUp),
    "pagedown" => Some(KeyCode::PageDown),
    s if s.starts_with('f') && s.len() > 1 => {
      s[1..].parse::<u8>().ok().filter(|&n| (1..=24).contains(&n)).map(KeyCode::F)
    }
    _ => None,
  }
}

pub fn normalize_key_event(key: KeyEvent) -> KeyBinding {
  let mut modifiers = key.modifiers;
  if let KeyCode::Char(c) = key.code
    && c.is_uppercase()
  {
    modifiers -= KeyModifiers::SHIFT;
  }
  if key.code == KeyCode::BackTab {
    modifiers |= KeyModifiers::SHIFT;
  }
  KeyBinding { code: key.code, modifiers }
}

impl Default for Config {
  fn default() -> Self {
    let mut config = Config::empty();
    let mut errors = Vec::new();
    config.apply_toml_str(Config::default_toml(), &mut errors);
    config
  }
}

impl Config {
  fn empty() -> Self {
    Config {
      sidebar_ratio: 25,
      min_sidebar_ratio: 10,
      max_sidebar_ratio: 50,
      ratio_step: 5,
      tick_rate_ms: 100,
      drag_threshold_px: 4.0,
      progress_time_constant_ms: 1200,
      toast_ticks: 30,
      double_click_ms: 400,
      theme: "dark".to_string(),
      backend: "fexp-backend".to_string(),
      normal_keys: HashMap::new(),
      g_prefix_keys: HashMap::new(),
    }
  }

  fn apply_toml_str(&mut self, s: &str, errors: &mut Vec<String>) {
    let toml_config: TomlConfig = match toml::from_str(s) {
      Ok(c) => c,
      Err(e) => {
        errors.push(format!("failed to parse config.toml: {e}"));
        return;
      }
    };

    if let Some(general) = toml_config.general {
      self.apply_general(general, errors);
    }

    if let Some(keys) = toml_config.keys {
      if let Some(normal) = keys.normal {
        self.normal_keys = parse_bindings(&normal, errors);
      }
      if let Some(g_prefix) = keys.g_prefix {
        self.g_prefix_keys = parse_bindings(&g_prefix, errors);
      }
    }
  }

  fn apply_general(&mut self, general: GeneralConfig, errors: &mut Vec<String>) {
    if let Some(ratio) = general.sidebar_ratio {
      self.sidebar_ratio = ratio.clamp(self.min_sidebar_ratio, self.max_sidebar_ratio);
    }
    if let Some(tick) = general.tick_rate_ms {
      self.tick_rate_ms = tick.max(10);
    }
    if let Some(px) = general.drag_threshold_px {
      if px.is_finite() && px >= 0.0 {
        self.drag_threshold_px = px;
      } else {
        errors.push(format!("invalid drag_threshold_px: {px}"));
      }
    }
    if let Some(ms) = general.progress_time_constant_ms {
      self.progress_time_constant_ms = ms.max(1);
    }
    if let Some(ticks) = general.toast_ticks {
      self.toast_ticks = ticks;
    }
    if let Some(ms) = general.double_click_ms {
      self.double_click_ms = ms;
    }
    if let Some(theme) = general.theme {
      if Theme::from_name(&theme).is_some() {
        self.theme = theme;
      } else {
        errors.push(format!(
          "unknown theme {theme:?} (available: {})",
          Theme::available_themes().join(", ")
        ));
      }
    }
    if let Some(backend) = general.backend {
      if backend.trim().is_empty() {
        errors.push("backend command is empty".to_string());
      } else {
        self.backend = backend;
      }
    }
  }

  pub fn default_toml() -> &'static str {
    r#"[general]
sidebar_ratio = 25                # sidebar width (percentage)
tick_rate_ms = 100                # event loop tick rate in ms
drag_threshold_px = 4.0           # pointer travel before a press becomes a drag
progress_time_constant_ms = 1200  # pace of the simulated loading progress
toast_ticks = 30                  # ticks a toast stays visible
double_click_ms = 400             # max gap between the clicks of a double click
theme = "dark"                    # dark | light
backend = "fexp-backend"          # command that runs the native backend

[keys.normal]
j = "move_down"
k = "move_up"
h = "move_left"
l = "move_right"
down = "move_down"
up = "move_up"
left = "move_left"
right = "move_right"
"shift+down" = "extend_down"
"shift+up" = "extend_up"
"shift+j" = "extend_down"
"shift+k" = "extend_up"
"shift+g" = "go_to_bottom"
g = "g_press"
pageup = "page_up"
pagedown = "page_down"
enter = "open"
backspace = "history_back"
"alt+left" = "history_back"
"alt+right" = "history_forward"
"shift+h" = "history_back"
"shift+l" = "history_forward"
"alt+up" = "go_up"
"-" = "go_up"
"~" = "go_home"
f5 = "refresh"
"ctrl+r" = "refresh"
"ctrl+t" = "new_tab"
"ctrl+w" = "close_tab"
"shift+t" = "duplicate_tab"
tab = "next_tab"
"shift+tab" = "prev_tab"
"ctrl+a" = "select_all"
esc = "clear_selection"
"ctrl+c" = "copy"
"ctrl+x" = "cut"
"ctrl+v" = "paste"
n = "new_file"
"shift+n" = "new_directory"
f2 = "rename"
delete = "delete"
m = "move_to"
s = "cycle_sort"
"shift+s" = "toggle_sort_direction"
"." = "toggle_hidden"
e = "toggle_extensions"
v = "toggle_view_mode"
z = "cycle_icon_size"
"ctrl+b" = "focus_sidebar"
"<" = "shrink_sidebar"
">" = "grow_sidebar"
":" = "command"
"ctrl+l" = "command"
q = "quit"

[keys.g_prefix]
g = "go_to_top"
h = "go_home"
t = "next_tab"
"shift+t" = "prev_tab"
"#
  }

  pub fn reverse_lookup(&self) -> HashMap<Action, Vec<String>> {
    let mut map: HashMap<Action, Vec<String>> = HashMap::new();
    for (kb, action) in &self.normal_keys {
      map.entry(action.clone()).or_default().push(kb.display_key());
    }
    for (kb, action) in &self.g_prefix_keys {
      let key_str = format!("g{}", kb.display_key());
      map.entry(action.clone()).or_default().push(key_str);
    }
    for keys in map.values_mut() {
      keys.sort();
    }
    map
  }

  pub fn tab_settings(&self) -> TabSettings {
    TabSettings {
      progress_time_constant: Duration::from_millis(self.progress_time_constant_ms),
      drag_threshold: self.drag_threshold_px,
    }
  }

  pub fn theme(&self) -> Theme {
    Theme::from_name(&self.theme).unwrap_or_default()
  }

  pub fn config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
      .map(|d| d.join("fexp").join("config.toml"))
      .ok_or_else(|| "could not determine config directory".to_string())
  }

  pub fn dump_default_config(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }

    std::fs::write(path, Self::default_toml())
      .map_err(|e| format!("failed to write {}: {e}", path.display()))?;

    Ok(())
  }

  pub fn load() -> (Config, Vec<String>) {
    match Self::config_path() {
      Ok(path) => Self::load_from_path(&path),
      Err(e) => (Config::default(), vec![e]),
    }
  }

  /// A missing file yields the defaults without errors.
  pub fn load_from_path(path: &Path) -> (Config, Vec<String>) {
    let mut errors = Vec::new();
    let config = match std::fs::read_to_string(path) {
      Ok(s) => Self::load_from_str_with_errors(&s, &mut errors),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
      Err(e) => {
        errors.push(format!("failed to read {}: {e}", path.display()));
        Config::default()
      }
    };
    (config, errors)
  }

  #[cfg(test)]
  fn load_from_str(s: &str) -> Config {
    let mut errors = Vec::new();
    Self::load_from_str_with_errors(s, &mut errors)
  }

  fn load_from_str_with_errors(s: &str, errors: &mut Vec<String>) -> Config {
    let mut config = Config::default();
    config.apply_toml_str(s, errors);
    config
  }
}

fn parse_bindings(table: &HashMap<String, String>, errors: &mut Vec<String>) -> HashMap<KeyBinding, Action> {
  let mut bindings = HashMap::new();
  for (key_str, action_str) in table {
    let Some(kb) = parse_key_binding(key_str) else {
      errors.push(format!("invalid key binding: {key_str:?}"));
      continue;
    };
    let Some(action) = Action::from_name(action_str) else {
      errors.push(format!("invalid action: {action_str:?}"));
      continue;
    };
    bindings.insert(kb, action);
  }
  bindings
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

  fn kb(code: KeyCode, modifiers: KeyModifiers) -> KeyBinding {
    KeyBinding { code, modifiers }
  }

  fn key_event(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent { code, modifiers, kind: KeyEventKind::Press, state: KeyEventState::NONE }
  }

  #[test]
  fn test_parse_single_char() {
    let kb = parse_key_binding("j").unwrap();
    assert_eq!(kb.code, KeyCode::Char('j'));
    assert_eq!(kb.modifiers, KeyModifiers::NONE);
  }

  #[test]
  fn test_parse_shift_char_is_uppercase() {
    let kb = parse_key_binding("shift+j").unwrap();
    assert_eq!(kb, parse_key_binding("J").unwrap());
  }

  #[test]
  fn test_parse_shift_named_key_keeps_modifier() {
    let kb = parse_key_binding("shift+down").unwrap();
    assert_eq!(kb.code, KeyCode::Down);
    assert_eq!(kb.modifiers, KeyModifiers::SHIFT);
  }

  #[test]
  fn test_parse_shift_tab_is_backtab() {
    let kb = parse_key_binding("shift+tab").unwrap();
    assert_eq!(kb, normalize_key_event(key_event(KeyCode::BackTab, KeyModifiers::NONE)));
  }

  #[test]
  fn test_parse_ctrl_and_alt() {
    assert_eq!(parse_key_binding("ctrl+l"), Some(kb(KeyCode::Char('l'), KeyModifiers::CONTROL)));
    assert_eq!(parse_key_binding("alt+left"), Some(kb(KeyCode::Left, KeyModifiers::ALT)));
  }

  #[test]
  fn test_parse_named_keys() {
    assert_eq!(parse_key_binding("enter").unwrap().code, KeyCode::Enter);
    assert_eq!(parse_key_binding("space").unwrap().code, KeyCode::Char(' '));
    assert_eq!(parse_key_binding("f5").unwrap().code, KeyCode::F(5));
    assert_eq!(parse_key_binding("home").unwrap().code, KeyCode::Home);
    assert!(parse_key_binding("f99").is_none());
  }

  #[test]
  fn test_parse_invalid() {
    assert!(parse_key_binding("").is_none());
    assert!(parse_key_binding("foobar").is_none());
    assert!(parse_key_binding("meta+x").is_none());
  }

  #[test]
  fn test_normalize_uppercase_strips_shift() {
    let kb = normalize_key_event(key_event(KeyCode::Char('J'), KeyModifiers::SHIFT));
    assert_eq!(kb.modifiers, KeyModifiers::NONE);
  }

  #[test]
  fn test_default_general_values() {
    let config = Config::default();
    assert_eq!(config.sidebar_ratio, 25);
    assert_eq!(config.tick_rate_ms, 100);
    assert_eq!(config.drag_threshold_px, 4.0);
    assert_eq!(config.progress_time_constant_ms, 1200);
    assert_eq!(config.toast_ticks, 30);
    assert_eq!(config.double_click_ms, 400);
    assert_eq!(config.theme, "dark");
    assert_eq!(config.backend, "fexp-backend");
  }

  #[test]
  fn test_default_bindings() {
    let config = Config::default();
    let n = KeyModifiers::NONE;
    let expected = vec![
      (KeyCode::Char('q'), n, Action::Quit),
      (KeyCode::Char('j'), n, Action::MoveDown),
      (KeyCode::Down, KeyModifiers::SHIFT, Action::ExtendDown),
      (KeyCode::Char('J'), n, Action::ExtendDown),
      (KeyCode::Enter, n, Action::Open),
      (KeyCode::Backspace, n, Action::HistoryBack),
      (KeyCode::Left, KeyModifiers::ALT, Action::HistoryBack),
      (KeyCode::Right, KeyModifiers::ALT, Action::HistoryForward),
      (KeyCode::Char('-'), n, Action::GoUp),
      (KeyCode::Char('t'), KeyModifiers::CONTROL, Action::NewTab),
      (KeyCode::Char('w'), KeyModifiers::CONTROL, Action::CloseTab),
      (KeyCode::Char('T'), n, Action::DuplicateTab),
      (KeyCode::Tab, n, Action::NextTab),
      (KeyCode::BackTab, KeyModifiers::SHIFT, Action::PrevTab),
      (KeyCode::Char('a'), KeyModifiers::CONTROL, Action::SelectAll),
      (KeyCode::Esc, n, Action::ClearSelection),
      (KeyCode::Char('c'), KeyModifiers::CONTROL, Action::Copy),
      (KeyCode::Char('x'), KeyModifiers::CONTROL, Action::Cut),
      (KeyCode::Char('v'), KeyModifiers::CONTROL, Action::Paste),
      (KeyCode::Char('n'), n, Action::NewFile),
      (KeyCode::Char('N'), n, Action::NewDirectory),
      (KeyCode::F(2), n, Action::Rename),
      (KeyCode::Delete, n, Action::Delete),
      (KeyCode::Char('m'), n, Action::MoveTo),
      (KeyCode::Char(':'), n, Action::CommandStart),
      (KeyCode::Char('l'), KeyModifiers::CONTROL, Action::CommandStart),
      (KeyCode::Char('v'), n, Action::ToggleViewMode),
      (KeyCode::Char('.'), n, Action::ToggleHidden),
    ];
    for (code, mods, action) in expected {
      assert_eq!(
        config.normal_keys.get(&kb(code, mods)),
        Some(&action),
        "missing binding for {code:?} with {mods:?}"
      );
    }
  }

  #[test]
  fn test_default_g_prefix_bindings() {
    let config = Config::default();
    let n = KeyModifiers::NONE;
    assert_eq!(config.g_prefix_keys.get(&kb(KeyCode::Char('g'), n)), Some(&Action::GoToTop));
    assert_eq!(config.g_prefix_keys.get(&kb(KeyCode::Char('T'), n)), Some(&Action::PrevTab));
  }

  #[test]
  fn test_default_toml_parses_without_errors() {
    let mut config = Config::empty();
    let mut errors = Vec::new();
    config.apply_toml_str(Config::default_toml(), &mut errors);
    assert!(errors.is_empty(), "{errors:?}");
  }

  #[test]
  fn test_keys_section_replaces_defaults() {
    let config = Config::load_from_str("[keys.normal]\nj = \"move_up\"\n");
    assert_eq!(config.normal_keys.len(), 1);
    assert_eq!(config.normal_keys.get(&kb(KeyCode::Char('j'), KeyModifiers::NONE)), Some(&Action::MoveUp));
    assert!(!config.g_prefix_keys.is_empty());
  }

  #[test]
  fn test_general_overrides() {
    let toml = r#"
[general]
sidebar_ratio = 40
drag_threshold_px = 8.5
theme = "light"
backend = "python3 backend.py"
"#;
    let config = Config::load_from_str(toml);
    assert_eq!(config.sidebar_ratio, 40);
    assert_eq!(config.drag_threshold_px, 8.5);
    assert_eq!(config.theme, "light");
    assert_eq!(config.backend, "python3 backend.py");
    assert_eq!(config.tab_settings().drag_threshold, 8.5);
  }

  #[test]
  fn test_sidebar_ratio_is_clamped() {
    let config = Config::load_from_str("[general]\nsidebar_ratio = 90\n");
    assert_eq!(config.sidebar_ratio, 50);
  }

  #[test]
  fn test_invalid_values_reported_and_ignored() {
    let mut errors = Vec::new();
    let toml = r#"
[general]
theme = "neon"
backend = "  "
drag_threshold_px = -1.0

[keys.normal]
j = "invalid_action"
"" = "quit"
k = "quit"
"#;
    let config = Config::load_from_str_with_errors(toml, &mut errors);
    assert_eq!(config.theme, "dark");
    assert_eq!(config.backend, "fexp-backend");
    assert_eq!(config.drag_threshold_px, 4.0);
    assert_eq!(config.normal_keys.len(), 1);
    assert_eq!(errors.len(), 5, "{errors:?}");
  }

  #[test]
  fn test_malformed_toml_returns_default() {
    let mut errors = Vec::new();
    let config = Config::load_from_str_with_errors("this is not [valid toml", &mut errors);
    assert_eq!(config.sidebar_ratio, 25);
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn test_load_missing_file_is_silent() {
    let path = std::env::temp_dir().join("fexp-test-missing").join("config.toml");
    let (config, errors) = Config::load_from_path(&path);
    assert!(errors.is_empty());
    assert_eq!(config.tick_rate_ms, 100);
  }

  #[test]
  fn test_dump_then_load() {
    let dir = std::env::temp_dir().join(format!("fexp-test-dump-{}", std::process::id()));
    let path = dir.join("config.toml");
    Config::dump_default_config(&path).unwrap();
    let (config, errors) = Config::load_from_path(&path);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(config.normal_keys.len(), Config::default().normal_keys.len());
    let _ = std::fs::remove_dir_all(dir);
  }

  #[test]
  fn test_display_key() {
    assert_eq!(kb(KeyCode::Char(' '), KeyModifiers::NONE).display_key(), "Space");
    assert_eq!(kb(KeyCode::Char('t'), KeyModifiers::CONTROL).display_key(), "Ctrl+t");
    assert_eq!(kb(KeyCode::Left, KeyModifiers::ALT).display_key(), "Alt+Left");
    assert_eq!(kb(KeyCode::Down, KeyModifiers::SHIFT).display_key(), "Shift+Down");
  }

  #[test]
  fn test_reverse_lookup() {
    let lookup = Config::default().reverse_lookup();
    assert!(lookup[&Action::Quit].contains(&"q".to_string()));
    assert!(lookup[&Action::GoToTop].contains(&"gg".to_string()));
  }
}
