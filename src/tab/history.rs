/// Working directory of the virtual home view: pinned places followed by
/// the user's home directory, listed by the backend as one stream.
pub const HOME_VIEW: &str = "Home";

pub fn is_home_view(path: &str) -> bool {
  path == HOME_VIEW
}

/// Back/forward/up history of one tab.
///
/// Values are immutable: every transition returns a new history, and a
/// transition that cannot happen returns `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
  working_dir: String,
  back: Vec<String>,
  forward: Vec<String>,
}

impl NavigationHistory {
  pub fn new(path: impl Into<String>) -> Self {
    Self { working_dir: path.into(), back: Vec::new(), forward: Vec::new() }
  }

  pub fn working_dir(&self) -> &str {
    &self.working_dir
  }

  /// Previously visited paths, most recent last.
  #[cfg(test)]
  pub fn back_stack(&self) -> &[String] {
    &self.back
  }

  #[cfg(test)]
  pub fn forward_stack(&self) -> &[String] {
    &self.forward
  }

  /// Visits `path`. Navigating to the current directory still records it.
  pub fn navigate_to(&self, path: impl Into<String>) -> Self {
    let mut back = self.back.clone();
    back.push(self.working_dir.clone());
    Self { working_dir: path.into(), back, forward: Vec::new() }
  }

  pub fn go_back(&self) -> Option<Self> {
    let mut back = self.back.clone();
    let target = back.pop()?;
    let mut forward = self.forward.clone();
    forward.push(self.working_dir.clone());
    Some(Self { working_dir: target, back, forward })
  }

  pub fn go_forward(&self) -> Option<Self> {
    let mut forward = self.forward.clone();
    let target = forward.pop()?;
    let mut back = self.back.clone();
    back.push(self.working_dir.clone());
    Some(Self { working_dir: target, back, forward })
  }

  /// Navigates to the parent directory. A root has no parent.
  pub fn go_up(&self) -> Option<Self> {
    parent_path(&self.working_dir).map(|parent| self.navigate_to(parent))
  }

  pub fn can_go_back(&self) -> bool {
    !self.back.is_empty()
  }

  pub fn can_go_forward(&self) -> bool {
    !self.forward.is_empty()
  }

  pub fn can_go_up(&self) -> bool {
    segments(&self.working_dir).len() >= 2
  }
}

pub fn is_separator(c: char) -> bool {
  c == '/' || c == '\\'
}

/// Non-empty path segments, accepting both separator styles.
pub fn segments(path: &str) -> Vec<&str> {
  path.split(is_separator).filter(|s| !s.is_empty()).collect()
}

/// Parent of `path`, or `None` when fewer than two segments remain.
///
/// The separator style of the input is kept; a leading `/` survives and a
/// drive parent keeps its trailing separator (`C:\`).
pub fn parent_path(path: &str) -> Option<String> {
  let parts = segments(path);
  if parts.len() < 2 {
    return None;
  }

  let sep = if path.contains('\\') && !path.contains('/') { '\\' } else { '/' };
  let kept = &parts[..parts.len() - 1];
  let mut parent = kept.join(&sep.to_string());

  if path.starts_with(is_separator) {
    parent.insert(0, sep);
  }
  if kept.len() == 1 && is_drive(kept[0]) {
    parent.push(sep);
  }
  Some(parent)
}

/// Directory a changed path lives in. Unlike [`parent_path`], an entry
/// directly under a root resolves to that root.
pub fn containing_dir(path: &str) -> Option<String> {
  if let Some(parent) = parent_path(path) {
    return Some(parent);
  }
  let parts = segments(path);
  match path.chars().next() {
    Some(sep) if parts.len() == 1 && is_separator(sep) => Some(sep.to_string()),
    _ => None,
  }
}

/// `name` inside `dir`, using the separator style of `dir`.
pub fn join_path(dir: &str, name: &str) -> String {
  let sep = if dir.contains('\\') && !dir.contains('/') { '\\' } else { '/' };
  if dir.ends_with(is_separator) { format!("{dir}{name}") } else { format!("{dir}{sep}{name}") }
}

/// Last segment of `path`.
pub fn file_name(path: &str) -> &str {
  segments(path).last().copied().unwrap_or(path)
}

/// `C:`-style drive designator.
pub fn is_drive(segment: &str) -> bool {
  let bytes = segment.as_bytes();
  bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
