use std::cmp::Ordering;

use crate::backend::protocol::FileMetadata;
use crate::layout::SortKey;

/// One streamed item. `path` is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
  pub name: String,
  pub path: String,
  pub is_dir: bool,
  pub size: Option<u64>,
  pub filetype: String,
  pub date_modified: Option<u64>,
  pub thumbnail: Option<String>,
  pub pinned: bool,
}

impl FileEntry {
  pub fn from_metadata(meta: FileMetadata) -> Self {
    Self {
      name: meta.name,
      path: meta.path,
      is_dir: meta.is_dir,
      size: meta.size,
      filetype: meta.filetype,
      date_modified: meta.date_modified,
      thumbnail: None,
      pinned: meta.pinned,
    }
  }

  /// Folds a repeated metadata event into the entry, keeping fields the
  /// new event does not carry.
  pub fn merge_metadata(&mut self, meta: FileMetadata) {
    self.name = meta.name;
    self.is_dir = meta.is_dir;
    if meta.size.is_some() {
      self.size = meta.size;
    }
    if !meta.filetype.is_empty() {
      self.filetype = meta.filetype;
    }
    if meta.date_modified.is_some() {
      self.date_modified = meta.date_modified;
    }
    self.pinned = meta.pinned;
  }

  pub fn is_hidden(&self) -> bool {
    self.name.starts_with('.')
  }

  /// Name without its extension, for layouts that hide extensions.
  pub fn stem(&self) -> &str {
    if self.is_dir {
      return &self.name;
    }
    match self.name.rfind('.') {
      Some(0) | None => &self.name,
      Some(i) => &self.name[..i],
    }
  }
}

/// Pinned places first (home view only), then directories, then `key`;
/// `ascending == false` reverses the key only.
pub fn compare(a: &FileEntry, b: &FileEntry, key: SortKey, ascending: bool) -> Ordering {
  if a.pinned != b.pinned {
    return b.pinned.cmp(&a.pinned);
  }
  if a.is_dir != b.is_dir {
    return b.is_dir.cmp(&a.is_dir);
  }
  let ord = match key {
    SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    SortKey::Size => a.size.cmp(&b.size),
    SortKey::Filetype => a.filetype.to_lowercase().cmp(&b.filetype.to_lowercase()),
    SortKey::DateModified => a.date_modified.cmp(&b.date_modified),
  };
  let ord = if ascending { ord } else { ord.reverse() };
  ord
    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    .then_with(|| a.path.cmp(&b.path))
}

pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
  let mut size = bytes as f64;
  let mut unit = 0;
  while size >= 1024.0 && unit < UNITS.len() - 1 {
    size /= 1024.0;
    unit += 1;
  }
  if unit == 0 {
    format!("{bytes} B")
  } else {
    format!("{size:.1} {}", UNITS[unit])
  }
}

#[cfg(test)]
pub(crate) fn meta(request_id: u64, path: &str) -> FileMetadata {
  let name = path.rsplit(['/', '\\']).next().unwrap_or(path).to_string();
  let filetype = name.rsplit_once('.').map(|(_, ext)| ext.to_string()).unwrap_or_default();
  FileMetadata {
    request_id,
    name,
    path: path.to_string(),
    is_dir: false,
    size: Some(1),
    filetype,
    date_modified: None,
    pinned: false,
  }
}
