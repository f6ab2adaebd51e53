use serde::{Deserialize, Serialize};

/// View and sort preferences, round-tripped verbatim through the backend store.
///
/// Every field falls back to its client-side default when the stored
/// document is missing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutCache {
  pub sort_key: SortKey,
  pub ascending: bool,
  pub view_mode: ViewMode,
  pub show_hidden: bool,
  pub show_extensions: bool,
  pub icon_size: IconSize,
}

impl Default for LayoutCache {
  fn default() -> Self {
    Self {
      sort_key: SortKey::Name,
      ascending: true,
      view_mode: ViewMode::Grid,
      show_hidden: false,
      show_extensions: true,
      icon_size: IconSize::Small,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  #[default]
  Name,
  Size,
  Filetype,
  DateModified,
}

impl SortKey {
  /// Wire name used by `stream_directory_contents`.
  pub fn as_str(self) -> &'static str {
    match self {
      SortKey::Name => "name",
      SortKey::Size => "size",
      SortKey::Filetype => "filetype",
      SortKey::DateModified => "date_modified",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortKey::Name => "Name",
      SortKey::Size => "Size",
      SortKey::Filetype => "Type",
      SortKey::DateModified => "Modified",
    }
  }

  pub fn next(self) -> SortKey {
    match self {
      SortKey::Name => SortKey::Size,
      SortKey::Size => SortKey::Filetype,
      SortKey::Filetype => SortKey::DateModified,
      SortKey::DateModified => SortKey::Name,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
  #[default]
  Grid,
  List,
}

impl ViewMode {
  pub fn toggled(self) -> ViewMode {
    match self {
      ViewMode::Grid => ViewMode::List,
      ViewMode::List => ViewMode::Grid,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconSize {
  #[default]
  Small,
  Medium,
  Large,
}

impl IconSize {
  pub fn next(self) -> IconSize {
    match self {
      IconSize::Small => IconSize::Medium,
      IconSize::Medium => IconSize::Large,
      IconSize::Large => IconSize::Small,
    }
  }

  /// Width in cells of one grid tile.
  pub fn tile_width(self) -> u16 {
    match self {
      IconSize::Small => 18,
      IconSize::Medium => 24,
      IconSize::Large => 32,
    }
  }
}
