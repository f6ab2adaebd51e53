//! Wire types exchanged with the backend process.
//!
//! Every line the backend writes is one [`BackendMessage`]: either a reply to
//! an earlier call or an unsolicited event. Every line we write is a
//! [`Call`] wrapped with its call id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::{LayoutCache, SortKey};

/// Commands issued to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Call {
  ListDirectoryContents {
    path: String,
  },
  GetTreeFromRoot {
    target_path: String,
  },
  StreamDirectoryContents {
    path: String,
    sort_key: SortKey,
    ascending: bool,
    show_hidden: bool,
    request_id: u64,
  },
  ResolveUser,
  ResolveQuickAccess,
  OpenFromPath {
    path: String,
  },
  CopyItemsToClipboard {
    paths: Vec<String>,
  },
  CutItemsToClipboard {
    paths: Vec<String>,
  },
  PasteItemsFromClipboard {
    dest: String,
    request_id: u64,
  },
  ResolveCopyConflict {
    payload: ResolveCopyPayload,
  },
  CreateNewFile {
    path: String,
  },
  CreateNewDirectory {
    path: String,
  },
  RenameItem {
    path: String,
    new_name: String,
  },
  DeleteItem {
    path: String,
  },
  MoveItem {
    src: String,
    dest: String,
  },
  ResolvePathCommand {
    command: String,
  },
  FetchLayoutSettings,
  UpdateLayoutSettings {
    new_settings: LayoutCache,
  },
}

impl Call {
  pub fn name(&self) -> &'static str {
    match self {
      Call::ListDirectoryContents { .. } => "list_directory_contents",
      Call::GetTreeFromRoot { .. } => "get_tree_from_root",
      Call::StreamDirectoryContents { .. } => "stream_directory_contents",
      Call::ResolveUser => "resolve_user",
      Call::ResolveQuickAccess => "resolve_quick_access",
      Call::OpenFromPath { .. } => "open_from_path",
      Call::CopyItemsToClipboard { .. } => "copy_items_to_clipboard",
      Call::CutItemsToClipboard { .. } => "cut_items_to_clipboard",
      Call::PasteItemsFromClipboard { .. } => "paste_items_from_clipboard",
      Call::ResolveCopyConflict { .. } => "resolve_copy_conflict",
      Call::CreateNewFile { .. } => "create_new_file",
      Call::CreateNewDirectory { .. } => "create_new_directory",
      Call::RenameItem { .. } => "rename_item",
      Call::DeleteItem { .. } => "delete_item",
      Call::MoveItem { .. } => "move_item",
      Call::ResolvePathCommand { .. } => "resolve_path_command",
      Call::FetchLayoutSettings => "fetch_layout_settings",
      Call::UpdateLayoutSettings { .. } => "update_layout_settings",
    }
  }

  /// Encodes the call as one wire line (without the trailing newline).
  pub fn encode(&self, id: u64) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(self)?;
    if let Value::Object(ref mut map) = value {
      map.insert("id".to_string(), Value::from(id));
    }
    serde_json::to_string(&value)
  }
}

/// Answer to one paste conflict, sent as `resolve_copy_conflict { payload }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolveCopyPayload {
  pub request_id: u64,
  pub strategy: ConflictStrategy,
  pub repeat_for_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictStrategy {
  Ignore,
  Replace,
  Index,
}

impl ConflictStrategy {
  pub const ALL: [ConflictStrategy; 3] =
    [ConflictStrategy::Ignore, ConflictStrategy::Replace, ConflictStrategy::Index];

  pub fn label(self) -> &'static str {
    match self {
      ConflictStrategy::Ignore => "Skip",
      ConflictStrategy::Replace => "Replace",
      ConflictStrategy::Index => "Keep both",
    }
  }
}

/// One decoded line from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BackendMessage {
  Reply(Reply),
  Event(BackendEvent),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
  pub reply: u64,
  #[serde(default)]
  pub ok: Option<Value>,
  #[serde(default)]
  pub err: Option<String>,
}

impl Reply {
  /// Decodes a successful payload, turning backend rejections into `Err`.
  pub fn into_result<T: serde::de::DeserializeOwned>(self) -> Result<T, String> {
    if let Some(err) = self.err {
      return Err(err);
    }
    serde_json::from_value(self.ok.unwrap_or(Value::Null)).map_err(|e| format!("malformed reply: {e}"))
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum BackendEvent {
  #[serde(rename = "file-metadata")]
  FileMetadata(FileMetadata),
  #[serde(rename = "file-metadata-complete")]
  MetadataComplete(StreamMarker),
  #[serde(rename = "file-thumbnail")]
  FileThumbnail(FileThumbnail),
  #[serde(rename = "file-stream-complete")]
  StreamComplete(StreamMarker),
  #[serde(rename = "file-error")]
  FileError(FileError),
  #[serde(rename = "clipboard-paste-scan")]
  PasteScan(PasteScan),
  #[serde(rename = "clipboard-paste-file")]
  PasteFile(PasteFile),
  #[serde(rename = "clipboard-paste-complete")]
  PasteComplete(PasteComplete),
  #[serde(rename = "clipboard-paste-file-error")]
  PasteFileError(FileError),
  #[serde(rename = "clipboard-paste-conflict")]
  PasteConflict(PasteConflict),
  #[serde(rename = "file-change")]
  FileChange(FileChange),
  #[serde(rename = "window-focus")]
  WindowFocus,
  #[serde(rename = "window-blur")]
  WindowBlur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
  pub request_id: u64,
  pub name: String,
  pub path: String,
  #[serde(default)]
  pub is_dir: bool,
  #[serde(default)]
  pub size: Option<u64>,
  #[serde(default)]
  pub filetype: String,
  #[serde(default)]
  pub date_modified: Option<u64>,
  #[serde(default)]
  pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamMarker {
  pub request_id: u64,
  #[serde(default)]
  pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileThumbnail {
  pub request_id: u64,
  pub path: String,
  #[serde(default)]
  pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileError {
  pub request_id: u64,
  #[serde(default)]
  pub path: String,
  #[serde(default, alias = "error")]
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PasteScan {
  pub request_id: u64,
  #[serde(default)]
  pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PasteFile {
  pub request_id: u64,
  #[serde(default)]
  pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PasteComplete {
  pub request_id: u64,
  #[serde(default)]
  pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PasteConflict {
  pub request_id: u64,
  pub src: String,
  pub dest: String,
}

/// Paths the backend's filesystem watcher saw change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileChange {
  #[serde(default)]
  pub paths: Vec<String>,
}

/// Flat listing item returned by `list_directory_contents`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileItem {
  pub name: String,
  pub path: String,
  pub is_dir: bool,
  #[serde(default)]
  pub size: Option<u64>,
}

/// Recursive tree returned by `get_tree_from_root`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileNode {
  pub name: String,
  pub path: String,
  #[serde(default)]
  pub is_dir: bool,
  #[serde(default)]
  pub children: Option<Vec<FileNode>>,
}

pub type QuickAccess = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveKind {
  Path,
  Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolveResult {
  pub kind: ResolveKind,
  pub value: String,
}
