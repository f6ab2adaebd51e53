use tracing::debug;

use crate::backend::protocol::{Call, FileItem, FileNode, QuickAccess};
use crate::tab::{is_home_view, same_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
  QuickAccess,
  Tree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarRow {
  pub kind: RowKind,
  pub depth: usize,
  pub name: String,
  pub path: String,
  /// Directory whose children are known and shown.
  pub expanded: bool,
}

/// Quick-access shortcuts plus the directory tree down to the working dir.
#[derive(Debug, Default)]
pub struct Sidebar {
  quick_access: Vec<(String, String)>,
  tree: Option<FileNode>,
  rows: Vec<SidebarRow>,
  pub cursor: usize,
  pub scroll: usize,
  pub focused: bool,
  requested_for: Option<String>,
  tree_call: Option<u64>,
  /// Call id and path of the directory being expanded.
  children_call: Option<(u64, String)>,
}

impl Sidebar {
  pub fn rows(&self) -> &[SidebarRow] {
    &self.rows
  }

  /// Call id of the tree request in flight.
  pub fn pending_tree_call(&self) -> Option<u64> {
    self.tree_call
  }

  /// The tree call for `working_dir`, unless it was already requested.
  /// The home view is not a real directory and keeps the current tree.
  pub fn request_tree(&mut self, working_dir: &str) -> Option<Call> {
    if is_home_view(working_dir) {
      return None;
    }
    if self.requested_for.as_deref().is_some_and(|d| same_dir(d, working_dir)) {
      return None;
    }
    self.requested_for = Some(working_dir.to_string());
    Some(Call::GetTreeFromRoot { target_path: working_dir.to_string() })
  }

  pub fn set_tree_call(&mut self, id: u64) {
    self.tree_call = Some(id);
  }

  /// Forget the last request so the next one goes out again.
  pub fn invalidate(&mut self) {
    self.requested_for = None;
  }

  /// Applies a tree reply. Replies to superseded requests are ignored.
  pub fn set_tree(&mut self, call_id: u64, tree: FileNode) -> bool {
    if self.tree_call != Some(call_id) {
      return false;
    }
    self.tree_call = None;
    self.tree = Some(tree);
    self.rebuild();
    true
  }

  /// Lists the children of the tree row under the cursor, unless they are
  /// already shown.
  pub fn expand(&self) -> Option<Call> {
    let row = self.selected().filter(|r| r.kind == RowKind::Tree && !r.expanded)?;
    Some(Call::ListDirectoryContents { path: row.path.clone() })
  }

  pub fn set_children_call(&mut self, id: u64, path: String) {
    self.children_call = Some((id, path));
  }

  /// Applies a directory listing to the row it was requested for. Only
  /// directories become rows.
  pub fn set_children(&mut self, call_id: u64, items: Vec<FileItem>) -> bool {
    let Some((id, path)) = self.children_call.take() else { return false };
    if id != call_id {
      self.children_call = Some((id, path));
      return false;
    }
    let children: Vec<FileNode> = items
      .into_iter()
      .filter(|item| item.is_dir)
      .map(|item| FileNode { name: item.name, path: item.path, is_dir: true, children: None })
      .collect();
    debug!(event = "sidebar.expanded", path = %path, children = children.len());
    let Some(node) = self.tree.as_mut().and_then(|t| find_node(t, &path)) else { return false };
    node.children = Some(children);
    self.rebuild();
    self.reveal(&path);
    true
  }

  /// Hides the children of the expanded tree row under the cursor.
  pub fn collapse(&mut self) -> bool {
    let Some(path) = self.selected().filter(|r| r.kind == RowKind::Tree && r.expanded).map(|r| r.path.clone())
    else {
      return false;
    };
    let Some(node) = self.tree.as_mut().and_then(|t| find_node(t, &path)) else { return false };
    node.children = None;
    self.rebuild();
    self.reveal(&path);
    true
  }

  pub fn set_quick_access(&mut self, entries: QuickAccess) {
    let mut list: Vec<(String, String)> = entries.into_iter().collect();
    list.sort_by_key(|(name, _)| name.to_lowercase());
    self.quick_access = list;
    self.rebuild();
  }

  pub fn move_cursor(&mut self, delta: isize) {
    if self.rows.is_empty() {
      self.cursor = 0;
      return;
    }
    let last = self.rows.len() - 1;
    self.cursor = self.cursor.saturating_add_signed(delta).min(last);
  }

  pub fn selected(&self) -> Option<&SidebarRow> {
    self.rows.get(self.cursor)
  }

  /// Moves the cursor onto the row for `path`, if shown.
  pub fn reveal(&mut self, path: &str) {
    if let Some(i) = self.rows.iter().position(|r| r.kind == RowKind::Tree && same_dir(&r.path, path)) {
      self.cursor = i;
    }
  }

  pub fn adjust_scroll(&mut self, visible: usize) {
    if visible == 0 {
      return;
    }
    if self.cursor < self.scroll {
      self.scroll = self.cursor;
    } else if self.cursor >= self.scroll + visible {
      self.scroll = self.cursor + 1 - visible;
    }
  }

  fn rebuild(&mut self) {
    let mut rows: Vec<SidebarRow> = self
      .quick_access
      .iter()
      .map(|(name, path)| SidebarRow {
        kind: RowKind::QuickAccess,
        depth: 0,
        name: name.clone(),
        path: path.clone(),
        expanded: false,
      })
      .collect();
    if let Some(tree) = &self.tree {
      flatten(tree, 0, &mut rows);
    }
    self.rows = rows;
    if let Some(dir) = self.requested_for.clone() {
      self.reveal(&dir);
    }
    self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
  }
}

fn flatten(node: &FileNode, depth: usize, out: &mut Vec<SidebarRow>) {
  let children = node.children.as_deref().unwrap_or_default();
  out.push(SidebarRow {
    kind: RowKind::Tree,
    depth,
    name: if node.name.is_empty() { node.path.clone() } else { node.name.clone() },
    path: node.path.clone(),
    expanded: node.children.is_some(),
  });
  for child in children.iter().filter(|c| c.is_dir) {
    flatten(child, depth + 1, out);
  }
}

fn find_node<'a>(node: &'a mut FileNode, path: &str) -> Option<&'a mut FileNode> {
  if same_dir(&node.path, path) {
    return Some(node);
  }
  node.children.as_mut()?.iter_mut().find_map(|child| find_node(child, path))
}
