use indexmap::IndexSet;
use tracing::trace;

pub const DEFAULT_DRAG_THRESHOLD: f32 = 4.0;

/// Pointer position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  fn distance(self, other: Point) -> f32 {
    ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
  }
}

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl Rect {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self { x, y, width, height }
  }

  pub fn from_corners(a: Point, b: Point) -> Self {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  /// Overlap test; touching edges count.
  pub fn intersects(&self, other: &Rect) -> bool {
    self.x <= other.right()
      && other.x <= self.right()
      && self.y <= other.bottom()
      && other.y <= self.bottom()
  }

  pub fn contains(&self, p: Point) -> bool {
    p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
  }
}

/// Where a selectable item was last drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBounds {
  pub index: usize,
  pub path: String,
  pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
  /// Ctrl, or Cmd on macOS.
  pub ctrl: bool,
  pub shift: bool,
}

impl Modifiers {
  pub const NONE: Modifiers = Modifiers { ctrl: false, shift: false };
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
  Idle,
  Pending { start: Point, ctrl: bool },
  Dragging { start: Point, current: Point, base: IndexSet<String> },
}

/// How a pointer gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEnd {
  /// No gesture was in progress.
  None,
  /// Never crossed the threshold; a click follows.
  Click,
  /// A rectangle selection finished; the following click is swallowed.
  Drag,
}

/// Maps pointer and keyboard input over the displayed sequence to a set of
/// selected paths.
#[derive(Debug, Clone)]
pub struct SelectionController {
  selected: IndexSet<String>,
  anchor: Option<usize>,
  focus: Option<usize>,
  gesture: Gesture,
  just_dragged: bool,
  threshold: f32,
}

impl Default for SelectionController {
  fn default() -> Self {
    Self::new(DEFAULT_DRAG_THRESHOLD)
  }
}

impl SelectionController {
  pub fn new(threshold: f32) -> Self {
    Self {
      selected: IndexSet::new(),
      anchor: None,
      focus: None,
      gesture: Gesture::Idle,
      just_dragged: false,
      threshold,
    }
  }

  pub fn set_threshold(&mut self, threshold: f32) {
    self.threshold = threshold;
  }

  pub fn is_selected(&self, path: &str) -> bool {
    self.selected.contains(path)
  }

  pub fn len(&self) -> usize {
    self.selected.len()
  }

  pub fn is_empty(&self) -> bool {
    self.selected.is_empty()
  }

  #[cfg(test)]
  pub fn anchor(&self) -> Option<usize> {
    self.anchor
  }

  pub fn focus(&self) -> Option<usize> {
    self.focus
  }

  #[cfg(test)]
  fn is_dragging(&self) -> bool {
    matches!(self.gesture, Gesture::Dragging { .. })
  }

  /// The live rubber band, while a drag is in progress.
  pub fn drag_rect(&self) -> Option<Rect> {
    match &self.gesture {
      Gesture::Dragging { start, current, .. } => Some(Rect::from_corners(*start, *current)),
      _ => None,
    }
  }

  /// Selected paths in the order of `sequence`.
  pub fn selected_in_order<S: AsRef<str>>(&self, sequence: &[S]) -> Vec<String> {
    sequence
      .iter()
      .map(AsRef::as_ref)
      .filter(|p| self.selected.contains(*p))
      .map(str::to_string)
      .collect()
  }

  /// Mouse-down. Returns whether the selection changed.
  pub fn pointer_down(&mut self, at: Point, modifiers: Modifiers, hit: Option<usize>) -> bool {
    self.just_dragged = false;
    self.gesture = Gesture::Pending { start: at, ctrl: modifiers.ctrl };

    if hit.is_none() && !modifiers.ctrl {
      self.anchor = None;
      if !self.selected.is_empty() {
        self.selected.clear();
        return true;
      }
    }
    false
  }

  /// Mouse-move. `items` are the bounds of every selectable item drawn.
  pub fn pointer_move(&mut self, at: Point, items: &[ItemBounds]) -> bool {
    let start = match &self.gesture {
      Gesture::Idle => return false,
      Gesture::Pending { start, ctrl } => {
        if start.distance(at) <= self.threshold {
          return false;
        }
        let base = if *ctrl { self.selected.clone() } else { IndexSet::new() };
        let start = *start;
        trace!(event = "selection.drag_started", base = base.len());
        self.gesture = Gesture::Dragging { start, current: at, base };
        start
      }
      Gesture::Dragging { start, .. } => *start,
    };

    let band = Rect::from_corners(start, at);
    let Gesture::Dragging { current, base, .. } = &mut self.gesture else {
      return false;
    };
    *current = at;

    let mut next = base.clone();
    for item in items.iter().filter(|item| band.intersects(&item.rect)) {
      next.insert(item.path.clone());
    }

    if next == self.selected {
      return false;
    }
    self.selected = next;
    true
  }

  /// Mouse-up.
  pub fn pointer_up(&mut self) -> GestureEnd {
    match std::mem::replace(&mut self.gesture, Gesture::Idle) {
      Gesture::Idle => GestureEnd::None,
      Gesture::Pending { .. } => GestureEnd::Click,
      Gesture::Dragging { .. } => {
        self.just_dragged = true;
        trace!(event = "selection.drag_finished", selected = self.selected.len());
        GestureEnd::Drag
      }
    }
  }

  /// Click on the item at `hit` within `sequence`. A click right after a
  /// drag is swallowed. Returns whether the selection changed.
  pub fn click<S: AsRef<str>>(&mut self, hit: Option<usize>, modifiers: Modifiers, sequence: &[S]) -> bool {
    if std::mem::take(&mut self.just_dragged) {
      return false;
    }
    let Some(index) = hit else { return false };
    let Some(path) = sequence.get(index).map(AsRef::as_ref) else { return false };

    if modifiers.shift
      && let Some(anchor) = self.anchor
    {
      self.select_range(anchor, index, sequence);
      self.focus = Some(index);
      return true;
    }

    if modifiers.ctrl {
      if !self.selected.shift_remove(path) {
        self.selected.insert(path.to_string());
      }
    } else {
      self.selected.clear();
      self.selected.insert(path.to_string());
    }
    self.anchor = Some(index);
    self.focus = Some(index);
    true
  }

  pub fn select_all<S: AsRef<str>>(&mut self, sequence: &[S]) -> bool {
    let all: IndexSet<String> = sequence.iter().map(|s| s.as_ref().to_string()).collect();
    if all == self.selected {
      return false;
    }
    self.selected = all;
    true
  }

  pub fn clear(&mut self) -> bool {
    self.anchor = None;
    self.focus = None;
    self.gesture = Gesture::Idle;
    self.just_dragged = false;
    if self.selected.is_empty() {
      return false;
    }
    self.selected.clear();
    true
  }

  /// The displayed sequence is being rebuilt (new listing, re-sort, hidden
  /// toggle). Selected paths, focus and any gesture in flight are dropped.
  /// The anchor index is kept as is and may now point at a different item;
  /// range selection clamps it to the new sequence.
  pub fn rebuild(&mut self) {
    self.selected.clear();
    self.focus = None;
    self.gesture = Gesture::Idle;
    self.just_dragged = false;
  }

  /// Keyboard step: moves the focus by `delta`, selecting the focused item,
  /// or the range from the anchor when `extend` is set.
  pub fn step<S: AsRef<str>>(&mut self, delta: isize, extend: bool, sequence: &[S]) -> bool {
    if sequence.is_empty() {
      return false;
    }
    let last = sequence.len() - 1;
    let target = match self.focus {
      Some(f) => f.min(last).saturating_add_signed(delta).min(last),
      None if delta < 0 => last,
      None => 0,
    };
    self.jump(target, extend, sequence)
  }

  /// Moves the focus to `index` with the same rules as [`Self::step`].
  pub fn jump<S: AsRef<str>>(&mut self, index: usize, extend: bool, sequence: &[S]) -> bool {
    if sequence.is_empty() {
      return false;
    }
    let target = index.min(sequence.len() - 1);
    self.just_dragged = false;

    if extend {
      let anchor = *self.anchor.get_or_insert(self.focus.unwrap_or(target));
      self.select_range(anchor, target, sequence);
      self.focus = Some(target);
      return true;
    }
    self.click(Some(target), Modifiers::NONE, sequence)
  }

  fn select_range<S: AsRef<str>>(&mut self, anchor: usize, index: usize, sequence: &[S]) {
    let last = sequence.len().saturating_sub(1);
    let (lo, hi) = if anchor <= index { (anchor, index) } else { (index, anchor) };
    let (lo, hi) = (lo.min(last), hi.min(last));
    self.selected = sequence[lo..=hi].iter().map(|s| s.as_ref().to_string()).collect();
  }
}
