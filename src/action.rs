#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
  Quit,
  MoveUp,
  MoveDown,
  MoveLeft,
  MoveRight,
  ExtendUp,
  ExtendDown,
  GoToTop,
  GoToBottom,
  PageUp,
  PageDown,
  Open,
  HistoryBack,
  HistoryForward,
  GoUp,
  GoHome,
  Refresh,
  NewTab,
  CloseTab,
  DuplicateTab,
  NextTab,
  PrevTab,
  SelectAll,
  ClearSelection,
  Copy,
  Cut,
  Paste,
  NewFile,
  NewDirectory,
  Rename,
  Delete,
  MoveTo,
  CycleSort,
  ToggleSortDirection,
  ToggleHidden,
  ToggleExtensions,
  ToggleViewMode,
  CycleIconSize,
  FocusSidebar,
  ShrinkSidebar,
  GrowSidebar,
  CommandStart,
  GPress,
  PromptInput(char),
  PromptBackspace,
  PromptConfirm,
  PromptCancel,
  ConflictNext,
  ConflictPrev,
  ConflictToggleRepeat,
  ConflictConfirm,
  ConflictEscape,
  ErrorClose,
  Resize(u16, u16),
  Tick,
  None,
}

impl Action {
  pub fn from_name(name: &str) -> Option<Action> {
    match name {
      "quit" => Some(Action::Quit),
      "move_up" => Some(Action::MoveUp),
      "move_down" => Some(Action::MoveDown),
      "move_left" => Some(Action::MoveLeft),
      "move_right" => Some(Action::MoveRight),
      "extend_up" => Some(Action::ExtendUp),
      "extend_down" => Some(Action::ExtendDown),
      "go_to_top" => Some(Action::GoToTop),
      "go_to_bottom" => Some(Action::GoToBottom),
      "page_up" => Some(Action::PageUp),
      "page_down" => Some(Action::PageDown),
      "open" => Some(Action::Open),
      "history_back" => Some(Action::HistoryBack),
      "history_forward" => Some(Action::HistoryForward),
      "go_up" => Some(Action::GoUp),
      "go_home" => Some(Action::GoHome),
      "refresh" => Some(Action::Refresh),
      "new_tab" => Some(Action::NewTab),
      "close_tab" => Some(Action::CloseTab),
      "duplicate_tab" => Some(Action::DuplicateTab),
      "next_tab" => Some(Action::NextTab),
      "prev_tab" => Some(Action::PrevTab),
      "select_all" => Some(Action::SelectAll),
      "clear_selection" => Some(Action::ClearSelection),
      "copy" => Some(Action::Copy),
      "cut" => Some(Action::Cut),
      "paste" => Some(Action::Paste),
      "new_file" => Some(Action::NewFile),
      "new_directory" => Some(Action::NewDirectory),
      "rename" => Some(Action::Rename),
      "delete" => Some(Action::Delete),
      "move_to" => Some(Action::MoveTo),
      "cycle_sort" => Some(Action::CycleSort),
      "toggle_sort_direction" => Some(Action::ToggleSortDirection),
      "toggle_hidden" => Some(Action::ToggleHidden),
      "toggle_extensions" => Some(Action::ToggleExtensions),
      "toggle_view_mode" => Some(Action::ToggleViewMode),
      "cycle_icon_size" => Some(Action::CycleIconSize),
      "focus_sidebar" => Some(Action::FocusSidebar),
      "shrink_sidebar" => Some(Action::ShrinkSidebar),
      "grow_sidebar" => Some(Action::GrowSidebar),
      "command" => Some(Action::CommandStart),
      "g_press" => Some(Action::GPress),
      "none" => Some(Action::None),
      _ => None,
    }
  }
}
