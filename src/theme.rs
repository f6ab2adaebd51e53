use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
  pub accent: Color,
  pub text: Color,
  pub text_dim: Color,
  pub border: Color,
  pub title_inactive: Color,
  pub directory: Color,
  pub bg_selected: Color,
  pub bg_cursor: Color,
  pub bg_overlay: Color,
  pub bg_bar: Color,
  pub rubber_band: Color,
  pub success: Color,
  pub warning: Color,
  pub error: Color,
  pub info: Color,
}

impl Theme {
  pub fn dark() -> Self {
    Self {
      accent: Color::Indexed(75),
      text: Color::Indexed(252),
      text_dim: Color::DarkGray,
      border: Color::Indexed(240),
      title_inactive: Color::Indexed(245),
      directory: Color::Indexed(110),
      bg_selected: Color::Indexed(24),
      bg_cursor: Color::Indexed(236),
      bg_overlay: Color::Indexed(235),
      bg_bar: Color::Indexed(236),
      rubber_band: Color::Indexed(67),
      success: Color::Indexed(114),
      warning: Color::Indexed(214),
      error: Color::Indexed(167),
      info: Color::Indexed(150),
    }
  }

  pub fn light() -> Self {
    Self {
      accent: Color::Indexed(27),
      text: Color::Indexed(235),
      text_dim: Color::Indexed(243),
      border: Color::Indexed(250),
      title_inactive: Color::Indexed(243),
      directory: Color::Indexed(25),
      bg_selected: Color::Indexed(153),
      bg_cursor: Color::Indexed(254),
      bg_overlay: Color::Indexed(255),
      bg_bar: Color::Indexed(253),
      rubber_band: Color::Indexed(111),
      success: Color::Indexed(28),
      warning: Color::Indexed(172),
      error: Color::Indexed(124),
      info: Color::Indexed(30),
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "dark" => Some(Self::dark()),
      "light" => Some(Self::light()),
      _ => None,
    }
  }

  pub fn available_themes() -> &'static [&'static str] {
    &["dark", "light"]
  }
}

impl Default for Theme {
  fn default() -> Self {
    Self::dark()
  }
}
