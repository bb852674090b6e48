use anyhow::Result;
use ratatui::style::Color;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

// --- Palettes ---

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub playing: Color,
  pub paused: Color,
  pub loading: Color,
  pub bar_fill: Color,
  pub bar_empty: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static LIGHT: Theme = Theme {
  name: "light",
  bg: Color::Rgb(250, 248, 245),
  fg: Color::Rgb(40, 42, 54),
  accent: Color::Rgb(214, 48, 49),
  muted: Color::Rgb(128, 128, 140),
  border: Color::Rgb(200, 196, 190),
  status: Color::Rgb(0, 122, 153),
  error: Color::Rgb(192, 28, 40),
  playing: Color::Rgb(46, 160, 67),
  paused: Color::Rgb(191, 135, 0),
  loading: Color::Rgb(88, 101, 242),
  bar_fill: Color::Rgb(214, 48, 49),
  bar_empty: Color::Rgb(225, 221, 215),
  key_fg: Color::Rgb(250, 248, 245),
  key_bg: Color::Rgb(88, 88, 100),
};

pub static DARK: Theme = Theme {
  name: "dark",
  bg: Color::Rgb(24, 24, 30),
  fg: Color::Rgb(230, 230, 235),
  accent: Color::Rgb(255, 85, 85),
  muted: Color::Rgb(120, 120, 135),
  border: Color::Rgb(60, 60, 72),
  status: Color::Rgb(139, 233, 253),
  error: Color::Rgb(255, 110, 110),
  playing: Color::Rgb(80, 250, 123),
  paused: Color::Rgb(241, 250, 140),
  loading: Color::Rgb(189, 147, 249),
  bar_fill: Color::Rgb(255, 85, 85),
  bar_empty: Color::Rgb(52, 52, 64),
  key_fg: Color::Rgb(24, 24, 30),
  key_bg: Color::Rgb(170, 170, 185),
};

// --- Preference ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
  Light,
  Dark,
  #[default]
  Auto,
}

impl ThemePreference {
  pub const ALL: [ThemePreference; 3] = [ThemePreference::Light, ThemePreference::Dark, ThemePreference::Auto];

  pub fn as_str(self) -> &'static str {
    match self {
      ThemePreference::Light => "light",
      ThemePreference::Dark => "dark",
      ThemePreference::Auto => "auto",
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

impl fmt::Display for ThemePreference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ThemePreference {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "light" => Ok(ThemePreference::Light),
      "dark" => Ok(ThemePreference::Dark),
      "auto" => Ok(ThemePreference::Auto),
      _ => Err(()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
  Light,
  Dark,
}

/// Sample the OS colour scheme. Unknown or failed detection counts as light.
pub fn detect_system_scheme() -> ColorScheme {
  match dark_light::detect() {
    Ok(dark_light::Mode::Dark) => ColorScheme::Dark,
    Ok(_) => ColorScheme::Light,
    Err(e) => {
      debug!(err = %e, "theme: system scheme detection failed");
      ColorScheme::Light
    }
  }
}

/// Persistent home of the single preference string.
pub trait PreferenceStore {
  fn load(&self) -> Option<String>;
  fn save(&mut self, value: &str) -> Result<()>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Box<S> {
  fn load(&self) -> Option<String> {
    (**self).load()
  }

  fn save(&mut self, value: &str) -> Result<()> {
    (**self).save(value)
  }
}

pub struct ThemeController<S: PreferenceStore> {
  store: S,
  preference: ThemePreference,
  system: ColorScheme,
  resolved: ColorScheme,
}

impl<S: PreferenceStore> ThemeController<S> {
  /// Restore the stored preference. Missing or invalid values fall back to `auto`
  /// without being written back.
  pub fn init(store: S, system: ColorScheme) -> Self {
    let preference = store.load().and_then(|raw| raw.trim().parse().ok()).unwrap_or_default();
    let mut controller = Self { store, preference, system, resolved: system };
    controller.resolve();
    controller
  }

  pub fn preference(&self) -> ThemePreference {
    self.preference
  }

  pub fn resolved(&self) -> ColorScheme {
    self.resolved
  }

  pub fn theme(&self) -> &'static Theme {
    match self.resolved {
      ColorScheme::Light => &LIGHT,
      ColorScheme::Dark => &DARK,
    }
  }

  fn resolve(&mut self) {
    self.resolved = match self.preference {
      ThemePreference::Light => ColorScheme::Light,
      ThemePreference::Dark => ColorScheme::Dark,
      ThemePreference::Auto => self.system,
    };
  }

  /// Apply an explicit choice and persist the raw preference.
  pub fn select(&mut self, preference: ThemePreference) {
    self.preference = preference;
    if let Err(e) = self.store.save(preference.as_str()) {
      warn!(err = %e, "theme: unable to store preference");
    }
    self.resolve();
  }

  pub fn cycle(&mut self) {
    self.select(self.preference.next());
  }

  /// New system scheme signal. Only re-resolves while `auto` is selected; never persists.
  pub fn on_system_scheme(&mut self, scheme: ColorScheme) {
    if scheme == self.system {
      return;
    }
    self.system = scheme;
    if self.preference == ThemePreference::Auto {
      self.resolve();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct MemoryStore {
    value: Option<String>,
    writes: usize,
  }

  impl PreferenceStore for MemoryStore {
    fn load(&self) -> Option<String> {
      self.value.clone()
    }

    fn save(&mut self, value: &str) -> Result<()> {
      self.value = Some(value.to_string());
      self.writes += 1;
      Ok(())
    }
  }

  fn stored(value: &str) -> MemoryStore {
    MemoryStore { value: Some(value.to_string()), writes: 0 }
  }

  #[test]
  fn missing_preference_defaults_to_auto_without_writing() {
    let t = ThemeController::init(MemoryStore::default(), ColorScheme::Dark);
    assert_eq!(t.preference(), ThemePreference::Auto);
    assert_eq!(t.resolved(), ColorScheme::Dark);
    assert_eq!(t.store.writes, 0);
    assert_eq!(t.store.value, None);
  }

  #[test]
  fn invalid_preference_defaults_to_auto() {
    let t = ThemeController::init(stored("solarized"), ColorScheme::Light);
    assert_eq!(t.preference(), ThemePreference::Auto);
    assert_eq!(t.store.value.as_deref(), Some("solarized"));
  }

  #[test]
  fn stored_preference_is_restored() {
    let t = ThemeController::init(stored("dark"), ColorScheme::Light);
    assert_eq!(t.preference(), ThemePreference::Dark);
    assert_eq!(t.theme().name, "dark");
  }

  #[test]
  fn auto_follows_system_flip_without_persisting() {
    let mut t = ThemeController::init(MemoryStore::default(), ColorScheme::Light);
    assert_eq!(t.resolved(), ColorScheme::Light);
    t.on_system_scheme(ColorScheme::Dark);
    assert_eq!(t.resolved(), ColorScheme::Dark);
    assert_eq!(t.store.writes, 0);
  }

  #[test]
  fn explicit_choice_ignores_system_flip() {
    let mut t = ThemeController::init(MemoryStore::default(), ColorScheme::Light);
    t.select(ThemePreference::Light);
    t.on_system_scheme(ColorScheme::Dark);
    assert_eq!(t.resolved(), ColorScheme::Light);
    // Switching back to auto picks up the scheme seen while it was overridden.
    t.select(ThemePreference::Auto);
    assert_eq!(t.resolved(), ColorScheme::Dark);
  }

  #[test]
  fn selecting_persists_raw_preference() {
    let mut t = ThemeController::init(MemoryStore::default(), ColorScheme::Dark);
    t.select(ThemePreference::Auto);
    assert_eq!(t.store.value.as_deref(), Some("auto"));
    t.cycle();
    assert_eq!(t.store.value.as_deref(), Some("light"));
    assert_eq!(t.store.writes, 2);
  }

  #[test]
  fn preference_cycle_order() {
    assert_eq!(ThemePreference::Light.next(), ThemePreference::Dark);
    assert_eq!(ThemePreference::Dark.next(), ThemePreference::Auto);
    assert_eq!(ThemePreference::Auto.next(), ThemePreference::Light);
  }
}
