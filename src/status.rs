use crate::constants::constants;

/// Status categories projected from controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
  Idle,
  Loading,
  Playing,
  Paused,
  Buffering,
  Error,
}

/// Colour class of the status dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
  Loading,
  Playing,
  Paused,
  Error,
}

impl StatusKind {
  pub fn indicator(self) -> Indicator {
    match self {
      StatusKind::Idle | StatusKind::Loading | StatusKind::Buffering => Indicator::Loading,
      StatusKind::Playing => Indicator::Playing,
      StatusKind::Paused => Indicator::Paused,
      StatusKind::Error => Indicator::Error,
    }
  }

  pub fn default_message(self) -> &'static str {
    match self {
      StatusKind::Idle => "Idle • ready for commands",
      StatusKind::Loading => "Linking to the audio stream…",
      StatusKind::Playing => "Streaming steady • lightweight mode",
      StatusKind::Paused => "Paused • press Play to resume",
      StatusKind::Buffering => "Buffering… optimizing connection",
      StatusKind::Error => "Stream connection interrupted",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
  pub kind: StatusKind,
  pub message: String,
}

impl StatusLine {
  pub fn new(kind: StatusKind, message: Option<&str>) -> Self {
    Self { kind, message: message.unwrap_or(kind.default_message()).to_string() }
  }

  pub fn indicator(&self) -> Indicator {
    self.kind.indicator()
  }
}

impl Default for StatusLine {
  fn default() -> Self {
    Self::new(StatusKind::Idle, None)
  }
}

/// Engine origin and endpoint, refreshed on the slow status tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalInfo {
  pub origin: String,
  pub endpoint: String,
}

impl Default for TerminalInfo {
  fn default() -> Self {
    Self { origin: constants().engine_origin.clone(), endpoint: "not available yet".to_string() }
  }
}

impl TerminalInfo {
  pub fn new(origin: &str) -> Self {
    let origin = if origin.is_empty() { constants().engine_origin.clone() } else { origin.to_string() };
    Self { origin, ..Self::default() }
  }

  /// Re-read the engine endpoint. `None` means no engine is loaded.
  pub fn refresh(&mut self, endpoint: Option<String>) {
    self.endpoint = endpoint.unwrap_or_else(|| "not available yet".to_string());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn idle_and_buffering_share_loading_dot() {
    assert_eq!(StatusKind::Idle.indicator(), Indicator::Loading);
    assert_eq!(StatusKind::Buffering.indicator(), Indicator::Loading);
    assert_eq!(StatusKind::Error.indicator(), Indicator::Error);
  }

  #[test]
  fn custom_message_overrides_default() {
    let line = StatusLine::new(StatusKind::Paused, Some("Playback finished"));
    assert_eq!(line.message, "Playback finished");
    assert_eq!(StatusLine::new(StatusKind::Paused, None).message, StatusKind::Paused.default_message());
  }

  #[test]
  fn terminal_info_tracks_endpoint() {
    let mut info = TerminalInfo::new("");
    assert_eq!(info.origin, constants().engine_origin);
    info.refresh(Some("/tmp/sock".to_string()));
    assert_eq!(info.endpoint, "/tmp/sock");
    info.refresh(None);
    assert_eq!(info.endpoint, "not available yet");
  }
}
