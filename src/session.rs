use crate::widget::{SessionId, WidgetState};

/// Device class the player is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceProfile {
  #[default]
  Standard,
  /// Mobile-like: must start muted and gets buffering recovery on flaky networks.
  Constrained,
}

impl DeviceProfile {
  pub fn is_constrained(self) -> bool {
    self == DeviceProfile::Constrained
  }
}

/// Fields describing the one loaded track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSession {
  pub id: SessionId,
  pub video_id: Option<String>,
  pub duration: f64,
  pub is_playing: bool,
  pub is_looping: bool,
  /// A play was requested and not yet confirmed by the engine.
  pub pending_play: bool,
  /// Started muted on a constrained device; unmute on the next real gesture.
  pub awaiting_unmute: bool,
}

impl PlaybackSession {
  /// Fresh session for a newly loaded track. The loop toggle carries over.
  pub fn start(id: SessionId, video_id: String, previous: &PlaybackSession, profile: DeviceProfile) -> Self {
    Self {
      id,
      video_id: Some(video_id),
      duration: 0.0,
      is_playing: false,
      is_looping: previous.is_looping,
      pending_play: true,
      awaiting_unmute: profile.is_constrained(),
    }
  }

  pub fn is_active(&self) -> bool {
    self.video_id.is_some()
  }
}

/// Where the player is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
  #[default]
  Idle,
  Loading,
  Ready,
  Playing,
  Paused,
  Buffering,
  /// Track finished. With loop on this is transient until the replay is confirmed.
  Ended,
  Error,
}

impl Phase {
  /// Transition driven by an engine state report.
  pub fn on_widget_state(self, state: WidgetState) -> Phase {
    if self == Phase::Idle {
      return Phase::Idle;
    }
    match state {
      WidgetState::Playing => Phase::Playing,
      WidgetState::Paused => Phase::Paused,
      WidgetState::Buffering => Phase::Buffering,
      WidgetState::Ended => Phase::Ended,
      WidgetState::Cued => Phase::Ready,
      WidgetState::Unstarted => self,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Phase::Idle => "idle",
      Phase::Loading => "loading",
      Phase::Ready => "ready",
      Phase::Playing => "playing",
      Phase::Paused => "paused",
      Phase::Buffering => "buffering",
      Phase::Ended => "ended",
      Phase::Error => "error",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn playing_and_paused_alternate() {
    let p = Phase::Ready.on_widget_state(WidgetState::Playing);
    assert_eq!(p, Phase::Playing);
    let p = p.on_widget_state(WidgetState::Paused);
    assert_eq!(p, Phase::Paused);
    assert_eq!(p.on_widget_state(WidgetState::Playing), Phase::Playing);
  }

  #[test]
  fn buffering_resolves_either_way() {
    assert_eq!(Phase::Playing.on_widget_state(WidgetState::Buffering), Phase::Buffering);
    assert_eq!(Phase::Buffering.on_widget_state(WidgetState::Playing), Phase::Playing);
    assert_eq!(Phase::Buffering.on_widget_state(WidgetState::Paused), Phase::Paused);
  }

  #[test]
  fn ended_then_replay() {
    let p = Phase::Playing.on_widget_state(WidgetState::Ended);
    assert_eq!(p, Phase::Ended);
    assert_eq!(p.on_widget_state(WidgetState::Playing), Phase::Playing);
  }

  #[test]
  fn cued_means_ready_and_unstarted_keeps_phase() {
    assert_eq!(Phase::Loading.on_widget_state(WidgetState::Cued), Phase::Ready);
    assert_eq!(Phase::Loading.on_widget_state(WidgetState::Unstarted), Phase::Loading);
  }

  #[test]
  fn idle_ignores_engine_reports() {
    assert_eq!(Phase::Idle.on_widget_state(WidgetState::Playing), Phase::Idle);
  }

  #[test]
  fn error_recovers_on_new_report() {
    assert_eq!(Phase::Error.on_widget_state(WidgetState::Playing), Phase::Playing);
  }

  #[test]
  fn new_session_keeps_loop_and_requests_play() {
    let previous = PlaybackSession { is_looping: true, is_playing: true, ..Default::default() };
    let s = PlaybackSession::start(SessionId(7), "abc".to_string(), &previous, DeviceProfile::Constrained);
    assert!(s.is_looping && s.pending_play && s.awaiting_unmute);
    assert!(!s.is_playing);
    assert_eq!(s.id, SessionId(7));
    assert!(s.is_active());
  }
}
