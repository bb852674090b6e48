//! The playback controller: single owner of session state.
//!
//! Every play or resume request goes through [`PlaybackController::attempt_play`]. Engine
//! callbacks arrive through [`PlaybackController::handle_event`] and timers through
//! [`PlaybackController::advance_to`]; display components only read from the controller.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::constants::constants;
use crate::media_session::{MediaAction, MediaPlaybackState, MediaSession, TrackMetadata};
use crate::resolver::extract_video_id;
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};
use crate::session::{DeviceProfile, Phase, PlaybackSession};
use crate::status::{StatusKind, StatusLine};
use crate::widget::{
  ErrorCause, PlayOutcome, PlayerWidget, Quality, SessionId, WidgetConfig, WidgetEvent, WidgetFactory, WidgetState,
};

/// What caused a play attempt. Decides which notices a refusal may surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTrigger {
  /// Engine became ready after a load.
  Autoplay,
  /// Play/pause control.
  Toggle,
  /// Play action from media keys.
  MediaKey,
  /// First interaction anywhere while a play is pending.
  ResumeGesture,
  /// View became visible with a play pending.
  Visible,
  /// View became visible while already playing.
  KeepAlive,
  /// View hidden while playing.
  Background,
  Focus,
  /// Returned from suspension.
  PageRestore,
  BufferingRecovery,
  Loop,
}

impl PlayTrigger {
  /// Explicit user requests to start audio.
  pub fn is_gesture(self) -> bool {
    matches!(self, PlayTrigger::Toggle | PlayTrigger::MediaKey)
  }

  /// Whether a refusal replaces the status with a "tap play" notice.
  pub fn shows_block_notice(self) -> bool {
    matches!(self, PlayTrigger::Autoplay | PlayTrigger::Toggle | PlayTrigger::MediaKey)
  }

  fn status_message(self) -> &'static str {
    match self {
      PlayTrigger::Autoplay => "Stream initiated • lightweight mode",
      PlayTrigger::Toggle => "Resuming playback…",
      PlayTrigger::MediaKey => "Resuming from media controls",
      PlayTrigger::ResumeGesture => "Resuming after user interaction",
      PlayTrigger::Visible => "Resuming after returning",
      PlayTrigger::KeepAlive => "Keeping playback alive",
      PlayTrigger::Background => "Maintaining background playback",
      PlayTrigger::Focus => "Keeping playback active",
      PlayTrigger::PageRestore => "Resuming after return",
      PlayTrigger::BufferingRecovery => "Re-stabilizing stream…",
      PlayTrigger::Loop => "Loop active",
    }
  }
}

/// Timer callbacks the controller does not consume itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
  Position,
  Status,
}

pub struct PlaybackController {
  factory: Box<dyn WidgetFactory>,
  widget: Option<Box<dyn PlayerWidget>>,
  media: Box<dyn MediaSession>,
  scheduler: Scheduler,
  profile: DeviceProfile,
  session: PlaybackSession,
  phase: Phase,
  last_session: SessionId,
  refresh_timer: Option<TimerHandle>,
  retry_timer: Option<TimerHandle>,
  quality_timer: Option<TimerHandle>,
  /// Last quality sent to the current engine.
  quality: Option<Quality>,
  /// Trigger of the last attempt the engine left unresolved.
  pending_trigger: Option<PlayTrigger>,
  volume: u8,
  status: StatusLine,
  song_status: String,
  title: String,
  error: Option<String>,
  loading: bool,
  card_visible: bool,
}

impl PlaybackController {
  pub fn new(factory: Box<dyn WidgetFactory>, media: Box<dyn MediaSession>, profile: DeviceProfile) -> Self {
    Self {
      factory,
      widget: None,
      media,
      scheduler: Scheduler::new(),
      profile,
      session: PlaybackSession::default(),
      phase: Phase::Idle,
      last_session: SessionId::default(),
      refresh_timer: None,
      retry_timer: None,
      quality_timer: None,
      quality: None,
      pending_trigger: None,
      volume: constants().default_volume.min(100),
      status: StatusLine::default(),
      song_status: "Ready to play".to_string(),
      title: constants().idle_title.clone(),
      error: None,
      loading: false,
      card_visible: false,
    }
  }

  // --- Accessors ---

  pub fn session(&self) -> &PlaybackSession {
    &self.session
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn status(&self) -> &StatusLine {
    &self.status
  }

  pub fn song_status(&self) -> &str {
    &self.song_status
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn card_visible(&self) -> bool {
    self.card_visible
  }

  pub fn volume(&self) -> u8 {
    self.volume
  }

  pub fn profile(&self) -> DeviceProfile {
    self.profile
  }

  pub fn has_widget(&self) -> bool {
    self.widget.is_some()
  }

  pub fn duration(&self) -> f64 {
    self.session.duration
  }

  pub fn current_time(&self) -> f64 {
    self.widget.as_ref().map_or(0.0, |w| w.current_time())
  }

  pub fn endpoint(&self) -> Option<String> {
    self.widget.as_ref().and_then(|w| w.endpoint())
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn scheduler_mut(&mut self) -> &mut Scheduler {
    &mut self.scheduler
  }

  // --- Notices ---

  fn set_status(&mut self, kind: StatusKind, message: Option<&str>) {
    self.status = StatusLine::new(kind, message);
  }

  /// Show an error in the error box and the status line.
  pub fn show_error(&mut self, message: impl Into<String>) {
    let message = message.into();
    self.set_status(StatusKind::Error, Some(&message));
    self.error = Some(message);
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  fn set_loading(&mut self, loading: bool) {
    self.loading = loading;
    if loading {
      self.set_status(StatusKind::Loading, None);
    } else if !self.session.is_playing {
      self.set_status(StatusKind::Idle, None);
    }
  }

  fn publish_playback_state(&mut self) {
    let state = if !self.session.is_active() {
      MediaPlaybackState::None
    } else if self.session.is_playing {
      MediaPlaybackState::Playing
    } else {
      MediaPlaybackState::Paused
    };
    if let Err(e) = self.media.set_playback_state(state) {
      warn!(err = %e, "media session: failed to publish playback state");
    }
  }

  fn publish_metadata(&mut self) {
    let c = constants();
    let metadata =
      TrackMetadata { title: self.title.clone(), artist: c.media_artist.clone(), album: c.media_album.clone() };
    if let Err(e) = self.media.set_metadata(&metadata) {
      warn!(err = %e, "media session: failed to publish metadata");
    }
  }

  // --- Loading ---

  /// Validate a pasted link and load it. Invalid input only produces an inline error.
  pub fn submit_link(&mut self, raw: &str) {
    self.clear_error();
    let raw = raw.trim();
    if raw.is_empty() {
      self.show_error("Please provide a YouTube link first.");
      return;
    }
    match extract_video_id(raw) {
      Some(video_id) => self.load(&video_id),
      None => {
        debug!(input = %raw, "link rejected");
        self.show_error("That does not look like a valid YouTube link.");
      }
    }
  }

  /// Replace whatever is loaded with a new engine bound to `video_id`.
  pub fn load(&mut self, video_id: &str) {
    self.clear_error();
    self.set_loading(true);
    self.set_status(StatusKind::Loading, Some("Initializing player…"));

    self.teardown();

    self.last_session = SessionId(self.last_session.0 + 1);
    self.session = PlaybackSession::start(self.last_session, video_id.to_string(), &self.session, self.profile);
    self.phase = Phase::Loading;
    info!(video_id = %video_id, session = self.session.id.0, "loading track");

    let config = WidgetConfig { muted: self.profile.is_constrained(), ..WidgetConfig::audio_only() };
    match self.factory.create(self.session.id, video_id, &config) {
      Ok(widget) => self.widget = Some(widget),
      Err(e) => {
        error!(err = %e, "failed to create playback engine");
        self.loading = false;
        self.session.is_playing = false;
        self.session.pending_play = false;
        self.phase = Phase::Error;
        self.show_error(format!("Could not start the player: {:#}", e));
      }
    }
  }

  /// Destroy the engine and cancel every session timer. Safe to call repeatedly.
  pub fn teardown(&mut self) {
    if let Some(mut widget) = self.widget.take() {
      debug!(session = self.session.id.0, "destroying engine");
      widget.destroy();
    }
    self.scheduler.cancel_slot(&mut self.refresh_timer);
    self.scheduler.cancel_slot(&mut self.retry_timer);
    self.scheduler.cancel_slot(&mut self.quality_timer);
    self.quality = None;
    self.pending_trigger = None;
  }

  /// Tear down and reset everything, including the loop toggle and display.
  pub fn clear(&mut self) {
    self.teardown();
    self.session = PlaybackSession { id: self.last_session, ..PlaybackSession::default() };
    self.phase = Phase::Idle;
    self.loading = false;
    self.card_visible = false;
    self.title = constants().idle_title.clone();
    self.song_status = "Ready to play".to_string();
    self.clear_error();
    self.set_status(StatusKind::Idle, None);
    self.publish_playback_state();
    info!("player cleared");
  }

  // --- Engine callbacks ---

  /// Dispatch an engine event. Events from any session but the current one are dropped.
  pub fn handle_event(&mut self, session: SessionId, event: WidgetEvent) {
    if session != self.session.id || self.widget.is_none() {
      debug!(session = session.0, current = self.session.id.0, ?event, "ignoring late engine event");
      return;
    }
    match event {
      WidgetEvent::Ready => self.on_ready(),
      WidgetEvent::StateChange(state) => self.on_state_change(state),
      WidgetEvent::Error(code) => self.on_error(code),
      WidgetEvent::PlayBlocked => {
        let trigger = self.pending_trigger.take().unwrap_or(PlayTrigger::Autoplay);
        self.on_play_blocked(trigger);
      }
    }
  }

  fn on_ready(&mut self) {
    self.set_loading(false);
    self.begin_quality_reduction();

    let Some(widget) = self.widget.as_mut() else { return };
    self.session.duration = widget.duration().max(0.0);
    self.title = widget.title().filter(|t| !t.trim().is_empty()).unwrap_or_else(|| constants().fallback_title.clone());
    self.song_status = "Priming playback…".to_string();
    self.card_visible = true;
    self.phase = Phase::Ready;
    info!(title = %self.title, duration = self.session.duration, "engine ready");

    if self.profile.is_constrained()
      && let Err(e) = widget.mute()
    {
      warn!(err = %e, "unable to mute on constrained start");
    }
    // Volume only; unmuting waits for a real gesture.
    if let Err(e) = widget.set_volume(self.volume) {
      warn!(err = %e, "unable to apply volume");
    }

    self.publish_metadata();
    self.publish_playback_state();

    self.scheduler.cancel_slot(&mut self.refresh_timer);
    self.refresh_timer = Some(self.scheduler.every(constants().position_refresh(), TimerKind::PositionRefresh));

    self.attempt_play(PlayTrigger::Autoplay);
  }

  fn on_state_change(&mut self, state: WidgetState) {
    debug!(state = state.label(), "engine state change");
    if state != WidgetState::Buffering {
      self.scheduler.cancel_slot(&mut self.retry_timer);
    }
    self.phase = self.phase.on_widget_state(state);

    match state {
      WidgetState::Playing => self.mark_playing(None),
      WidgetState::Paused => {
        self.session.is_playing = false;
        self.session.pending_play = false;
        self.song_status = "Paused".to_string();
        self.set_status(StatusKind::Paused, None);
        self.publish_playback_state();
      }
      WidgetState::Buffering => {
        self.session.is_playing = false;
        self.session.pending_play = true;
        self.song_status = "Buffering…".to_string();
        self.set_status(StatusKind::Buffering, None);
        self.begin_quality_reduction();
        self.scheduler.cancel_slot(&mut self.retry_timer);
        if self.profile.is_constrained() {
          self.retry_timer = Some(self.scheduler.once(constants().buffering_retry(), TimerKind::BufferingRetry));
        }
      }
      WidgetState::Ended => {
        self.session.is_playing = false;
        if self.session.is_looping {
          self.session.pending_play = true;
          self.seek_to(0.0);
          self.attempt_play(PlayTrigger::Loop);
          self.song_status = "Looping…".to_string();
        } else {
          self.session.pending_play = false;
          self.song_status = "Playback finished".to_string();
          self.set_status(StatusKind::Paused, Some("Playback finished"));
          self.publish_playback_state();
        }
      }
      WidgetState::Cued => {
        self.session.is_playing = false;
        self.song_status = "Ready to play".to_string();
        self.set_status(StatusKind::Idle, None);
      }
      WidgetState::Unstarted => {}
    }
  }

  fn on_error(&mut self, code: i32) {
    self.loading = false;
    self.session.is_playing = false;
    self.session.pending_play = false;
    self.pending_trigger = None;
    self.scheduler.cancel_slot(&mut self.retry_timer);
    self.phase = Phase::Error;
    self.publish_playback_state();

    let cause = ErrorCause::from_code(code);
    warn!(code, ?cause, "engine reported an error");
    self.show_error(cause.message());
  }

  // --- Play funnel ---

  /// Issue a play command. Every start or resume goes through here.
  pub fn attempt_play(&mut self, trigger: PlayTrigger) {
    let Some(widget) = self.widget.as_mut() else { return };
    match widget.play() {
      Ok(PlayOutcome::Confirmed) => {
        debug!(?trigger, "play confirmed");
        self.phase = Phase::Playing;
        self.mark_playing(Some(trigger.status_message()));
      }
      Ok(PlayOutcome::Pending) => {
        debug!(?trigger, "play pending");
        self.session.pending_play = true;
        self.pending_trigger = Some(trigger);
      }
      Ok(PlayOutcome::Rejected) => self.on_play_blocked(trigger),
      Err(e) => {
        error!(err = %e, ?trigger, "play command failed");
        self.on_play_blocked(trigger);
        if trigger.shows_block_notice() {
          self.set_status(StatusKind::Error, Some("Unable to start playback. Try again."));
        }
        if trigger.is_gesture() {
          self.show_error("Could not start audio playback. Please try again.");
        }
      }
    }
  }

  fn mark_playing(&mut self, message: Option<&str>) {
    self.session.is_playing = true;
    self.session.pending_play = false;
    self.session.awaiting_unmute = false;
    self.pending_trigger = None;
    self.scheduler.cancel_slot(&mut self.retry_timer);
    self.song_status = "Playing…".to_string();
    self.set_status(StatusKind::Playing, message);
    self.publish_playback_state();
  }

  fn on_play_blocked(&mut self, trigger: PlayTrigger) {
    info!(?trigger, "playback blocked");
    self.session.is_playing = false;
    self.session.pending_play = true;
    if trigger.shows_block_notice() {
      self.set_status(StatusKind::Paused, Some("Tap Play to start audio"));
      self.song_status = "Tap Play to start audio".to_string();
    }
    if trigger.is_gesture() {
      self.show_error("Playback was blocked. Press Play to continue.");
    }
    self.publish_playback_state();
  }

  // --- Timers ---

  /// Advance virtual time, running controller-owned timers and returning display ticks.
  pub fn advance_to(&mut self, now: Duration) -> Vec<Tick> {
    let mut ticks = Vec::new();
    while let Some((handle, kind)) = self.scheduler.pop_due(now) {
      match kind {
        TimerKind::PositionRefresh => ticks.push(Tick::Position),
        TimerKind::StatusRefresh => ticks.push(Tick::Status),
        TimerKind::BufferingRetry => {
          if self.retry_timer == Some(handle) {
            self.retry_timer = None;
            self.on_buffering_timeout();
          }
        }
        TimerKind::QualityStep => {
          if self.quality_timer == Some(handle) {
            self.quality_timer = None;
            self.set_quality(Quality::Tiny);
          }
        }
      }
    }
    ticks
  }

  fn on_buffering_timeout(&mut self) {
    let Some(widget) = self.widget.as_ref() else { return };
    if widget.state() != WidgetState::Buffering {
      return;
    }
    // The delayed quality step has normally reached tiny already.
    if self.quality != Some(Quality::Tiny) {
      info!("buffering persisted; downgrading quality");
      self.set_quality(Quality::Tiny);
    }
    info!("buffering persisted; retrying playback");
    self.attempt_play(PlayTrigger::BufferingRecovery);
  }

  /// Step quality down to `small` now and `tiny` shortly after.
  fn begin_quality_reduction(&mut self) {
    self.set_quality(Quality::Small);
    self.scheduler.cancel_slot(&mut self.quality_timer);
    self.quality_timer = Some(self.scheduler.once(constants().quality_step(), TimerKind::QualityStep));
  }

  fn set_quality(&mut self, quality: Quality) {
    self.quality = Some(quality);
    if let Some(widget) = self.widget.as_mut()
      && let Err(e) = widget.set_quality(quality)
    {
      warn!(err = %e, quality = quality.label(), "unable to change playback quality");
    }
  }

  // --- Transport ---

  pub fn toggle_play_pause(&mut self) {
    if self.widget.is_none() {
      return;
    }
    self.clear_error();
    if self.session.is_playing {
      if let Some(widget) = self.widget.as_mut()
        && let Err(e) = widget.pause()
      {
        warn!(err = %e, "pause command failed");
      }
      self.session.pending_play = false;
    } else {
      self.session.pending_play = true;
      self.deferred_unmute();
      self.attempt_play(PlayTrigger::Toggle);
    }
  }

  /// Unmute a constrained start on the first real gesture. Failures leave the flag set.
  fn deferred_unmute(&mut self) {
    if !self.session.awaiting_unmute {
      return;
    }
    if let Some(widget) = self.widget.as_mut() {
      match widget.unmute() {
        Ok(()) => self.session.awaiting_unmute = false,
        Err(e) => warn!(err = %e, "unable to unmute"),
      }
    }
  }

  fn seek_to(&mut self, seconds: f64) {
    if let Some(widget) = self.widget.as_mut()
      && let Err(e) = widget.seek_to(seconds)
    {
      warn!(err = %e, seconds, "seek failed");
    }
  }

  /// Seek by `delta` seconds, clamped to the track. Returns the new position.
  pub fn seek_by(&mut self, delta: f64) -> Option<f64> {
    let current = self.widget.as_ref()?.current_time();
    let target = (current + delta).clamp(0.0, self.session.duration.max(0.0));
    self.seek_to(target);
    Some(target)
  }

  pub fn seek_forward(&mut self) -> Option<f64> {
    self.seek_by(constants().seek_step_secs)
  }

  pub fn seek_backward(&mut self) -> Option<f64> {
    self.seek_by(-constants().seek_step_secs)
  }

  /// Seek to a percentage of the track. Ignored until the duration is known.
  pub fn seek_percent(&mut self, percent: f64) {
    if self.widget.is_none() || self.session.duration <= 0.0 {
      return;
    }
    let percent = crate::timefmt::clamp_percent(percent);
    self.seek_to(percent / 100.0 * self.session.duration);
  }

  /// Set volume 0–100. Anything above zero also unmutes.
  pub fn set_volume(&mut self, volume: i32) {
    let volume = volume.clamp(0, 100) as u8;
    self.volume = volume;
    let Some(widget) = self.widget.as_mut() else { return };
    if let Err(e) = widget.set_volume(volume) {
      warn!(err = %e, "unable to set volume");
    }
    if volume > 0 {
      match widget.unmute() {
        Ok(()) => self.session.awaiting_unmute = false,
        Err(e) => warn!(err = %e, "unable to unmute when setting volume"),
      }
    }
  }

  pub fn toggle_loop(&mut self) {
    self.session.is_looping = !self.session.is_looping;
    if self.session.is_looping {
      self.set_status(StatusKind::Playing, Some("Loop enabled • track will repeat"));
    } else if self.session.is_playing {
      self.set_status(StatusKind::Playing, None);
    } else {
      self.set_status(StatusKind::Idle, None);
    }
  }

  pub fn on_media_action(&mut self, action: MediaAction) {
    match action {
      MediaAction::Play if !self.session.is_playing => self.media_toggle(),
      MediaAction::Pause if self.session.is_playing => self.media_toggle(),
      MediaAction::Toggle => self.media_toggle(),
      MediaAction::SeekForward => {
        self.seek_forward();
      }
      MediaAction::SeekBackward => {
        self.seek_backward();
      }
      MediaAction::Play | MediaAction::Pause => {}
    }
  }

  fn media_toggle(&mut self) {
    if self.widget.is_none() {
      return;
    }
    if self.session.is_playing {
      self.toggle_play_pause();
    } else {
      self.clear_error();
      self.session.pending_play = true;
      self.deferred_unmute();
      self.attempt_play(PlayTrigger::MediaKey);
    }
  }

  // --- Re-entry triggers ---

  /// First interaction anywhere while a play is pending.
  pub fn on_user_gesture(&mut self) {
    if !self.session.pending_play || self.widget.is_none() || self.session.is_playing {
      return;
    }
    if self.session.awaiting_unmute {
      if let Some(widget) = self.widget.as_mut()
        && let Err(e) = widget.unmute()
      {
        warn!(err = %e, "unable to unmute on resume gesture");
      }
      self.session.awaiting_unmute = false;
    }
    self.attempt_play(PlayTrigger::ResumeGesture);
  }

  pub fn on_visibility_change(&mut self, visible: bool) {
    if self.widget.is_none() {
      return;
    }
    if visible {
      if self.session.pending_play {
        self.attempt_play(PlayTrigger::Visible);
      } else if self.session.is_playing {
        self.attempt_play(PlayTrigger::KeepAlive);
      }
    } else if self.session.is_playing {
      self.attempt_play(PlayTrigger::Background);
    }
  }

  pub fn on_focus(&mut self) {
    if self.session.is_playing && self.widget.is_some() {
      self.attempt_play(PlayTrigger::Focus);
    }
  }

  pub fn on_page_restored(&mut self) {
    if (self.session.is_playing || self.session.pending_play) && self.widget.is_some() {
      self.attempt_play(PlayTrigger::PageRestore);
    }
  }
}

impl Drop for PlaybackController {
  fn drop(&mut self) {
    self.teardown();
  }
}
