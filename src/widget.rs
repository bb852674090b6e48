//! Contract between the playback controller and the opaque playback engine.
//!
//! The controller only ever talks to a `dyn PlayerWidget`; engines report their
//! lifecycle asynchronously as [`WidgetEvent`]s tagged with the [`SessionId`] they were
//! created for, so events from a torn-down engine can be told apart and dropped.

use anyhow::Result;

/// Identifies one load-to-teardown session. Increases monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

/// Engine-reported playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
  Unstarted,
  Ended,
  Playing,
  Paused,
  Buffering,
  /// Loaded and ready, but playback never started.
  Cued,
}

impl WidgetState {
  pub fn label(self) -> &'static str {
    match self {
      WidgetState::Unstarted => "unstarted",
      WidgetState::Ended => "ended",
      WidgetState::Playing => "playing",
      WidgetState::Paused => "paused",
      WidgetState::Buffering => "buffering",
      WidgetState::Cued => "cued",
    }
  }
}

/// Lifecycle callbacks emitted by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
  Ready,
  StateChange(WidgetState),
  /// Numeric error code in the engine's error space.
  Error(i32),
  /// A play command that was reported as pending was later refused. Only engines
  /// subject to an autoplay policy send this; mpv never refuses a play.
  PlayBlocked,
}

/// Result of issuing a play command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
  /// The engine started playing synchronously.
  Confirmed,
  /// Accepted but unresolved; a lifecycle event will follow.
  Pending,
  /// Refused outright (autoplay policy).
  Rejected,
}

/// Requested stream quality. Lower tiers trade fidelity for fewer stalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
  Small,
  Tiny,
}

impl Quality {
  pub fn label(self) -> &'static str {
    match self {
      Quality::Small => "small",
      Quality::Tiny => "tiny",
    }
  }
}

/// Human-readable cause for an engine error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
  InvalidId,
  Incompatible,
  NotFound,
  OwnerRestricted,
  Unknown,
}

impl ErrorCause {
  pub fn from_code(code: i32) -> Self {
    match code {
      2 => ErrorCause::InvalidId,
      5 => ErrorCause::Incompatible,
      100 => ErrorCause::NotFound,
      101 | 150 => ErrorCause::OwnerRestricted,
      _ => ErrorCause::Unknown,
    }
  }

  /// Full message shown to the user.
  pub fn message(self) -> String {
    let detail = match self {
      ErrorCause::InvalidId => "The video ID is invalid.",
      ErrorCause::Incompatible => "The video cannot play in this player.",
      ErrorCause::NotFound => "The video was not found or was removed.",
      ErrorCause::OwnerRestricted => "The video owner restricted playback.",
      ErrorCause::Unknown => "Please try again.",
    };
    format!("Something went wrong while loading the audio. {}", detail)
  }
}

/// Construction options for an engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
  pub autoplay: bool,
  pub inline: bool,
  pub controls: bool,
  pub keyboard: bool,
  pub related_videos: bool,
  pub branding: bool,
  pub annotations: bool,
  /// Start with audio muted, before the first frame plays.
  pub muted: bool,
}

impl WidgetConfig {
  /// Headless audio-only player: autoplay on, every piece of engine chrome off.
  pub fn audio_only() -> Self {
    Self {
      autoplay: true,
      inline: true,
      controls: false,
      keyboard: false,
      related_videos: false,
      branding: false,
      annotations: false,
      muted: false,
    }
  }
}

pub trait PlayerWidget {
  fn play(&mut self) -> Result<PlayOutcome>;
  fn pause(&mut self) -> Result<()>;
  fn seek_to(&mut self, seconds: f64) -> Result<()>;
  fn mute(&mut self) -> Result<()>;
  fn unmute(&mut self) -> Result<()>;
  fn set_volume(&mut self, volume: u8) -> Result<()>;
  fn set_quality(&mut self, quality: Quality) -> Result<()>;
  fn current_time(&self) -> f64;
  fn duration(&self) -> f64;
  fn title(&self) -> Option<String>;
  fn state(&self) -> WidgetState;
  /// Where the engine is reachable, for the terminal info panel.
  fn endpoint(&self) -> Option<String>;
  fn destroy(&mut self);
}

/// Builds engine instances for the controller.
pub trait WidgetFactory {
  fn create(&mut self, session: SessionId, video_id: &str, config: &WidgetConfig) -> Result<Box<dyn PlayerWidget>>;
}

#[cfg(test)]
pub mod fake {
  //! Scriptable in-memory engine used by controller and progress bar tests.

  use super::*;
  use anyhow::anyhow;
  use std::cell::RefCell;
  use std::rc::Rc;

  #[derive(Debug, Clone, PartialEq)]
  pub enum Command {
    Play,
    Pause,
    Seek(f64),
    Mute,
    Unmute,
    Volume(u8),
    Quality(Quality),
    Destroy,
  }

  /// State shared between the test and every engine the factory builds.
  #[derive(Debug)]
  pub struct Shared {
    pub created: Vec<(SessionId, String)>,
    pub live: usize,
    pub commands: Vec<Command>,
    pub play_outcome: PlayOutcome,
    pub play_fails: bool,
    pub unmute_fails: bool,
    pub create_fails: bool,
    pub state: WidgetState,
    pub current_time: f64,
    pub duration: f64,
    pub title: Option<String>,
    pub configs: Vec<WidgetConfig>,
  }

  impl Default for Shared {
    fn default() -> Self {
      Self {
        created: Vec::new(),
        live: 0,
        commands: Vec::new(),
        play_outcome: PlayOutcome::Pending,
        play_fails: false,
        unmute_fails: false,
        create_fails: false,
        state: WidgetState::Unstarted,
        current_time: 0.0,
        duration: 200.0,
        title: Some("Test Track".to_string()),
        configs: Vec::new(),
      }
    }
  }

  impl Shared {
    pub fn count(&self, command: &Command) -> usize {
      self.commands.iter().filter(|c| *c == command).count()
    }

    pub fn plays(&self) -> usize {
      self.count(&Command::Play)
    }

    pub fn seeks(&self) -> Vec<f64> {
      self
        .commands
        .iter()
        .filter_map(|c| match c {
          Command::Seek(s) => Some(*s),
          _ => None,
        })
        .collect()
    }
  }

  pub type Handle = Rc<RefCell<Shared>>;

  pub struct FakeWidget {
    shared: Handle,
    destroyed: bool,
  }

  impl FakeWidget {
    fn record(&self, command: Command) {
      self.shared.borrow_mut().commands.push(command);
    }
  }

  impl PlayerWidget for FakeWidget {
    fn play(&mut self) -> Result<PlayOutcome> {
      self.record(Command::Play);
      let shared = self.shared.borrow();
      if shared.play_fails {
        return Err(anyhow!("engine threw"));
      }
      Ok(shared.play_outcome)
    }

    fn pause(&mut self) -> Result<()> {
      self.record(Command::Pause);
      Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
      self.record(Command::Seek(seconds));
      self.shared.borrow_mut().current_time = seconds;
      Ok(())
    }

    fn mute(&mut self) -> Result<()> {
      self.record(Command::Mute);
      Ok(())
    }

    fn unmute(&mut self) -> Result<()> {
      self.record(Command::Unmute);
      if self.shared.borrow().unmute_fails { Err(anyhow!("unmute refused")) } else { Ok(()) }
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
      self.record(Command::Volume(volume));
      Ok(())
    }

    fn set_quality(&mut self, quality: Quality) -> Result<()> {
      self.record(Command::Quality(quality));
      Ok(())
    }

    fn current_time(&self) -> f64 {
      self.shared.borrow().current_time
    }

    fn duration(&self) -> f64 {
      self.shared.borrow().duration
    }

    fn title(&self) -> Option<String> {
      self.shared.borrow().title.clone()
    }

    fn state(&self) -> WidgetState {
      self.shared.borrow().state
    }

    fn endpoint(&self) -> Option<String> {
      Some("fake://engine".to_string())
    }

    fn destroy(&mut self) {
      if !self.destroyed {
        self.destroyed = true;
        self.record(Command::Destroy);
        self.shared.borrow_mut().live -= 1;
      }
    }
  }

  #[derive(Default)]
  pub struct FakeFactory {
    pub shared: Handle,
  }

  impl FakeFactory {
    pub fn new() -> (Self, Handle) {
      let factory = Self::default();
      let handle = Rc::clone(&factory.shared);
      (factory, handle)
    }
  }

  impl WidgetFactory for FakeFactory {
    fn create(&mut self, session: SessionId, video_id: &str, config: &WidgetConfig) -> Result<Box<dyn PlayerWidget>> {
      let mut shared = self.shared.borrow_mut();
      if shared.create_fails {
        return Err(anyhow!("engine unavailable"));
      }
      shared.created.push((session, video_id.to_string()));
      shared.configs.push(config.clone());
      shared.live += 1;
      shared.state = WidgetState::Unstarted;
      drop(shared);
      Ok(Box::new(FakeWidget { shared: Rc::clone(&self.shared), destroyed: false }))
    }
  }
}
