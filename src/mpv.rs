//! Playback engine backed by an `mpv` child process.
//!
//! mpv is started with no video output and a JSON IPC socket. A tokio task owns the
//! socket: it observes the properties the controller needs, folds them into a shared
//! [`Snapshot`] and forwards lifecycle changes to the UI loop as `(SessionId, WidgetEvent)`.
//! Commands from the controller are queued to the same task, so the widget itself never blocks.

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader},
  net::UnixStream,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::widget::{
  PlayOutcome, PlayerWidget, Quality, SessionId, WidgetConfig, WidgetEvent, WidgetFactory, WidgetState,
};

pub type EventSender = mpsc::UnboundedSender<(SessionId, WidgetEvent)>;
pub type EventReceiver = mpsc::UnboundedReceiver<(SessionId, WidgetEvent)>;

/// Properties observed over IPC, in observe-id order.
const OBSERVED: [&str; 6] = ["pause", "paused-for-cache", "eof-reached", "duration", "time-pos", "media-title"];

/// Error codes reported for mpv load failures, in the engine error space.
const CODE_INCOMPATIBLE: i32 = 5;
const CODE_NOT_FOUND: i32 = 100;
const CODE_UNKNOWN: i32 = -1;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_DELAY: Duration = Duration::from_millis(100);

// --- IPC messages ---

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
  Pause(bool),
  PausedForCache(bool),
  EofReached(bool),
  Duration(f64),
  TimePos(f64),
  MediaTitle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MpvMessage {
  Property(Property),
  FileLoaded,
  PlaybackRestart,
  EndFile { reason: String, error: Option<String> },
  Other,
}

/// Parse one line of mpv IPC output.
pub fn parse_message(line: &str) -> Option<MpvMessage> {
  let val: Value = serde_json::from_str(line).ok()?;
  let Some(event) = val.get("event").and_then(|v| v.as_str()) else {
    return Some(MpvMessage::Other);
  };
  let msg = match event {
    "property-change" => {
      let name = val.get("name").and_then(|v| v.as_str()).unwrap_or("");
      let data = val.get("data");
      let flag = || data.and_then(|v| v.as_bool()).unwrap_or(false);
      let number = || data.and_then(|v| v.as_f64()).unwrap_or(0.0);
      match name {
        "pause" => MpvMessage::Property(Property::Pause(flag())),
        "paused-for-cache" => MpvMessage::Property(Property::PausedForCache(flag())),
        "eof-reached" => MpvMessage::Property(Property::EofReached(flag())),
        "duration" => MpvMessage::Property(Property::Duration(number())),
        "time-pos" => MpvMessage::Property(Property::TimePos(number())),
        "media-title" => MpvMessage::Property(Property::MediaTitle(
          data.and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        )),
        _ => MpvMessage::Other,
      }
    }
    "file-loaded" => MpvMessage::FileLoaded,
    "playback-restart" => MpvMessage::PlaybackRestart,
    "end-file" => MpvMessage::EndFile {
      reason: val.get("reason").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
      error: val.get("file_error").and_then(|v| v.as_str()).map(str::to_string),
    },
    _ => MpvMessage::Other,
  };
  Some(msg)
}

/// Map an mpv `file_error` string onto the engine error space.
pub fn error_code(file_error: Option<&str>) -> i32 {
  match file_error {
    Some("unrecognized file format") => CODE_INCOMPATIBLE,
    Some("loading failed") => CODE_NOT_FOUND,
    _ => CODE_UNKNOWN,
  }
}

// --- Snapshot ---

/// Latest engine state as seen over IPC.
#[derive(Debug, Clone)]
pub struct Snapshot {
  paused: bool,
  buffering: bool,
  eof: bool,
  duration: f64,
  time_pos: f64,
  title: Option<String>,
  file_loaded: bool,
  has_played: bool,
  ready: bool,
  /// Last state reported to the controller.
  reported: WidgetState,
}

impl Default for Snapshot {
  fn default() -> Self {
    Self {
      paused: true,
      buffering: false,
      eof: false,
      duration: 0.0,
      time_pos: 0.0,
      title: None,
      file_loaded: false,
      has_played: false,
      ready: false,
      reported: WidgetState::Unstarted,
    }
  }
}

impl Snapshot {
  pub fn state(&self) -> WidgetState {
    if !self.file_loaded {
      WidgetState::Unstarted
    } else if self.eof {
      WidgetState::Ended
    } else if self.paused {
      if self.has_played { WidgetState::Paused } else { WidgetState::Cued }
    } else if self.buffering {
      WidgetState::Buffering
    } else {
      WidgetState::Playing
    }
  }

  /// Fold a message in and return the lifecycle events it produces.
  pub fn apply(&mut self, msg: MpvMessage) -> Vec<WidgetEvent> {
    let mut events = Vec::new();
    let restarted = msg == MpvMessage::PlaybackRestart;
    match msg {
      MpvMessage::Property(prop) => match prop {
        Property::Pause(p) => {
          self.paused = p;
          if !p {
            self.has_played = true;
          }
        }
        Property::PausedForCache(b) => self.buffering = b,
        Property::EofReached(e) => self.eof = e,
        Property::Duration(d) => self.duration = d.max(0.0),
        Property::TimePos(t) => self.time_pos = t.max(0.0),
        Property::MediaTitle(t) => self.title = Some(t).filter(|t| !t.is_empty()),
      },
      MpvMessage::FileLoaded => self.file_loaded = true,
      MpvMessage::PlaybackRestart => {}
      MpvMessage::EndFile { reason, error } => {
        if reason == "error" {
          events.push(WidgetEvent::Error(error_code(error.as_deref())));
          return events;
        }
      }
      MpvMessage::Other => return events,
    }

    if !self.ready {
      // Ready once the stream is open and its length is known, or it restarted without one.
      if self.file_loaded && (self.duration > 0.0 || restarted) {
        self.ready = true;
        events.push(WidgetEvent::Ready);
        // An engine that autoplayed is already past cued.
        let state = self.state();
        if state != WidgetState::Cued {
          events.push(WidgetEvent::StateChange(state));
        }
        self.reported = state;
      }
      return events;
    }

    let state = self.state();
    if state != self.reported {
      self.reported = state;
      events.push(WidgetEvent::StateChange(state));
    }
    events
  }
}

// --- Widget ---

pub struct MpvWidget {
  session: SessionId,
  child: Option<TokioChild>,
  ipc_handle: Option<JoinHandle<()>>,
  commands: mpsc::UnboundedSender<String>,
  snapshot: Arc<StdMutex<Snapshot>>,
  socket_path: Option<String>,
}

impl MpvWidget {
  fn send(&self, command: Value) -> Result<()> {
    let line = format!("{}\n", json!({ "command": command }));
    self.commands.send(line).map_err(|_| anyhow!("mpv IPC task is not running"))
  }

  fn set_property(&self, name: &str, value: Value) -> Result<()> {
    self.send(json!(["set_property", name, value])).with_context(|| format!("Failed to set mpv property {}", name))
  }

  fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
    let snapshot = self.snapshot.lock().expect("mpv snapshot mutex poisoned");
    f(&snapshot)
  }
}

impl PlayerWidget for MpvWidget {
  /// Unpauses. mpv has no autoplay policy, so the outcome is settled by the next
  /// `pause` property change and never by [`WidgetEvent::PlayBlocked`].
  fn play(&mut self) -> Result<PlayOutcome> {
    self.set_property("pause", json!(false))?;
    Ok(PlayOutcome::Pending)
  }

  fn pause(&mut self) -> Result<()> {
    self.set_property("pause", json!(true))
  }

  fn seek_to(&mut self, seconds: f64) -> Result<()> {
    self.send(json!(["seek", seconds.max(0.0), "absolute"])).context("Failed to send seek to mpv")
  }

  fn mute(&mut self) -> Result<()> {
    self.set_property("mute", json!(true))
  }

  fn unmute(&mut self) -> Result<()> {
    self.set_property("mute", json!(false))
  }

  fn set_volume(&mut self, volume: u8) -> Result<()> {
    self.set_property("volume", json!(volume.min(100)))
  }

  fn set_quality(&mut self, quality: Quality) -> Result<()> {
    self.set_property("ytdl-format", json!(ytdl_format(quality)))
  }

  fn current_time(&self) -> f64 {
    self.read(|s| s.time_pos)
  }

  fn duration(&self) -> f64 {
    self.read(|s| s.duration)
  }

  fn title(&self) -> Option<String> {
    self.read(|s| s.title.clone())
  }

  fn state(&self) -> WidgetState {
    self.read(|s| s.state())
  }

  fn endpoint(&self) -> Option<String> {
    self.socket_path.clone()
  }

  fn destroy(&mut self) {
    if let Some(handle) = self.ipc_handle.take() {
      handle.abort();
    }
    if let Some(mut child) = self.child.take()
      && let Err(e) = child.start_kill()
    {
      warn!(err = %e, session = self.session.0, "failed to kill mpv process");
    }
    if let Some(path) = self.socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
    debug!(session = self.session.0, "mpv engine destroyed");
  }
}

impl Drop for MpvWidget {
  fn drop(&mut self) {
    self.destroy();
  }
}

/// mpv flags for the widget options.
pub fn engine_args(config: &WidgetConfig) -> Vec<&'static str> {
  let mut args = Vec::new();
  if !config.autoplay {
    args.push("--pause");
  }
  if config.inline {
    args.push("--force-window=no");
  }
  if !config.controls {
    args.push("--osc=no");
  }
  if !config.keyboard {
    args.push("--input-default-bindings=no");
  }
  if !config.related_videos {
    args.push("--ytdl-raw-options=no-playlist=");
  }
  if !config.branding {
    args.push("--osd-level=0");
  }
  if !config.annotations {
    args.push("--sid=no");
  }
  if config.muted {
    args.push("--mute=yes");
  }
  args
}

/// mpv format selector for a quality tier.
pub fn ytdl_format(quality: Quality) -> &'static str {
  match quality {
    Quality::Small => "bestaudio[abr<=96]/worstaudio/worst",
    Quality::Tiny => "worstaudio/worst",
  }
}

// --- Factory ---

pub struct MpvFactory {
  binary: String,
  events: EventSender,
}

impl MpvFactory {
  pub fn new(binary: impl Into<String>, events: EventSender) -> Self {
    Self { binary: binary.into(), events }
  }
}

impl WidgetFactory for MpvFactory {
  fn create(&mut self, session: SessionId, video_id: &str, config: &WidgetConfig) -> Result<Box<dyn PlayerWidget>> {
    let socket_path =
      std::env::temp_dir().join(format!("audiotube-mpv-{}-{}.sock", std::process::id(), session.0));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let url = format!("https://www.youtube.com/watch?v={}", video_id);
    let mut cmd = Command::new(&self.binary);
    cmd.args(["--no-video", "--no-terminal", "--idle=no", "--keep-open=yes"]);
    cmd.args(engine_args(config));
    cmd.arg(format!("--input-ipc-server={}", socket_path_str));
    cmd.arg(&url);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("{} not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)", self.binary)
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;
    info!(session = session.0, socket = %socket_path_str, "mpv spawned");

    let snapshot = Arc::new(StdMutex::new(Snapshot::default()));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let ipc_handle =
      tokio::spawn(run_ipc(socket_path_str.clone(), session, snapshot.clone(), self.events.clone(), cmd_rx));

    Ok(Box::new(MpvWidget {
      session,
      child: Some(child),
      ipc_handle: Some(ipc_handle),
      commands: cmd_tx,
      snapshot,
      socket_path: Some(socket_path_str),
    }))
  }
}

// --- IPC task ---

async fn connect(socket_path: &str) -> Result<UnixStream> {
  let mut last_err = None;
  for _ in 0..CONNECT_ATTEMPTS {
    match UnixStream::connect(socket_path).await {
      Ok(stream) => return Ok(stream),
      Err(e) => last_err = Some(e),
    }
    tokio::time::sleep(CONNECT_DELAY).await;
  }
  Err(anyhow!("mpv IPC socket never came up: {:?}", last_err))
}

async fn run_ipc(
  socket_path: String,
  session: SessionId,
  snapshot: Arc<StdMutex<Snapshot>>,
  events: EventSender,
  mut commands: mpsc::UnboundedReceiver<String>,
) {
  let stream = match connect(&socket_path).await {
    Ok(s) => s,
    Err(e) => {
      warn!(err = %e, session = session.0, "mpv IPC unavailable");
      let _ = events.send((session, WidgetEvent::Error(CODE_UNKNOWN)));
      return;
    }
  };
  let (read_half, mut write_half) = stream.into_split();

  for (id, name) in OBSERVED.iter().enumerate() {
    let line = format!("{}\n", json!({ "command": ["observe_property", id + 1, name] }));
    if let Err(e) = write_half.write_all(line.as_bytes()).await {
      warn!(err = %e, property = name, "failed to observe mpv property");
    }
  }

  let mut lines = TokioBufReader::new(read_half).lines();
  loop {
    tokio::select! {
      line = lines.next_line() => match line {
        Ok(Some(line)) => {
          let Some(msg) = parse_message(&line) else { continue };
          let out = snapshot.lock().expect("mpv snapshot mutex poisoned").apply(msg);
          for event in out {
            if events.send((session, event)).is_err() {
              return;
            }
          }
        }
        Ok(None) | Err(_) => {
          debug!(session = session.0, "mpv IPC closed");
          let _ = events.send((session, WidgetEvent::Error(CODE_UNKNOWN)));
          return;
        }
      },
      cmd = commands.recv() => match cmd {
        Some(line) => {
          if let Err(e) = write_half.write_all(line.as_bytes()).await {
            warn!(err = %e, session = session.0, "failed to write mpv command");
          }
        }
        None => return,
      },
    }
  }
}
