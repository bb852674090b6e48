use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::controller::{PlaybackController, Tick};
use crate::mpv::EventReceiver;
use crate::progress::ProgressBar;
use crate::scheduler::TimerKind;
use crate::status::TerminalInfo;
use crate::theme::{ColorScheme, PreferenceStore, Theme, ThemeController, detect_system_scheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Typing a link.
  Input,
  /// Transport keys drive the player.
  Player,
}

/// Outcome of reading the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardRead {
  Unavailable,
  Empty,
  Failed,
  Text(String),
}

pub fn read_clipboard() -> ClipboardRead {
  let mut clipboard = match arboard::Clipboard::new() {
    Ok(c) => c,
    Err(e) => {
      warn!(err = %e, "clipboard unavailable");
      return ClipboardRead::Unavailable;
    }
  };
  match clipboard.get_text() {
    Ok(text) if text.trim().is_empty() => ClipboardRead::Empty,
    Ok(text) => ClipboardRead::Text(text),
    Err(arboard::Error::ContentNotAvailable) => ClipboardRead::Empty,
    Err(e) => {
      warn!(err = %e, "clipboard read failed");
      ClipboardRead::Failed
    }
  }
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub player: PlaybackController,
  pub progress: ProgressBar,
  pub theme: ThemeController<Box<dyn PreferenceStore>>,
  pub terminal_info: TerminalInfo,
  /// Progress bar track as last drawn, for mouse hit-testing.
  pub progress_area: Option<Rect>,
  pub should_quit: bool,
  /// Set by `^z`; the event loop suspends the process and clears it.
  pub suspend_requested: bool,
  pub started_at: Instant,
  events_rx: EventReceiver,
  scheme_probe: fn() -> ColorScheme,
}

impl App {
  pub fn new(
    player: PlaybackController,
    store: Box<dyn PreferenceStore>,
    system: ColorScheme,
    events_rx: EventReceiver,
  ) -> Self {
    let mut app = Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      player,
      progress: ProgressBar::new(),
      theme: ThemeController::init(store, system),
      terminal_info: TerminalInfo::new(&constants().engine_origin),
      progress_area: None,
      should_quit: false,
      suspend_requested: false,
      started_at: Instant::now(),
      events_rx,
      scheme_probe: detect_system_scheme,
    };
    app.player.scheduler_mut().every(constants().status_refresh(), TimerKind::StatusRefresh);
    app
  }

  pub fn theme(&self) -> &'static Theme {
    self.theme.theme()
  }

  pub fn cycle_theme(&mut self) {
    self.theme.cycle();
    info!(preference = %self.theme.preference(), resolved = ?self.theme.resolved(), "theme changed");
  }

  // --- Loop plumbing ---

  /// Feed queued engine events to the controller.
  pub fn drain_engine_events(&mut self) {
    while let Ok((session, event)) = self.events_rx.try_recv() {
      self.player.handle_event(session, event);
    }
  }

  /// Run every timer due by now.
  pub fn tick(&mut self) {
    self.tick_at(self.started_at.elapsed());
  }

  pub fn tick_at(&mut self, now: Duration) {
    for tick in self.player.advance_to(now) {
      match tick {
        Tick::Position => self.progress.refresh(&self.player),
        Tick::Status => {
          self.terminal_info.refresh(self.player.endpoint());
          self.theme.on_system_scheme((self.scheme_probe)());
        }
      }
    }
  }

  /// How long the loop may sleep before the next timer is due.
  pub fn poll_timeout(&self, cap: Duration) -> Duration {
    match self.player.scheduler().next_deadline() {
      Some(deadline) => deadline.saturating_sub(self.started_at.elapsed()).min(cap),
      None => cap,
    }
  }

  // --- Actions ---

  pub fn submit(&mut self) {
    let link = self.input.trim().to_string();
    self.player.submit_link(&link);
    if self.player.is_loading() {
      self.progress.reset();
      self.input.clear();
      self.cursor_position = 0;
      self.input_scroll = 0;
      self.mode = AppMode::Player;
    }
  }

  pub fn paste_and_play(&mut self) {
    let read = read_clipboard();
    self.apply_clipboard(read);
  }

  pub fn apply_clipboard(&mut self, read: ClipboardRead) {
    match read {
      ClipboardRead::Unavailable => self.player.show_error("Clipboard API is not available. Paste manually."),
      ClipboardRead::Empty => self.player.show_error("Clipboard is empty."),
      ClipboardRead::Failed => self.player.show_error("Unable to read from clipboard. Paste manually."),
      ClipboardRead::Text(text) => {
        self.input = text.trim().to_string();
        self.cursor_position = self.input.chars().count();
        self.submit();
      }
    }
  }

  pub fn clear(&mut self) {
    self.player.clear();
    self.progress.reset();
    self.terminal_info.refresh(None);
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.mode = AppMode::Input;
  }

  pub fn seek_step(&mut self, forward: bool) {
    let target = if forward { self.player.seek_forward() } else { self.player.seek_backward() };
    if let Some(seconds) = target {
      self.progress.show_position(seconds, self.player.duration());
    }
  }

  pub fn adjust_volume(&mut self, up: bool) {
    let step = constants().volume_step as i32;
    let volume = self.player.volume() as i32;
    self.player.set_volume(if up { volume + step } else { volume - step });
  }

  /// Terminal focus stands in for page visibility.
  pub fn set_focus(&mut self, focused: bool) {
    debug!(focused, "terminal focus changed");
    self.player.on_visibility_change(focused);
    if focused {
      self.player.on_focus();
    }
  }

  pub fn resumed_from_suspend(&mut self) {
    info!("resumed from suspend");
    self.player.on_page_restored();
  }
}
