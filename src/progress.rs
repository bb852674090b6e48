//! Drag-to-seek progress bar.
//!
//! Owns the drag state exclusively. The periodic refresh reads the engine position
//! through the controller but never while a drag is in progress.

use crate::controller::PlaybackController;
use crate::timefmt::{clamp_percent, format_time, percent_of};

/// Where an input sequence came from. Pointer input carries an identity so that only
/// the pointer that started a drag can move or finish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
  Pointer(u32),
  Touch,
  Mouse,
}

/// What the press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
  Thumb,
  Track,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
  pub is_dragging: bool,
  pub active_pointer: Option<u32>,
}

impl DragState {
  fn accepts(&self, source: InputSource) -> bool {
    match (source, self.active_pointer) {
      (InputSource::Pointer(id), Some(active)) => self.is_dragging && id == active,
      _ => self.is_dragging,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProgressBar {
  drag: DragState,
  /// Track position and width in the input's coordinate space.
  left: f64,
  width: f64,
  percent: f64,
  elapsed: String,
}

impl Default for ProgressBar {
  fn default() -> Self {
    Self { drag: DragState::default(), left: 0.0, width: 0.0, percent: 0.0, elapsed: format_time(0.0) }
  }
}

impl ProgressBar {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_dragging(&self) -> bool {
    self.drag.is_dragging
  }

  pub fn percent(&self) -> f64 {
    self.percent
  }

  pub fn elapsed(&self) -> &str {
    &self.elapsed
  }

  /// Update the track geometry after layout.
  pub fn set_track(&mut self, left: f64, width: f64) {
    self.left = left;
    self.width = width.max(0.0);
  }

  /// Position of the thumb in track coordinates.
  pub fn thumb_position(&self) -> f64 {
    self.left + self.width * self.percent / 100.0
  }

  pub fn percent_at(&self, x: f64) -> f64 {
    if self.width <= 0.0 {
      return 0.0;
    }
    clamp_percent((x - self.left) / self.width * 100.0)
  }

  fn render(&mut self, percent: f64) {
    self.percent = clamp_percent(percent);
  }

  fn update_during_drag(&mut self, percent: f64, duration: f64) {
    self.render(percent);
    if duration > 0.0 {
      self.elapsed = format_time(self.percent / 100.0 * duration);
    }
  }

  /// Gesture start.
  ///
  /// Pointer input on either target begins a drag and seeks right away. In the
  /// touch/mouse fallback a press on the thumb begins a drag, while a press elsewhere on
  /// the track seeks once and leaves drag mode off.
  pub fn press(&mut self, controller: &mut PlaybackController, target: HitTarget, source: InputSource, x: f64) {
    let percent = self.percent_at(x);
    self.update_during_drag(percent, controller.duration());
    controller.seek_percent(self.percent);

    match (source, target) {
      (InputSource::Pointer(id), _) => {
        self.drag = DragState { is_dragging: true, active_pointer: Some(id) };
      }
      (_, HitTarget::Thumb) => {
        self.drag = DragState { is_dragging: true, active_pointer: None };
      }
      (_, HitTarget::Track) => {}
    }
  }

  /// Gesture move: visual only.
  pub fn motion(&mut self, controller: &PlaybackController, source: InputSource, x: f64) {
    if !self.drag.accepts(source) {
      return;
    }
    let percent = self.percent_at(x);
    self.update_during_drag(percent, controller.duration());
  }

  /// Gesture end (or cancel): final position and seek.
  pub fn release(&mut self, controller: &mut PlaybackController, source: InputSource, x: f64) {
    if !self.drag.accepts(source) {
      return;
    }
    let percent = self.percent_at(x);
    self.update_during_drag(percent, controller.duration());
    controller.seek_percent(self.percent);
    self.drag = DragState::default();
  }

  /// Periodic refresh from the engine position. Suppressed while dragging.
  pub fn refresh(&mut self, controller: &PlaybackController) {
    let duration = controller.duration();
    if self.drag.is_dragging || !controller.has_widget() || duration <= 0.0 {
      return;
    }
    let current = controller.current_time();
    self.render(percent_of(current, duration));
    self.elapsed = format_time(current);
  }

  /// Reflect a position set by a step seek.
  pub fn show_position(&mut self, seconds: f64, duration: f64) {
    self.elapsed = format_time(seconds);
    if !self.drag.is_dragging {
      self.render(percent_of(seconds, duration));
    }
  }

  pub fn reset(&mut self) {
    let (left, width) = (self.left, self.width);
    *self = Self::default();
    self.set_track(left, width);
  }
}
