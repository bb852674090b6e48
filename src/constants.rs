//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Playback engine
  pub engine_binary: String,
  pub engine_origin: String,

  // Ticks
  pub position_refresh_ms: u64,
  pub status_refresh_ms: u64,

  // Constrained-network recovery
  pub buffering_retry_ms: u64,
  pub quality_step_ms: u64,

  // Transport
  pub seek_step_secs: f64,
  pub default_volume: u8,
  pub volume_step: u8,

  // Labels
  pub idle_title: String,
  pub fallback_title: String,
  pub media_artist: String,
  pub media_album: String,
}

impl Constants {
  pub fn position_refresh(&self) -> Duration {
    Duration::from_millis(self.position_refresh_ms)
  }

  pub fn status_refresh(&self) -> Duration {
    Duration::from_millis(self.status_refresh_ms)
  }

  pub fn buffering_retry(&self) -> Duration {
    Duration::from_millis(self.buffering_retry_ms)
  }

  pub fn quality_step(&self) -> Duration {
    Duration::from_millis(self.quality_step_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
