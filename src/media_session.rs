//! OS-level transport integration: now-playing metadata and media-key actions.
//!
//! In the terminal the "media session" is the window title, and actions arrive as
//! media keys when the terminal reports them.

use anyhow::{Context, Result};
use ratatui::crossterm::{
  event::{KeyCode, MediaKeyCode},
  execute,
  terminal::SetTitle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
  pub title: String,
  pub artist: String,
  pub album: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaybackState {
  None,
  Playing,
  Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
  Play,
  Pause,
  /// Play/pause toggle keys; resolved against the current state by the controller.
  Toggle,
  SeekForward,
  SeekBackward,
}

impl MediaAction {
  pub fn from_key(code: KeyCode) -> Option<Self> {
    match code {
      KeyCode::Media(MediaKeyCode::Play) => Some(MediaAction::Play),
      KeyCode::Media(MediaKeyCode::Pause | MediaKeyCode::Stop) => Some(MediaAction::Pause),
      KeyCode::Media(MediaKeyCode::PlayPause) => Some(MediaAction::Toggle),
      KeyCode::Media(MediaKeyCode::FastForward | MediaKeyCode::TrackNext) => Some(MediaAction::SeekForward),
      KeyCode::Media(MediaKeyCode::Rewind | MediaKeyCode::TrackPrevious) => Some(MediaAction::SeekBackward),
      _ => None,
    }
  }
}

pub trait MediaSession {
  fn set_metadata(&mut self, metadata: &TrackMetadata) -> Result<()>;
  fn set_playback_state(&mut self, state: MediaPlaybackState) -> Result<()>;
}

/// Publishes the now-playing track in the terminal window title.
#[derive(Debug, Default)]
pub struct TerminalTitle {
  metadata: Option<TrackMetadata>,
}

/// Window title for a track in the given state.
pub fn title_text(metadata: Option<&TrackMetadata>, state: MediaPlaybackState) -> String {
  let icon = match state {
    MediaPlaybackState::Playing => "▶",
    MediaPlaybackState::Paused => "⏸",
    MediaPlaybackState::None => return "audiotube".to_string(),
  };
  match metadata {
    Some(m) => format!("{} {} · {} ({})", icon, m.title, m.artist, m.album),
    None => "audiotube".to_string(),
  }
}

impl MediaSession for TerminalTitle {
  fn set_metadata(&mut self, metadata: &TrackMetadata) -> Result<()> {
    self.metadata = Some(metadata.clone());
    Ok(())
  }

  fn set_playback_state(&mut self, state: MediaPlaybackState) -> Result<()> {
    if state == MediaPlaybackState::None {
      self.metadata = None;
    }
    let text = title_text(self.metadata.as_ref(), state);
    execute!(std::io::stdout(), SetTitle(text)).context("Failed to set terminal title")
  }
}

#[cfg(test)]
pub mod recording {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  #[derive(Debug, Default)]
  pub struct Log {
    pub metadata: Vec<TrackMetadata>,
    pub states: Vec<MediaPlaybackState>,
  }

  /// Media session that records everything it is told.
  #[derive(Debug, Default)]
  pub struct RecordingSession {
    pub log: Rc<RefCell<Log>>,
  }

  impl MediaSession for RecordingSession {
    fn set_metadata(&mut self, metadata: &TrackMetadata) -> Result<()> {
      self.log.borrow_mut().metadata.push(metadata.clone());
      Ok(())
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) -> Result<()> {
      self.log.borrow_mut().states.push(state);
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn media_keys_map_to_actions() {
    assert_eq!(MediaAction::from_key(KeyCode::Media(MediaKeyCode::Play)), Some(MediaAction::Play));
    assert_eq!(MediaAction::from_key(KeyCode::Media(MediaKeyCode::PlayPause)), Some(MediaAction::Toggle));
    assert_eq!(MediaAction::from_key(KeyCode::Media(MediaKeyCode::FastForward)), Some(MediaAction::SeekForward));
    assert_eq!(MediaAction::from_key(KeyCode::Media(MediaKeyCode::Rewind)), Some(MediaAction::SeekBackward));
    assert_eq!(MediaAction::from_key(KeyCode::Char('p')), None);
  }

  #[test]
  fn window_title_reflects_state() {
    let m = TrackMetadata {
      title: "Song".to_string(),
      artist: "YouTube Audio".to_string(),
      album: "AudioTube".to_string(),
    };
    assert_eq!(title_text(Some(&m), MediaPlaybackState::Playing), "▶ Song · YouTube Audio (AudioTube)");
    assert_eq!(title_text(Some(&m), MediaPlaybackState::Paused), "⏸ Song · YouTube Audio (AudioTube)");
    assert_eq!(title_text(Some(&m), MediaPlaybackState::None), "audiotube");
    assert_eq!(title_text(None, MediaPlaybackState::Playing), "audiotube");
  }
}
