use ratatui::crossterm::event::{self, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

use crate::app::{App, AppMode};
use crate::media_session::MediaAction;
use crate::progress::{HitTarget, InputSource};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Terminal cell column of the progress thumb, for hit-testing.
fn thumb_column(app: &App) -> f64 {
  app.progress.thumb_position().round()
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if let Some(action) = MediaAction::from_key(key.code) {
    app.player.on_media_action(action);
    return;
  }

  // Any other key counts as the gesture a pending start may be waiting for. Play/pause
  // resolves a pending start on its own.
  let toggles = app.mode == AppMode::Player && key.code == KeyCode::Char(' ');
  if !toggles {
    app.player.on_user_gesture();
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => app.should_quit = true,
      KeyCode::Char('t') => app.cycle_theme(),
      KeyCode::Char('v') => app.paste_and_play(),
      KeyCode::Char('l') => app.player.toggle_loop(),
      KeyCode::Char('x') => app.clear(),
      KeyCode::Char('z') => app.suspend_requested = true,
      _ => {}
    }
    return;
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Player => handle_player_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.submit();
    }
    KeyCode::Char(c) => {
      app.player.clear_error();
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.player.has_widget() {
        app.mode = AppMode::Player;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down | KeyCode::Tab => {
      if app.player.has_widget() {
        app.mode = AppMode::Player;
      }
    }
    _ => {}
  }
}

fn handle_player_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char(' ') => app.player.toggle_play_pause(),
    KeyCode::Left => app.seek_step(false),
    KeyCode::Right => app.seek_step(true),
    KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => app.adjust_volume(true),
    KeyCode::Char('-') | KeyCode::Down => app.adjust_volume(false),
    KeyCode::Esc | KeyCode::Tab | KeyCode::Char('/') => app.mode = AppMode::Input,
    _ => {}
  }
}

pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
  let x = mouse.column as f64;
  match mouse.kind {
    MouseEventKind::Down(MouseButton::Left) => {
      app.player.on_user_gesture();
      let Some(area) = app.progress_area else { return };
      if !hit(area, mouse.column, mouse.row) {
        return;
      }
      let target = if (x - thumb_column(app)).abs() <= 1.0 { HitTarget::Thumb } else { HitTarget::Track };
      app.progress.press(&mut app.player, target, InputSource::Mouse, x);
    }
    MouseEventKind::Drag(MouseButton::Left) => {
      app.progress.motion(&app.player, InputSource::Mouse, x);
    }
    MouseEventKind::Up(MouseButton::Left) => {
      app.progress.release(&mut app.player, InputSource::Mouse, x);
    }
    _ => {}
  }
}

fn hit(area: Rect, column: u16, row: u16) -> bool {
  area.contains(Position { x: column, y: row })
}
