use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::status::Indicator;
use crate::theme::{Theme, ThemePreference};
use crate::timefmt::format_time;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn indicator_color(theme: &Theme, indicator: Indicator) -> Color {
  match indicator {
    Indicator::Loading => theme.loading,
    Indicator::Playing => theme.playing,
    Indicator::Paused => theme.paused,
    Indicator::Error => theme.error,
  }
}

/// Cell index of the thumb on a `width`-wide bar. Cells before it are filled.
pub fn thumb_cell(percent: f64, width: u16) -> usize {
  let last = width.saturating_sub(1) as f64;
  (percent.clamp(0.0, 100.0) / 100.0 * last).round() as usize
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.progress_area = None;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, info_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(8),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  if app.player.card_visible() {
    render_player(frame, app, main_area);
  } else {
    render_welcome(frame, app, main_area);
  }
  render_terminal_info(frame, app, info_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let title_style = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
  let left = Line::from(Span::styled(" ▶ audiotube ", title_style));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn card_block(theme: &Theme, title: &str) -> Block<'static> {
  Block::bordered()
    .title(Span::styled(title.to_string(), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1))
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut text = vec![
    Line::from(""),
    Line::from(Span::styled(
      app.player.title().to_string(),
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(Span::styled("YouTube audio. In the terminal.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Paste a link below and press Enter, or ^v to play the clipboard.",
      Style::default().fg(theme.muted),
    )),
  ];
  if let Some(err) = app.player.error() {
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(format!("⚠  {}", err), Style::default().fg(theme.error))));
  }
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_player(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = card_block(theme, " Now Playing ");
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let [_, title_area, song_area, _, bar_area, meta_area, _, error_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(0),
  ])
  .areas(inner);

  let inner_w = inner.width as usize;
  frame.render_widget(
    Line::from(Span::styled(
      truncate_str(app.player.title(), inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    title_area,
  );
  frame.render_widget(Line::from(Span::styled(app.player.song_status(), Style::default().fg(theme.muted))), song_area);

  // Progress bar; the track geometry feeds mouse seeking.
  app.progress_area = Some(bar_area);
  app.progress.set_track(bar_area.x as f64, bar_area.width.saturating_sub(1) as f64);
  let thumb = thumb_cell(app.progress.percent(), bar_area.width);
  let width = bar_area.width as usize;
  let mut spans = Vec::with_capacity(3);
  spans.push(Span::styled("━".repeat(thumb), Style::default().fg(theme.bar_fill)));
  if width > 0 {
    let thumb_style = if app.progress.is_dragging() { theme.accent } else { theme.bar_fill };
    spans.push(Span::styled("●", Style::default().fg(thumb_style).add_modifier(Modifier::BOLD)));
  }
  spans.push(Span::styled("─".repeat(width.saturating_sub(thumb + 1)), Style::default().fg(theme.bar_empty)));
  frame.render_widget(Line::from(spans), bar_area);

  let time = format!("{} / {}", app.progress.elapsed(), format_time(app.player.duration()));
  let loop_label = if app.player.session().is_looping { "⟳ loop on" } else { "⟳ loop off" };
  let right = format!("vol {}%  {}", app.player.volume(), loop_label);
  let gap = inner_w.saturating_sub(time.chars().count() + right.chars().count());
  frame.render_widget(
    Line::from(vec![
      Span::styled(time, Style::default().fg(theme.fg)),
      Span::raw(" ".repeat(gap)),
      Span::styled(right, Style::default().fg(theme.muted)),
    ]),
    meta_area,
  );

  if let Some(err) = app.player.error() {
    let paragraph =
      Paragraph::new(format!("⚠  {}", err)).style(Style::default().fg(theme.error)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, error_area);
  }
}

fn render_terminal_info(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let info = &app.terminal_info;
  let mut spans = vec![
    Span::styled(" engine ", Style::default().fg(theme.muted)),
    Span::styled(info.origin.as_str(), Style::default().fg(theme.fg)),
    Span::styled("  state ", Style::default().fg(theme.muted)),
    Span::styled(app.player.phase().label(), Style::default().fg(theme.fg)),
  ];
  if app.player.profile().is_constrained() {
    spans.push(Span::styled("  constrained", Style::default().fg(theme.paused)));
  }
  spans.push(Span::styled("  endpoint ", Style::default().fg(theme.muted)));
  spans.push(Span::styled(
    truncate_str(&info.endpoint, area.width.saturating_sub(50) as usize),
    Style::default().fg(theme.fg),
  ));
  let line = Line::from(spans);
  frame.render_widget(line, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let status = app.player.status();
  let line = Line::from(vec![
    Span::styled(" ● ", Style::default().fg(indicator_color(theme, status.indicator()))),
    Span::styled(status.message.as_str(), Style::default().fg(theme.status)),
  ]);
  frame.render_widget(line, area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" YouTube link ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn theme_label(preference: ThemePreference, theme: &Theme) -> String {
  if preference == ThemePreference::Auto { format!("auto · {} ", theme.name) } else { format!("{} ", theme.name) }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_player = app.player.has_widget();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Play"), ("^v", "Paste"), ("^t", "Theme")];
      if has_player {
        k.push(("Tab", "Player"));
        k.push(("^x", "Clear"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Player => {
      let play_label = if app.player.session().is_playing { "Pause" } else { "Play" };
      vec![
        ("Space", play_label),
        ("←/→", "Seek"),
        ("+/-", "Volume"),
        ("^l", "Loop"),
        ("^x", "Clear"),
        ("^t", "Theme"),
        ("Tab", "Link"),
      ]
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let label = theme_label(app.theme.preference(), theme);
  let label_w = label.chars().count() as u16;
  let right = Line::from(Span::styled(label, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}
