mod app;
mod config;
mod constants;
mod controller;
mod input;
mod media_session;
mod mpv;
mod progress;
mod resolver;
mod scheduler;
mod session;
mod status;
mod theme;
mod timefmt;
mod ui;
mod widget;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{
      self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event, KeyEventKind,
      KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
  },
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use config::ConfigStore;
use constants::constants;
use controller::PlaybackController;
use media_session::TerminalTitle;
use mpv::MpvFactory;
use session::DeviceProfile;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// YouTube link to start playing right away
  link: Option<String>,

  /// Constrained device profile: start muted and retry stalled buffering
  #[arg(long)]
  constrained: bool,

  /// Initial volume (0-100)
  #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
  volume: Option<u8>,

  /// Playback engine binary (default: mpv)
  #[arg(long)]
  engine: Option<String>,

  /// Log level for the log file: 'error', 'warn', 'info', 'debug' or 'trace'
  #[arg(long)]
  log_level: Option<String>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

const POLL_CAP: Duration = Duration::from_millis(100);

// --- Logging ---

fn init_logging(level: Option<&str>) -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let dir = config::log_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "audiotube.log"));

  let filter = match level {
    Some(level) => EnvFilter::try_new(format!("audiotube={}", level)).context("Invalid --log-level")?,
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("audiotube=info")),
  };
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(guard)
}

// --- Terminal ---

fn enter_terminal_modes() {
  let mut stdout = std::io::stdout();
  if let Err(e) = execute!(stdout, EnableMouseCapture, EnableFocusChange) {
    warn!(err = %e, "mouse or focus reporting unavailable");
  }
  if matches!(ratatui::crossterm::terminal::supports_keyboard_enhancement(), Ok(true))
    && let Err(e) =
      execute!(stdout, PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES))
  {
    warn!(err = %e, "keyboard enhancement unavailable");
  }
}

fn leave_terminal_modes() {
  let mut stdout = std::io::stdout();
  if matches!(ratatui::crossterm::terminal::supports_keyboard_enhancement(), Ok(true)) {
    let _ = execute!(stdout, PopKeyboardEnhancementFlags);
  }
  let _ = execute!(stdout, DisableMouseCapture, DisableFocusChange);
}

/// Hand the terminal back, stop the process and take the terminal over again on resume.
#[cfg(unix)]
fn suspend(terminal: &mut DefaultTerminal) -> Result<()> {
  leave_terminal_modes();
  ratatui::restore();
  // Safety: raising a signal on our own process has no memory-safety preconditions.
  let rc = unsafe { libc::raise(libc::SIGTSTP) };
  if rc != 0 {
    warn!(rc, "failed to suspend");
  }
  *terminal = ratatui::init();
  enter_terminal_modes();
  terminal.clear().context("Failed to redraw after resume")?;
  Ok(())
}

#[cfg(not(unix))]
fn suspend(_terminal: &mut DefaultTerminal) -> Result<()> {
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_logging(args.log_level.as_deref())?;
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    leave_terminal_modes();
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  enter_terminal_modes();
  let result = run(&mut terminal, args).await;
  leave_terminal_modes();
  ratatui::restore();
  if let Err(ref e) = result {
    tracing::error!(err = %e, "exiting with error");
  }
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let profile = if args.constrained { DeviceProfile::Constrained } else { DeviceProfile::Standard };
  let binary = args.engine.unwrap_or_else(|| constants().engine_binary.clone());

  let (events_tx, events_rx) = mpsc::unbounded_channel();
  let factory = MpvFactory::new(binary, events_tx);
  let player = PlaybackController::new(Box::new(factory), Box::new(TerminalTitle::default()), profile);
  let mut app = App::new(player, Box::new(ConfigStore), theme::detect_system_scheme(), events_rx);

  if let Some(volume) = args.volume {
    app.player.set_volume(volume as i32);
  }
  if let Some(link) = args.link {
    app.input = link;
    app.submit();
  }

  loop {
    app.drain_engine_events();
    app.tick();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(app.poll_timeout(POLL_CAP))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        Event::Mouse(mouse) => input::handle_mouse_event(&mut app, mouse),
        Event::FocusGained => app.set_focus(true),
        Event::FocusLost => app.set_focus(false),
        _ => {}
      }
    }

    if app.suspend_requested {
      app.suspend_requested = false;
      suspend(terminal)?;
      app.resumed_from_suspend();
    }

    if app.should_quit {
      break;
    }
  }

  app.player.teardown();
  info!("bye");
  Ok(())
}
