mod action;
mod app;
mod backend;
mod clipboard;
mod config;
mod event;
mod layout;
mod logging;
mod notice;
mod sidebar;
mod tab;
mod theme;
mod ui;

use std::io;
use std::panic;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;

use crate::action::Action;
use crate::app::App;
use crate::backend::ProcessBackend;
use crate::config::Config;
use crate::event::{Event, EventLoop, watch_config};

/// Events handled between two frames.
const MAX_EVENTS_PER_FRAME: usize = 512;
const CONFIG_DEBOUNCE: Duration = Duration::from_millis(500);

/// Command-line options.
#[derive(Debug, Default, PartialEq)]
struct Cli {
  help: bool,
  version: bool,
  init: bool,
  backend: Option<String>,
  log: Option<PathBuf>,
  path: Option<String>,
}

impl Cli {
  fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
    let mut cli = Cli::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
      match arg.as_str() {
        "--help" | "-h" => cli.help = true,
        "--version" | "-V" => cli.version = true,
        "--init" => cli.init = true,
        "--backend" => cli.backend = Some(args.next().context("--backend needs a command")?),
        "--log" => cli.log = Some(PathBuf::from(args.next().context("--log needs a path")?)),
        a if !a.starts_with('-') => cli.path = Some(a.to_string()),
        _ => bail!("unknown option '{arg}'"),
      }
    }
    Ok(cli)
  }
}

fn main() -> Result<()> {
  let Cli { help: show_help, version: show_version, init: show_init, backend: backend_arg, log: log_arg, path: path_arg } =
    Cli::parse(std::env::args().skip(1))?;

  if show_help {
    println!(concat!(
      "fexp - tabbed file explorer\n",
      "\n",
      "Usage: fexp [options] [path]\n",
      "\n",
      "Options:\n",
      "  --backend <cmd>          Backend command line (overrides config)\n",
      "  --log <path>             Write logs to <path>\n",
      "  --init                   Write the default config to ~/.config/fexp/\n",
      "  -h, --help               Print this help message\n",
      "  -V, --version            Print version\n",
      "\n",
      "If no path is given, opens the home directory.\n",
      "Log verbosity is read from FEXP_LOG (default: fexp=info).",
    ));
    return Ok(());
  }

  if show_version {
    println!("fexp {}", env!("CARGO_PKG_VERSION"));
    return Ok(());
  }

  if show_init {
    let config_path = Config::config_path().map_err(|e| anyhow!(e))?;
    let write = if config_path.exists() {
      eprint!("{} already exists. Overwrite? [y/N] ", config_path.display());
      let mut answer = String::new();
      io::stdin().read_line(&mut answer)?;
      answer.trim().eq_ignore_ascii_case("y")
    } else {
      true
    };
    if write {
      Config::dump_default_config(&config_path).map_err(|e| anyhow!(e))?;
      println!("{}", config_path.display());
    }
    return Ok(());
  }

  let log_path = log_arg.or_else(logging::default_log_path);
  logging::init(log_path.as_deref())?;

  let config_path = Config::config_path().ok();
  let (mut config, config_errors) = match &config_path {
    Some(path) => Config::load_from_path(path),
    None => Config::load(),
  };
  let backend_command = backend_arg.unwrap_or_else(|| config.backend.clone());

  let events = EventLoop::new(Duration::from_millis(config.tick_rate_ms));
  let backend = ProcessBackend::spawn(&backend_command, events.sender())
    .with_context(|| format!("cannot start backend '{backend_command}'"))?;
  let _watcher = config_path.as_deref().and_then(|p| watch_config(p, events.sender()));

  // Install panic hook that restores terminal
  let original_hook = panic::take_hook();
  panic::set_hook(Box::new(move |info| {
    let _ = restore_terminal();
    original_hook(info);
  }));

  setup_terminal()?;
  let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

  info!(event = "app.started", version = env!("CARGO_PKG_VERSION"), backend = %backend_command);
  let mut app = App::new(&config, Box::new(backend), path_arg);
  app.notices.extend_errors(config_errors);

  let mut last_reload = Instant::now() - CONFIG_DEBOUNCE;

  loop {
    terminal.draw(|frame| ui::draw(frame, &mut app, &config))?;

    let mut next = Some(events.next()?);
    let mut handled = 0;
    while let Some(event) = next {
      match event {
        Event::Key(key) => app.handle_key(key, &config)?,
        Event::Mouse(mouse) => app.handle_mouse(mouse),
        Event::Resize(w, h) => app.update(Action::Resize(w, h))?,
        Event::Tick => app.update(Action::Tick)?,
        Event::Backend(message) => app.handle_backend(message),
        Event::BackendExited => app.backend_exited(),
        Event::ConfigChanged => {
          if last_reload.elapsed() > CONFIG_DEBOUNCE
            && let Some(path) = &config_path
          {
            let (new, errors) = Config::load_from_path(path);
            config = new;
            app.apply_config(&config);
            if errors.is_empty() {
              app.notices.info("Config reloaded");
            } else {
              app.notices.extend_errors(errors);
            }
            last_reload = Instant::now();
          }
        }
      }
      handled += 1;
      if app.should_quit || handled >= MAX_EVENTS_PER_FRAME {
        break;
      }
      next = events.try_next();
    }

    if app.should_quit {
      break;
    }
  }

  restore_terminal()?;
  info!(event = "app.exited");
  Ok(())
}

fn setup_terminal() -> Result<()> {
  enable_raw_mode()?;
  execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
  Ok(())
}

fn restore_terminal() -> Result<()> {
  disable_raw_mode()?;
  execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
  Ok(())
}
