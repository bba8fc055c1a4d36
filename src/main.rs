use clap::Parser;
use color_eyre::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use quartui::backend::{DataSource, LocalBackend, OpenOptions};
use quartui::{App, AppConfig, AppEvent, Args, CacheManager, ChartSelection, Theme};
use ratatui::DefaultTerminal;
use std::fs::OpenOptions as FileOptions;
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: AppConfig, theme: Theme) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let backend = Arc::new(LocalBackend::new(config.performance.shard_rows));
    let mut app = App::new(tx.clone(), backend, config, theme);
    if args.debug {
        app.enable_debug();
    }
    let opts: OpenOptions = args.into();
    render(&mut terminal, &mut app)?;
    if let Some(path) = &args.path {
        tx.send(AppEvent::Open(
            DataSource::new(path, opts.clone()),
            ChartSelection::from(args),
        ))?;
    }
    if let Some(snapshot) = &args.snapshot {
        tx.send(AppEvent::Restore(snapshot.clone(), opts))?;
    }

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Mouse(mouse) => tx.send(AppEvent::Mouse(mouse))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            // Keep the throbber turning while requests run.
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => app.is_busy(),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_cache {
        match CacheManager::new(quartui::APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    if args.generate_config {
        match quartui::ConfigManager::new(quartui::APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

/// Logs go to a file in the cache directory; the terminal belongs to the UI.
fn init_logging(config: &AppConfig) {
    let Ok(cache) = CacheManager::new(quartui::APP_NAME) else {
        return;
    };
    if cache.ensure_cache_dir().is_err() {
        return;
    }
    let file = match FileOptions::new()
        .create(true)
        .append(true)
        .open(cache.cache_file(&config.logging.file))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Could not open log file: {}", e);
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let config = AppConfig::load(quartui::APP_NAME).unwrap_or_else(|e| {
        eprintln!("Warning: using default configuration: {}", e);
        AppConfig::default()
    });
    init_logging(&config);
    let theme = Theme::from_config(&config.theme).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid theme, using defaults");
        Theme::from_config(&AppConfig::default().theme).unwrap_or_default()
    });
    tracing::info!(path = ?args.path, snapshot = ?args.snapshot, "starting");

    let terminal = ratatui::init();
    execute!(std::io::stdout(), EnableMouseCapture)?;
    let result = run(terminal, &args, config, theme);
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    if let Err(e) = result {
        tracing::error!(error = %e, "exiting with error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
