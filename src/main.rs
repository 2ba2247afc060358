use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use svcwatch::logging::{self, LogTarget};
use svcwatch::{events, export, ui, App, Mirror, Overrides, Settings};

/// How long one event poll may block before the next redraw.
const TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "svcwatch")]
#[command(about = "Terminal dashboard for an HTTP health-check backend")]
struct Args {
    /// Configuration file (default: ./svcwatch.{toml,yaml,json} if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (e.g., "http://localhost:8080")
    #[arg(short, long)]
    url: Option<String>,

    /// Static API token; skips the login screen
    #[arg(short, long)]
    token: Option<String>,

    /// Refresh interval (e.g., "15s", "500ms")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Latency warning threshold in milliseconds
    #[arg(long)]
    latency_warn: Option<f64>,

    /// Latency critical threshold in milliseconds
    #[arg(long)]
    latency_crit: Option<f64>,

    /// Log file for the TUI session
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Export current state to JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.url.clone(),
            token: self.token.clone(),
            refresh_interval: self.refresh.clone(),
            latency_warn_ms: self.latency_warn,
            latency_critical_ms: self.latency_crit,
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;

    // The TUI owns the terminal, so logs go to a file unless exporting
    if args.export.is_some() {
        logging::init(LogTarget::Stderr)?;
    } else {
        logging::init(LogTarget::File(&settings.log_file))?;
    }

    let backend = settings.backend()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        let count = rt.block_on(export::fetch_and_export(
            &backend,
            &settings.thresholds(),
            &export_path,
        ))?;
        println!("Exported {} services to: {}", count, export_path.display());
        return Ok(());
    }

    // Tasks spawned by the mirror run on this runtime's workers
    let _guard = rt.enter();
    info!("Starting svcwatch against {}", settings.base_url);

    let (mirror, updates) = Mirror::new(Arc::new(backend));
    let mut app = App::new(mirror, updates, &settings)?;
    app.start();

    let result = run_tui(&mut app);
    if let Err(ref e) = result {
        error!("TUI exited with error: {:#}", e);
    }
    result
}

/// Run the TUI until the user quits
fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        app.drain_updates();

        terminal.draw(|frame| ui::draw(frame, app))?;

        if let Some(event) = events::poll_event(TICK)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    events::handle_mouse_event(app, mouse, ui::CONTENT_START_ROW);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}
