//! sheetdash - Terminal dashboard for a hosted performance spreadsheet
//!
//! Fetches daily revenue, customer and ad spend figures from a spreadsheet,
//! caches them for a configurable TTL, and shows them as a live dashboard.

use std::io;
use std::panic;
use std::process;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use sheetdash::app::{App, AppState};
use sheetdash::cache::{Clock, RefreshController, SystemClock};
use sheetdash::cli::{Cli, StartupConfig};
use sheetdash::config::Settings;
use sheetdash::data::{DataLoader, SheetLoader};
use sheetdash::filter::RecordFilter;
use sheetdash::{logging, ui};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Renders the UI based on the current application state
fn render_ui<L: DataLoader, C: Clock>(frame: &mut ratatui::Frame, app: &App<L, C>) {
    match app.state {
        AppState::Loading => {
            render_loading(frame);
        }
        AppState::Dashboard => {
            ui::render_dashboard(frame, app);
        }
    }

    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while the first fetch is in flight
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading sheet data...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

fn sheet_loader(settings: &Settings) -> SheetLoader {
    SheetLoader::new(
        &settings.sheet_url,
        settings.worksheet.as_deref(),
        settings.credentials.clone(),
    )
}

/// Fetches once and prints the matching rows as JSON
async fn dump_json(config: &StartupConfig) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = sheet_loader(&config.settings).fetch().await?;

    let mut filter = RecordFilter::default();
    if let Some(country) = &config.country {
        filter.countries.insert(country.clone());
    }
    let records = filter.apply(&snapshot);

    serde_json::to_writer_pretty(io::stdout().lock(), &records)?;
    println!();
    Ok(())
}

/// Runs the interactive dashboard until the user quits
async fn run_dashboard(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let controller =
        RefreshController::with_clock(sheet_loader(settings), SystemClock, settings.ttl);
    let mut app = App::new(controller);

    // Initial render to show loading state
    terminal.draw(|f| render_ui(f, &app))?;

    // Main event loop
    loop {
        // Fetch only when the cache is stale or a refresh was requested
        app.sync().await;

        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Resolve configuration before touching the terminal
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let log_path = config.log_file.clone().or_else(logging::default_log_path);
    if let Some(path) = log_path {
        if let Err(e) = logging::init(&path) {
            eprintln!("Warning: could not open log file {}: {}", path.display(), e);
        }
    }
    tracing::info!(json = config.json, ttl_secs = config.settings.ttl.as_secs(), "starting");

    if config.json {
        if let Err(e) = dump_json(&config).await {
            tracing::error!(error = %e, "json export failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return Ok(());
    }

    run_dashboard(&config.settings).await
}
