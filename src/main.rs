mod catalog;
mod config;
mod display;
mod error;
mod source;
mod timetables;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use display::{AppState, DisplayLoop};
use timetables::{Clock, SystemClock};
use ui::{Frame, Output, TerminalOutput};

/// Next bus departure and a live countdown to it.
///
/// While running, type a route number or id and press enter to switch
/// routes; `r` refreshes, `l` lists routes, `q` quits.
#[derive(Parser, Debug)]
#[command(name = "nextbus", version)]
struct Cli {
    /// Route id or 1-based route number to start with
    #[arg(short, long)]
    route: Option<String>,

    /// Route data file path or http(s) URL, instead of the embedded timetable
    #[arg(short, long, value_name = "PATH_OR_URL")]
    data: Option<String>,

    /// Config file to use instead of the one in the user config directory
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the current departure once and exit
    #[arg(long)]
    once: bool,

    /// List the available routes and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nextbus=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.config.as_deref()).await?;
    let mut output = TerminalOutput::new(io::stdout());

    let location = cli.data.as_deref().or(config.data.as_deref());
    let catalog = match source::from_location(location, config.dir()).load().await {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!(error = %e, "Failed to load route data");
            output.render(&Frame::load_error(&e.to_string()))?;
            return Err(e.into());
        }
    };
    info!(routes = catalog.routes().len(), "Route data loaded");

    if cli.list {
        output.list_routes(&catalog)?;
        return Ok(());
    }

    let initial = cli.route.as_deref().or(config.default_route.as_deref());
    let mut state = AppState::new(catalog, initial);

    if cli.once {
        output.render(&state.start_cycle(SystemClock.now()))?;
        return Ok(());
    }

    // Plain thread: a blocked stdin read must not keep the runtime alive
    // after Ctrl-C.
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || display::read_commands(io::stdin().lock(), tx));

    let mut display = DisplayLoop::new(state, SystemClock, output);
    display
        .run_until(rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
