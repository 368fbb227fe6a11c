//! Split every two seconds until the run ends.
//!
//! Demonstrates:
//! - Resetting a run that is already in progress
//! - Starting the timer and splitting on a schedule
//! - Reading split state after each split
//! - Observing commands through event handlers
//!
//! Start LiveSplit with its server enabled first (Control > Start Server).
//!
//! Usage:
//!   cargo run --example split_every_2_seconds
//!   cargo run --example split_every_2_seconds -- --debug
//!   cargo run --example split_every_2_seconds -- --port 16835

// ============================================================================
// Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use livesplit_client::{Client, DEFAULT_PORT, TimerPhase, format_duration};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const SPLIT_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    port: u16,
}

impl Args {
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let port = match args.iter().position(|a| a == "--port") {
            Some(i) => args
                .get(i + 1)
                .context("--port needs a value")?
                .parse()
                .context("--port must be a port number")?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            debug: args.iter().any(|a| a == "--debug"),
            port,
        })
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "livesplit_client=trace"
    } else {
        "livesplit_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    if let Err(e) = run() {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse()?;
    init_logging(args.debug);

    let client = Client::builder()
        .port(args.port)
        .build()
        .context("invalid client configuration")?;

    client.on_split(|_| {
        println!("[split]");
        Ok(())
    });
    client.on_reset(|_| {
        println!("[reset]");
        Ok(())
    });

    let result = drive(&client);
    client.close()?;
    result
}

fn drive(client: &Client) -> Result<()> {
    let phase = client
        .get_current_timer_phase()
        .with_context(|| format!("is the LiveSplit server running on {}?", client.endpoint()))?;

    if phase != TimerPhase::NotRunning {
        client.reset()?;
    }

    client.start_timer()?;

    loop {
        thread::sleep(SPLIT_INTERVAL);

        client.split()?;

        if client.get_current_timer_phase()? == TimerPhase::Ended {
            println!("run ended");
            return Ok(());
        }

        print_state(client)?;
    }
}

fn print_state(client: &Client) -> Result<()> {
    let split_time = client.get_last_split_time()?;
    let split_name = client.get_current_split_name()?;
    let phase = client.get_current_timer_phase()?;
    let comparison_split_time = client.get_comparison_split_time()?;
    let split_index = client.get_split_index()?;
    let best_possible_time = client.get_best_possible_time()?;
    let final_time = client.get_final_time(None)?;

    println!("------------------------------");
    println!("split name:            {split_name}");
    println!("split index:           {split_index}");
    println!("split time:            {}", format_duration(split_time));
    println!("comparison split time: {}", format_duration(comparison_split_time));
    println!("timer phase:           {phase}");
    println!("best possible time:    {}", format_duration(best_possible_time));
    println!("final time:            {}", format_duration(final_time));

    Ok(())
}
