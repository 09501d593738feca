//! Reliability lab command line.
//!
//! Drives probes against a running lab backend and prints the trace with
//! explanations.
//!
//! # Usage
//!
//! ```bash
//! reliability-lab info
//! reliability-lab --mode hardened --scenario slow probe search
//! reliability-lab --mode hardened both
//! reliability-lab --mode hardened --scenario fail-window continuous --duration-ms 12000
//! reliability-lab reset
//! ```
//!
//! The backend location comes from `--base-url`, then `LAB_API_BASE_URL`,
//! then `http://localhost:8080`.

use std::time::Duration;

use clap::{Parser, Subcommand};
use reliability_lab::render::{ProfilePanel, StatusPanel, TracePanel};
use reliability_lab::{Endpoint, Lab, LabConfig, Mode, Scenario, TokioProviders, ENV_BASE_URL};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "reliability-lab")]
#[command(about = "Probe a resilience lab backend and explain the outcomes", long_about = None)]
struct Args {
    /// Backend base URL (overrides LAB_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend variant: baseline or hardened
    #[arg(long, global = true, default_value = "baseline")]
    mode: Mode,

    /// Fault scenario: normal, slow, fail or fail-window
    #[arg(long, global = true, default_value = "normal")]
    scenario: Scenario,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show backend identification
    Info,
    /// Show circuit breaker status
    Status,
    /// Probe one endpoint
    Probe {
        /// profile or search
        endpoint: Endpoint,
        /// Number of sequential probes
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },
    /// Probe both endpoints concurrently
    Both,
    /// Run continuous search traffic for a while
    Continuous {
        /// How long to keep traffic running
        #[arg(long, default_value = "5000")]
        duration_ms: u64,
    },
    /// Reset backend fault state and circuit breaker
    Reset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reliability_lab=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = LabConfig::from_lookup(|var| match (&args.base_url, var) {
        (Some(url), ENV_BASE_URL) => Some(url.clone()),
        _ => std::env::var(var).ok(),
    })?;
    tracing::info!(
        base_url = config.base_url(),
        mode = %args.mode,
        scenario = %args.scenario,
        "reliability lab"
    );

    let local = tokio::task::LocalSet::new();
    local.run_until(run(args, config)).await
}

async fn run(args: Args, config: LabConfig) -> Result<(), Box<dyn std::error::Error>> {
    let providers = TokioProviders::new(config.base_url())?;
    let lab = Lab::new(providers, config);
    lab.set_mode(args.mode);
    lab.set_scenario(args.scenario);

    match args.command {
        Command::Info => {
            let info = lab.info().await?;
            println!("{}", info.service);
            if let Some(version) = info.java_version {
                println!("  runtime:   {version}");
            }
            if let Some(timestamp) = info.timestamp {
                println!("  timestamp: {timestamp}");
            }
        }
        Command::Status => {
            let snapshot = lab.refresh_status().await;
            print!("{}", StatusPanel(&snapshot));
            print!("{}", ProfilePanel(lab.profile()));
        }
        Command::Probe { endpoint, count } => {
            for _ in 0..count {
                lab.run_one(endpoint).await?;
            }
            print!("{}", TracePanel::capture(&lab));
        }
        Command::Both => {
            lab.run_both().await?;
            print!("{}", TracePanel::capture(&lab));
        }
        Command::Continuous { duration_ms } => {
            lab.start_status_polling();
            lab.start_continuous();
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
            lab.stop_continuous_and_wait().await;
            print!("{}", TracePanel::capture(&lab));
            print!("{}", StatusPanel(&lab.status()));
        }
        Command::Reset => {
            let ack = lab.reset().await?;
            println!("{}", ack.message);
            print!("{}", StatusPanel(&lab.status()));
        }
    }

    lab.shutdown();
    Ok(())
}
