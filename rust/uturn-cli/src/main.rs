use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use uturn_cli::{plan, walk, Scenario};

#[derive(Parser, Debug)]
#[command(name = "uturn-cli", version, about = "Plan headland U-turns from a JSON field scenario")]
struct Args {
    /// Log as JSON lines instead of text
    #[arg(long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the turn at the end of the current pass
    Plan {
        /// Scenario JSON file
        #[arg(long = "scenario", value_name = "PATH")]
        scenario: PathBuf,

        /// Write the report here instead of stdout
        #[arg(long = "out", value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Drive a simulated vehicle through one turn
    Walk {
        #[arg(long = "scenario", value_name = "PATH")]
        scenario: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

fn emit<T: Serialize>(report: &T, out: Option<&PathBuf>) -> Result<()> {
    let text = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => fs::write(path, text).with_context(|| format!("failed to write {:?}", path)),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);
    info!(?args, "starting uturn-cli");

    match &args.command {
        Command::Plan { scenario, out } => {
            let s = Scenario::load(scenario)?;
            let report = plan(&s)?;
            emit(&report, out.as_ref())
        }
        Command::Walk { scenario } => {
            let s = Scenario::load(scenario)?;
            let report = walk(&s)?;
            info!(paths_away = report.final_paths_away, ticks = report.ticks, "walk finished");
            emit(&report, None)
        }
    }
}
