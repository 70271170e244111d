use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use quarter_engine::codemap::CodeMaps;
use quarter_engine::database::table::code;
use quarter_engine::{config, database, instruments, logging, orchestrator};

#[derive(Parser)]
#[command(name = "quarter-engine", about = "Quarter consolidation & daily recomputation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild research_quarter/prepare_quarter/strategy_quarter.
    Quarter {
        /// Full rebuild instead of an incremental one.
        #[arg(long)]
        first: bool,
    },
    /// Recompute orig_day/recal_day for every stock in the universe.
    Day {
        /// Full rebuild instead of an incremental one.
        #[arg(long)]
        first: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = run().await {
        logging::error(format!("fatal: {e:#}"));
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let app = config::App::load().context("loading configuration")?;
    logging::init(&app.logging.dir);

    database::init(&app.data.source, &app.data.dest);

    let universe = instruments::read_universe(&app.instruments)?;
    let short_codes: Vec<String> = universe.keys().cloned().collect();
    let stk_code_rows = code::fetch_restricted_to(&short_codes).await?;
    let codemaps = Arc::new(CodeMaps::build(&universe, &stk_code_rows));

    match cli.command {
        Command::Quarter { first } => {
            logging::info(format!("starting quarter update (first={first})"));
            orchestrator::update_quarter(&codemaps, first, app.update.timeslot).await?;
            logging::info("quarter update complete".to_string());
        }
        Command::Day { first } => {
            logging::info(format!("starting day recompute (first={first})"));
            orchestrator::update_day(codemaps, first, app.update.day_workers).await?;
            logging::info("day recompute complete".to_string());
        }
    }

    Ok(())
}
