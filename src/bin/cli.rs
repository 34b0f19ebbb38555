use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use footy_scout::data::{load_store, save_predictions_to_csv, save_store};
use footy_scout::pipeline;
use footy_scout::{ApiClient, BaselineModel, Store};

#[derive(Parser)]
#[command(name = "footy_scout", about = "Fixture ingestion, team ratings and outcome predictions")]
struct Cli {
    /// Store snapshot file.
    #[arg(long, default_value = "cache/store.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one full ingestion cycle against the live API.
    Cycle,
    /// Recompute ratings and predictions from the snapshot, no network.
    Predict,
    /// Export stored predictions to CSV.
    Export {
        #[arg(long, default_value = "cache/predictions.csv")]
        out: PathBuf,
    },
}

fn load_or_new(path: &PathBuf) -> Result<Store> {
    if path.exists() {
        load_store(path).with_context(|| format!("Failed to load snapshot {}", path.display()))
    } else {
        println!("No snapshot at {}, starting empty", path.display());
        Ok(Store::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let now = Utc::now();

    match cli.command {
        Command::Cycle => {
            let client = ApiClient::from_env()?;
            let mut store = load_or_new(&cli.snapshot)?;
            if store.running_tournaments().is_empty() {
                println!("Snapshot has no running tournaments; nothing to ingest.");
                return Ok(());
            }

            pipeline::run_cycle(&client, &mut store, &BaselineModel, now).await;
            save_store(&store, &cli.snapshot).context("Failed to save snapshot")?;
            println!(
                "Cycle complete: {} teams, {} games",
                store.team_count(),
                store.game_count()
            );
        }
        Command::Predict => {
            let mut store = load_or_new(&cli.snapshot)?;
            pipeline::compute(&mut store, &BaselineModel, now);
            save_store(&store, &cli.snapshot).context("Failed to save snapshot")?;
            println!("Ratings and predictions recomputed");
        }
        Command::Export { out } => {
            let store = load_or_new(&cli.snapshot)?;
            let written = save_predictions_to_csv(&store, &out)
                .with_context(|| format!("Failed to export to {}", out.display()))?;
            println!("Exported {} predictions to {}", written, out.display());
        }
    }

    Ok(())
}
