use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wayfar::catalog::RegionCatalog;
use wayfar::config::Config;
use wayfar::models::VisitedSnapshot;
use wayfar::storage;
use wayfar::store::VisitedStore;
use wayfar::widget;

#[derive(Parser)]
#[command(name = "wayfar-admin")]
#[command(about = "Wayfar visited-state management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the widget aggregates
    Stats,
    /// List trips, most recent first
    Trips,
    /// Write the stored state to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Replace the stored state with a JSON export
    Import {
        /// Source file
        path: PathBuf,
    },
    /// Remove all travel data
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wayfar=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let catalog = RegionCatalog::from_path(&config.catalog.path)
        .with_context(|| format!("Failed to load region catalog from {}", config.catalog.path))?;
    let storage = storage::open(&config.database).await?;
    let mut store = VisitedStore::hydrate(Arc::new(catalog), storage.as_ref()).await;

    // Commands that rewrite the state also refresh the widget
    if matches!(cli.command, Commands::Import { .. } | Commands::Clear) {
        if let Some(dispatcher) = widget::spawn_from_config(&config.widget) {
            store = store.with_widget(dispatcher);
        }
    }

    match cli.command {
        Commands::Stats => {
            let stats = store.stats();
            println!("Countries visited:   {}", stats.visited_countries);
            println!("Regions visited:     {}", stats.visited_regions);
            println!("Countries completed: {}", stats.countries_completed);
            println!("World completed:     {}%", stats.world_completed);
        }
        Commands::Trips => {
            let trips = store.trips();
            if trips.is_empty() {
                println!("No trips recorded.");
            } else {
                println!("{:<24} {:<24} {:<12} {:<12} {}", "Region", "Country", "From", "To", "Days");
                println!("{}", "-".repeat(80));
                for trip in trips {
                    println!(
                        "{:<24} {:<24} {:<12} {:<12} {}",
                        trip.region_name,
                        trip.country_name,
                        short_date(trip.visit.date_from.as_deref()),
                        short_date(trip.visit.date_to.as_deref()),
                        trip.duration_days
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                }
            }
        }
        Commands::Export { path } => {
            let json = serde_json::to_string_pretty(&store.snapshot())?;
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Exported {} visits to {}", store.visits().len(), path.display());
        }
        Commands::Import { path } => {
            let data = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let snapshot: VisitedSnapshot =
                serde_json::from_str(&data).context("Export file is not a visited-state snapshot")?;

            store.replace(snapshot);
            storage.save(&store.snapshot()).await?;
            println!("✓ Imported {} visits from {}", store.visits().len(), path.display());
        }
        Commands::Clear => {
            store.clear_all();
            storage.save(&store.snapshot()).await?;
            println!("✓ Removed all travel data");
        }
    }

    store.shutdown().await;
    Ok(())
}

fn short_date(value: Option<&str>) -> String {
    match value.and_then(wayfar::store::stats::parse_instant) {
        Some(instant) => instant.format("%Y-%m-%d").to_string(),
        None => "N/A".to_string(),
    }
}
