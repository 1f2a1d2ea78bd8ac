use std::path::PathBuf;

use clap::{Parser, Subcommand};
use route_trace_data_management::{DataManager, DataManagerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "RouteCLI")]
#[command(about = "A CLI to inspect completed routes", long_about = None)]
struct Cli {
    /// Database file, defaults to the project's data directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List completed routes, newest first
    List,
    /// Print a completed route as JSON
    Show { route_id: String },
    /// Delete a completed route
    Delete { route_id: String },
}

#[tokio::main]
async fn main() -> Result<(), DataManagerError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let data_manager = match &cli.database {
        Some(path) => DataManager::start_at(path).await?,
        None => DataManager::start().await?,
    };

    match &cli.command {
        Commands::List => {
            let routes = data_manager.get_completed_routes().await?;
            if routes.is_empty() {
                println!("No completed routes");
            }
            for route in routes {
                println!(
                    "{}  {}  {}/{} stops  {:.1} km  {} credits  {}",
                    route.route_id,
                    route.completed_at.format("%Y-%m-%d %H:%M"),
                    route.completed_stops,
                    route.total_stops,
                    route.navigation_data.total_distance_meters / 1000.0,
                    route.estimated_credits,
                    route.route_type.map(|route_type| route_type.as_str()).unwrap_or("-"),
                );
            }
        },
        Commands::Show { route_id } => {
            let route = data_manager.get_completed_route(route_id).await?;
            let json = serde_json::to_string_pretty(&route)
                .map_err(|err| DataManagerError::Database(format!("Failed to format route: {err}")))?;
            println!("{json}");
        },
        Commands::Delete { route_id } => {
            if data_manager.delete_completed_route(route_id).await? {
                tracing::info!("Deleted route {}", route_id);
            } else {
                return Err(DataManagerError::NotFound(route_id.clone()));
            }
        },
    }

    Ok(())
}
