use std::{fs::OpenOptions, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use navigator::{console_map::ConsoleMap, repl, shell::Shell};
use route_trace_data_management::DataManager;
use route_trace_session::{adapters::mapbox::MapboxClient, search::AddressSearch, SessionConfig, SessionRuntime};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOG_DIR: &str = "log";
const LOG_FILE: &str = "log/navigator.log";

#[derive(Parser)]
#[command(name = "navigator")]
#[command(about = "Plan a multi-stop route and navigate it from the terminal", long_about = None)]
struct Args {
    /// `key = value` configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where completed routes are stored, defaults to the project's data directory
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("Failed to create log directory")?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .context("Failed to open log file")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "navigator=debug,route_trace_session=debug,route_trace_data_management=info".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path).map_err(|err| anyhow::anyhow!("{err}"))?,
        None => SessionConfig::default(),
    }.with_env_overrides();

    tracing::info!("Starting navigator...");

    let mapbox = Arc::new(MapboxClient::new(&config).map_err(|err| anyhow::anyhow!("{err}"))?);
    let data_manager = match &args.database {
        Some(path) => DataManager::start_at(path).await?,
        None => DataManager::start().await?,
    };

    let runtime = SessionRuntime::new(&config, mapbox.clone(), mapbox.clone(), Arc::new(data_manager));
    runtime.register_map(Arc::new(ConsoleMap));
    let ticker = runtime.spawn_ticker(Duration::from_secs(1));

    // Phase changes go to the log, the shell prints its own results.
    let mut snapshots = runtime.subscribe();
    let watcher = tokio::spawn(async move {
        let mut phase = snapshots.borrow().phase;
        while snapshots.changed().await.is_ok() {
            let current = snapshots.borrow_and_update().phase;
            if current != phase {
                tracing::info!("Phase {} -> {}", phase, current);
                phase = current;
            }
        }
    });

    let mut shell = Shell::new(runtime.clone(), AddressSearch::new(mapbox, &config));
    println!("{}", repl::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match repl::parse(&line) {
            Ok(Some(action)) => {
                if !shell.execute(action).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => println!("{err}"),
        }
    }

    ticker.abort();
    watcher.abort();
    tracing::info!("Navigator stopped");
    Ok(())
}
