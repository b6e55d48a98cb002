//! Command line front end for the balance tracker.
//!
//! State lives under the configured state directory and is shared by every
//! subcommand:
//! - `watch`: refresh all queries on the configured interval until Ctrl-C
//! - `add` / `remove` / `list`: manage tracked queries
//! - `export` / `import`: move the whole configuration between machines

use balance::{AlertConfig, AlertEvaluator, BalanceFetcher};
use clap::{Parser, Subcommand};
use client::{ClientCache, RpcClientFactory};
use eyre::WrapErr;
use snapshot::ImportMode;
use std::{path::PathBuf, sync::Arc};
use store::{short_address, JsonDirStore, NewQuery};
use tracing::{error, info};
use tracker::{
    config::Config, metrics::install_prometheus_exporter, scheduler::RefreshScheduler,
    signal::LogSink, FetchStatus, Tracker,
};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Track ERC-20 and TRC-20 balances across chains")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TRACKER_CONFIG", default_value = "tracker.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh every query on the configured interval until interrupted
    Watch,

    /// Refresh once and print the results
    Refresh {
        /// Only this query
        #[arg(long, conflicts_with = "project")]
        id: Option<String>,

        /// Only queries of this project
        #[arg(long)]
        project: Option<String>,
    },

    /// Track a new balance
    Add {
        /// Chain key, e.g. ETH or TRON
        #[arg(long)]
        chain: String,

        #[arg(long)]
        holder: String,

        #[arg(long)]
        token: String,

        /// Symbol shown until the contract reports one
        #[arg(long, default_value = "")]
        symbol: String,

        #[arg(long)]
        project: Option<String>,

        /// Endpoint override for this query
        #[arg(long)]
        rpc: Option<String>,

        #[arg(long)]
        chain_id: Option<u64>,

        /// TRON API key override for this query
        #[arg(long)]
        api_key: Option<String>,

        /// Alert when the balance drops below this amount
        #[arg(long, conflicts_with = "alert_above")]
        alert_below: Option<String>,

        /// Alert when the balance rises above this amount
        #[arg(long)]
        alert_above: Option<String>,
    },

    /// Stop tracking a query
    Remove { id: String },

    /// Print every query grouped by project
    List,

    /// Enable or disable a query's alert
    ToggleAlert { id: String },

    /// Print the chain registry
    Chains,

    /// Edit a chain's connection settings
    ChainSet {
        key: String,

        #[arg(long)]
        rpc: Option<String>,

        #[arg(long)]
        chain_id: Option<u64>,

        #[arg(long)]
        api_key: Option<String>,
    },

    /// Add a project and select it
    ProjectAdd { name: String },

    /// Show or change auto refresh settings
    Settings {
        #[arg(long)]
        enabled: Option<bool>,

        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Write the configuration snapshot
    Export {
        /// Output path, defaults to the user's export file name
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Apply a configuration snapshot
    Import {
        path: PathBuf,

        /// Merge into the current state instead of replacing it
        #[arg(long)]
        merge: bool,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::load_or_default(&cli.config)
        .wrap_err_with(|| format!("Failed to load {}", cli.config.display()))?;

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!(port, "Metrics exporter listening");
    }

    let storage = Arc::new(JsonDirStore::open(&config.state_dir)?);
    let factory = RpcClientFactory::new(config.request_timeout())?;
    let cache = Arc::new(ClientCache::new(Arc::new(factory)));
    let tracker = Tracker::load(
        storage,
        BalanceFetcher::new(cache),
        AlertEvaluator::new(config.alert_trigger),
        Arc::new(LogSink),
    )?;

    match cli.command {
        Command::Watch => {
            info!(
                queries = tracker.query_count(),
                state_dir = %config.state_dir.display(),
                "Starting tracker"
            );
            tracker.refresh_all().await;
            tracker.persist().await?;

            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            RefreshScheduler::new(tracker.clone()).run(shutdown).await;
            if let Err(e) = tracker.persist().await {
                error!(error = %e, "Failed to persist state on shutdown");
            }
        }
        Command::Refresh { id, project } => {
            match (id, project) {
                (Some(id), _) => {
                    tracker.refresh_one(&id).await?;
                }
                (None, Some(project)) => {
                    tracker.refresh_project(&project).await;
                }
                (None, None) => {
                    tracker.refresh_all().await;
                }
            }
            tracker.persist().await?;
            print_queries(&tracker);
        }
        Command::Add {
            chain,
            holder,
            token,
            symbol,
            project,
            rpc,
            chain_id,
            api_key,
            alert_below,
            alert_above,
        } => {
            let alert = match (alert_below, alert_above) {
                (Some(threshold), _) => AlertConfig::below(&threshold),
                (None, Some(threshold)) => AlertConfig::above(&threshold),
                (None, None) => AlertConfig::default(),
            };
            let handle = tracker.add_query(NewQuery {
                chain_key: chain,
                endpoint: rpc,
                chain_id,
                credential: api_key,
                holder,
                token,
                symbol_hint: symbol,
                project_name: project,
                alert,
            })
            .await?;
            println!("{}", handle.id);

            let status = handle.fetch.await?;
            tracker.persist().await?;
            if status == FetchStatus::Failed {
                if let Some(query) = tracker.query(&handle.id) {
                    eprintln!("first fetch failed: {}", query.last_error.unwrap_or_default());
                }
            }
        }
        Command::Remove { id } => {
            tracker.remove_query(&id).await?;
        }
        Command::List => print_queries(&tracker),
        Command::ToggleAlert { id } => {
            let enabled = tracker.toggle_alert(&id).await?;
            println!("alert {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Chains => {
            for chain in tracker.chains() {
                println!(
                    "{:<8} {:<20} {:<5} {}",
                    chain.key,
                    chain.display_name,
                    chain.family.as_str(),
                    chain.endpoint
                );
            }
        }
        Command::ChainSet {
            key,
            rpc,
            chain_id,
            api_key,
        } => {
            if let Some(rpc) = rpc {
                tracker.set_chain_endpoint(&key, &rpc).await?;
            }
            if let Some(chain_id) = chain_id {
                tracker.set_chain_id(&key, chain_id).await?;
            }
            if let Some(api_key) = api_key {
                tracker.set_chain_credential(&key, &api_key).await?;
            }
        }
        Command::ProjectAdd { name } => {
            let name = tracker.add_project(&name).await?;
            println!("selected project {name}");
        }
        Command::Settings { enabled, seconds } => {
            let settings = if enabled.is_some() || seconds.is_some() {
                tracker.set_refresh(enabled, seconds).await?
            } else {
                tracker.refresh_settings()
            };
            println!(
                "auto refresh {} every {}s",
                if settings.enabled { "on" } else { "off" },
                settings.interval().as_secs_f64()
            );
        }
        Command::Export { out } => {
            let path = out.unwrap_or_else(|| PathBuf::from(tracker.export_file_name()));
            let text = tracker.export().to_json()?;
            tokio::fs::write(&path, text).await?;
            println!("{}", path.display());
        }
        Command::Import { path, merge } => {
            let text = tokio::fs::read_to_string(&path).await?;
            let mode = if merge {
                ImportMode::Merge
            } else {
                ImportMode::Replace
            };
            let report = tracker.import(&text, mode).await?;
            println!(
                "imported {} queries ({} ids rewritten)",
                report.queries_imported, report.ids_rewritten
            );
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn print_queries(tracker: &Tracker) {
    let queries = tracker.queries();
    for summary in tracker.summaries() {
        println!("[{}] {}", summary.name, summary.total_text);
        for id in &summary.query_ids {
            let Some(query) = queries.iter().find(|q| &q.id == id) else {
                continue;
            };
            let status = match (&query.last_error, query.is_alerting) {
                (Some(error), _) => format!("error: {error}"),
                (None, true) => "ALERT".to_string(),
                (None, false) => String::new(),
            };
            println!(
                "  {}  {:<10} {:<8} {:>24}  {}  {}",
                query.id,
                query.chain_name,
                query.display_symbol(),
                query.balance,
                short_address(&query.holder_address),
                status
            );
        }
    }
}
