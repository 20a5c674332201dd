//! EduMesh command-line front end
//!
//! Usage:
//!   edumesh [--seed FILE] [--backend auto|mock] <COMMAND>
//!
//! Examples:
//!   edumesh --backend mock --seed data/mock_community.json gaps
//!   edumesh status
//!   edumesh seed data/mock_community.json

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use edumesh_graph::{
    load_dataset_path, BackendPreference, GapAnalyzer, GraphStore, Label, RuleTable, StoreConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load this dataset before running the command
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Backend selection, overrides EDUMESH_GRAPH_BACKEND
    #[arg(long, global = true, value_parser = ["auto", "mock"])]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active backend and graph size
    Status,

    /// Print every node as JSON
    Nodes {
        /// Only nodes with this label
        #[arg(long)]
        label: Option<String>,
    },

    /// Print every relationship as JSON
    Edges,

    /// Run the deterministic gap analysis and print findings as JSON
    Gaps {
        /// YAML or JSON rule table, built-in rules when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Load a dataset and print the load report
    Seed {
        /// Path to the dataset JSON file
        path: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,edumesh_graph=info"));

    // stdout carries command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = StoreConfig::from_env().context("Failed to load graph store configuration")?;
    if let Some(backend) = &cli.backend {
        config.backend = backend.parse::<BackendPreference>()?;
    }

    let store = GraphStore::connect(config)
        .await
        .context("Failed to construct graph store")?;
    info!("Graph store mode: {}", store.mode());

    if let Some(path) = &cli.seed {
        let report = load_dataset_path(&store, path)
            .await
            .with_context(|| format!("Failed to seed from {}", path.display()))?;
        info!("Seeded {} people from {}", report.people, path.display());
    }

    let outcome = run(&store, cli.command).await;
    store.close().await.context("Failed to close graph store")?;
    outcome
}

async fn run(store: &GraphStore, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            let nodes = store.get_all_nodes().await.context("Failed to read nodes")?;
            let edges = store.get_edges().await.context("Failed to read relationships")?;

            println!("mode: {}", store.mode());
            for label in Label::ALL {
                let count = nodes.iter().filter(|n| n.label == label).count();
                println!("{}: {}", label, count);
            }
            println!("relationships: {}", edges.len());
        }
        Commands::Nodes { label } => {
            let mut nodes = store.get_all_nodes().await.context("Failed to read nodes")?;
            if let Some(label) = label {
                let label: Label = label.parse()?;
                nodes.retain(|n| n.label == label);
            }
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        Commands::Edges => {
            let edges = store.get_edges().await.context("Failed to read relationships")?;
            println!("{}", serde_json::to_string_pretty(&edges)?);
        }
        Commands::Gaps { rules } => {
            let rules = match rules {
                Some(path) => RuleTable::from_path(&path)
                    .with_context(|| format!("Failed to load rules from {}", path.display()))?,
                None => RuleTable::default(),
            };
            let nodes = store.get_all_nodes().await.context("Failed to read nodes")?;
            let findings = GapAnalyzer::new(rules).analyze(&nodes);
            println!("{}", serde_json::to_string_pretty(&findings)?);
        }
        Commands::Seed { path } => {
            let report = load_dataset_path(store, &path)
                .await
                .with_context(|| format!("Failed to seed from {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
