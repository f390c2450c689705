use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ripple_common::config::{load_config, SourceKind};
use ripple_common::{EnvConfig, FileConfig};
use ripple_experiment::{CommandScorer, Experiment};
use ripple_store::{CsvPostSource, PgPostSource, PostSource};

#[derive(Parser)]
#[command(name = "ripple", about = "Forum influence sampling and feature experiments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample and extract features for the first filter set and window pair
    Run {
        /// Path to config TOML file
        #[arg(long, default_value = "./config/ripple.toml")]
        config: PathBuf,
    },
    /// Sweep filter sets, window pairs and feature subsets
    Sweep {
        #[arg(long, default_value = "./config/ripple.toml")]
        config: PathBuf,
    },
    /// Print and save corpus statistics per filter set
    Stats {
        #[arg(long, default_value = "./config/ripple.toml")]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> &PathBuf {
        match self {
            Command::Run { config } | Command::Sweep { config } | Command::Stats { config } => {
                config
            }
        }
    }
}

async fn post_source(config: &FileConfig) -> Result<Arc<dyn PostSource>> {
    match config.source.kind {
        SourceKind::Csv => {
            let path = config
                .source
                .csv_path
                .as_deref()
                .context("source.csv_path is required for csv sources")?;
            Ok(Arc::new(CsvPostSource::open(path)?))
        }
        SourceKind::Postgres => {
            let env = EnvConfig::from_env();
            let source = PgPostSource::connect(env.require_database_url()?).await?;
            Ok(Arc::new(source))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ripple=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config_path = cli.command.config_path();
    info!(config = %config_path.display(), "Loading config");
    let config = load_config(config_path)?;

    let source = post_source(&config).await?;
    let scorer = config
        .scorer
        .as_ref()
        .map(|s| CommandScorer::new(&s.command))
        .transpose()?;

    let experiment = match scorer {
        Some(scorer) => Experiment::builder()
            .config(config)
            .source(source)
            .scorer(Arc::new(scorer))
            .build(),
        None => Experiment::builder().config(config).source(source).build(),
    };

    match cli.command {
        Command::Run { .. } => match experiment.run_once().await? {
            Some(outcome) => {
                println!("{}", outcome.stats);
                println!("Artifacts written to {}", outcome.dir.display());
            }
            None => println!("No posts matched; nothing to sample."),
        },
        Command::Sweep { .. } => {
            let report = experiment.sweep().await?;
            println!("{report}");
        }
        Command::Stats { .. } => {
            for (filters, stats) in experiment.stats().await? {
                println!("filters {filters}{stats}");
            }
        }
    }

    Ok(())
}
