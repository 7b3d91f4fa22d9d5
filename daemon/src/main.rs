//! tangle-tool: inspect and verify a Tangle storage directory.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tangle_store::{MetaStore, MilestoneStore, Pack, SpentAddressStore, TransactionStore};
use tangle_store_lmdb::{LmdbEnvironment, SpentAddressEnvironment, StorageConfig};
use tangle_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "tangle-tool", about = "Inspect and verify Tangle storage")]
struct Cli {
    /// Data directory holding the `tangle` and `spent-addresses` databases.
    #[arg(long, default_value = "./tangle_data", env = "TANGLE_DATA_DIR")]
    data_dir: PathBuf,

    /// Path to a TOML storage configuration. Overrides `--data-dir`.
    #[arg(long, env = "TANGLE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "warn", env = "TANGLE_LOG_LEVEL")]
    log_level: String,

    /// Log output format: "human" or "json".
    #[arg(long, default_value_t = LogFormat::Human, env = "TANGLE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print row counts, milestone range and schema version.
    Stats,
    /// Run the integrity check and exit non-zero if it finds problems.
    Check,
    /// Print the effective storage configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    match &cli.config {
        Some(path) => StorageConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(StorageConfig::new(&cli.data_dir)),
    }
}

fn stats(config: &StorageConfig) -> anyhow::Result<()> {
    let env = LmdbEnvironment::open(config).context("opening tangle database")?;
    let transactions = env.transaction_store();
    let milestones = env.milestone_store();

    let mut first = Pack::with_capacity(1);
    let mut last = Pack::with_capacity(1);
    milestones.load_first(&mut first)?;
    milestones.load_last(&mut last)?;

    println!("database:        {}", env.path().display());
    println!("schema version:  {}", env.meta_store().schema_version()?);
    println!("transactions:    {}", transactions.count()?);
    match (first.first(), last.first()) {
        (Some(first), Some(last)) => {
            println!("milestones:      {} ..= {}", first.index, last.index)
        }
        _ => println!("milestones:      none"),
    }
    env.close()?;

    let spent = SpentAddressEnvironment::open(config).context("opening spent-address database")?;
    println!("spent addresses: {}", spent.spent_address_store().count()?);
    spent.close()?;
    Ok(())
}

fn check(config: &StorageConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    // The explicit check below reports instead of logging.
    config.run_integrity_check = false;

    let started = Instant::now();
    let env = LmdbEnvironment::open(&config).context("opening tangle database")?;
    let report = env.check_integrity()?;
    env.close()?;

    println!(
        "checked {} databases, {} entries in {}",
        report.databases_checked,
        report.total_entries,
        format_duration(started.elapsed())
    );
    println!(
        "{} transactions, {} milestones",
        report.transactions, report.milestones
    );
    if report.is_healthy() {
        println!("OK");
        return Ok(());
    }
    for error in &report.errors {
        println!("error: {error}");
    }
    bail!("integrity check found {} problem(s)", report.errors.len())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    let config = load_config(&cli)?;
    tracing::debug!(db = %config.db_path.display(), "storage configuration loaded");

    match cli.command {
        Command::Stats => stats(&config),
        Command::Check => check(&config),
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
