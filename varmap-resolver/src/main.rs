//! varmap-resolver - command-line front end for the resolution engine
//!
//! Loads a catalog snapshot and resolves listing titles or structured
//! queries, printing JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use varmap_resolver::{
    read_catalog, EngineConfig, HierarchyValidator, ResolutionEngine, ResolutionQuery,
    SnapshotWatcher, VariantId, VariantStore,
};

/// Command-line arguments for varmap-resolver
#[derive(Parser, Debug)]
#[command(name = "varmap-resolver")]
#[command(about = "Resolve listing titles to catalog variants")]
#[command(version)]
struct Args {
    /// TOML config file (overrides VARMAP_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON file (overrides VARMAP_CATALOG and catalog_path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the catalog and print its size or its violations
    Validate,

    /// Resolve one listing title
    Resolve {
        #[arg(long)]
        series: String,
        text: String,
    },

    /// Resolve structured coordinates with optional hint tokens
    Lookup {
        #[arg(long)]
        series: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        mint: String,
        #[arg(long = "hint")]
        hints: Vec<String>,
    },

    /// Print ancestors and descendants of a variant
    Family { variant_id: String },

    /// Resolve listing lines from stdin while hot-reloading the catalog
    Stream {
        #[arg(long)]
        series: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_location) =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let default_level: tracing::Level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    info!("Starting varmap-resolver v{}", env!("CARGO_PKG_VERSION"));
    match &config_location {
        Some(location) => info!(
            path = %location.path.display(),
            source = location.source.as_str(),
            "Configuration file"
        ),
        None => info!("Using compiled default configuration"),
    }

    let Some(catalog_path) = config.catalog_path(args.catalog.as_deref()) else {
        bail!("No catalog given: use --catalog, VARMAP_CATALOG or catalog_path in the config file");
    };
    info!("Catalog path: {}", catalog_path.display());

    match args.command {
        Command::Validate => validate(&catalog_path).await?,
        Command::Resolve { series, text } => {
            let (engine, _) = load_engine(&config, catalog_path).await?;
            let outcome = engine.resolve_listing(&series, &text);
            println!("{}", serde_json::to_string_pretty(&outcome.to_result())?);
        }
        Command::Lookup {
            series,
            year,
            mint,
            hints,
        } => {
            let (engine, _) = load_engine(&config, catalog_path).await?;
            let query = ResolutionQuery::new(&series, year, &mint).with_hints(&hints);
            let outcome = engine.resolve(&query);
            println!("{}", serde_json::to_string_pretty(&outcome.to_result())?);
        }
        Command::Family { variant_id } => {
            let (engine, _) = load_engine(&config, catalog_path).await?;
            let report = engine.family(&VariantId::new(variant_id))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Stream { series } => {
            let (engine, watcher) = load_engine(&config, catalog_path).await?;
            stream(&engine, watcher, &series).await?;
        }
    }

    Ok(())
}

/// Load the catalog into a fresh store and build the engine around it
///
/// The returned watcher has already seen the loaded file, so it only reloads
/// on later changes.
async fn load_engine(
    config: &EngineConfig,
    catalog_path: PathBuf,
) -> Result<(ResolutionEngine, SnapshotWatcher)> {
    let store = Arc::new(VariantStore::new());
    let mut watcher = SnapshotWatcher::new(
        store.clone(),
        catalog_path,
        config.reload.poll_interval(),
    );

    let snapshot = match watcher.load_now().await {
        Ok(info) => info,
        Err(e) => {
            error!("Failed to load catalog: {}", e);
            bail!("Catalog {} rejected: {}", watcher.path().display(), e);
        }
    };
    info!(
        "✓ Loaded catalog: {} variants in {} groups (version {})",
        snapshot.variant_count, snapshot.group_count, snapshot.version
    );

    Ok((ResolutionEngine::with_config(store, config), watcher))
}

/// Validate without loading into a store, listing every violation
async fn validate(catalog_path: &std::path::Path) -> Result<()> {
    let catalog = read_catalog(catalog_path).await?;
    let violations = HierarchyValidator::new().collect_violations(&catalog.variants);

    if violations.is_empty() {
        let groups: std::collections::BTreeSet<_> =
            catalog.variants.iter().map(|v| v.group_key()).collect();
        println!(
            "OK: {} variants in {} groups",
            catalog.variants.len(),
            groups.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("{}", violation);
    }
    bail!("{} hierarchy violation(s) in {}", violations.len(), catalog_path.display())
}

/// Resolve stdin lines until EOF or Ctrl+C
async fn stream(engine: &ResolutionEngine, watcher: SnapshotWatcher, series: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher_handle = watcher.spawn(cancel.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let outcome = engine.resolve_listing(series, line);
                println!("{}", serde_json::to_string(&outcome.to_result())?);
            }
        }
    }

    cancel.cancel();
    if let Err(e) = watcher_handle.await {
        warn!("Catalog watcher task ended abnormally: {}", e);
    }
    Ok(())
}
