//! aerodex-catalog - command-line front end for the catalog browser
//!
//! `browse` runs the query controller against the remote catalog and prints
//! the accumulated results; `resolve` matches a display name against a
//! local content table; `manufacturers` lists the manufacturer directory.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aerodex_catalog::{
    CatalogClient, ContentTable, ControllerOptions, FilterPatch, IdentityResolver,
    ManufacturerDirectory, QueryController, SortSpec, ViewState,
};
use aerodex_common::config::{CatalogConfig, ConfigOverrides, LoggingConfig, ENV_CATALOG_URL};

#[derive(Debug, Parser)]
#[command(name = "aerodex-catalog", version, about = "Browse a remote aircraft catalog")]
struct Cli {
    /// Path to TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog base URL
    #[arg(long, global = true, env = ENV_CATALOG_URL)]
    catalog_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one query and print the results
    Browse {
        #[arg(long)]
        manufacturer: Option<i64>,

        #[arg(long)]
        family: Option<i64>,

        #[arg(long)]
        search: Option<String>,

        /// Only aircraft still in service
        #[arg(long)]
        active: bool,

        /// Sort as `field[:asc|desc]`, e.g. `firstFlight:desc`
        #[arg(long, default_value = "name")]
        sort: SortSpec,

        /// Additional pages to load after the first
        #[arg(long, default_value_t = 0)]
        pages: u32,

        /// Debounce delay in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Show candidate content keys for a display name and the matched entry
    Resolve {
        name: String,

        /// Content table JSON file (defaults to the configured table)
        #[arg(long)]
        table: Option<PathBuf>,
    },
    /// List catalog manufacturers
    Manufacturers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let debounce_ms = match &cli.command {
        Command::Browse { debounce_ms, .. } => *debounce_ms,
        _ => None,
    };
    let content_table = match &cli.command {
        Command::Resolve { table, .. } => table.clone(),
        _ => None,
    };

    let config = CatalogConfig::resolve(ConfigOverrides {
        config_path: cli.config.clone(),
        catalog_url: cli.catalog_url.clone(),
        content_table,
        debounce_ms,
        request_timeout_ms: cli.timeout_ms,
    })
    .context("Failed to resolve configuration")?;

    init_tracing(&config.logging)?;
    info!(
        "Starting aerodex-catalog v{} (catalog {})",
        env!("CARGO_PKG_VERSION"),
        config.catalog_url
    );

    match cli.command {
        Command::Browse {
            manufacturer,
            family,
            search,
            active,
            sort,
            pages,
            ..
        } => {
            let mut patch = FilterPatch::new().only_active(active);
            if manufacturer.is_some() {
                patch = patch.manufacturer(manufacturer);
            }
            if family.is_some() {
                patch = patch.family(family);
            }
            if let Some(term) = search {
                patch = patch.search(term);
            }
            browse(&config, patch, sort, pages).await
        }
        Command::Resolve { name, .. } => resolve(&config, &name),
        Command::Manufacturers => list_manufacturers(&config).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

async fn browse(config: &CatalogConfig, patch: FilterPatch, sort: SortSpec, pages: u32) -> Result<()> {
    let client = Arc::new(CatalogClient::from_config(config)?);
    let options = ControllerOptions {
        debounce: config.debounce,
        ..ControllerOptions::default()
    };
    let mut controller = QueryController::new(client, ManufacturerDirectory::new(), options);

    controller.set_filters(patch);
    controller.set_sort(sort);
    controller.mount();
    controller.settle().await;

    for _ in 0..pages {
        if !controller.load_more() {
            break;
        }
        controller.settle().await;
        if let Some(err) = controller.load_more_error() {
            error!("Load more failed: {}", err);
            break;
        }
    }

    let snapshot = controller.snapshot();
    controller.shutdown();

    match snapshot.view {
        ViewState::Error => {
            if let Some(err) = snapshot.error {
                bail!("{}", err);
            }
            bail!("Catalog query failed");
        }
        ViewState::SearchTooShort => {
            println!("Search term too short; type at least two characters");
            return Ok(());
        }
        ViewState::Empty => {
            println!("No aircraft match these filters");
            return Ok(());
        }
        _ => {}
    }

    for item in &snapshot.items {
        let manufacturer = item
            .get("manufacturer")
            .and_then(|v| v.as_str().or_else(|| v.get("name")?.as_str()))
            .unwrap_or("-");
        println!(
            "{:>8}  {:<20}  {}",
            item.id().unwrap_or_default(),
            manufacturer,
            item.name().unwrap_or("(unnamed)")
        );
    }
    if let Some(cursor) = snapshot.cursor {
        println!(
            "-- {} of {} shown{}",
            snapshot.items.len(),
            cursor.total_elements,
            if cursor.has_next { ", more available" } else { "" }
        );
    }
    Ok(())
}

fn resolve(config: &CatalogConfig, name: &str) -> Result<()> {
    let Some(path) = config.content_table.as_deref() else {
        bail!("No content table given; pass --table or set content_table in config");
    };
    let table = ContentTable::load(path)
        .with_context(|| format!("Failed to load content table {}", path.display()))?;
    let resolver = IdentityResolver::new(Arc::new(table));

    println!("Candidates:");
    for (rank, candidate) in resolver.candidates(name).iter().enumerate() {
        println!("  {}. {}", rank + 1, candidate);
    }

    match resolver.resolve(name) {
        Some(found) => {
            println!("Match: {} ({})", found.key, found.record.title);
            if let Some(summary) = &found.record.summary {
                println!("  {}", summary);
            }
        }
        None => println!("No content for {:?}", name),
    }
    Ok(())
}

async fn list_manufacturers(config: &CatalogConfig) -> Result<()> {
    let client = CatalogClient::from_config(config)?;
    let directory = ManufacturerDirectory::new();

    let list = match directory.get_or_load(&client).await {
        Ok(list) => list,
        Err(e) => bail!("{}", aerodex_catalog::UserFacingError::from(&e)),
    };
    for m in list.iter() {
        match &m.country {
            Some(country) => println!("{:>6}  {} ({})", m.id, m.name, country),
            None => println!("{:>6}  {}", m.id, m.name),
        }
    }
    Ok(())
}
