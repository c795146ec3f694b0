//! Keel CLI - open a store and bring its schema up to date.

mod args;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keel::migrate::{version, Registry};
use keel::{open_database, Config};

use args::{Args, Command};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keel=info,keel_migrate=info,keel_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.to_config()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        datadir = %config.datadir.display(),
        store = %config.resolved_store_path().display(),
        label = %config.label,
        "configuration loaded"
    );

    // No migrations ship with the binary yet; upgrade only stamps and checks
    // the schema version.
    let registry = Registry::new();

    match args.command {
        Command::Upgrade { .. } => upgrade(&config, &registry),
        Command::Status => status(&config, &registry),
    }
}

fn upgrade(config: &Config, registry: &Registry) -> anyhow::Result<()> {
    let upgrade = open_database(config, registry).context("failed to open store")?;
    if upgrade.upgraded() {
        tracing::info!(
            applied = ?upgrade.applied,
            version = %version::SchemaVersion::SUPPORTED,
            "store upgraded"
        );
    } else {
        tracing::info!("store up to date");
    }
    upgrade.into_handle().close().context("failed to close store")?;
    Ok(())
}

fn status(config: &Config, registry: &Registry) -> anyhow::Result<()> {
    let handle = config
        .store_options()
        .open()
        .context("failed to open store")?;
    let records = registry.migrator(config.label).records(&handle)?;
    let stamped = handle.view(|tx| version::read(tx))?;

    match stamped {
        Some(v) => println!("schema version {}", v),
        None => println!("schema version unset"),
    }

    if records.is_empty() {
        println!("no migrations registered for {}", config.label);
    }
    for record in &records {
        match &record.applied {
            Some(applied) => println!(
                "{:<32} applied at {} (schema {})",
                record.name, applied.applied_at, applied.schema_version
            ),
            None => println!("{:<32} pending", record.name),
        }
    }

    handle.close().context("failed to close store")?;
    Ok(())
}
