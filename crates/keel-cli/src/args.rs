//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keel::store::Label;
use keel::{Config, DiagnosticScan};

/// Default root data directory.
pub const DEFAULT_DATADIR: &str = "./data";

/// Default number of blocks visited by `--scan-from`.
pub const DEFAULT_SCAN_AMOUNT: usize = 8;

/// Open and upgrade Keel stores.
#[derive(Debug, Parser)]
#[command(name = "keel", version, about)]
pub struct Args {
    /// Root data directory.
    #[arg(long, global = true, default_value = DEFAULT_DATADIR)]
    pub datadir: PathBuf,

    /// Store directory. Defaults to `<datadir>/<label>`.
    #[arg(long, global = true)]
    pub chaindata: Option<PathBuf>,

    /// Store diagnostic level, 0 (fatal) to 7 (extra). -1 keeps the default.
    #[arg(
        long = "database.verbosity",
        global = true,
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub database_verbosity: i8,

    /// Schema domain of the store.
    #[arg(long, global = true, default_value_t = Label::Chain)]
    pub label: Label,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the store, applying pending migrations.
    Upgrade {
        /// Open without checking for migrations.
        #[arg(long)]
        no_migrations: bool,

        /// Log stored blocks starting at this number before migrating.
        #[arg(long)]
        scan_from: Option<u64>,

        /// Number of blocks to log with `--scan-from`.
        #[arg(long, default_value_t = DEFAULT_SCAN_AMOUNT, requires = "scan_from")]
        scan_amount: usize,
    },
    /// List migration records without applying anything.
    Status,
}

impl Args {
    /// Build the coordinator configuration.
    pub fn to_config(&self) -> keel::Result<Config> {
        let mut config = Config::new(&self.datadir)
            .label(self.label)
            .verbosity_level(self.database_verbosity)?;
        if let Some(path) = &self.chaindata {
            config = config.store_path(path);
        }
        if let Command::Upgrade {
            no_migrations,
            scan_from,
            scan_amount,
        } = &self.command
        {
            config = config
                .apply_migrations(!no_migrations)
                .diagnostics(scan_from.map(|from| DiagnosticScan::new(from, *scan_amount)));
        }
        Ok(config)
    }
}
