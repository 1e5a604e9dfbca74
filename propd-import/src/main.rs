//! propd-import: CSV migration tool for the propd backend
//!
//! Reads a directory of exported CSV files, classifies each file to an
//! entity, cleans and validates the rows, resolves references, and
//! commits into the SQLite store, with a pre-run snapshot and a run
//! report at the end.

use anyhow::{Context, Result};
use clap::Parser;
use propd_common::config::{resolve_database_path, TomlConfig};
use propd_common::db::{self, init::init_database};
use propd_common::logging::{init_logging, LogRotation};
use propd_common::models::{User, UserRole};
use propd_import::report::{render, OutputFormat};
use propd_import::{run_migration, ImportConfig, RunState};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_ADMIN_EMAIL: &str = "admin@propd.local";

#[derive(Parser, Debug)]
#[command(name = "propd-import", about = "CSV data migration for propd", version)]
struct Args {
    /// Directory containing the CSV files to import
    #[arg(long)]
    csv_dir: PathBuf,

    /// Directory for pre-run snapshots (defaults to the data folder)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Validate and resolve everything, commit nothing
    #[arg(long)]
    dry_run: bool,

    /// Skip the validation stage
    #[arg(long)]
    no_validation: bool,

    /// Skip the cleaning stage
    #[arg(long)]
    no_cleaning: bool,

    /// Skip the pre-run snapshot
    #[arg(long)]
    no_backup: bool,

    /// Rows per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Run-wide error threshold before the run aborts
    #[arg(long)]
    max_errors: Option<usize>,

    /// Skip files that match no entity mapping instead of failing
    #[arg(long)]
    skip_unmatched: bool,

    /// Log filter directive (error, warn, info, debug, trace; warning
    /// and critical are accepted as aliases)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output_format: OutputFormat,

    /// TOML configuration file
    #[arg(long, default_value = "propd.toml")]
    config: PathBuf,

    /// SQLite database path (overrides config and environment)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Email of the acting user; must exist unless it is the default
    /// admin account, which is created on demand
    #[arg(long, default_value = DEFAULT_ADMIN_EMAIL)]
    principal: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(&args.config).unwrap_or_else(|e| {
        eprintln!("warning: {e}");
        TomlConfig::default()
    });

    let level = toml_config
        .log_level
        .clone()
        .filter(|_| args.log_level == "info")
        .unwrap_or_else(|| args.log_level.clone());
    let log_file = args.log_file.clone().or_else(|| toml_config.log_file.clone());
    let mut rotation = LogRotation::default();
    if let Some(v) = toml_config.log_max_bytes {
        rotation.max_bytes = v;
    }
    if let Some(v) = toml_config.log_backups {
        rotation.backups = v;
    }
    let _log_guard = init_logging(&level, log_file.as_deref(), rotation)?;

    let db_path = resolve_database_path(args.database.as_deref(), &toml_config);
    info!(database = %db_path.display(), "opening store");
    let pool = init_database(&db_path).await?;

    let mut config = ImportConfig::default();
    if args.config.exists() {
        config
            .apply_overrides(&args.config)
            .context("applying configuration overrides")?;
    }
    config.dry_run = args.dry_run;
    config.validation = !args.no_validation;
    config.cleaning = !args.no_cleaning;
    config.snapshot = !args.no_backup;
    config.skip_unmatched = config.skip_unmatched || args.skip_unmatched;
    if let Some(v) = args.batch_size {
        config.batch_size = v;
    }
    if let Some(v) = args.max_errors {
        config.max_errors = v;
    }
    if let Some(dir) = args.backup_dir {
        config.snapshot_dir = dir;
    }

    let principal = ensure_principal(&pool, &args.principal).await?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current batch");
            signal_cancel.cancel();
        }
    });

    let report = match run_migration(&pool, &config, &args.csv_dir, principal, &cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!("migration failed: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    println!("{}", render(&report, args.output_format)?);

    match report.state {
        RunState::Succeeded => Ok(()),
        _ => std::process::exit(1),
    }
}

/// Resolve the acting user. The default admin account is bootstrapped on
/// first use; any other principal must already exist.
async fn ensure_principal(pool: &SqlitePool, email: &str) -> Result<Uuid> {
    let email = email.to_lowercase();
    if let Some(id) = db::users::find_user_id_by_email(pool, &email).await? {
        return Ok(id);
    }

    if email == DEFAULT_ADMIN_EMAIL {
        let admin = User::new(email.clone(), UserRole::Admin, "Administrator".to_string());
        let mut conn = pool.acquire().await?;
        db::users::insert_user(&mut conn, &admin).await?;
        info!(email = %email, "bootstrapped default admin account");
        return Ok(admin.id);
    }

    anyhow::bail!("principal '{email}' does not exist");
}
