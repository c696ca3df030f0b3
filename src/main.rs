use anyhow::ensure;
use clap::{Parser, Subcommand};
use snowpull::{export_inventory, sync_bucket, Credentials, S3Store, SyncOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "snowpull")]
#[command(about = "Reconcile an S3-compatible storage appliance against local disk", long_about = None)]
#[command(version)]
struct Cli {
    /// Endpoint URL of the appliance (e.g. https://192.0.2.10:8443)
    #[arg(long)]
    endpoint: String,

    /// Access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    access_key: Option<String>,

    /// Secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer every missing or changed object from a bucket
    Sync {
        /// Bucket name
        #[arg(long)]
        bucket: String,

        /// Local folder to sync into (must already exist)
        #[arg(long)]
        local_folder: PathBuf,

        /// Maximum number of concurrent transfers
        #[arg(long, default_value_t = 1)]
        max_workers: usize,

        /// Plan and report without transferring anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Like sync, restricted to the names listed in a manifest file
    SyncManifest {
        /// Bucket name
        #[arg(long)]
        bucket: String,

        /// Local folder to sync into (must already exist)
        #[arg(long)]
        local_folder: PathBuf,

        /// Manifest file whose name column narrows the work set
        #[arg(long)]
        manifest: PathBuf,

        /// Maximum number of concurrent transfers
        #[arg(long, default_value_t = 1)]
        max_workers: usize,

        /// Plan and report without transferring anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Snapshot the full bucket inventory into a manifest file
    Export {
        /// Bucket name
        #[arg(long)]
        bucket: String,

        /// Path of the manifest file to write
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("snowpull={log_level}"))
        .init();

    // Per-item transfer failures are reported in the run summary and leave
    // the exit status at 0; only setup failures reach this point.
    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("🚀 snowpull - appliance to disk reconciliation");
    info!("Endpoint: {}", cli.endpoint);

    let credentials = match (cli.access_key, cli.secret_key) {
        (Some(access_key), Some(secret_key)) => Some(Credentials {
            access_key,
            secret_key,
        }),
        (None, None) => None,
        _ => anyhow::bail!("--access-key and --secret-key must be supplied together"),
    };
    let store = Arc::new(S3Store::new(&cli.endpoint, credentials)?);

    match cli.command {
        Command::Sync {
            bucket,
            local_folder,
            max_workers,
            dry_run,
        } => {
            run_sync(store, bucket, local_folder, max_workers, dry_run, None).await?;
        }
        Command::SyncManifest {
            bucket,
            local_folder,
            manifest,
            max_workers,
            dry_run,
        } => {
            run_sync(
                store,
                bucket,
                local_folder,
                max_workers,
                dry_run,
                Some(manifest),
            )
            .await?;
        }
        Command::Export { bucket, output } => {
            export_inventory(store.as_ref(), &bucket, &output).await?;
            info!("✅ Export complete");
        }
    }
    Ok(())
}

async fn run_sync(
    store: Arc<S3Store>,
    bucket: String,
    local_folder: PathBuf,
    max_workers: usize,
    dry_run: bool,
    manifest: Option<PathBuf>,
) -> anyhow::Result<()> {
    ensure!(
        local_folder.is_dir(),
        "local folder {} does not exist or is not a directory",
        local_folder.display()
    );

    let report = sync_bucket(
        store,
        &SyncOptions {
            bucket,
            dest: local_folder,
            max_workers,
            dry_run,
            manifest,
        },
    )
    .await?;

    if report.dry_run {
        info!("✅ Dry run complete");
    } else {
        info!("✅ Sync complete");
    }
    Ok(())
}
