use clap::{Parser, Subcommand};
use photo_sync::models::{Photo, RemoteInstance};
use photo_sync::services::{
    get_sync_status, instance_service, photo_service, BackgroundSync, ClientRegistry, Reconciler,
    SyncCoordinator, SyncWorker,
};
use photo_sync::{AppError, Database, SyncConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PHOTO_SYNC_CONFIG", default_value = "photo-sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the active remote deployment of a tenant
    AddInstance {
        tenant: String,
        base_url: String,
        username: String,
        #[arg(long, env = "PHOTO_SYNC_REMOTE_PASSWORD")]
        password: String,
    },
    /// Record a local photo as pending sync
    AddPhoto {
        tenant: String,
        path: PathBuf,
        /// Defaults to the file name of `path`
        #[arg(long)]
        filename: Option<String>,
    },
    /// Sync one photo
    Sync { photo_id: String },
    /// Sync several photos concurrently
    Batch {
        photo_ids: Vec<String>,
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Reset failed photos of a tenant and sync them again
    Retry {
        tenant: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Sync photos of a tenant still waiting in pending
    Pending {
        tenant: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Compare local and remote photos; only reports unless --apply is given
    Reconcile {
        tenant: String,
        #[arg(long)]
        apply: bool,
    },
    /// Show sync counts for a tenant
    Status { tenant: String },
    /// Probe every tenant's active deployment
    Health,
    /// Ask a tenant's deployment to re-index its library
    Index { tenant: String },
    /// Run the background scheduler until Ctrl-C, then print the cycle log
    Run,
}

struct App {
    config: SyncConfig,
    db: Database,
    registry: Arc<ClientRegistry>,
}

impl App {
    fn open(config: SyncConfig) -> Result<Self, AppError> {
        let db = Database::open(&config.database_path)?;
        Ok(Self {
            config,
            db,
            registry: Arc::new(ClientRegistry::new()),
        })
    }

    fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(
            self.db.clone(),
            self.registry.clone(),
            self.config.retry.clone(),
            self.config.batch.clone(),
        )
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.db.clone(),
            self.registry.clone(),
            self.config.reconcile.clone(),
        )
    }

    fn active_instance(&self, tenant: &str) -> Result<RemoteInstance, AppError> {
        self.db
            .with(|conn| instance_service::find_active_instance(conn, tenant))?
            .ok_or_else(|| AppError::NotFound(format!("active instance for tenant {}", tenant)))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = SyncConfig::load(&cli.config)?;
    let app = App::open(config)?;

    match cli.command {
        Commands::AddInstance {
            tenant,
            base_url,
            username,
            password,
        } => {
            let instance = RemoteInstance::new(&tenant, &base_url, &username, &password);
            app.db
                .with(|conn| instance_service::create_instance(conn, &instance))?;
            print_json(&instance)
        }
        Commands::AddPhoto {
            tenant,
            path,
            filename,
        } => {
            let filename = match filename {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        AppError::Validation(format!("{} has no file name", path.display()))
                    })?,
            };
            let photo = Photo::new(&tenant, &filename, &path.to_string_lossy());
            app.db.with(|conn| photo_service::create_photo(conn, &photo))?;
            print_json(&photo)
        }
        Commands::Sync { photo_id } => {
            let synced = app.coordinator().sync_photo(&photo_id).await;
            print_json(&serde_json::json!({ "photo_id": photo_id, "synced": synced }))
        }
        Commands::Batch {
            photo_ids,
            max_concurrent,
        } => {
            let max_concurrent = max_concurrent.unwrap_or(app.config.batch.max_concurrent);
            let results = app
                .coordinator()
                .batch_sync_photos(&photo_ids, max_concurrent)
                .await;
            print_json(&results)
        }
        Commands::Retry { tenant, limit } => {
            let limit = limit.unwrap_or(app.config.batch.retry_limit);
            let retried = app.coordinator().retry_failed_syncs(&tenant, limit).await;
            print_json(&retried)
        }
        Commands::Pending { tenant, limit } => {
            let limit = limit.unwrap_or(app.config.background.pending_limit);
            let results = app.coordinator().sync_pending_photos(&tenant, limit).await;
            print_json(&results)
        }
        Commands::Reconcile { tenant, apply } => {
            let report = app.reconciler().reconcile(&tenant, !apply).await;
            print_json(&report)
        }
        Commands::Status { tenant } => print_json(&get_sync_status(&app.db, &tenant)?),
        Commands::Health => {
            let tenants = app.db.with(instance_service::list_active_tenants)?;
            for tenant in &tenants {
                let instance = app.active_instance(tenant)?;
                app.registry
                    .get_client_for_tenant(tenant, &instance.client_config())?;
            }
            let results = app.registry.health_check_all().await;
            for (tenant, healthy) in &results {
                app.db
                    .with(|conn| instance_service::record_health_check(conn, tenant, *healthy))?;
            }
            print_json(&results)
        }
        Commands::Index { tenant } => {
            let instance = app.active_instance(&tenant)?;
            let client = app
                .registry
                .get_client_for_tenant(&tenant, &instance.client_config())?;
            let triggered = client.trigger_indexing().await;
            print_json(&serde_json::json!({ "tenant_id": tenant, "indexing_triggered": triggered }))
        }
        Commands::Run => {
            let worker = SyncWorker::new(
                app.coordinator(),
                Arc::new(app.reconciler()),
                app.config.background.clone(),
            );
            let background = BackgroundSync::start(worker);
            tokio::signal::ctrl_c().await?;
            let sync_log = background.sync_log();
            background.stop().await;
            print_json(&sync_log)
        }
    }
}
