//! Favorites daemon entry point.
//!
//! Usage: favorites-daemon [--base-dir <dir>] [run | list | delete]
//!
//! With no subcommand the daemon consumes lifecycle events until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use directory_client::{AuthHeaders, DirectoryConfig, HttpPeopleDirectory};
use favorites_config::{init_logging, Config, Paths};
use favorites_daemon::{
    BackgroundTasks, Caller, ConsumerSettings, EventLoop, FavoritesService, RedisAuditPublisher, RedisEventConsumer,
};
use favorites_database::{AsyncDatabase, SqliteStore};
use favorites_list_engine::{ListEngine, ListQuery, PagingView};
use favorites_model::ProfileKey;
use favorites_sync_engine::{SyncEngine, SyncSettings};
use tracing::{error, info};

/// Favorites list service.
#[derive(Parser, Debug)]
#[command(name = "favorites-daemon")]
#[command(about = "Favorites list service and lifecycle event consumer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log line format (compact, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Base directory for runtime files (database, logs, config). Defaults to ~/.favorites
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Redis connection URL.
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Consume lifecycle events (default)
    Run,
    /// Print one page of a user's entries as JSON
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        org: String,
        #[arg(long)]
        hidden: Option<bool>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        ps: Option<i64>,
    },
    /// Delete a comma-separated list of entry ids
    Delete {
        #[arg(long)]
        user: String,
        #[arg(long)]
        org: String,
        #[arg(long)]
        ids: String,
    },
}

/// Everything built from configuration, shared by the subcommands.
struct App {
    config: Config,
    store: Arc<SqliteStore>,
    directory: Arc<HttpPeopleDirectory>,
    sync: Arc<SyncEngine>,
    tasks: Arc<BackgroundTasks>,
}

impl App {
    async fn build(config: Config, paths: &Paths) -> anyhow::Result<Self> {
        let db = AsyncDatabase::open(&paths.database_file())
            .await
            .context("Failed to open database")?;
        db.health_check().await?;
        let store = Arc::new(SqliteStore::new(db));

        let directory = Arc::new(HttpPeopleDirectory::new(DirectoryConfig {
            profiles_url: config.profiles_url()?,
            id_mapping_url: config.id_mapping_url()?,
            s2s_token: config.s2s_token.clone(),
            timeout: config.directory_timeout(),
        })?);

        let sync = Arc::new(SyncEngine::new(
            store.clone(),
            store.clone(),
            directory.clone(),
            SyncSettings {
                ttl: config.sync_ttl(),
                sync_people_changes: config.sync_people_changes,
                communities_acl_sync: config.communities_acl_sync,
            },
        ));

        Ok(Self {
            config,
            store,
            directory,
            sync,
            tasks: Arc::new(BackgroundTasks::new()),
        })
    }

    async fn service(&self) -> anyhow::Result<FavoritesService> {
        let client = redis::Client::open(self.config.redis_url.as_str())?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis for audit events")?;
        let audit = Arc::new(RedisAuditPublisher::new(
            conn,
            self.config.subscriptions_hash.clone(),
            self.config.registration_name.clone(),
            self.config.audit_channel.clone(),
            self.tasks.clone(),
        ));

        Ok(FavoritesService::new(
            ListEngine::new(self.store.clone(), audit, self.config.max_visible_entries),
            PagingView::new(
                self.config.public_base_url()?,
                self.config.default_page_size,
                self.config.max_page_size,
            ),
            self.sync.clone(),
            self.directory.clone(),
            self.store.clone(),
            self.tasks.clone(),
        ))
    }

    async fn run(&self) -> anyhow::Result<()> {
        let settings = ConsumerSettings::from_config(&self.config);
        info!(
            redis_url = %settings.redis_url,
            list = %settings.events_list,
            name = %settings.registration_name,
            "Configuration loaded"
        );

        let consumer = RedisEventConsumer::connect(settings).await?;
        let mut events = EventLoop::new(consumer, self.sync.clone());

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::select! {
            result = events.run() => {
                if let Err(e) = result {
                    error!(error = %e, "Event loop exited with error");
                    return Err(e.into());
                }
            }
            _ = ctrl_c => {
                info!("Received shutdown signal, exiting...");
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(redis_url) = cli.redis_url {
        config.redis_url = redis_url;
    }

    init_logging(&config.log_level, &config.log_format, Some(paths.log_file()));
    info!(base_dir = %paths.base_dir().display(), "Favorites daemon starting...");

    let app = App::build(config, &paths).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => app.run().await?,
        Commands::List {
            user,
            org,
            hidden,
            page,
            ps,
        } => {
            let caller = Caller::new(ProfileKey::new(user, org), AuthHeaders::new());
            let query = ListQuery {
                hidden,
                page,
                page_size: ps,
            };
            let list = app.service().await?.get_entry_list(&caller, query).await;
            app.tasks.drain().await;
            let list = list?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        Commands::Delete { user, org, ids } => {
            let caller = Caller::new(ProfileKey::new(user, org), AuthHeaders::new());
            let summary = app.service().await?.delete_entries(&caller, &ids).await;
            app.tasks.drain().await;
            let summary = summary?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
