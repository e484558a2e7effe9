//! Metagram - a self-hosted Instagram content manager
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Comments, direct messages, publications                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Read-through sync engine (comments, DMs)                 │
//! │  - Publication lifecycle and publishing                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │  Data Layer (SQLite)     │   │  Instagram Graph API client  │
//! │  - cached content        │   │  - containers + publishing   │
//! │  - sync bookkeeping      │   │                              │
//! └──────────────────────────┘   └──────────────────────────────┘
//!        background tasks: sweepers + publication scheduler
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `instagram`: Graph API client and publishing workflow
//! - `scheduler`: Background sweepers and the publication scheduler
//! - `data`: Database layer
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod instagram;
pub mod metrics;
pub mod scheduler;
pub mod service;

use std::sync::Arc;

use scheduler::{
    CommentSweeper, ConversationSweeper, MessageSweeper, PeriodicTask, PublicationSchedulerJob,
};
use service::{AccountService, CommentService, DirectService, PublicationService};

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and services.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Account credential resolution
    pub accounts: Arc<AccountService>,

    /// Comment cache and sync
    pub comments: Arc<CommentService>,

    /// Conversation/message cache and sync
    pub direct: Arc<DirectService>,

    /// Publication lifecycle
    pub publications: Arc<PublicationService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the Graph API client
    /// 3. Wire up services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Build the Graph API client
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent("Metagram/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );
        let platform: Arc<dyn instagram::PlatformClient> = Arc::new(instagram::Client::new(
            http_client,
            config.instagram.base_url.clone(),
            config.instagram.api_version.clone(),
        ));

        // 3. Wire up services
        let accounts = Arc::new(AccountService::new(Arc::clone(&db)));
        let comments = Arc::new(CommentService::new(
            Arc::clone(&platform),
            Arc::clone(&db),
            config.sync.max_age(),
        ));
        let direct = Arc::new(DirectService::new(
            Arc::clone(&platform),
            Arc::clone(&db),
            config.sync.max_age(),
        ));
        let publisher = Arc::new(instagram::Publisher::new(Arc::clone(&platform)));
        let publications = Arc::new(PublicationService::new(
            Arc::clone(&db),
            publisher,
            Arc::clone(&accounts),
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            accounts,
            comments,
            direct,
            publications,
        })
    }

    /// Build the background tasks for this state.
    ///
    /// The caller owns starting and stopping them; the publication
    /// scheduler is omitted when disabled in configuration.
    pub fn background_tasks(&self) -> Vec<Arc<PeriodicTask>> {
        let mut tasks = vec![
            Arc::new(PeriodicTask::new(CommentSweeper::new(
                Arc::clone(&self.comments),
                Arc::clone(&self.accounts),
                self.config.sync.comments.clone(),
            ))),
            Arc::new(PeriodicTask::new(ConversationSweeper::new(
                Arc::clone(&self.direct),
                Arc::clone(&self.accounts),
                self.config.sync.conversations.clone(),
            ))),
            Arc::new(PeriodicTask::new(MessageSweeper::new(
                Arc::clone(&self.direct),
                Arc::clone(&self.accounts),
                self.config.sync.messages.clone(),
            ))),
        ];

        if self.config.scheduler.enabled {
            tasks.push(Arc::new(PeriodicTask::new(PublicationSchedulerJob::new(
                Arc::clone(&self.publications),
                self.config.scheduler.interval(),
            ))));
        }

        tasks
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
