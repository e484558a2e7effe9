//! Background sweep and scheduling jobs
//!
//! Three sweepers (comments, conversation lists, messages) drive drain
//! syncs for stale units, and the publication scheduler publishes due
//! scheduled publications. One unit's failure never aborts the rest of
//! its batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::config::SweeperConfig;
use crate::data::SyncDomain;
use crate::error::AppError;
use crate::metrics;
use crate::service::{AccountService, CommentService, DirectService, PublicationService};

use super::PeriodicJob;

fn cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow()
}

// =============================================================================
// Comment sweeper
// =============================================================================

/// Sweeps stale comment caches, one published media item at a time
pub struct CommentSweeper {
    comments: Arc<CommentService>,
    accounts: Arc<AccountService>,
    config: SweeperConfig,
}

impl CommentSweeper {
    pub fn new(
        comments: Arc<CommentService>,
        accounts: Arc<AccountService>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            comments,
            accounts,
            config,
        }
    }

    async fn sweep_media(&self, media_id: &str) -> Result<(), AppError> {
        let result = async {
            let account_id = self
                .comments
                .media_account_id(media_id)
                .await?
                .ok_or(AppError::NotFound)?;
            let access_token = self.accounts.get_access_token(&account_id).await?;
            self.comments
                .sync_media_comments(media_id, &access_token)
                .await
        }
        .await;

        match result {
            Ok(()) => {
                if let Err(error) = self.comments.record_sync_success(media_id).await {
                    tracing::warn!(media_id = %media_id, %error, "Failed to reset retry count");
                }
                Ok(())
            }
            Err(error) => {
                if let Err(record_error) = self
                    .comments
                    .record_sync_failure(media_id, &error.to_string(), self.config.max_retries)
                    .await
                {
                    tracing::warn!(
                        media_id = %media_id,
                        error = %record_error,
                        "Failed to record retry count"
                    );
                }
                Err(error)
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for CommentSweeper {
    fn name(&self) -> &'static str {
        "comment-sweeper"
    }

    fn startup_delay(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn interval(&self) -> Duration {
        self.config.interval()
    }

    async fn run(&self, cancel: &watch::Receiver<bool>) {
        metrics::SWEEPS_TOTAL.with_label_values(&["comments"]).inc();

        let media_ids = match self
            .comments
            .media_ids_needing_sync(self.config.sync_age(), self.config.batch_size)
            .await
        {
            Ok(media_ids) => media_ids,
            Err(error) => {
                tracing::error!(%error, "Failed to select media needing comment sync");
                return;
            }
        };

        if media_ids.is_empty() {
            tracing::debug!("No media needs comment sync");
            return;
        }

        tracing::info!(count = media_ids.len(), "Syncing comments for media");

        for media_id in media_ids {
            if cancelled(cancel) {
                return;
            }

            if let Err(error) = self.sweep_media(&media_id).await {
                tracing::error!(media_id = %media_id, %error, "Comment sync failed");
                continue;
            }
            tracing::debug!(media_id = %media_id, "Comments synced");
        }
    }
}

// =============================================================================
// Conversation-list sweeper
// =============================================================================

/// Sweeps stale conversation lists, one account at a time
pub struct ConversationSweeper {
    direct: Arc<DirectService>,
    accounts: Arc<AccountService>,
    config: SweeperConfig,
}

impl ConversationSweeper {
    pub fn new(
        direct: Arc<DirectService>,
        accounts: Arc<AccountService>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            direct,
            accounts,
            config,
        }
    }

    async fn sweep_account(&self, account_id: &str) -> Result<(), AppError> {
        let result = async {
            let credentials = self.accounts.credentials(account_id).await?;
            self.direct
                .sync_conversations(
                    account_id,
                    &credentials.instagram_user_id,
                    &credentials.access_token,
                )
                .await
        }
        .await;

        match result {
            Ok(()) => {
                if let Err(error) = self
                    .direct
                    .record_sync_success(SyncDomain::Conversations, account_id)
                    .await
                {
                    tracing::warn!(account_id = %account_id, %error, "Failed to reset retry count");
                }
                Ok(())
            }
            Err(error) => {
                if let Err(record_error) = self
                    .direct
                    .record_sync_failure(
                        SyncDomain::Conversations,
                        account_id,
                        &error.to_string(),
                        self.config.max_retries,
                    )
                    .await
                {
                    tracing::warn!(
                        account_id = %account_id,
                        error = %record_error,
                        "Failed to record retry count"
                    );
                }
                Err(error)
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for ConversationSweeper {
    fn name(&self) -> &'static str {
        "conversation-sweeper"
    }

    fn startup_delay(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn interval(&self) -> Duration {
        self.config.interval()
    }

    async fn run(&self, cancel: &watch::Receiver<bool>) {
        metrics::SWEEPS_TOTAL
            .with_label_values(&["conversations"])
            .inc();

        let account_ids = match self
            .direct
            .accounts_needing_sync(self.config.sync_age(), self.config.batch_size)
            .await
        {
            Ok(account_ids) => account_ids,
            Err(error) => {
                tracing::error!(%error, "Failed to select accounts needing DM sync");
                return;
            }
        };

        if account_ids.is_empty() {
            tracing::debug!("No accounts need DM sync");
            return;
        }

        tracing::info!(count = account_ids.len(), "Syncing conversations for accounts");

        for account_id in account_ids {
            if cancelled(cancel) {
                return;
            }

            if let Err(error) = self.sweep_account(&account_id).await {
                tracing::error!(account_id = %account_id, %error, "Conversation sync failed");
                continue;
            }
            tracing::debug!(account_id = %account_id, "Conversations synced");
        }
    }
}

// =============================================================================
// Message sweeper
// =============================================================================

/// Sweeps stale message caches, one conversation at a time
pub struct MessageSweeper {
    direct: Arc<DirectService>,
    accounts: Arc<AccountService>,
    config: SweeperConfig,
}

impl MessageSweeper {
    pub fn new(
        direct: Arc<DirectService>,
        accounts: Arc<AccountService>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            direct,
            accounts,
            config,
        }
    }

    async fn sweep_conversation(&self, conversation_id: &str) -> Result<(), AppError> {
        let result = async {
            let account_id = self
                .direct
                .conversation_account_id(conversation_id)
                .await?
                .ok_or(AppError::NotFound)?;
            let credentials = self.accounts.credentials(&account_id).await?;
            self.direct
                .sync_messages(
                    conversation_id,
                    &credentials.instagram_user_id,
                    &credentials.access_token,
                )
                .await
        }
        .await;

        match result {
            Ok(()) => {
                if let Err(error) = self
                    .direct
                    .record_sync_success(SyncDomain::Messages, conversation_id)
                    .await
                {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        %error,
                        "Failed to reset retry count"
                    );
                }
                Ok(())
            }
            Err(error) => {
                if let Err(record_error) = self
                    .direct
                    .record_sync_failure(
                        SyncDomain::Messages,
                        conversation_id,
                        &error.to_string(),
                        self.config.max_retries,
                    )
                    .await
                {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %record_error,
                        "Failed to record retry count"
                    );
                }
                Err(error)
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for MessageSweeper {
    fn name(&self) -> &'static str {
        "message-sweeper"
    }

    fn startup_delay(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn interval(&self) -> Duration {
        self.config.interval()
    }

    async fn run(&self, cancel: &watch::Receiver<bool>) {
        metrics::SWEEPS_TOTAL.with_label_values(&["messages"]).inc();

        let conversation_ids = match self
            .direct
            .conversations_needing_sync(self.config.sync_age(), self.config.batch_size)
            .await
        {
            Ok(conversation_ids) => conversation_ids,
            Err(error) => {
                tracing::error!(%error, "Failed to select conversations needing message sync");
                return;
            }
        };

        if conversation_ids.is_empty() {
            tracing::debug!("No conversations need message sync");
            return;
        }

        tracing::info!(
            count = conversation_ids.len(),
            "Syncing messages for conversations"
        );

        for conversation_id in conversation_ids {
            if cancelled(cancel) {
                return;
            }

            if let Err(error) = self.sweep_conversation(&conversation_id).await {
                tracing::error!(
                    conversation_id = %conversation_id,
                    %error,
                    "Message sync failed"
                );
                continue;
            }
            tracing::debug!(conversation_id = %conversation_id, "Messages synced");
        }
    }
}

// =============================================================================
// Publication scheduler
// =============================================================================

/// Publishes scheduled publications whose time has come
pub struct PublicationSchedulerJob {
    publications: Arc<PublicationService>,
    interval: Duration,
}

impl PublicationSchedulerJob {
    pub fn new(publications: Arc<PublicationService>, interval: Duration) -> Self {
        Self {
            publications,
            interval,
        }
    }
}

#[async_trait]
impl PeriodicJob for PublicationSchedulerJob {
    fn name(&self) -> &'static str {
        "publication-scheduler"
    }

    fn startup_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self, _cancel: &watch::Receiver<bool>) {
        tracing::debug!("Processing scheduled publications");

        if let Err(error) = self.publications.process_scheduled().await {
            tracing::error!(%error, "Failed to process scheduled publications");
        }
    }
}
