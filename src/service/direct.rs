//! Direct message service
//!
//! Conversations and messages are mirrored locally. Conversation lists
//! are refreshed by the background sweeper; message reads are
//! read-through with an on-demand drain when stale. Outgoing messages
//! go to the platform first and are cached best-effort afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use crate::data::{Conversation, Database, MediaKind, Message, MessageType, SyncDomain, SyncStatus};
use crate::error::AppError;
use crate::instagram::PlatformClient;
use crate::metrics;

use super::{
    await_persist_tasks, record_persist_outcome, MAX_CONSECUTIVE_EMPTY_PAGES, SYNC_PAGE_SIZE,
};

/// A page of cached conversations
#[derive(Debug, Clone)]
pub struct ConversationListing {
    pub conversations: Vec<Conversation>,
    pub total: i64,
    pub has_more: bool,
}

/// A page of cached messages
#[derive(Debug, Clone)]
pub struct MessageListing {
    pub messages: Vec<Message>,
    pub total: i64,
    pub has_more: bool,
}

/// Conversation/message cache and sync coordinator
pub struct DirectService {
    client: Arc<dyn PlatformClient>,
    db: Arc<Database>,
    /// How stale a conversation's message cache may be before a read
    /// triggers a sync
    sync_max_age: Duration,
}

impl DirectService {
    pub fn new(client: Arc<dyn PlatformClient>, db: Arc<Database>, sync_max_age: Duration) -> Self {
        Self {
            client,
            db,
            sync_max_age,
        }
    }

    /// List cached conversations for an account.
    ///
    /// The conversation list is kept fresh by the background sweeper;
    /// reads never block on the platform.
    pub async fn get_conversations(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<ConversationListing, AppError> {
        let conversations = self
            .db
            .get_conversations_by_account(account_id, limit, offset)
            .await?;
        let total = self.db.count_conversations(account_id).await?;
        let has_more = offset + (conversations.len() as i64) < total;

        Ok(ConversationListing {
            conversations,
            total,
            has_more,
        })
    }

    /// Get messages in a conversation, refreshing the cache first when
    /// it is stale.
    ///
    /// A failed refresh falls back to the stale cache when one exists;
    /// with no cache at all the error propagates.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
        access_token: &str,
        limit: i64,
        offset: i64,
    ) -> Result<MessageListing, AppError> {
        let status = self
            .db
            .get_sync_status(SyncDomain::Messages, conversation_id)
            .await?;

        let needs_sync = match &status {
            None => true,
            Some(status) => {
                Utc::now() - status.last_synced_at
                    > chrono::Duration::from_std(self.sync_max_age).unwrap_or_else(|_| chrono::Duration::zero())
            }
        };

        if needs_sync {
            if let Err(error) = self
                .sync_messages(conversation_id, user_id, access_token)
                .await
            {
                if status.is_some() {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        %error,
                        "Message sync failed, serving stale cache"
                    );
                } else {
                    return Err(error);
                }
            }
        }

        let messages = self
            .db
            .get_messages_by_conversation(conversation_id, limit, offset)
            .await?;
        let total = self.db.count_messages(conversation_id).await?;
        let has_more = offset + (messages.len() as i64) < total;

        Ok(MessageListing {
            messages,
            total,
            has_more,
        })
    }

    /// Send a text message, then cache it best-effort
    pub async fn send_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        text: &str,
    ) -> Result<String, AppError> {
        crate::data::validate_message_text(text)?;

        let message_id = self
            .client
            .send_message(user_id, recipient_id, access_token, text)
            .await?;

        self.write_behind_own_message(
            &message_id,
            conversation_id,
            user_id,
            MessageType::Text,
            Some(text.to_string()),
            None,
        )
        .await;

        Ok(message_id)
    }

    /// Send an image or video message, then cache it best-effort
    pub async fn send_media_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
    ) -> Result<String, AppError> {
        if media_url.is_empty() {
            return Err(AppError::Validation(
                "media URL is required for media messages".to_string(),
            ));
        }

        let message_id = self
            .client
            .send_media_message(user_id, recipient_id, access_token, media_url, media_kind)
            .await?;

        let message_type = match media_kind {
            MediaKind::Image => MessageType::Image,
            MediaKind::Video => MessageType::Video,
        };
        self.write_behind_own_message(
            &message_id,
            conversation_id,
            user_id,
            message_type,
            None,
            Some(media_url.to_string()),
        )
        .await;

        Ok(message_id)
    }

    /// Drain every remaining conversation page for an account into the
    /// cache.
    ///
    /// Pages persist concurrently while the next page is fetched; the
    /// call returns only after all dispatched persistence has finished.
    pub async fn sync_conversations(
        &self,
        account_id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let mut cursor: Option<String> = None;
        let mut empty_pages = 0u32;
        let mut tasks: JoinSet<Result<(), AppError>> = JoinSet::new();
        let mut first_error: Option<AppError> = None;

        loop {
            while let Some(outcome) = tasks.try_join_next() {
                record_persist_outcome(outcome, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let page = match self
                .client
                .get_conversations(user_id, access_token, SYNC_PAGE_SIZE, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    await_persist_tasks(&mut tasks, &mut first_error).await;
                    metrics::SYNC_RUNS_TOTAL
                        .with_label_values(&["conversations", "error"])
                        .inc();
                    return Err(error);
                }
            };

            if page.items.is_empty() {
                empty_pages += 1;
                if empty_pages >= MAX_CONSECUTIVE_EMPTY_PAGES {
                    tracing::warn!(
                        account_id = %account_id,
                        empty_pages,
                        "Aborting conversation drain after consecutive empty pages"
                    );
                    break;
                }
            } else {
                empty_pages = 0;
                let mut conversations = page.items;
                for conversation in &mut conversations {
                    conversation.account_id = account_id.to_string();
                }
                let db = Arc::clone(&self.db);
                tasks.spawn(async move { db.upsert_conversations(&conversations).await });
            }

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        await_persist_tasks(&mut tasks, &mut first_error).await;
        if let Some(error) = first_error {
            metrics::SYNC_RUNS_TOTAL
                .with_label_values(&["conversations", "error"])
                .inc();
            return Err(error);
        }

        self.db
            .update_sync_status(
                SyncDomain::Conversations,
                &SyncStatus::completed(account_id.to_string(), None),
            )
            .await?;

        metrics::SYNC_RUNS_TOTAL
            .with_label_values(&["conversations", "success"])
            .inc();

        Ok(())
    }

    /// Drain every remaining message page for a conversation into the
    /// cache, tracking the oldest message timestamp seen for the next
    /// incremental window.
    pub async fn sync_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let mut cursor: Option<String> = None;
        let mut empty_pages = 0u32;
        let mut oldest_seen: Option<DateTime<Utc>> = None;
        let mut tasks: JoinSet<Result<(), AppError>> = JoinSet::new();
        let mut first_error: Option<AppError> = None;

        loop {
            while let Some(outcome) = tasks.try_join_next() {
                record_persist_outcome(outcome, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let page = match self
                .client
                .get_messages(
                    conversation_id,
                    user_id,
                    access_token,
                    SYNC_PAGE_SIZE,
                    cursor.as_deref(),
                )
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    await_persist_tasks(&mut tasks, &mut first_error).await;
                    metrics::SYNC_RUNS_TOTAL
                        .with_label_values(&["messages", "error"])
                        .inc();
                    return Err(error);
                }
            };

            if page.items.is_empty() {
                empty_pages += 1;
                if empty_pages >= MAX_CONSECUTIVE_EMPTY_PAGES {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        empty_pages,
                        "Aborting message drain after consecutive empty pages"
                    );
                    break;
                }
            } else {
                empty_pages = 0;

                // Pages arrive newest-first; the page's last message is
                // its oldest
                if let Some(last) = page.items.last() {
                    if oldest_seen.is_none_or(|oldest| last.sent_at < oldest) {
                        oldest_seen = Some(last.sent_at);
                    }
                }

                let db = Arc::clone(&self.db);
                let messages = page.items;
                tasks.spawn(async move { db.upsert_messages(&messages).await });
            }

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        await_persist_tasks(&mut tasks, &mut first_error).await;
        if let Some(error) = first_error {
            metrics::SYNC_RUNS_TOTAL
                .with_label_values(&["messages", "error"])
                .inc();
            return Err(error);
        }

        self.db
            .update_sync_status(
                SyncDomain::Messages,
                &SyncStatus::completed(conversation_id.to_string(), oldest_seen),
            )
            .await?;

        metrics::SYNC_RUNS_TOTAL
            .with_label_values(&["messages", "success"])
            .inc();

        Ok(())
    }

    /// Accounts whose conversation list is due for a background sweep
    pub async fn accounts_needing_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        self.db
            .accounts_needing_conversation_sync(older_than, limit)
            .await
    }

    /// Conversations whose messages are due for a background sweep
    pub async fn conversations_needing_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        self.db
            .conversations_needing_message_sync(older_than, limit)
            .await
    }

    /// Resolve the owning account of a cached conversation
    pub async fn conversation_account_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<String>, AppError> {
        self.db.get_conversation_account_id(conversation_id).await
    }

    /// Record a failed sweep attempt for a unit in a DM domain
    pub async fn record_sync_failure(
        &self,
        domain: SyncDomain,
        unit_id: &str,
        error: &str,
        max_retries: u32,
    ) -> Result<(), AppError> {
        self.db
            .increment_sync_retry(domain, unit_id, error, max_retries)
            .await
    }

    /// Clear retry bookkeeping after a successful sweep
    pub async fn record_sync_success(
        &self,
        domain: SyncDomain,
        unit_id: &str,
    ) -> Result<(), AppError> {
        self.db.reset_sync_retry(domain, unit_id).await
    }

    async fn write_behind_own_message(
        &self,
        message_id: &str,
        conversation_id: &str,
        user_id: &str,
        message_type: MessageType,
        text: Option<String>,
        media_url: Option<String>,
    ) {
        let now = Utc::now();
        let message = Message {
            id: message_id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: user_id.to_string(),
            message_type,
            text,
            media_url,
            is_unsent: false,
            is_from_me: true,
            sent_at: now,
            created_at: now,
        };

        if let Err(error) = self.db.upsert_message(&message).await {
            tracing::warn!(
                message_id = %message_id,
                %error,
                "Failed to cache own message"
            );
        }
    }
}
