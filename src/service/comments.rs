//! Comment service
//!
//! Serves comments from the local cache with read-through sync against
//! the platform, and mirrors local comment mutations (create, reply,
//! delete, hide) back into the cache after the remote call succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;

use crate::data::{Comment, Database, SyncDomain, SyncStatus};
use crate::error::AppError;
use crate::instagram::PlatformClient;
use crate::metrics;

use super::{
    await_persist_tasks, record_persist_outcome, MAX_CONSECUTIVE_EMPTY_PAGES, SYNC_PAGE_SIZE,
};

/// A page of cached comments
#[derive(Debug, Clone)]
pub struct CommentListing {
    pub comments: Vec<Comment>,
    pub total: i64,
    pub has_more: bool,
}

/// Comment cache and sync coordinator
pub struct CommentService {
    client: Arc<dyn PlatformClient>,
    db: Arc<Database>,
    /// How stale the cache may be before a read triggers a sync
    sync_max_age: Duration,
}

impl CommentService {
    pub fn new(client: Arc<dyn PlatformClient>, db: Arc<Database>, sync_max_age: Duration) -> Self {
        Self {
            client,
            db,
            sync_max_age,
        }
    }

    /// Get comments for a media item, refreshing the cache first when
    /// it is stale.
    ///
    /// A failed refresh falls back to the stale cache when one exists;
    /// with no cache at all the error propagates.
    pub async fn get_comments(
        &self,
        media_id: &str,
        access_token: &str,
        limit: i64,
        offset: i64,
    ) -> Result<CommentListing, AppError> {
        let status = self.db.get_sync_status(SyncDomain::Comments, media_id).await?;

        let needs_sync = match &status {
            None => true,
            Some(status) => {
                Utc::now() - status.last_synced_at
                    > chrono::Duration::from_std(self.sync_max_age).unwrap_or_else(|_| chrono::Duration::zero())
            }
        };

        if needs_sync {
            if let Err(error) = self.sync_media_comments(media_id, access_token).await {
                if status.is_some() {
                    tracing::warn!(
                        media_id = %media_id,
                        %error,
                        "Comment sync failed, serving stale cache"
                    );
                } else {
                    return Err(error);
                }
            }
        }

        let comments = self
            .db
            .get_comments_by_media(media_id, limit, offset)
            .await?;
        let total = self.db.count_comments(media_id).await?;
        let has_more = offset + (comments.len() as i64) < total;

        Ok(CommentListing {
            comments,
            total,
            has_more,
        })
    }

    /// Get replies to a comment.
    ///
    /// Replies are shallow: one remote page is fetched and cached
    /// best-effort. When the remote call fails, cached replies are
    /// served instead if any exist.
    pub async fn get_replies(
        &self,
        comment_id: &str,
        access_token: &str,
        limit: i64,
    ) -> Result<CommentListing, AppError> {
        let page = match self
            .client
            .get_comment_replies(comment_id, access_token, SYNC_PAGE_SIZE, None)
            .await
        {
            Ok(page) => page,
            Err(error) => {
                let cached = self.db.get_comment_replies(comment_id, limit, 0).await?;
                if cached.is_empty() {
                    return Err(error);
                }
                tracing::warn!(
                    comment_id = %comment_id,
                    %error,
                    "Reply fetch failed, serving cached replies"
                );
                let total = cached.len() as i64;
                return Ok(CommentListing {
                    comments: cached,
                    total,
                    has_more: false,
                });
            }
        };

        // The replies endpoint does not echo the media ID; take it from
        // the cached parent when we have one.
        let media_id = self
            .db
            .get_comment(comment_id)
            .await?
            .map(|parent| parent.media_id)
            .unwrap_or_default();

        let mut replies = page.items;
        for reply in &mut replies {
            reply.media_id = media_id.clone();
        }

        // Write-behind: a cache failure must not fail the read
        if let Err(error) = self.db.upsert_comments(&replies).await {
            tracing::warn!(comment_id = %comment_id, %error, "Failed to cache replies");
        }

        let total = replies.len() as i64;
        let returned = replies.into_iter().take(limit as usize).collect::<Vec<_>>();
        let has_more = page.has_more || (returned.len() as i64) < total;

        Ok(CommentListing {
            comments: returned,
            total,
            has_more,
        })
    }

    /// Create a top-level comment on a media item
    pub async fn create_comment(
        &self,
        media_id: &str,
        access_token: &str,
        text: &str,
    ) -> Result<String, AppError> {
        crate::data::validate_comment_text(text)?;

        let id = self
            .client
            .create_comment(media_id, access_token, text)
            .await?;

        self.write_behind_own_comment(&id, media_id, None, text).await;

        Ok(id)
    }

    /// Reply to an existing comment
    pub async fn reply(
        &self,
        comment_id: &str,
        access_token: &str,
        text: &str,
    ) -> Result<String, AppError> {
        crate::data::validate_comment_text(text)?;

        let id = self
            .client
            .reply_to_comment(comment_id, access_token, text)
            .await?;

        let media_id = self
            .db
            .get_comment(comment_id)
            .await
            .ok()
            .flatten()
            .map(|parent| parent.media_id)
            .unwrap_or_default();
        self.write_behind_own_comment(&id, &media_id, Some(comment_id), text)
            .await;

        Ok(id)
    }

    /// Delete a comment remotely, then drop it from the cache
    pub async fn delete(&self, comment_id: &str, access_token: &str) -> Result<(), AppError> {
        self.client.delete_comment(comment_id, access_token).await?;

        if let Err(error) = self.db.delete_comment(comment_id).await {
            tracing::warn!(comment_id = %comment_id, %error, "Failed to delete cached comment");
        }

        Ok(())
    }

    /// Hide or unhide a comment remotely, then record the flag locally
    pub async fn hide(
        &self,
        comment_id: &str,
        access_token: &str,
        hide: bool,
    ) -> Result<(), AppError> {
        self.client
            .hide_comment(comment_id, access_token, hide)
            .await?;

        if let Err(error) = self.db.set_comment_hidden(comment_id, hide).await {
            tracing::warn!(comment_id = %comment_id, %error, "Failed to record hidden flag");
        }

        Ok(())
    }

    /// Drain every remaining comment page for a media item into the
    /// cache.
    ///
    /// Pages persist concurrently while the next page is fetched; the
    /// call returns only after all dispatched persistence has finished.
    /// A partially-failed drain can leave some pages persisted with no
    /// rollback; the next drain re-upserts them idempotently.
    pub async fn sync_media_comments(
        &self,
        media_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let mut cursor: Option<String> = None;
        let mut empty_pages = 0u32;
        let mut tasks: JoinSet<Result<(), AppError>> = JoinSet::new();
        let mut first_error: Option<AppError> = None;

        loop {
            // Surface persistence failures before fetching further pages
            while let Some(outcome) = tasks.try_join_next() {
                record_persist_outcome(outcome, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let page = match self
                .client
                .get_comments(media_id, access_token, SYNC_PAGE_SIZE, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    await_persist_tasks(&mut tasks, &mut first_error).await;
                    metrics::SYNC_RUNS_TOTAL
                        .with_label_values(&["comments", "error"])
                        .inc();
                    return Err(error);
                }
            };

            if page.items.is_empty() {
                empty_pages += 1;
                if empty_pages >= MAX_CONSECUTIVE_EMPTY_PAGES {
                    tracing::warn!(
                        media_id = %media_id,
                        empty_pages,
                        "Aborting comment drain after consecutive empty pages"
                    );
                    break;
                }
            } else {
                empty_pages = 0;
                let db = Arc::clone(&self.db);
                let items = page.items;
                tasks.spawn(async move { db.upsert_comments(&items).await });
            }

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        await_persist_tasks(&mut tasks, &mut first_error).await;
        if let Some(error) = first_error {
            metrics::SYNC_RUNS_TOTAL
                .with_label_values(&["comments", "error"])
                .inc();
            return Err(error);
        }

        self.db
            .update_sync_status(
                SyncDomain::Comments,
                &SyncStatus::completed(media_id.to_string(), None),
            )
            .await?;

        metrics::SYNC_RUNS_TOTAL
            .with_label_values(&["comments", "success"])
            .inc();

        Ok(())
    }

    /// Resolve the owning account of a published media item
    pub async fn media_account_id(&self, media_id: &str) -> Result<Option<String>, AppError> {
        self.db.get_account_id_by_media_id(media_id).await
    }

    /// Media IDs due for a background sweep
    pub async fn media_ids_needing_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        self.db.media_ids_needing_comment_sync(older_than, limit).await
    }

    /// Record a failed sweep attempt for a media item
    pub async fn record_sync_failure(
        &self,
        media_id: &str,
        error: &str,
        max_retries: u32,
    ) -> Result<(), AppError> {
        self.db
            .increment_sync_retry(SyncDomain::Comments, media_id, error, max_retries)
            .await
    }

    /// Clear retry bookkeeping after a successful sweep
    pub async fn record_sync_success(&self, media_id: &str) -> Result<(), AppError> {
        self.db.reset_sync_retry(SyncDomain::Comments, media_id).await
    }

    async fn write_behind_own_comment(
        &self,
        id: &str,
        media_id: &str,
        parent_id: Option<&str>,
        text: &str,
    ) {
        let now = Utc::now();
        let comment = Comment {
            id: id.to_string(),
            media_id: media_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            username: String::new(),
            text: text.to_string(),
            like_count: 0,
            replies_count: 0,
            is_hidden: false,
            commented_at: now,
            synced_at: now,
        };

        if let Err(error) = self.db.upsert_comment(&comment).await {
            tracing::warn!(comment_id = %id, %error, "Failed to cache own comment");
        }
    }
}
