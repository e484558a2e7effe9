//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with migrations applied at connect time.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Filter for listing publications
#[derive(Debug, Clone, Default)]
pub struct PublicationFilter {
    pub account_id: Option<String>,
    pub publication_type: Option<PublicationType>,
    pub status: Option<PublicationStatus>,
}

impl Database {
    /// Connect to the SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Get a connected account by ID
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// List all connected accounts
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    pub async fn upsert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, instagram_user_id, access_token, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                instagram_user_id = excluded.instagram_user_id,
                access_token = excluded.access_token
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.instagram_user_id)
        .bind(&account.access_token)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolve the owning account for a published media item
    pub async fn get_account_id_by_media_id(
        &self,
        media_id: &str,
    ) -> Result<Option<String>, AppError> {
        let row = sqlx::query(
            "SELECT account_id FROM publications WHERE instagram_media_id = ? LIMIT 1",
        )
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("account_id")))
    }

    /// Resolve the owning account for a cached conversation
    pub async fn get_conversation_account_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT account_id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("account_id")))
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Upsert a single comment by its platform ID.
    ///
    /// On conflict every remote-owned field is refreshed, but
    /// `is_hidden` keeps the local value (it is only changed through
    /// [`Database::set_comment_hidden`]).
    pub async fn upsert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.upsert_comment_in(&self.pool, comment).await
    }

    async fn upsert_comment_in<'e, E>(&self, executor: E, comment: &Comment) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO comments (
                id, media_id, parent_id, username, text, like_count,
                replies_count, is_hidden, commented_at, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                media_id = excluded.media_id,
                parent_id = excluded.parent_id,
                username = excluded.username,
                text = excluded.text,
                like_count = excluded.like_count,
                replies_count = excluded.replies_count,
                commented_at = excluded.commented_at,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.media_id)
        .bind(&comment.parent_id)
        .bind(&comment.username)
        .bind(&comment.text)
        .bind(comment.like_count)
        .bind(comment.replies_count)
        .bind(comment.is_hidden)
        .bind(comment.commented_at)
        .bind(comment.synced_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Upsert a page of comments in one transaction
    pub async fn upsert_comments(&self, comments: &[Comment]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for comment in comments {
            self.upsert_comment_in(&mut *tx, comment).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Top-level comments for a media item, newest first
    pub async fn get_comments_by_media(
        &self,
        media_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE media_id = ? AND parent_id IS NULL
            ORDER BY commented_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(media_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Replies to a comment, oldest first
    pub async fn get_comment_replies(
        &self,
        parent_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE parent_id = ?
            ORDER BY commented_at ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(parent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn count_comments(&self, media_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM comments WHERE media_id = ? AND parent_id IS NULL",
        )
        .bind(media_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }

    pub async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Set the locally-authoritative hidden flag
    pub async fn set_comment_hidden(&self, id: &str, hidden: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE comments SET is_hidden = ? WHERE id = ?")
            .bind(hidden)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    async fn upsert_conversation_in<'e, E>(
        &self,
        executor: E,
        conversation: &Conversation,
    ) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, account_id, participant_id, participant_username,
                participant_name, participant_avatar_url, last_message_text,
                last_message_at, last_message_is_from_me, unread_count,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                account_id = excluded.account_id,
                participant_id = excluded.participant_id,
                participant_username = excluded.participant_username,
                participant_name = excluded.participant_name,
                participant_avatar_url = excluded.participant_avatar_url,
                last_message_text = excluded.last_message_text,
                last_message_at = excluded.last_message_at,
                last_message_is_from_me = excluded.last_message_is_from_me,
                unread_count = excluded.unread_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.account_id)
        .bind(&conversation.participant_id)
        .bind(&conversation.participant_username)
        .bind(&conversation.participant_name)
        .bind(&conversation.participant_avatar_url)
        .bind(&conversation.last_message_text)
        .bind(conversation.last_message_at)
        .bind(conversation.last_message_is_from_me)
        .bind(conversation.unread_count)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Upsert a page of conversations in one transaction
    pub async fn upsert_conversations(
        &self,
        conversations: &[Conversation],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for conversation in conversations {
            self.upsert_conversation_in(&mut *tx, conversation).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    /// Conversations for an account, most recent activity first
    pub async fn get_conversations_by_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE account_id = ?
            ORDER BY last_message_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    pub async fn count_conversations(&self, account_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM conversations WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("n"))
    }

    // =========================================================================
    // Messages
    // =========================================================================

    async fn upsert_message_in<'e, E>(&self, executor: E, message: &Message) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, message_type, text,
                media_url, is_unsent, is_from_me, sent_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                conversation_id = excluded.conversation_id,
                sender_id = excluded.sender_id,
                message_type = excluded.message_type,
                text = excluded.text,
                media_url = excluded.media_url,
                is_unsent = excluded.is_unsent,
                is_from_me = excluded.is_from_me,
                sent_at = excluded.sent_at
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(message.message_type)
        .bind(&message.text)
        .bind(&message.media_url)
        .bind(message.is_unsent)
        .bind(message.is_from_me)
        .bind(message.sent_at)
        .bind(message.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn upsert_message(&self, message: &Message) -> Result<(), AppError> {
        self.upsert_message_in(&self.pool, message).await
    }

    /// Upsert a page of messages in one transaction
    pub async fn upsert_messages(&self, messages: &[Message]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            self.upsert_message_in(&mut *tx, message).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Messages in a conversation, newest first
    pub async fn get_messages_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?
            ORDER BY sent_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn count_messages(&self, conversation_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("n"))
    }

    // =========================================================================
    // Sync status
    // =========================================================================

    pub async fn get_sync_status(
        &self,
        domain: SyncDomain,
        unit_id: &str,
    ) -> Result<Option<SyncStatus>, AppError> {
        let status = sqlx::query_as::<_, SyncStatus>(
            r#"
            SELECT unit_id, last_synced_at, next_cursor, sync_complete,
                   oldest_item_at, retry_count, failed, last_error
            FROM sync_status
            WHERE domain = ? AND unit_id = ?
            "#,
        )
        .bind(domain.as_str())
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status)
    }

    /// Write the full sync status for a unit.
    ///
    /// Used after a successful drain: resets retry bookkeeping along
    /// with the cursor and completion flag.
    pub async fn update_sync_status(
        &self,
        domain: SyncDomain,
        status: &SyncStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_status (
                domain, unit_id, last_synced_at, next_cursor, sync_complete,
                oldest_item_at, retry_count, failed, last_error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (domain, unit_id) DO UPDATE SET
                last_synced_at = excluded.last_synced_at,
                next_cursor = excluded.next_cursor,
                sync_complete = excluded.sync_complete,
                oldest_item_at = excluded.oldest_item_at,
                retry_count = excluded.retry_count,
                failed = excluded.failed,
                last_error = excluded.last_error
            "#,
        )
        .bind(domain.as_str())
        .bind(&status.unit_id)
        .bind(status.last_synced_at)
        .bind(&status.next_cursor)
        .bind(status.sync_complete)
        .bind(status.oldest_item_at)
        .bind(status.retry_count)
        .bind(status.failed)
        .bind(&status.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed sync attempt for a unit.
    ///
    /// Increments the retry counter in a single statement and marks
    /// the unit failed once the counter reaches `max_retries`.
    /// `last_synced_at` is touched so a failing unit does not pin
    /// itself to the front of the sweep ordering.
    pub async fn increment_sync_retry(
        &self,
        domain: SyncDomain,
        unit_id: &str,
        last_error: &str,
        max_retries: u32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_status (
                domain, unit_id, last_synced_at, next_cursor, sync_complete,
                oldest_item_at, retry_count, failed, last_error
            ) VALUES (?, ?, ?, NULL, 0, NULL, 1, ?, ?)
            ON CONFLICT (domain, unit_id) DO UPDATE SET
                retry_count = sync_status.retry_count + 1,
                failed = (sync_status.retry_count + 1) >= ?,
                last_error = excluded.last_error,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(domain.as_str())
        .bind(unit_id)
        .bind(Utc::now())
        .bind(1 >= max_retries)
        .bind(last_error)
        .bind(max_retries as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clear retry bookkeeping after a successful sync
    pub async fn reset_sync_retry(
        &self,
        domain: SyncDomain,
        unit_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_status
            SET retry_count = 0, failed = 0, last_error = NULL
            WHERE domain = ? AND unit_id = ?
            "#,
        )
        .bind(domain.as_str())
        .bind(unit_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Published media items whose comments are due for a sweep.
    ///
    /// Stories are excluded because the platform has no comments
    /// endpoint for them. Units marked failed are skipped; never-synced
    /// units sort first (SQLite orders NULLs before values on ASC).
    pub async fn media_ids_needing_comment_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());

        let rows = sqlx::query(
            r#"
            SELECT p.instagram_media_id AS unit_id
            FROM publications p
            LEFT JOIN sync_status s
                ON s.domain = 'comments' AND s.unit_id = p.instagram_media_id
            WHERE p.instagram_media_id IS NOT NULL
              AND p.status = 'published'
              AND p.publication_type != 'story'
              AND COALESCE(s.failed, 0) = 0
              AND (s.unit_id IS NULL OR s.last_synced_at < ?)
            ORDER BY s.last_synced_at ASC
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("unit_id")).collect())
    }

    /// Accounts whose conversation list is due for a sweep
    pub async fn accounts_needing_conversation_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());

        let rows = sqlx::query(
            r#"
            SELECT a.id AS unit_id
            FROM accounts a
            LEFT JOIN sync_status s
                ON s.domain = 'conversations' AND s.unit_id = a.id
            WHERE COALESCE(s.failed, 0) = 0
              AND (s.unit_id IS NULL OR s.last_synced_at < ?)
            ORDER BY s.last_synced_at ASC
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("unit_id")).collect())
    }

    /// Conversations whose messages are due for a sweep
    pub async fn conversations_needing_message_sync(
        &self,
        older_than: Duration,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());

        let rows = sqlx::query(
            r#"
            SELECT c.id AS unit_id
            FROM conversations c
            LEFT JOIN sync_status s
                ON s.domain = 'messages' AND s.unit_id = c.id
            WHERE COALESCE(s.failed, 0) = 0
              AND (s.unit_id IS NULL OR s.last_synced_at < ?)
            ORDER BY s.last_synced_at ASC
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("unit_id")).collect())
    }

    // =========================================================================
    // Publications
    // =========================================================================

    pub async fn insert_publication(&self, publication: &Publication) -> Result<(), AppError> {
        let reel_options = publication
            .reel_options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.into()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO publications (
                id, account_id, instagram_media_id, publication_type, status,
                caption, reel_options, scheduled_at, published_at,
                error_message, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&publication.id)
        .bind(&publication.account_id)
        .bind(&publication.instagram_media_id)
        .bind(publication.publication_type)
        .bind(publication.status)
        .bind(&publication.caption)
        .bind(&reel_options)
        .bind(publication.scheduled_at)
        .bind(publication.published_at)
        .bind(&publication.error_message)
        .bind(publication.created_at)
        .bind(publication.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &publication.media {
            sqlx::query(
                r#"
                INSERT INTO publication_media (
                    id, publication_id, url, media_kind, position, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&publication.id)
            .bind(&item.url)
            .bind(item.media_kind)
            .bind(item.position)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Update a publication and replace its media list
    pub async fn update_publication(&self, publication: &Publication) -> Result<(), AppError> {
        let reel_options = publication
            .reel_options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.into()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE publications SET
                instagram_media_id = ?,
                status = ?,
                caption = ?,
                reel_options = ?,
                scheduled_at = ?,
                published_at = ?,
                error_message = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&publication.instagram_media_id)
        .bind(publication.status)
        .bind(&publication.caption)
        .bind(&reel_options)
        .bind(publication.scheduled_at)
        .bind(publication.published_at)
        .bind(&publication.error_message)
        .bind(publication.updated_at)
        .bind(&publication.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM publication_media WHERE publication_id = ?")
            .bind(&publication.id)
            .execute(&mut *tx)
            .await?;

        for item in &publication.media {
            sqlx::query(
                r#"
                INSERT INTO publication_media (
                    id, publication_id, url, media_kind, position, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&publication.id)
            .bind(&item.url)
            .bind(item.media_kind)
            .bind(item.position)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    pub async fn get_publication(&self, id: &str) -> Result<Option<Publication>, AppError> {
        let row = sqlx::query("SELECT * FROM publications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut publication = publication_from_row(&row)?;
        publication.media = self.get_publication_media(id).await?;

        Ok(Some(publication))
    }

    async fn get_publication_media(
        &self,
        publication_id: &str,
    ) -> Result<Vec<MediaItem>, AppError> {
        let media = sqlx::query_as::<_, MediaItem>(
            r#"
            SELECT id, url, media_kind, position, created_at
            FROM publication_media
            WHERE publication_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(publication_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(media)
    }

    pub async fn delete_publication(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM publication_media WHERE publication_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM publications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// List publications matching a filter, most recently scheduled first
    pub async fn list_publications(
        &self,
        filter: &PublicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Publication>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM publications WHERE 1 = 1");

        if let Some(account_id) = &filter.account_id {
            builder.push(" AND account_id = ").push_bind(account_id);
        }
        if let Some(publication_type) = filter.publication_type {
            builder
                .push(" AND publication_type = ")
                .push_bind(publication_type);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }

        builder.push(" ORDER BY COALESCE(scheduled_at, created_at) DESC");
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut publications = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut publication = publication_from_row(row)?;
            publication.media = self.get_publication_media(&publication.id).await?;
            publications.push(publication);
        }

        Ok(publications)
    }

    pub async fn count_publications(&self, filter: &PublicationFilter) -> Result<i64, AppError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM publications WHERE 1 = 1");

        if let Some(account_id) = &filter.account_id {
            builder.push(" AND account_id = ").push_bind(account_id);
        }
        if let Some(publication_type) = filter.publication_type {
            builder
                .push(" AND publication_type = ")
                .push_bind(publication_type);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }

        let row = builder.build().fetch_one(&self.pool).await?;

        Ok(row.get("n"))
    }

    /// Scheduled publications whose time has come, oldest first
    pub async fn get_publications_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Publication>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM publications
            WHERE status = 'scheduled' AND scheduled_at <= ?
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut publications = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut publication = publication_from_row(row)?;
            publication.media = self.get_publication_media(&publication.id).await?;
            publications.push(publication);
        }

        Ok(publications)
    }

    /// Record a successful publish: status, remote media ID, timestamp
    pub async fn set_publication_published(
        &self,
        id: &str,
        instagram_media_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE publications
            SET status = 'published',
                instagram_media_id = ?,
                published_at = ?,
                error_message = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(instagram_media_id)
        .bind(published_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed publish attempt
    pub async fn set_publication_error(
        &self,
        id: &str,
        error_message: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE publications
            SET status = 'error', error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn publication_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Publication, AppError> {
    let reel_options: Option<String> = row.try_get("reel_options")?;
    let reel_options = reel_options
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt reel_options column: {}", e)))?;

    Ok(Publication {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        instagram_media_id: row.try_get("instagram_media_id")?,
        publication_type: row.try_get("publication_type")?,
        status: row.try_get("status")?,
        caption: row.try_get("caption")?,
        media: Vec::new(),
        reel_options,
        scheduled_at: row.try_get("scheduled_at")?,
        published_at: row.try_get("published_at")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
