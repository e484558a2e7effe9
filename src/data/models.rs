//! Data models
//!
//! Rust structs representing database entities.
//! All locally-generated IDs use ULID; remote entities keep their
//! platform-assigned IDs as primary keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account (credential boundary)
// =============================================================================

/// A connected Instagram account
///
/// Token acquisition and refresh happen outside this service;
/// this table is only read to resolve credentials for sync and
/// publishing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// Instagram Graph API user ID
    pub instagram_user_id: String,
    /// Long-lived access token
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Comment
// =============================================================================

/// A comment on a published media item
///
/// The `id` is the platform-assigned comment ID; re-syncing the same
/// comment overwrites mutable fields but never creates a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    /// Instagram media this comment belongs to
    pub media_id: String,
    /// Parent comment ID for replies
    pub parent_id: Option<String>,
    pub username: String,
    pub text: String,
    pub like_count: i64,
    pub replies_count: i64,
    /// Locally authoritative: set through the hide/unhide operation,
    /// never overwritten by sync once the row exists.
    pub is_hidden: bool,
    /// When the comment was posted on the platform
    pub commented_at: DateTime<Utc>,
    /// When this row was last written by a sync
    pub synced_at: DateTime<Utc>,
}

/// Maximum length of a comment or reply
pub const MAX_COMMENT_LENGTH: usize = 2200;

/// Validate the text of a comment or reply before any remote call
pub fn validate_comment_text(text: &str) -> Result<(), AppError> {
    if text.is_empty() {
        return Err(AppError::Validation(
            "comment text cannot be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "comment text exceeds maximum length of {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// Direct messages
// =============================================================================

/// A direct-message conversation/thread
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub account_id: String,
    pub participant_id: String,
    pub participant_username: String,
    pub participant_name: Option<String>,
    pub participant_avatar_url: Option<String>,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_is_from_me: bool,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The type of a direct message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    Link,
    StoryMention,
    StoryReply,
}

/// A direct message
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub is_unsent: bool,
    pub is_from_me: bool,
    /// When the message was sent on the platform
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Maximum length of a direct message
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Validate the text of an outgoing message before any remote call
pub fn validate_message_text(text: &str) -> Result<(), AppError> {
    if text.is_empty() {
        return Err(AppError::Validation(
            "message text cannot be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(format!(
            "message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// Sync status
// =============================================================================

/// The sync domain a status row belongs to
///
/// Each domain tracks a different unit: a media item for comments,
/// an account for its conversation list, a conversation for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDomain {
    Comments,
    Conversations,
    Messages,
}

impl SyncDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comments => "comments",
            Self::Conversations => "conversations",
            Self::Messages => "messages",
        }
    }
}

/// Sync bookkeeping for one unit in one domain
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncStatus {
    pub unit_id: String,
    pub last_synced_at: DateTime<Utc>,
    pub next_cursor: Option<String>,
    pub sync_complete: bool,
    /// Oldest item timestamp seen during the last drain
    /// (used for incremental windowing in the messages domain)
    pub oldest_item_at: Option<DateTime<Utc>>,
    pub retry_count: i64,
    /// Set once `retry_count` reaches the sweeper's max retries;
    /// excludes the unit from background sweeps until a sync succeeds.
    pub failed: bool,
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// A fresh, successful status for a completed drain
    pub fn completed(unit_id: String, oldest_item_at: Option<DateTime<Utc>>) -> Self {
        Self {
            unit_id,
            last_synced_at: Utc::now(),
            next_cursor: None,
            sync_complete: true,
            oldest_item_at,
            retry_count: 0,
            failed: false,
            last_error: None,
        }
    }
}

// =============================================================================
// Publication
// =============================================================================

/// The kind of content a publication produces on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PublicationType {
    Post,
    Story,
    Reel,
}

/// Lifecycle status of a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Scheduled,
    Published,
    Error,
}

/// The kind of a single media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A single media file attached to a publication
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    pub media_kind: MediaKind,
    /// Position within the publication (carousel order)
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Reel-specific publishing options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReelOptions {
    #[serde(default)]
    pub share_to_feed: bool,
    pub cover_url: Option<String>,
    /// Thumbnail frame offset in milliseconds
    pub thumb_offset: Option<i64>,
    pub audio_name: Option<String>,
    pub location_id: Option<String>,
    #[serde(default)]
    pub collaborators: Vec<String>,
}

/// Maximum caption length accepted by the platform
pub const MAX_CAPTION_LENGTH: usize = 2200;

/// Maximum media items in a carousel post
pub const MAX_POST_MEDIA_ITEMS: usize = 10;

/// A locally-authored publication (post, story, or reel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    pub account_id: String,
    /// Platform media ID, set once published
    pub instagram_media_id: Option<String>,
    pub publication_type: PublicationType,
    pub status: PublicationStatus,
    pub caption: String,
    /// Ordered media items (1 for story/reel, 1-10 for post)
    pub media: Vec<MediaItem>,
    pub reel_options: Option<ReelOptions>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Publication {
    /// A publication can be edited only before it reaches the platform.
    /// A failed attempt (`Error`) stays editable so the author can fix
    /// and reschedule it.
    pub fn is_editable(&self) -> bool {
        matches!(
            self.status,
            PublicationStatus::Draft | PublicationStatus::Scheduled | PublicationStatus::Error
        )
    }

    /// Published content cannot be deleted locally; the platform does
    /// not support remote deletion through this workflow either.
    pub fn is_deletable(&self) -> bool {
        self.status != PublicationStatus::Published
    }

    /// Validate the publication against platform rules.
    ///
    /// Runs before any remote call; failures here are never recorded
    /// as publish errors.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.account_id.is_empty() {
            return Err(AppError::Validation("account ID is required".to_string()));
        }

        if self.media.is_empty() {
            return Err(AppError::Validation(
                "at least one media item is required".to_string(),
            ));
        }

        match self.publication_type {
            PublicationType::Post => {
                if self.media.len() > MAX_POST_MEDIA_ITEMS {
                    return Err(AppError::Validation(format!(
                        "post cannot have more than {} media items",
                        MAX_POST_MEDIA_ITEMS
                    )));
                }
            }
            PublicationType::Story | PublicationType::Reel => {
                if self.media.len() != 1 {
                    return Err(AppError::Validation(
                        "story and reel require exactly one media item".to_string(),
                    ));
                }
            }
        }

        if self.caption.chars().count() > MAX_CAPTION_LENGTH {
            return Err(AppError::Validation(format!(
                "caption exceeds maximum length of {} characters",
                MAX_CAPTION_LENGTH
            )));
        }

        if self.status == PublicationStatus::Scheduled {
            match self.scheduled_at {
                Some(at) if at > Utc::now() => {}
                Some(_) => {
                    return Err(AppError::Validation(
                        "scheduled time must be in the future".to_string(),
                    ));
                }
                None => {
                    return Err(AppError::Validation(
                        "scheduled publication requires a scheduled time".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft_post(media_count: usize) -> Publication {
        let now = Utc::now();
        Publication {
            id: EntityId::new().0,
            account_id: "acct-1".to_string(),
            instagram_media_id: None,
            publication_type: PublicationType::Post,
            status: PublicationStatus::Draft,
            caption: "hello".to_string(),
            media: (0..media_count)
                .map(|i| MediaItem {
                    id: EntityId::new().0,
                    url: format!("https://cdn.example.com/{}.jpg", i),
                    media_kind: MediaKind::Image,
                    position: i as i64,
                    created_at: now,
                })
                .collect(),
            reel_options: None,
            scheduled_at: None,
            published_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn validate_accepts_single_image_post() {
        assert!(draft_post(1).validate().is_ok());
    }

    #[test]
    fn validate_accepts_ten_item_carousel() {
        assert!(draft_post(10).validate().is_ok());
    }

    #[test]
    fn validate_rejects_eleven_item_carousel() {
        let error = draft_post(11).validate().expect_err("11 items must fail");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[test]
    fn validate_rejects_publication_without_media() {
        let error = draft_post(0).validate().expect_err("no media must fail");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[test]
    fn validate_rejects_story_with_two_media_items() {
        let mut publication = draft_post(2);
        publication.publication_type = PublicationType::Story;

        let error = publication
            .validate()
            .expect_err("story with 2 media must fail");
        assert!(matches!(
            error,
            AppError::Validation(message) if message.contains("exactly one")
        ));
    }

    #[test]
    fn validate_rejects_past_schedule() {
        let mut publication = draft_post(1);
        publication.status = PublicationStatus::Scheduled;
        publication.scheduled_at = Some(Utc::now() - Duration::hours(1));

        let error = publication
            .validate()
            .expect_err("past schedule must fail");
        assert!(matches!(
            error,
            AppError::Validation(message) if message.contains("future")
        ));
    }

    #[test]
    fn validate_accepts_future_schedule() {
        let mut publication = draft_post(1);
        publication.status = PublicationStatus::Scheduled;
        publication.scheduled_at = Some(Utc::now() + Duration::hours(1));

        assert!(publication.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_caption() {
        let mut publication = draft_post(1);
        publication.caption = "x".repeat(MAX_CAPTION_LENGTH + 1);

        let error = publication
            .validate()
            .expect_err("oversized caption must fail");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[test]
    fn published_publication_is_not_editable_or_deletable() {
        let mut publication = draft_post(1);
        publication.status = PublicationStatus::Published;

        assert!(!publication.is_editable());
        assert!(!publication.is_deletable());
    }

    #[test]
    fn errored_publication_remains_editable() {
        let mut publication = draft_post(1);
        publication.status = PublicationStatus::Error;

        assert!(publication.is_editable());
        assert!(publication.is_deletable());
    }

    #[test]
    fn comment_text_validation_bounds() {
        assert!(validate_comment_text("nice shot").is_ok());
        assert!(validate_comment_text("").is_err());
        assert!(validate_comment_text(&"x".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
    }

    #[test]
    fn message_text_validation_bounds() {
        assert!(validate_message_text("hey").is_ok());
        assert!(validate_message_text("").is_err());
        assert!(validate_message_text(&"x".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }
}
