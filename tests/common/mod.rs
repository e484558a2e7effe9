//! Shared test support: a scripted platform client and state builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use metagram::data::{
    Account, Comment, Conversation, Database, MediaKind, Message, SyncDomain, SyncStatus,
};
use metagram::error::AppError;
use metagram::instagram::{
    ContainerSpec, ContainerState, ContainerStatus, MediaDetails, Page, PlatformClient,
};

/// Scripted stand-in for the Graph API.
///
/// Pages and container states are consumed front-to-back; anything not
/// scripted fails with a platform error so tests notice unexpected
/// calls.
#[derive(Default)]
pub struct FakePlatform {
    /// Pages returned by successive `get_comments` calls
    pub comment_pages: Mutex<VecDeque<Page<Comment>>>,
    /// Pages returned by successive `get_conversations` calls
    pub conversation_pages: Mutex<VecDeque<Page<Conversation>>>,
    /// Pages returned by successive `get_messages` calls
    pub message_pages: Mutex<VecDeque<Page<Message>>>,
    /// When set, every fetch fails with this message
    pub fetch_error: Mutex<Option<String>>,
    /// Fail only the next N fetches, then behave normally
    pub fail_next_fetches: AtomicU32,
    /// States returned by successive `get_container_status` calls;
    /// `Finished` once exhausted
    pub container_states: Mutex<VecDeque<ContainerState>>,

    pub get_comments_calls: AtomicU32,
    pub get_conversations_calls: AtomicU32,
    pub get_messages_calls: AtomicU32,
    pub containers_created: AtomicU32,
    pub publishes: AtomicU32,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_comment_page(&self, items: Vec<Comment>, next_cursor: Option<&str>) {
        let has_more = next_cursor.is_some();
        self.comment_pages.lock().unwrap().push_back(Page {
            items,
            next_cursor: next_cursor.map(str::to_string),
            has_more,
        });
    }

    pub fn push_message_page(&self, items: Vec<Message>, next_cursor: Option<&str>) {
        let has_more = next_cursor.is_some();
        self.message_pages.lock().unwrap().push_back(Page {
            items,
            next_cursor: next_cursor.map(str::to_string),
            has_more,
        });
    }

    pub fn push_conversation_page(&self, items: Vec<Conversation>, next_cursor: Option<&str>) {
        let has_more = next_cursor.is_some();
        self.conversation_pages.lock().unwrap().push_back(Page {
            items,
            next_cursor: next_cursor.map(str::to_string),
            has_more,
        });
    }

    pub fn set_fetch_error(&self, message: &str) {
        *self.fetch_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn clear_fetch_error(&self) {
        *self.fetch_error.lock().unwrap() = None;
    }

    pub fn push_container_state(&self, status: ContainerStatus, error_message: Option<&str>) {
        self.container_states.lock().unwrap().push_back(ContainerState {
            status,
            error_message: error_message.map(str::to_string),
        });
    }

    fn check_fetch_error(&self) -> Result<(), AppError> {
        if let Some(message) = self.fetch_error.lock().unwrap().clone() {
            return Err(AppError::Platform(message));
        }
        if self
            .fail_next_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Platform("transient failure".to_string()));
        }
        Ok(())
    }

    fn empty_page<T>() -> Page<T> {
        Page {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

fn unscripted(operation: &str) -> AppError {
    AppError::Platform(format!("{} not scripted", operation))
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn get_comments<'a>(
        &'a self,
        _media_id: &'a str,
        _access_token: &'a str,
        _limit: u32,
        _after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError> {
        self.get_comments_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetch_error()?;
        Ok(self
            .comment_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::empty_page))
    }

    async fn get_comment_replies<'a>(
        &'a self,
        _comment_id: &'a str,
        _access_token: &'a str,
        _limit: u32,
        _after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError> {
        self.check_fetch_error()?;
        Ok(Self::empty_page())
    }

    async fn create_comment(
        &self,
        _media_id: &str,
        _access_token: &str,
        _message: &str,
    ) -> Result<String, AppError> {
        Err(unscripted("create_comment"))
    }

    async fn reply_to_comment(
        &self,
        _comment_id: &str,
        _access_token: &str,
        _message: &str,
    ) -> Result<String, AppError> {
        Err(unscripted("reply_to_comment"))
    }

    async fn delete_comment(&self, _comment_id: &str, _access_token: &str) -> Result<(), AppError> {
        Err(unscripted("delete_comment"))
    }

    async fn hide_comment(
        &self,
        _comment_id: &str,
        _access_token: &str,
        _hide: bool,
    ) -> Result<(), AppError> {
        Err(unscripted("hide_comment"))
    }

    async fn get_conversations<'a>(
        &'a self,
        _user_id: &'a str,
        _access_token: &'a str,
        _limit: u32,
        _after: Option<&'a str>,
    ) -> Result<Page<Conversation>, AppError> {
        self.get_conversations_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetch_error()?;
        Ok(self
            .conversation_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::empty_page))
    }

    async fn get_messages<'a>(
        &'a self,
        _conversation_id: &'a str,
        _user_id: &'a str,
        _access_token: &'a str,
        _limit: u32,
        _after: Option<&'a str>,
    ) -> Result<Page<Message>, AppError> {
        self.get_messages_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetch_error()?;
        Ok(self
            .message_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::empty_page))
    }

    async fn send_message(
        &self,
        _user_id: &str,
        _recipient_id: &str,
        _access_token: &str,
        _text: &str,
    ) -> Result<String, AppError> {
        Ok("sent-message-1".to_string())
    }

    async fn send_media_message(
        &self,
        _user_id: &str,
        _recipient_id: &str,
        _access_token: &str,
        _media_url: &str,
        _media_kind: MediaKind,
    ) -> Result<String, AppError> {
        Ok("sent-media-message-1".to_string())
    }

    async fn create_media_container(
        &self,
        _user_id: &str,
        _access_token: &str,
        _spec: &ContainerSpec,
    ) -> Result<String, AppError> {
        let n = self.containers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("container-{}", n))
    }

    async fn get_container_status(
        &self,
        _container_id: &str,
        _access_token: &str,
    ) -> Result<ContainerState, AppError> {
        Ok(self
            .container_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ContainerState {
                status: ContainerStatus::Finished,
                error_message: None,
            }))
    }

    async fn publish_media(
        &self,
        _user_id: &str,
        _access_token: &str,
        _container_id: &str,
    ) -> Result<String, AppError> {
        let n = self.publishes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("remote-media-{}", n))
    }

    async fn get_media(
        &self,
        media_id: &str,
        _access_token: &str,
        _fields: &[&'static str],
    ) -> Result<MediaDetails, AppError> {
        Ok(MediaDetails {
            id: media_id.to_string(),
            permalink: Some(format!("https://instagram.com/p/{}", media_id)),
        })
    }

    async fn delete_media(&self, _media_id: &str, _access_token: &str) -> Result<(), AppError> {
        Err(unscripted("delete_media"))
    }
}

// =============================================================================
// Builders
// =============================================================================

pub async fn test_db() -> (std::sync::Arc<Database>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::connect(&temp_dir.path().join("test.db"))
        .await
        .unwrap();
    (std::sync::Arc::new(db), temp_dir)
}

pub fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        username: format!("user_{}", id),
        instagram_user_id: format!("ig_{}", id),
        access_token: "token".to_string(),
        created_at: Utc::now(),
    }
}

pub fn remote_comment(id: &str, media_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        media_id: media_id.to_string(),
        parent_id: None,
        username: "commenter".to_string(),
        text: format!("comment {}", id),
        like_count: 0,
        replies_count: 0,
        is_hidden: false,
        commented_at: Utc::now(),
        synced_at: Utc::now(),
    }
}

pub fn remote_message(id: &str, conversation_id: &str) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: "participant-1".to_string(),
        message_type: metagram::data::MessageType::Text,
        text: Some(format!("message {}", id)),
        media_url: None,
        is_unsent: false,
        is_from_me: false,
        sent_at: Utc::now(),
        created_at: Utc::now(),
    }
}

/// Backdate a unit's sync status so the next read triggers a refresh
pub async fn backdate_sync_status(
    db: &Database,
    domain: SyncDomain,
    unit_id: &str,
    hours_ago: i64,
) {
    let mut status = SyncStatus::completed(unit_id.to_string(), None);
    status.last_synced_at = Utc::now() - chrono::Duration::hours(hours_ago);
    db.update_sync_status(domain, &status).await.unwrap();
}
