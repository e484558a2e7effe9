//! Instagram Graph API client
//!
//! Implements the remote operations the rest of the application
//! consumes through the [`PlatformClient`] trait: comment and DM
//! reads/writes, and the container-based publishing endpoints.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::{Comment, Conversation, MediaKind, Message, MessageType, ReelOptions};
use crate::error::AppError;

/// One page of results from a paginated endpoint
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page, if the API returned one
    pub next_cursor: Option<String>,
    /// Whether the API reported more pages
    pub has_more: bool,
}

/// The container kind requested from the publishing endpoint.
///
/// Plain image/video containers carry no `media_type` parameter;
/// the other kinds do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Image,
    Video,
    Carousel,
    Reels,
    Stories,
}

impl ContainerKind {
    fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::Image | Self::Video => None,
            Self::Carousel => Some("CAROUSEL"),
            Self::Reels => Some("REELS"),
            Self::Stories => Some("STORIES"),
        }
    }
}

/// Parameters for creating a media container
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub kind: Option<ContainerKind>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub caption: Option<String>,
    pub is_carousel_item: bool,
    /// Child container IDs, for carousel parents
    pub children: Vec<String>,
    /// Reel-specific options
    pub reel: Option<ReelOptions>,
}

/// Processing state of a media container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    Expired,
    Published,
}

/// Status poll result for a container
#[derive(Debug, Clone)]
pub struct ContainerState {
    pub status: ContainerStatus,
    pub error_message: Option<String>,
}

/// Published media details (permalink lookup)
#[derive(Debug, Clone)]
pub struct MediaDetails {
    pub id: String,
    pub permalink: Option<String>,
}

/// Remote operations consumed by the sync engine and the publisher.
///
/// Implemented by [`Client`] in production and mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn get_comments<'a>(
        &'a self,
        media_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError>;

    async fn get_comment_replies<'a>(
        &'a self,
        comment_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError>;

    async fn create_comment(
        &self,
        media_id: &str,
        access_token: &str,
        message: &str,
    ) -> Result<String, AppError>;

    async fn reply_to_comment(
        &self,
        comment_id: &str,
        access_token: &str,
        message: &str,
    ) -> Result<String, AppError>;

    async fn delete_comment(&self, comment_id: &str, access_token: &str) -> Result<(), AppError>;

    async fn hide_comment(
        &self,
        comment_id: &str,
        access_token: &str,
        hide: bool,
    ) -> Result<(), AppError>;

    async fn get_conversations<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Conversation>, AppError>;

    async fn get_messages<'a>(
        &'a self,
        conversation_id: &'a str,
        user_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Message>, AppError>;

    async fn send_message(
        &self,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        text: &str,
    ) -> Result<String, AppError>;

    async fn send_media_message(
        &self,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
    ) -> Result<String, AppError>;

    async fn create_media_container(
        &self,
        user_id: &str,
        access_token: &str,
        spec: &ContainerSpec,
    ) -> Result<String, AppError>;

    async fn get_container_status(
        &self,
        container_id: &str,
        access_token: &str,
    ) -> Result<ContainerState, AppError>;

    async fn publish_media(
        &self,
        user_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<String, AppError>;

    async fn get_media(
        &self,
        media_id: &str,
        access_token: &str,
        fields: &[&'static str],
    ) -> Result<MediaDetails, AppError>;

    async fn delete_media(&self, media_id: &str, access_token: &str) -> Result<(), AppError>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    error_subcode: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    cursors: Cursors,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Cursors {
    #[serde(default)]
    after: String,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    username: String,
    timestamp: Option<String>,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    replies_count: i64,
}

#[derive(Debug, Deserialize)]
struct ConversationData {
    id: String,
    participants: Option<ParticipantList>,
    messages: Option<ConversationMessages>,
    updated_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParticipantList {
    #[serde(default = "Vec::new")]
    data: Vec<ParticipantData>,
}

#[derive(Debug, Deserialize)]
struct ParticipantData {
    id: String,
    #[serde(default)]
    username: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationMessages {
    #[serde(default = "Vec::new")]
    data: Vec<MessageData>,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    id: String,
    message: Option<String>,
    from: Option<ParticipantData>,
    created_time: Option<String>,
    attachments: Option<AttachmentList>,
}

#[derive(Debug, Deserialize)]
struct AttachmentList {
    #[serde(default = "Vec::new")]
    data: Vec<AttachmentData>,
}

#[derive(Debug, Deserialize)]
struct AttachmentData {
    mime_type: Option<String>,
    image_data: Option<AttachmentImage>,
    video_data: Option<AttachmentVideo>,
}

#[derive(Debug, Deserialize)]
struct AttachmentImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentVideo {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatusResponse {
    status_code: ContainerStatus,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaDetailsResponse {
    id: String,
    permalink: Option<String>,
}

/// Graph API timestamps come in two flavors: RFC 3339 and the legacy
/// `+0000` offset form.
fn parse_graph_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };

    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            tracing::debug!(timestamp = %raw, "Unparseable platform timestamp, using now");
            Utc::now()
        })
}

fn page_from_envelope<T, U>(envelope: ListEnvelope<T>, map: impl Fn(T) -> U) -> Page<U> {
    let has_more = envelope
        .paging
        .as_ref()
        .is_some_and(|paging| paging.next.is_some());
    let next_cursor = envelope
        .paging
        .map(|paging| paging.cursors.after)
        .filter(|after| !after.is_empty());

    Page {
        items: envelope.data.into_iter().map(map).collect(),
        next_cursor,
        has_more,
    }
}

// =============================================================================
// Client
// =============================================================================

/// Production [`PlatformClient`] over the Instagram Graph API
#[derive(Clone)]
pub struct Client {
    http_client: Arc<reqwest::Client>,
    base_url: String,
    api_version: String,
}

impl Client {
    pub fn new(http_client: Arc<reqwest::Client>, base_url: String, api_version: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, path)
    }

    /// Execute a request and decode the response, mapping Graph API
    /// error bodies to [`AppError::Platform`].
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let start = Instant::now();
        let response = self.http_client.execute(request).await?;
        let status = response.status();

        tracing::debug!(
            %method,
            %path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Platform API call"
        );

        let body = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(&body) {
                return Err(AppError::Platform(format!(
                    "{} (code: {}, subcode: {})",
                    parsed.error.message,
                    parsed.error.code,
                    parsed.error.error_subcode.unwrap_or_default(),
                )));
            }
            return Err(AppError::Platform(format!(
                "API error (status {}): {}",
                status.as_u16(),
                String::from_utf8_lossy(&body),
            )));
        }

        serde_json::from_slice(&body)
            .map_err(|e| AppError::Platform(format!("decoding response: {}", e)))
    }

    fn comment_from_data(data: CommentData, media_id: &str, parent_id: Option<&str>) -> Comment {
        Comment {
            id: data.id,
            media_id: media_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            username: data.username,
            text: data.text,
            like_count: data.like_count,
            replies_count: data.replies_count,
            is_hidden: data.hidden,
            commented_at: parse_graph_timestamp(data.timestamp.as_deref()),
            synced_at: Utc::now(),
        }
    }

    fn conversation_from_data(data: ConversationData, user_id: &str) -> Conversation {
        let now = Utc::now();

        // The other participant is whichever one is not us
        let participant = data
            .participants
            .map(|list| list.data)
            .unwrap_or_default()
            .into_iter()
            .find(|p| p.id != user_id);

        // The embedded messages field carries the latest message first
        let last_message = data.messages.and_then(|list| list.data.into_iter().next());
        let (last_message_text, last_message_at, last_message_is_from_me) = match last_message {
            Some(message) => (
                message.message,
                Some(parse_graph_timestamp(message.created_time.as_deref())),
                message.from.is_some_and(|from| from.id == user_id),
            ),
            None => (None, None, false),
        };

        let updated_at = data
            .updated_time
            .as_deref()
            .map(|raw| parse_graph_timestamp(Some(raw)))
            .unwrap_or(now);

        Conversation {
            id: data.id,
            // Filled in by the sync coordinator, which knows the account
            account_id: String::new(),
            participant_id: participant
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_default(),
            participant_username: participant
                .as_ref()
                .map(|p| p.username.clone())
                .unwrap_or_default(),
            participant_name: participant.and_then(|p| p.name),
            participant_avatar_url: None,
            last_message_text,
            last_message_at,
            last_message_is_from_me,
            unread_count: 0,
            created_at: now,
            updated_at,
        }
    }

    fn message_from_data(data: MessageData, conversation_id: &str, user_id: &str) -> Message {
        let attachment = data
            .attachments
            .map(|list| list.data)
            .unwrap_or_default()
            .into_iter()
            .next();

        let (message_type, media_url) = match &attachment {
            Some(attachment) => {
                let mime = attachment.mime_type.as_deref().unwrap_or_default();
                let message_type = if attachment.video_data.is_some() || mime.starts_with("video/")
                {
                    MessageType::Video
                } else if attachment.image_data.is_some() || mime.starts_with("image/") {
                    MessageType::Image
                } else if mime.starts_with("audio/") {
                    MessageType::Audio
                } else {
                    MessageType::Link
                };
                let media_url = attachment
                    .image_data
                    .as_ref()
                    .and_then(|image| image.url.clone())
                    .or_else(|| {
                        attachment
                            .video_data
                            .as_ref()
                            .and_then(|video| video.url.clone())
                    });
                (message_type, media_url)
            }
            None => (MessageType::Text, None),
        };

        let sender_id = data.from.map(|from| from.id).unwrap_or_default();

        Message {
            id: data.id,
            conversation_id: conversation_id.to_string(),
            is_from_me: sender_id == user_id,
            sender_id,
            message_type,
            text: data.message.filter(|text| !text.is_empty()),
            media_url,
            is_unsent: false,
            sent_at: parse_graph_timestamp(data.created_time.as_deref()),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PlatformClient for Client {
    /// GET /{media-id}/comments
    async fn get_comments<'a>(
        &'a self,
        media_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError> {
        let mut query = vec![
            ("access_token", access_token.to_string()),
            (
                "fields",
                "id,text,username,timestamp,like_count,hidden,replies_count".to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let envelope: ListEnvelope<CommentData> = self
            .execute(
                self.http_client
                    .get(self.endpoint(&format!("{}/comments", media_id)))
                    .query(&query),
            )
            .await?;

        Ok(page_from_envelope(envelope, |data| {
            Self::comment_from_data(data, media_id, None)
        }))
    }

    /// GET /{comment-id}/replies
    async fn get_comment_replies<'a>(
        &'a self,
        comment_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Comment>, AppError> {
        let mut query = vec![
            ("access_token", access_token.to_string()),
            (
                "fields",
                "id,text,username,timestamp,like_count,hidden".to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let envelope: ListEnvelope<CommentData> = self
            .execute(
                self.http_client
                    .get(self.endpoint(&format!("{}/replies", comment_id)))
                    .query(&query),
            )
            .await?;

        Ok(page_from_envelope(envelope, |data| {
            Self::comment_from_data(data, "", Some(comment_id))
        }))
    }

    /// POST /{media-id}/comments
    async fn create_comment(
        &self,
        media_id: &str,
        access_token: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let response: IdResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/comments", media_id)))
                    .query(&[("access_token", access_token), ("message", message)]),
            )
            .await?;

        Ok(response.id)
    }

    /// POST /{comment-id}/replies
    async fn reply_to_comment(
        &self,
        comment_id: &str,
        access_token: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let response: IdResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/replies", comment_id)))
                    .query(&[("access_token", access_token), ("message", message)]),
            )
            .await?;

        Ok(response.id)
    }

    /// DELETE /{comment-id}
    async fn delete_comment(&self, comment_id: &str, access_token: &str) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .execute(
                self.http_client
                    .delete(self.endpoint(comment_id))
                    .query(&[("access_token", access_token)]),
            )
            .await?;

        Ok(())
    }

    /// POST /{comment-id}?hide=true|false
    async fn hide_comment(
        &self,
        comment_id: &str,
        access_token: &str,
        hide: bool,
    ) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .execute(
                self.http_client
                    .post(self.endpoint(comment_id))
                    .query(&[
                        ("access_token", access_token),
                        ("hide", if hide { "true" } else { "false" }),
                    ]),
            )
            .await?;

        Ok(())
    }

    /// GET /{user-id}/conversations
    async fn get_conversations<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Conversation>, AppError> {
        let mut query = vec![
            ("access_token", access_token.to_string()),
            ("platform", "instagram".to_string()),
            (
                "fields",
                "id,participants,messages.limit(1){id,message,from,created_time},updated_time"
                    .to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let envelope: ListEnvelope<ConversationData> = self
            .execute(
                self.http_client
                    .get(self.endpoint(&format!("{}/conversations", user_id)))
                    .query(&query),
            )
            .await?;

        Ok(page_from_envelope(envelope, |data| {
            Self::conversation_from_data(data, user_id)
        }))
    }

    /// GET /{conversation-id}/messages
    async fn get_messages<'a>(
        &'a self,
        conversation_id: &'a str,
        user_id: &'a str,
        access_token: &'a str,
        limit: u32,
        after: Option<&'a str>,
    ) -> Result<Page<Message>, AppError> {
        let mut query = vec![
            ("access_token", access_token.to_string()),
            (
                "fields",
                "id,message,from,created_time,attachments{id,mime_type,image_data,video_data}"
                    .to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let envelope: ListEnvelope<MessageData> = self
            .execute(
                self.http_client
                    .get(self.endpoint(&format!("{}/messages", conversation_id)))
                    .query(&query),
            )
            .await?;

        Ok(page_from_envelope(envelope, |data| {
            Self::message_from_data(data, conversation_id, user_id)
        }))
    }

    /// POST /{user-id}/messages
    async fn send_message(
        &self,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        text: &str,
    ) -> Result<String, AppError> {
        let recipient = serde_json::json!({ "id": recipient_id }).to_string();
        let message = serde_json::json!({ "text": text }).to_string();

        let response: SendMessageResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/messages", user_id)))
                    .query(&[
                        ("access_token", access_token),
                        ("recipient", recipient.as_str()),
                        ("message", message.as_str()),
                    ]),
            )
            .await?;

        Ok(response.message_id)
    }

    /// POST /{user-id}/messages with a media attachment payload
    async fn send_media_message(
        &self,
        user_id: &str,
        recipient_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
    ) -> Result<String, AppError> {
        let attachment_type = match media_kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };
        let recipient = serde_json::json!({ "id": recipient_id }).to_string();
        let message = serde_json::json!({
            "attachment": {
                "type": attachment_type,
                "payload": { "url": media_url },
            }
        })
        .to_string();

        let response: SendMessageResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/messages", user_id)))
                    .query(&[
                        ("access_token", access_token),
                        ("recipient", recipient.as_str()),
                        ("message", message.as_str()),
                    ]),
            )
            .await?;

        Ok(response.message_id)
    }

    /// POST /{user-id}/media
    async fn create_media_container(
        &self,
        user_id: &str,
        access_token: &str,
        spec: &ContainerSpec,
    ) -> Result<String, AppError> {
        let mut query = vec![("access_token", access_token.to_string())];

        if let Some(image_url) = &spec.image_url {
            query.push(("image_url", image_url.clone()));
        }
        if let Some(video_url) = &spec.video_url {
            query.push(("video_url", video_url.clone()));
        }
        if let Some(media_type) = spec.kind.and_then(|kind| kind.as_param()) {
            query.push(("media_type", media_type.to_string()));
        }
        for child in &spec.children {
            query.push(("children", child.clone()));
        }
        if spec.is_carousel_item {
            query.push(("is_carousel_item", "true".to_string()));
        }
        // Carousel children never carry their own caption
        if let Some(caption) = &spec.caption {
            if !spec.is_carousel_item {
                query.push(("caption", caption.clone()));
            }
        }
        if let Some(reel) = &spec.reel {
            if reel.share_to_feed {
                query.push(("share_to_feed", "true".to_string()));
            }
            if let Some(cover_url) = &reel.cover_url {
                query.push(("cover_url", cover_url.clone()));
            }
            if let Some(thumb_offset) = reel.thumb_offset {
                query.push(("thumb_offset", thumb_offset.to_string()));
            }
            if let Some(audio_name) = &reel.audio_name {
                query.push(("audio_name", audio_name.clone()));
            }
            if let Some(location_id) = &reel.location_id {
                query.push(("location_id", location_id.clone()));
            }
            if !reel.collaborators.is_empty() {
                query.push(("collaborators", reel.collaborators.join(",")));
            }
        }

        let response: IdResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/media", user_id)))
                    .query(&query),
            )
            .await?;

        Ok(response.id)
    }

    /// GET /{container-id}?fields=status_code,error_message
    async fn get_container_status(
        &self,
        container_id: &str,
        access_token: &str,
    ) -> Result<ContainerState, AppError> {
        let response: ContainerStatusResponse = self
            .execute(
                self.http_client
                    .get(self.endpoint(container_id))
                    .query(&[
                        ("access_token", access_token),
                        ("fields", "status_code,error_message"),
                    ]),
            )
            .await?;

        Ok(ContainerState {
            status: response.status_code,
            error_message: response.error_message,
        })
    }

    /// POST /{user-id}/media_publish
    async fn publish_media(
        &self,
        user_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<String, AppError> {
        let response: IdResponse = self
            .execute(
                self.http_client
                    .post(self.endpoint(&format!("{}/media_publish", user_id)))
                    .query(&[
                        ("access_token", access_token),
                        ("creation_id", container_id),
                    ]),
            )
            .await?;

        Ok(response.id)
    }

    /// GET /{media-id}?fields=...
    async fn get_media(
        &self,
        media_id: &str,
        access_token: &str,
        fields: &[&'static str],
    ) -> Result<MediaDetails, AppError> {
        let fields = fields.join(",");
        let response: MediaDetailsResponse = self
            .execute(
                self.http_client
                    .get(self.endpoint(media_id))
                    .query(&[("access_token", access_token), ("fields", fields.as_str())]),
            )
            .await?;

        Ok(MediaDetails {
            id: response.id,
            permalink: response.permalink,
        })
    }

    /// DELETE /{media-id}
    async fn delete_media(&self, media_id: &str, access_token: &str) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .execute(
                self.http_client
                    .delete(self.endpoint(media_id))
                    .query(&[("access_token", access_token)]),
            )
            .await?;

        Ok(())
    }
}
