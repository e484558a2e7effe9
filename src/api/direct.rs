//! Direct message endpoints
//!
//! Conversation lists are served straight from the cache (the sweeper
//! keeps them fresh); message reads refresh on demand when stale.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::data::{Conversation, MediaKind, Message};
use crate::error::AppError;

use super::comments::PageQuery;

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    recipient_id: String,
    text: Option<String>,
    media_url: Option<String>,
    media_kind: Option<MediaKind>,
}

#[derive(Debug, serde::Serialize)]
struct ConversationListResponse {
    conversations: Vec<Conversation>,
    total: i64,
    has_more: bool,
}

#[derive(Debug, serde::Serialize)]
struct MessageListResponse {
    messages: Vec<Message>,
    total: i64,
    has_more: bool,
}

#[derive(Debug, serde::Serialize)]
struct SentResponse {
    message_id: String,
}

async fn list_conversations(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let listing = state
        .direct
        .get_conversations(&account_id, page.limit, page.offset)
        .await?;

    Ok(Json(ConversationListResponse {
        conversations: listing.conversations,
        total: listing.total,
        has_more: listing.has_more,
    }))
}

async fn sync_conversations(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    state
        .direct
        .sync_conversations(
            &account_id,
            &credentials.instagram_user_id,
            &credentials.access_token,
        )
        .await?;

    Ok(Json(serde_json::json!({ "synced": true })))
}

async fn list_messages(
    State(state): State<AppState>,
    Path((account_id, conversation_id)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<MessageListResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    let listing = state
        .direct
        .get_messages(
            &conversation_id,
            &credentials.instagram_user_id,
            &credentials.access_token,
            page.limit,
            page.offset,
        )
        .await?;

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[
            "GET",
            "/api/accounts/:account_id/conversations/:conversation_id/messages",
            "200",
        ])
        .inc();

    Ok(Json(MessageListResponse {
        messages: listing.messages,
        total: listing.total,
        has_more: listing.has_more,
    }))
}

async fn sync_messages(
    State(state): State<AppState>,
    Path((account_id, conversation_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    state
        .direct
        .sync_messages(
            &conversation_id,
            &credentials.instagram_user_id,
            &credentials.access_token,
        )
        .await?;

    Ok(Json(serde_json::json!({ "synced": true })))
}

async fn send_message(
    State(state): State<AppState>,
    Path((account_id, conversation_id)): Path<(String, String)>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<SentResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;

    let message_id = match (&body.text, &body.media_url) {
        (Some(text), None) => {
            state
                .direct
                .send_message(
                    &conversation_id,
                    &credentials.instagram_user_id,
                    &body.recipient_id,
                    &credentials.access_token,
                    text,
                )
                .await?
        }
        (None, Some(media_url)) => {
            state
                .direct
                .send_media_message(
                    &conversation_id,
                    &credentials.instagram_user_id,
                    &body.recipient_id,
                    &credentials.access_token,
                    media_url,
                    body.media_kind.unwrap_or(MediaKind::Image),
                )
                .await?
        }
        _ => {
            return Err(AppError::Validation(
                "exactly one of text or media_url is required".to_string(),
            ));
        }
    };

    Ok(Json(SentResponse { message_id }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/:account_id/conversations",
            get(list_conversations),
        )
        .route(
            "/accounts/:account_id/conversations/sync",
            post(sync_conversations),
        )
        .route(
            "/accounts/:account_id/conversations/:conversation_id/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/accounts/:account_id/conversations/:conversation_id/messages/sync",
            post(sync_messages),
        )
}
