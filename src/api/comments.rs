//! Comment endpoints
//!
//! Reads are served from the local cache (refreshed when stale);
//! moderation actions go to the platform first and update the cache
//! afterwards.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::data::Comment;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct HideBody {
    hide: bool,
}

#[derive(Debug, serde::Serialize)]
struct CommentListResponse {
    comments: Vec<Comment>,
    total: i64,
    has_more: bool,
}

#[derive(Debug, serde::Serialize)]
struct CreatedResponse {
    id: String,
}

async fn list_comments(
    State(state): State<AppState>,
    Path((account_id, media_id)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<CommentListResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    let listing = state
        .comments
        .get_comments(&media_id, &credentials.access_token, page.limit, page.offset)
        .await?;

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/accounts/:account_id/media/:media_id/comments", "200"])
        .inc();

    Ok(Json(CommentListResponse {
        comments: listing.comments,
        total: listing.total,
        has_more: listing.has_more,
    }))
}

async fn create_comment(
    State(state): State<AppState>,
    Path((account_id, media_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> Result<Json<CreatedResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    let id = state
        .comments
        .create_comment(&media_id, &credentials.access_token, &body.text)
        .await?;

    Ok(Json(CreatedResponse { id }))
}

async fn sync_comments(
    State(state): State<AppState>,
    Path((account_id, media_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    state
        .comments
        .sync_media_comments(&media_id, &credentials.access_token)
        .await?;

    Ok(Json(serde_json::json!({ "synced": true })))
}

async fn list_replies(
    State(state): State<AppState>,
    Path((account_id, comment_id)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<CommentListResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    let listing = state
        .comments
        .get_replies(&comment_id, &credentials.access_token, page.limit)
        .await?;

    Ok(Json(CommentListResponse {
        comments: listing.comments,
        total: listing.total,
        has_more: listing.has_more,
    }))
}

async fn create_reply(
    State(state): State<AppState>,
    Path((account_id, comment_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> Result<Json<CreatedResponse>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    let id = state
        .comments
        .reply(&comment_id, &credentials.access_token, &body.text)
        .await?;

    Ok(Json(CreatedResponse { id }))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path((account_id, comment_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    state
        .comments
        .delete(&comment_id, &credentials.access_token)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn hide_comment(
    State(state): State<AppState>,
    Path((account_id, comment_id)): Path<(String, String)>,
    Json(body): Json<HideBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let credentials = state.accounts.credentials(&account_id).await?;
    state
        .comments
        .hide(&comment_id, &credentials.access_token, body.hide)
        .await?;

    Ok(Json(serde_json::json!({ "hidden": body.hide })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/:account_id/media/:media_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/accounts/:account_id/media/:media_id/comments/sync",
            post(sync_comments),
        )
        .route(
            "/accounts/:account_id/comments/:comment_id/replies",
            get(list_replies).post(create_reply),
        )
        .route(
            "/accounts/:account_id/comments/:comment_id",
            delete(delete_comment),
        )
        .route(
            "/accounts/:account_id/comments/:comment_id/hide",
            post(hide_comment),
        )
}
