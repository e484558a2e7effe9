//! Publication endpoints
//!
//! CRUD, scheduling, and publishing for locally-authored content.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::AppState;
use crate::data::{
    MediaKind, Publication, PublicationFilter, PublicationStatus, PublicationType, ReelOptions,
};
use crate::error::AppError;
use crate::service::{CreatePublicationInput, MediaInput, UpdatePublicationInput};

#[derive(Debug, Deserialize)]
struct MediaItemBody {
    url: String,
    media_kind: MediaKind,
    #[serde(default)]
    position: i64,
}

impl MediaItemBody {
    fn into_input(self) -> MediaInput {
        MediaInput {
            url: self.url,
            media_kind: self.media_kind,
            position: self.position,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatePublicationBody {
    account_id: String,
    #[serde(rename = "type")]
    publication_type: PublicationType,
    #[serde(default)]
    caption: String,
    media: Vec<MediaItemBody>,
    reel_options: Option<ReelOptions>,
    scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    publish_now: bool,
}

#[derive(Debug, Deserialize)]
struct UpdatePublicationBody {
    caption: Option<String>,
    #[serde(default)]
    media: Vec<MediaItemBody>,
    reel_options: Option<ReelOptions>,
    scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    clear_schedule: bool,
}

#[derive(Debug, Deserialize)]
struct ScheduleBody {
    scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    account_id: Option<String>,
    #[serde(rename = "type")]
    publication_type: Option<PublicationType>,
    status: Option<PublicationStatus>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, serde::Serialize)]
struct PublicationListResponse {
    publications: Vec<Publication>,
    total: i64,
}

async fn create_publication(
    State(state): State<AppState>,
    Json(body): Json<CreatePublicationBody>,
) -> Result<Json<Publication>, AppError> {
    let publication = state
        .publications
        .create(CreatePublicationInput {
            account_id: body.account_id,
            publication_type: body.publication_type,
            caption: body.caption,
            media: body.media.into_iter().map(MediaItemBody::into_input).collect(),
            reel_options: body.reel_options,
            scheduled_at: body.scheduled_at,
            publish_now: body.publish_now,
        })
        .await?;

    Ok(Json(publication))
}

async fn list_publications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PublicationListResponse>, AppError> {
    let filter = PublicationFilter {
        account_id: query.account_id,
        publication_type: query.publication_type,
        status: query.status,
    };
    let listing = state
        .publications
        .list(filter, query.limit, query.offset)
        .await?;

    Ok(Json(PublicationListResponse {
        publications: listing.publications,
        total: listing.total,
    }))
}

async fn get_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Publication>, AppError> {
    Ok(Json(state.publications.get(&id).await?))
}

async fn update_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePublicationBody>,
) -> Result<Json<Publication>, AppError> {
    let publication = state
        .publications
        .update(UpdatePublicationInput {
            id,
            caption: body.caption,
            media: body.media.into_iter().map(MediaItemBody::into_input).collect(),
            reel_options: body.reel_options,
            scheduled_at: body.scheduled_at,
            clear_schedule: body.clear_schedule,
        })
        .await?;

    Ok(Json(publication))
}

async fn delete_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.publications.delete(&id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn publish_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Publication>, AppError> {
    let publication = state.publications.publish_now(&id).await?;

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/publications/:id/publish", "200"])
        .inc();

    Ok(Json(publication))
}

async fn schedule_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<Publication>, AppError> {
    Ok(Json(
        state.publications.schedule(&id, body.scheduled_at).await?,
    ))
}

async fn draft_publication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Publication>, AppError> {
    Ok(Json(state.publications.save_as_draft(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/publications",
            get(list_publications).post(create_publication),
        )
        .route(
            "/publications/:id",
            get(get_publication)
                .put(update_publication)
                .delete(delete_publication),
        )
        .route("/publications/:id/publish", post(publish_publication))
        .route("/publications/:id/schedule", post(schedule_publication))
        .route("/publications/:id/draft", post(draft_publication))
}
