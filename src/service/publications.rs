//! Publication service
//!
//! Owns the publication lifecycle: creation, editing, scheduling, and
//! the publish path that drives the container workflow and records its
//! outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data::{
    Database, EntityId, MediaItem, MediaKind, Publication, PublicationFilter, PublicationStatus,
    PublicationType, ReelOptions,
};
use crate::error::AppError;
use crate::instagram::Publisher;
use crate::metrics;

use super::AccountService;

/// Input for one media item
#[derive(Debug, Clone)]
pub struct MediaInput {
    pub url: String,
    pub media_kind: MediaKind,
    pub position: i64,
}

/// Input for creating a publication
#[derive(Debug, Clone)]
pub struct CreatePublicationInput {
    pub account_id: String,
    pub publication_type: PublicationType,
    pub caption: String,
    pub media: Vec<MediaInput>,
    pub reel_options: Option<ReelOptions>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Publish immediately after creation
    pub publish_now: bool,
}

/// Input for updating a publication
#[derive(Debug, Clone, Default)]
pub struct UpdatePublicationInput {
    pub id: String,
    pub caption: Option<String>,
    /// Replaces the media list when non-empty
    pub media: Vec<MediaInput>,
    pub reel_options: Option<ReelOptions>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Clears `scheduled_at` and returns the publication to draft
    pub clear_schedule: bool,
}

/// A filtered page of publications
#[derive(Debug, Clone)]
pub struct PublicationListing {
    pub publications: Vec<Publication>,
    pub total: i64,
}

/// Publication lifecycle service
pub struct PublicationService {
    db: Arc<Database>,
    publisher: Arc<Publisher>,
    accounts: Arc<AccountService>,
}

impl PublicationService {
    pub fn new(db: Arc<Database>, publisher: Arc<Publisher>, accounts: Arc<AccountService>) -> Self {
        Self {
            db,
            publisher,
            accounts,
        }
    }

    fn media_items(media: Vec<MediaInput>) -> Vec<MediaItem> {
        let now = Utc::now();
        media
            .into_iter()
            .map(|item| MediaItem {
                id: EntityId::new().0,
                url: item.url,
                media_kind: item.media_kind,
                position: item.position,
                created_at: now,
            })
            .collect()
    }

    /// Create a new publication as draft or scheduled
    pub async fn create(&self, input: CreatePublicationInput) -> Result<Publication, AppError> {
        let now = Utc::now();

        let status = if input.scheduled_at.is_some() {
            PublicationStatus::Scheduled
        } else {
            PublicationStatus::Draft
        };

        let publication = Publication {
            id: EntityId::new().0,
            account_id: input.account_id,
            instagram_media_id: None,
            publication_type: input.publication_type,
            status,
            caption: input.caption,
            media: Self::media_items(input.media),
            reel_options: input.reel_options,
            scheduled_at: input.scheduled_at,
            published_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        publication.validate()?;
        self.db.insert_publication(&publication).await?;

        tracing::info!(
            publication_id = %publication.id,
            account_id = %publication.account_id,
            status = ?publication.status,
            "Publication created"
        );

        if input.publish_now {
            return self.publish_now(&publication.id).await;
        }

        Ok(publication)
    }

    /// Update an editable publication.
    ///
    /// Editing a failed publication returns it to draft (or scheduled,
    /// when a schedule is set); this is the explicit re-entry path out
    /// of the error status.
    pub async fn update(&self, input: UpdatePublicationInput) -> Result<Publication, AppError> {
        let mut publication = self.get(&input.id).await?;

        if !publication.is_editable() {
            return Err(AppError::Unprocessable(
                "publication cannot be edited in its current status".to_string(),
            ));
        }

        if let Some(caption) = input.caption {
            publication.caption = caption;
        }

        if input.clear_schedule {
            publication.scheduled_at = None;
            publication.status = PublicationStatus::Draft;
        } else if let Some(scheduled_at) = input.scheduled_at {
            publication.scheduled_at = Some(scheduled_at);
            publication.status = PublicationStatus::Scheduled;
        } else if publication.status == PublicationStatus::Error {
            publication.status = PublicationStatus::Draft;
        }

        if publication.status != PublicationStatus::Error {
            publication.error_message = None;
        }

        if !input.media.is_empty() {
            publication.media = Self::media_items(input.media);
        }
        if let Some(reel_options) = input.reel_options {
            publication.reel_options = Some(reel_options);
        }

        publication.updated_at = Utc::now();
        publication.validate()?;
        self.db.update_publication(&publication).await?;

        Ok(publication)
    }

    pub async fn get(&self, id: &str) -> Result<Publication, AppError> {
        self.db.get_publication(id).await?.ok_or(AppError::NotFound)
    }

    /// Delete a publication locally.
    ///
    /// Published content stays on the platform; the API offers no
    /// deletion for content published through this workflow.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let publication = self.get(id).await?;

        if !publication.is_deletable() {
            return Err(AppError::Unprocessable(
                "published content cannot be deleted".to_string(),
            ));
        }

        self.db.delete_publication(id).await
    }

    pub async fn list(
        &self,
        filter: PublicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<PublicationListing, AppError> {
        let publications = self.db.list_publications(&filter, limit, offset).await?;
        let total = self.db.count_publications(&filter).await?;

        Ok(PublicationListing {
            publications,
            total,
        })
    }

    /// Schedule a publication for a future time
    pub async fn schedule(
        &self,
        id: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Publication, AppError> {
        if scheduled_at <= Utc::now() {
            return Err(AppError::Validation(
                "scheduled time must be in the future".to_string(),
            ));
        }

        self.update(UpdatePublicationInput {
            id: id.to_string(),
            scheduled_at: Some(scheduled_at),
            ..Default::default()
        })
        .await
    }

    /// Remove the schedule and return the publication to draft
    pub async fn save_as_draft(&self, id: &str) -> Result<Publication, AppError> {
        self.update(UpdatePublicationInput {
            id: id.to_string(),
            clear_schedule: true,
            ..Default::default()
        })
        .await
    }

    /// Publish a publication immediately.
    ///
    /// Resolves credentials, runs the container workflow, and records
    /// the outcome on the publication: `published` with the platform
    /// media ID on success, `error` with the failure message otherwise.
    pub async fn publish_now(&self, id: &str) -> Result<Publication, AppError> {
        let publication = self.get(id).await?;

        match publication.status {
            PublicationStatus::Published => return Ok(publication),
            PublicationStatus::Draft | PublicationStatus::Scheduled => {}
            PublicationStatus::Error => {
                return Err(AppError::Unprocessable(
                    "failed publication must be edited before publishing again".to_string(),
                ));
            }
        }

        if publication.media.is_empty() {
            return Err(AppError::Validation(
                "at least one media item is required".to_string(),
            ));
        }

        let credentials = self.accounts.credentials(&publication.account_id).await?;

        let outcome = match self
            .publisher
            .publish(
                &credentials.instagram_user_id,
                &credentials.access_token,
                &publication,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                metrics::PUBLISH_ATTEMPTS_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                tracing::error!(
                    publication_id = %id,
                    %error,
                    "Publish failed"
                );
                // Write-behind: the caller still gets the publish error
                // even if recording it fails
                if let Err(record_error) = self.db.set_publication_error(id, &error.to_string()).await
                {
                    tracing::warn!(
                        publication_id = %id,
                        error = %record_error,
                        "Failed to record publish error"
                    );
                }
                return Err(error);
            }
        };

        metrics::PUBLISH_ATTEMPTS_TOTAL
            .with_label_values(&["success"])
            .inc();

        self.db
            .set_publication_published(id, &outcome.instagram_media_id, Utc::now())
            .await?;

        tracing::info!(
            publication_id = %id,
            instagram_media_id = %outcome.instagram_media_id,
            permalink = outcome.permalink.as_deref().unwrap_or(""),
            "Publication published"
        );

        self.get(id).await
    }

    /// Publish every scheduled publication whose time has come.
    ///
    /// Failures are recorded per publication by `publish_now` and do
    /// not stop the rest of the batch.
    pub async fn process_scheduled(&self) -> Result<(), AppError> {
        let due = self.db.get_publications_due(Utc::now()).await?;

        if due.is_empty() {
            return Ok(());
        }

        tracing::info!(count = due.len(), "Processing scheduled publications");

        for publication in due {
            if let Err(error) = self.publish_now(&publication.id).await {
                tracing::error!(
                    publication_id = %publication.id,
                    %error,
                    "Scheduled publish failed"
                );
            }
        }

        Ok(())
    }
}
