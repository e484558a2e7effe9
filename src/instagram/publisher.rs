//! Publishing workflow
//!
//! Drives the three-step platform publishing pipeline:
//! create container(s) -> wait for processing -> commit.

use std::sync::Arc;
use std::time::Duration;

use crate::data::{MediaItem, MediaKind, Publication, PublicationType, ReelOptions};
use crate::error::AppError;

use super::client::{ContainerKind, ContainerSpec, ContainerStatus, PlatformClient};

/// Default interval between container status polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of status polls before giving up (~150s ceiling)
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Result of a successful publish
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// Platform-assigned media ID
    pub instagram_media_id: String,
    /// Best-effort permalink; `None` if the lookup failed
    pub permalink: Option<String>,
}

/// How a publication maps onto platform containers.
///
/// Selected once at the top of the pipeline; each variant knows how to
/// assemble its own containers.
enum ContainerPlan<'a> {
    /// Single-media feed post
    SinglePost {
        media: &'a MediaItem,
        caption: &'a str,
    },
    /// Multi-media feed post: child containers plus a carousel parent
    Carousel {
        media: &'a [MediaItem],
        caption: &'a str,
    },
    /// Story, no caption
    Story { media: &'a MediaItem },
    /// Reel with caption and reel-specific options
    Reel {
        media: &'a MediaItem,
        caption: &'a str,
        options: Option<&'a ReelOptions>,
    },
}

impl<'a> ContainerPlan<'a> {
    /// Validate the publication's media against its type and pick the
    /// assembly strategy. Fails before any remote call.
    fn for_publication(publication: &'a Publication) -> Result<Self, AppError> {
        match publication.publication_type {
            PublicationType::Post => match publication.media.len() {
                0 => Err(AppError::Validation(
                    "at least one media item is required".to_string(),
                )),
                1 => Ok(Self::SinglePost {
                    media: &publication.media[0],
                    caption: &publication.caption,
                }),
                _ => Ok(Self::Carousel {
                    media: &publication.media,
                    caption: &publication.caption,
                }),
            },
            PublicationType::Story => {
                let [media] = publication.media.as_slice() else {
                    return Err(AppError::Validation(
                        "story requires exactly one media item".to_string(),
                    ));
                };
                Ok(Self::Story { media })
            }
            PublicationType::Reel => {
                let [media] = publication.media.as_slice() else {
                    return Err(AppError::Validation(
                        "reel requires exactly one media item".to_string(),
                    ));
                };
                if media.media_kind != MediaKind::Video {
                    return Err(AppError::Validation(
                        "reel requires video content".to_string(),
                    ));
                }
                Ok(Self::Reel {
                    media,
                    caption: &publication.caption,
                    options: publication.reel_options.as_ref(),
                })
            }
        }
    }
}

fn media_urls(spec: &mut ContainerSpec, media: &MediaItem) {
    match media.media_kind {
        MediaKind::Image => spec.image_url = Some(media.url.clone()),
        MediaKind::Video => spec.video_url = Some(media.url.clone()),
    }
}

/// Publishing workflow over a [`PlatformClient`]
pub struct Publisher {
    client: Arc<dyn PlatformClient>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl Publisher {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Override polling cadence (tests use a zero interval)
    pub fn with_polling(
        client: Arc<dyn PlatformClient>,
        poll_interval: Duration,
        max_poll_attempts: u32,
    ) -> Self {
        Self {
            client,
            poll_interval,
            max_poll_attempts,
        }
    }

    /// Publish a publication to the platform.
    ///
    /// Assembles containers according to the publication type, waits
    /// for processing to finish, then commits. Any failure is returned
    /// to the caller; recording it on the publication is the caller's
    /// job.
    pub async fn publish(
        &self,
        user_id: &str,
        access_token: &str,
        publication: &Publication,
    ) -> Result<PublishOutcome, AppError> {
        let plan = ContainerPlan::for_publication(publication)?;

        let container_id = match plan {
            ContainerPlan::SinglePost { media, caption } => {
                let mut spec = ContainerSpec {
                    caption: Some(caption.to_string()),
                    ..Default::default()
                };
                media_urls(&mut spec, media);
                self.client
                    .create_media_container(user_id, access_token, &spec)
                    .await?
            }
            ContainerPlan::Carousel { media, caption } => {
                self.create_carousel(user_id, access_token, media, caption)
                    .await?
            }
            ContainerPlan::Story { media } => {
                let mut spec = ContainerSpec {
                    kind: Some(ContainerKind::Stories),
                    ..Default::default()
                };
                media_urls(&mut spec, media);
                self.client
                    .create_media_container(user_id, access_token, &spec)
                    .await?
            }
            ContainerPlan::Reel {
                media,
                caption,
                options,
            } => {
                let spec = ContainerSpec {
                    kind: Some(ContainerKind::Reels),
                    video_url: Some(media.url.clone()),
                    caption: Some(caption.to_string()),
                    reel: options.cloned(),
                    ..Default::default()
                };
                self.client
                    .create_media_container(user_id, access_token, &spec)
                    .await?
            }
        };

        self.wait_for_container(&container_id, access_token).await?;

        self.commit(user_id, access_token, &container_id).await
    }

    /// Create child containers in input order, then the carousel parent.
    ///
    /// Video children must finish processing before they can be
    /// referenced by the parent.
    async fn create_carousel(
        &self,
        user_id: &str,
        access_token: &str,
        media: &[MediaItem],
        caption: &str,
    ) -> Result<String, AppError> {
        let mut child_ids = Vec::with_capacity(media.len());

        for (index, item) in media.iter().enumerate() {
            let mut spec = ContainerSpec {
                is_carousel_item: true,
                ..Default::default()
            };
            media_urls(&mut spec, item);

            let child_id = self
                .client
                .create_media_container(user_id, access_token, &spec)
                .await
                .map_err(|e| {
                    AppError::Platform(format!("creating carousel item {}: {}", index, e))
                })?;

            if item.media_kind == MediaKind::Video {
                self.wait_for_container(&child_id, access_token)
                    .await
                    .map_err(|e| {
                        AppError::Platform(format!("waiting for carousel item {}: {}", index, e))
                    })?;
            }

            child_ids.push(child_id);
        }

        let spec = ContainerSpec {
            kind: Some(ContainerKind::Carousel),
            caption: Some(caption.to_string()),
            children: child_ids,
            ..Default::default()
        };

        self.client
            .create_media_container(user_id, access_token, &spec)
            .await
    }

    /// Poll a container until it reaches a terminal state.
    ///
    /// `Finished`/`Published` end the wait successfully; `Error` and
    /// `Expired` are terminal failures; running out of attempts yields
    /// [`AppError::ContainerNotReady`].
    async fn wait_for_container(
        &self,
        container_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let started = std::time::Instant::now();
        let observe = |outcome: &str| {
            crate::metrics::CONTAINER_WAIT_SECONDS
                .with_label_values(&[outcome])
                .observe(started.elapsed().as_secs_f64());
        };

        for attempt in 0..self.max_poll_attempts {
            let state = self
                .client
                .get_container_status(container_id, access_token)
                .await?;

            match state.status {
                ContainerStatus::Finished | ContainerStatus::Published => {
                    observe("ready");
                    return Ok(());
                }
                ContainerStatus::Error => {
                    observe("error");
                    return Err(AppError::Platform(format!(
                        "container error: {}",
                        state.error_message.unwrap_or_default()
                    )));
                }
                ContainerStatus::Expired => {
                    observe("expired");
                    return Err(AppError::Platform("container expired".to_string()));
                }
                ContainerStatus::InProgress => {
                    tracing::debug!(
                        container_id = %container_id,
                        attempt = attempt + 1,
                        "Container still processing"
                    );
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        observe("timeout");
        Err(AppError::ContainerNotReady)
    }

    /// Commit the container and fetch the permalink.
    ///
    /// The permalink lookup is best-effort: the publish has already
    /// succeeded, so its failure is logged and swallowed.
    async fn commit(
        &self,
        user_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<PublishOutcome, AppError> {
        let instagram_media_id = self
            .client
            .publish_media(user_id, access_token, container_id)
            .await?;

        let permalink = match self
            .client
            .get_media(&instagram_media_id, access_token, &["id", "permalink"])
            .await
        {
            Ok(details) => details.permalink,
            Err(error) => {
                tracing::warn!(
                    media_id = %instagram_media_id,
                    %error,
                    "Permalink lookup failed after successful publish"
                );
                None
            }
        };

        Ok(PublishOutcome {
            instagram_media_id,
            permalink,
        })
    }

}
