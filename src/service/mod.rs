//! Service layer
//!
//! Business logic on top of the data layer and the platform client:
//! - `accounts`: credential resolution for connected accounts
//! - `comments`: comment cache with read-through sync
//! - `direct`: conversation/message cache with read-through sync
//! - `publications`: publication lifecycle and publishing

mod accounts;
mod comments;
mod direct;
mod publications;

pub use accounts::{AccountService, Credentials};
pub use comments::{CommentListing, CommentService};
pub use direct::{ConversationListing, DirectService, MessageListing};
pub use publications::{
    CreatePublicationInput, MediaInput, PublicationListing, PublicationService,
    UpdatePublicationInput,
};

use tokio::task::JoinSet;

use crate::error::AppError;

/// Number of items requested per page during a drain sync
pub(crate) const SYNC_PAGE_SIZE: u32 = 100;

/// A drain aborts after this many consecutive empty pages; some API
/// permission problems produce an endless cursor over empty pages.
pub(crate) const MAX_CONSECUTIVE_EMPTY_PAGES: u32 = 3;

/// Fold one finished persistence task into the single-slot error
/// holder: the first error wins, later ones are logged and dropped.
pub(crate) fn record_persist_outcome(
    outcome: Result<Result<(), AppError>, tokio::task::JoinError>,
    first_error: &mut Option<AppError>,
) {
    let error = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(error)) => error,
        Err(join_error) => AppError::Internal(anyhow::anyhow!(
            "page persistence task panicked: {}",
            join_error
        )),
    };

    if first_error.is_none() {
        *first_error = Some(error);
    } else {
        tracing::warn!(%error, "Dropping additional page persistence failure");
    }
}

/// Completion barrier: wait for every dispatched persistence task.
pub(crate) async fn await_persist_tasks(
    tasks: &mut JoinSet<Result<(), AppError>>,
    first_error: &mut Option<AppError>,
) {
    while let Some(outcome) = tasks.join_next().await {
        record_persist_outcome(outcome, first_error);
    }
}
