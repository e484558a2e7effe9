//! Instagram Graph API integration
//!
//! - `client`: HTTP client and the `PlatformClient` trait the rest of
//!   the application consumes
//! - `publisher`: container-based publishing workflow

mod client;
mod publisher;

pub use client::{
    Client, ContainerKind, ContainerSpec, ContainerState, ContainerStatus, MediaDetails, Page,
    PlatformClient,
};
pub use publisher::{PublishOutcome, Publisher};

#[cfg(test)]
pub use client::MockPlatformClient;
