//! Calendar provider access.
//!
//! The HTTP layer only sees [`EventSource`]; [`GoogleCalendarClient`] is the
//! production implementation.

mod client;
pub mod window;

use async_trait::async_trait;
use shared::models::CalendarEvent;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use client::GoogleCalendarClient;
pub use window::{TimeWindow, WindowOverflow};

/// Any failure between asking for credentials and holding a decoded event list.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to read service account key {}: {source}", path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build service account authenticator: {0}")]
    Authenticator(#[source] std::io::Error),

    #[error("failed to obtain access token: {0}")]
    Token(#[from] yup_oauth2::Error),

    #[error("token response did not contain an access token")]
    MissingAccessToken,

    #[error("calendar request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("calendar API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode events list: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("calendar request timed out after {0:?}")]
    Timeout(Duration),
}

/// Read-only source of upcoming events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events overlapping `window`, recurring series expanded, ordered by start.
    async fn list_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, UpstreamError>;
}
