use async_trait::async_trait;
use shared::models::{CalendarEvent, EventList};
use std::path::PathBuf;
use tokio::sync::OnceCell;
use yup_oauth2::authenticator::DefaultAuthenticator;

use super::{EventSource, TimeWindow, UpstreamError};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Google Calendar events client using a service account.
///
/// The key file is read on first use rather than at start-up, so a missing or
/// broken key shows up as a failed request and is retried on the next one.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    service_account_file: PathBuf,
    calendar_id: String,
    authenticator: OnceCell<DefaultAuthenticator>,
}

impl GoogleCalendarClient {
    pub fn new(service_account_file: impl Into<PathBuf>, calendar_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            service_account_file: service_account_file.into(),
            calendar_id: calendar_id.into(),
            authenticator: OnceCell::new(),
        }
    }

    async fn authenticator(&self) -> Result<&DefaultAuthenticator, UpstreamError> {
        self.authenticator
            .get_or_try_init(|| async {
                let key = yup_oauth2::read_service_account_key(&self.service_account_file)
                    .await
                    .map_err(|source| UpstreamError::Credentials {
                        path: self.service_account_file.clone(),
                        source,
                    })?;

                let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(UpstreamError::Authenticator)?;

                tracing::info!(
                    "Service account credentials loaded from {}",
                    self.service_account_file.display()
                );
                Ok::<_, UpstreamError>(auth)
            })
            .await
    }

    async fn access_token(&self) -> Result<String, UpstreamError> {
        let token = self
            .authenticator()
            .await?
            .token(&[CALENDAR_READONLY_SCOPE])
            .await?;

        token
            .token()
            .map(str::to_owned)
            .ok_or(UpstreamError::MissingAccessToken)
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// Events list request for `window`: recurring series expanded, ordered by start.
    fn events_request(
        &self,
        access_token: &str,
        window: &TimeWindow,
    ) -> Result<reqwest::Request, UpstreamError> {
        let request = self
            .http
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.min_param()),
                ("timeMax", window.max_param()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .build()?;

        Ok(request)
    }
}

fn parse_event_list(status: reqwest::StatusCode, body: &str) -> Result<EventList, UpstreamError> {
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status,
            body: body.to_string(),
        });
    }

    serde_json::from_str(body).map_err(UpstreamError::Decode)
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    async fn list_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, UpstreamError> {
        let access_token = self.access_token().await?;
        let request = self.events_request(&access_token, window)?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = if status.is_success() {
            response.text().await?
        } else {
            response.text().await.unwrap_or_default()
        };
        let list = parse_event_list(status, &body)?;

        if list.next_page_token.is_some() {
            tracing::debug!(
                "Calendar {} has more events than one page, only the first page is returned",
                self.calendar_id
            );
        }

        tracing::debug!(
            "Fetched {} events from calendar {}",
            list.items.len(),
            self.calendar_id
        );
        Ok(list.items)
    }
}
