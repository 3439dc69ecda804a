use axum::{extract::State, Json};
use shared::api::Appointment;

use crate::calendar::{TimeWindow, UpstreamError};
use crate::error::ApiResult;
use crate::normalize::normalize_events;
use crate::state::AppState;

/// `GET /api/appointments`: upcoming events in the lookahead window.
pub async fn list_appointments(State(state): State<AppState>) -> ApiResult<Json<Vec<Appointment>>> {
    let config = &state.config;
    let window = TimeWindow::starting_now(config.display_timezone, config.lookahead_days)?;

    let events = tokio::time::timeout(config.upstream_timeout, state.events.list_events(&window))
        .await
        .map_err(|_| UpstreamError::Timeout(config.upstream_timeout))??;

    let fetched = events.len();
    let appointments = normalize_events(events, &state.normalize_options())?;

    tracing::debug!(
        "Returning {} of {} events between {} and {}",
        appointments.len(),
        fetched,
        window.min_param(),
        window.max_param()
    );
    Ok(Json(appointments))
}
