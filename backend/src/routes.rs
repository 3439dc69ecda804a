use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{appointments, health};
use crate::middleware::{require_api_key, API_KEY_HEADER};
use crate::state::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Routes behind the API key
    let protected = Router::new()
        .route("/appointments", get(appointments::list_appointments))
        .route_layer(middleware::from_fn_with_state(state, require_api_key));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(protected)
}

pub fn create_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .nest("/api", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build CORS layer from the configured origins.
///
/// With no origins configured, falls back to permissive CORS.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, using permissive CORS");
        return CorsLayer::permissive();
    }

    tracing::info!("CORS configured for origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventSource, TimeWindow, UpstreamError};
    use crate::config::{AppConfig, MalformedEventPolicy};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Duration as ChronoDuration;
    use shared::api::{Appointment, ErrorResponse};
    use shared::models::{CalendarEvent, EventDateTime};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    enum Outcome {
        Events(Vec<CalendarEvent>),
        CredentialsFailure,
        Hang,
    }

    struct FakeSource {
        outcome: Outcome,
        calls: AtomicUsize,
        last_window: Mutex<Option<TimeWindow>>,
    }

    impl FakeSource {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                last_window: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn list_events(
            &self,
            window: &TimeWindow,
        ) -> Result<Vec<CalendarEvent>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_window.lock().unwrap() = Some(*window);

            match &self.outcome {
                Outcome::Events(events) => Ok(events.clone()),
                Outcome::CredentialsFailure => Err(UpstreamError::Credentials {
                    path: PathBuf::from("/missing/key.json"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            api_key: "test-api-key".to_string(),
            service_account_file: PathBuf::from("/tmp/key.json"),
            calendar_id: "team@example.com".to_string(),
            lookahead_days: 14,
            upstream_timeout: Duration::from_secs(5),
            malformed_events: MalformedEventPolicy::Skip,
            display_timezone: Some(chrono_tz::UTC),
            cors_allowed_origins: vec![],
        }
    }

    fn app_with(config: AppConfig, source: Arc<FakeSource>) -> Router {
        create_app(AppState::new(config, source))
    }

    fn appointments_request(api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/appointments");
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sample_events() -> Vec<CalendarEvent> {
        vec![
            CalendarEvent {
                id: Some("1".to_string()),
                summary: Some("Company holiday".to_string()),
                start: EventDateTime::all_day("2024-06-10"),
                end: EventDateTime::all_day("2024-06-11"),
            },
            CalendarEvent {
                id: Some("2".to_string()),
                summary: None,
                start: EventDateTime::timed("2024-06-12T09:00:00Z"),
                end: EventDateTime::timed("2024-06-12T10:00:00Z"),
            },
            CalendarEvent {
                id: Some("3".to_string()),
                summary: Some("Review".to_string()),
                start: EventDateTime::timed("2024-06-13T14:00:00+03:00"),
                end: EventDateTime::timed("2024-06-13T15:00:00+03:00"),
            },
        ]
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized() {
        let source = FakeSource::new(Outcome::Events(sample_events()));
        let response = app_with(test_config(), source.clone())
            .oneshot(appointments_request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body, ErrorResponse::new("Unauthorized"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_unauthorized() {
        let source = FakeSource::new(Outcome::Events(sample_events()));
        let response = app_with(test_config(), source.clone())
            .oneshot(appointments_request(Some("wrong-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_returns_normalized_events_in_order() {
        let source = FakeSource::new(Outcome::Events(sample_events()));
        let response = app_with(test_config(), source.clone())
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let appointments: Vec<Appointment> = body_json(response).await;
        assert_eq!(appointments.len(), 3);
        assert_eq!(source.calls(), 1);

        assert_eq!(appointments[0].summary, "Company holiday");
        assert_eq!(appointments[0].start_timestamp, "2024-06-10");
        assert_eq!(appointments[0].start_date, "2024-06-10");
        assert_eq!(appointments[0].start_day_name, "Monday");

        assert_eq!(appointments[1].summary, "No Title");
        assert_eq!(appointments[1].start_timestamp, "2024-06-12T09:00:00Z");
        assert_eq!(appointments[1].start_date, "2024-06-12");
        assert_eq!(appointments[1].start_day_name, "Wednesday");

        assert_eq!(appointments[2].summary, "Review");
        assert_eq!(appointments[2].end_timestamp, "2024-06-13T15:00:00+03:00");
        assert_eq!(appointments[2].end_day_name, "Thursday");
    }

    #[tokio::test]
    async fn test_queries_fourteen_day_window() {
        let source = FakeSource::new(Outcome::Events(vec![]));
        let response = app_with(test_config(), source.clone())
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let appointments: Vec<Appointment> = body_json(response).await;
        assert!(appointments.is_empty());

        let window = source.last_window.lock().unwrap().expect("window recorded");
        assert_eq!(window.time_max - window.time_min, ChronoDuration::days(14));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic_500() {
        let source = FakeSource::new(Outcome::CredentialsFailure);
        let response = app_with(test_config(), source.clone())
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body, ErrorResponse::new("Failed to fetch calendar events"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_generic_500() {
        let config = AppConfig {
            upstream_timeout: Duration::from_millis(20),
            ..test_config()
        };
        let source = FakeSource::new(Outcome::Hang);
        let response = app_with(config, source)
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "Failed to fetch calendar events");
    }

    #[tokio::test]
    async fn test_unrepresentable_window_is_generic_500() {
        let config = AppConfig {
            lookahead_days: u64::MAX,
            ..test_config()
        };
        let source = FakeSource::new(Outcome::Events(sample_events()));
        let response = app_with(config, source.clone())
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body, ErrorResponse::new("Failed to fetch calendar events"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_event_policy() {
        let mut events = sample_events();
        events.insert(
            1,
            CalendarEvent {
                id: Some("broken".to_string()),
                summary: Some("No start".to_string()),
                start: EventDateTime::default(),
                end: EventDateTime::timed("2024-06-12T10:00:00Z"),
            },
        );

        let source = FakeSource::new(Outcome::Events(events.clone()));
        let response = app_with(test_config(), source)
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let appointments: Vec<Appointment> = body_json(response).await;
        assert_eq!(appointments.len(), 3);
        assert!(appointments.iter().all(|a| a.summary != "No start"));

        let config = AppConfig {
            malformed_events: MalformedEventPolicy::Fail,
            ..test_config()
        };
        let source = FakeSource::new(Outcome::Events(events));
        let response = app_with(config, source)
            .oneshot(appointments_request(Some("test-api-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_needs_no_key() {
        let source = FakeSource::new(Outcome::Events(vec![]));
        let response = app_with(test_config(), source.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(source.calls(), 0);
    }
}
