use std::sync::Arc;

use crate::calendar::EventSource;
use crate::config::AppConfig;
use crate::normalize::NormalizeOptions;

/// Router state: start-up configuration and the event source, both read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub events: Arc<dyn EventSource>,
}

impl AppState {
    pub fn new(config: AppConfig, events: Arc<dyn EventSource>) -> Self {
        Self {
            config: Arc::new(config),
            events,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            display_timezone: self.config.display_timezone,
            malformed_events: self.config.malformed_events,
        }
    }
}
