use serde::{Deserialize, Serialize};

// ============================================================================
// Appointment API Types
// ============================================================================

/// An upcoming calendar event with derived date and weekday fields.
///
/// `start_timestamp`/`end_timestamp` are the provider values untouched, so
/// all-day events show a bare `YYYY-MM-DD` there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub summary: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub start_date: String,
    pub start_day_name: String,
    pub end_date: String,
    pub end_day_name: String,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
