//! Reshapes provider events into [`Appointment`] records.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use shared::api::Appointment;
use shared::models::{CalendarEvent, EventDateTime};
use std::fmt;
use thiserror::Error;

use crate::config::MalformedEventPolicy;

/// Summary used when the provider sends none.
pub const NO_TITLE: &str = "No Title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("event {event} has no {boundary} time")]
    MissingBoundary { event: String, boundary: Boundary },

    #[error("event {event} has an unreadable {boundary} time '{value}'")]
    InvalidBoundary {
        event: String,
        boundary: Boundary,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub display_timezone: Option<Tz>,
    pub malformed_events: MalformedEventPolicy,
}

/// Normalize every event, preserving order.
///
/// Malformed events are dropped or fail the batch according to
/// `options.malformed_events`.
pub fn normalize_events(
    events: Vec<CalendarEvent>,
    options: &NormalizeOptions,
) -> Result<Vec<Appointment>, NormalizeError> {
    let mut appointments = Vec::with_capacity(events.len());

    for event in &events {
        match normalize_event(event, options.display_timezone) {
            Ok(appointment) => appointments.push(appointment),
            Err(e) if options.malformed_events == MalformedEventPolicy::Skip => {
                tracing::warn!("Skipping malformed event: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(appointments)
}

pub fn normalize_event(
    event: &CalendarEvent,
    display_timezone: Option<Tz>,
) -> Result<Appointment, NormalizeError> {
    let (start_timestamp, start) =
        read_boundary(event, &event.start, Boundary::Start, display_timezone)?;
    let (end_timestamp, end) = read_boundary(event, &event.end, Boundary::End, display_timezone)?;

    let summary = match event.summary.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NO_TITLE.to_string(),
    };

    Ok(Appointment {
        summary,
        start_timestamp,
        end_timestamp,
        start_date: format_date(start),
        start_day_name: day_name(start),
        end_date: format_date(end),
        end_day_name: day_name(end),
    })
}

fn read_boundary(
    event: &CalendarEvent,
    boundary: &EventDateTime,
    which: Boundary,
    display_timezone: Option<Tz>,
) -> Result<(String, NaiveDate), NormalizeError> {
    let raw = boundary
        .raw()
        .ok_or_else(|| NormalizeError::MissingBoundary {
            event: event_label(event),
            boundary: which,
        })?;

    let date = calendar_date(boundary, display_timezone).ok_or_else(|| {
        NormalizeError::InvalidBoundary {
            event: event_label(event),
            boundary: which,
            value: raw.to_string(),
        }
    })?;

    Ok((raw.to_string(), date))
}

/// Calendar date of a boundary.
///
/// All-day boundaries are taken as-is. Timestamps land in `display_timezone`
/// when given, otherwise on the date of their own UTC offset.
pub fn calendar_date(boundary: &EventDateTime, display_timezone: Option<Tz>) -> Option<NaiveDate> {
    let raw = boundary.raw()?;
    if boundary.is_all_day() {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    }

    let timestamp = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(match display_timezone {
        Some(tz) => timestamp.with_timezone(&tz).date_naive(),
        None => timestamp.date_naive(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

fn event_label(event: &CalendarEvent) -> String {
    event
        .id
        .clone()
        .or_else(|| event.summary.clone())
        .unwrap_or_else(|| "<unnamed>".to_string())
}
