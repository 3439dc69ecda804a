//! Query window arithmetic.

use chrono::{DateTime, Days, Duration, Local, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// The end of the window falls outside the representable date range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot add {days} days to {start}")]
pub struct WindowOverflow {
    pub start: DateTime<Utc>,
    pub days: u64,
}

/// Half-open range of time passed to the provider as `timeMin`/`timeMax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl TimeWindow {
    /// Window starting now and spanning `days` calendar days in the given zone,
    /// or in the server's local zone when none is given.
    pub fn starting_now(zone: Option<Tz>, days: u64) -> Result<Self, WindowOverflow> {
        match zone {
            Some(tz) => Self::spanning_days(Utc::now().with_timezone(&tz), days),
            None => Self::spanning_days(Local::now(), days),
        }
    }

    /// `[start, start + days]` using calendar-day addition in `start`'s zone.
    ///
    /// Keeps the local wall-clock time across month ends, leap days and DST
    /// changes. When that wall-clock time does not exist on the target day,
    /// falls back to adding whole 24 hour days. Fails only when the end is
    /// outside chrono's date range.
    pub fn spanning_days<Z: TimeZone>(
        start: DateTime<Z>,
        days: u64,
    ) -> Result<Self, WindowOverflow> {
        let overflow = || WindowOverflow {
            start: start.with_timezone(&Utc),
            days,
        };

        let end = match start.clone().checked_add_days(Days::new(days)) {
            Some(end) => end,
            None => i64::try_from(days)
                .ok()
                .and_then(Duration::try_days)
                .and_then(|delta| start.clone().checked_add_signed(delta))
                .ok_or_else(overflow)?,
        };

        Ok(Self {
            time_min: start.with_timezone(&Utc),
            time_max: end.with_timezone(&Utc),
        })
    }

    /// `timeMin` query value.
    pub fn min_param(&self) -> String {
        self.time_min.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// `timeMax` query value.
    pub fn max_param(&self) -> String {
        self.time_max.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
