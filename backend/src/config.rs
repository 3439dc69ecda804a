use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const LOOKAHEAD_DAYS_RANGE: RangeInclusive<u64> = 1..=366;

/// What to do with an event whose start or end cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedEventPolicy {
    /// Drop the event and log a warning.
    #[default]
    Skip,
    /// Fail the whole request.
    Fail,
}

impl FromStr for MalformedEventPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => bail!("unknown malformed event policy '{}', expected 'skip' or 'fail'", other),
        }
    }
}

impl fmt::Display for MalformedEventPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub api_key: String,
    pub service_account_file: PathBuf,
    pub calendar_id: String,
    pub lookahead_days: u64,
    pub upstream_timeout: Duration,
    pub malformed_events: MalformedEventPolicy,
    /// Zone used for window arithmetic and date derivation. `None` means the
    /// server's local zone for the window and each timestamp's own offset for dates.
    pub display_timezone: Option<Tz>,
    /// Empty means permissive CORS.
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("API_KEY").context("API_KEY must be set")?;
        if api_key.is_empty() {
            bail!("API_KEY must not be empty");
        }
        // Header values outside visible ASCII never reach the comparison intact.
        if !api_key.bytes().all(|b| b.is_ascii_graphic()) {
            bail!("API_KEY must contain only visible ASCII characters");
        }

        let lookahead_days: u64 = lookup("LOOKAHEAD_DAYS")
            .unwrap_or_else(|| "14".to_string())
            .parse()
            .context("LOOKAHEAD_DAYS must be a valid number")?;
        if !LOOKAHEAD_DAYS_RANGE.contains(&lookahead_days) {
            bail!(
                "LOOKAHEAD_DAYS must be between {} and {}, got {}",
                LOOKAHEAD_DAYS_RANGE.start(),
                LOOKAHEAD_DAYS_RANGE.end(),
                lookahead_days
            );
        }

        let upstream_timeout_secs: u64 = lookup("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("UPSTREAM_TIMEOUT_SECS must be a valid number")?;
        if upstream_timeout_secs == 0 {
            bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }

        let display_timezone = match lookup("DISPLAY_TIMEZONE").filter(|v| !v.trim().is_empty()) {
            Some(name) => Some(
                name.trim()
                    .parse::<Tz>()
                    .map_err(|e| anyhow!("DISPLAY_TIMEZONE '{}' is not a valid IANA zone: {}", name, e))?,
            ),
            None => None,
        };

        Ok(Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            api_key,
            service_account_file: lookup("SERVICE_ACCOUNT_FILE")
                .map(PathBuf::from)
                .context("SERVICE_ACCOUNT_FILE must be set")?,
            calendar_id: lookup("CALENDAR_MAIL").context("CALENDAR_MAIL must be set")?,
            lookahead_days,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            malformed_events: match lookup("MALFORMED_EVENT_POLICY") {
                Some(value) => value.parse().context("MALFORMED_EVENT_POLICY is invalid")?,
                None => MalformedEventPolicy::default(),
            },
            display_timezone,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
