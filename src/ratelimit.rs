//! Tracks the server's rate-limit window from response headers.
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use reqwest::header::HeaderMap;

/// Quota level at which the client starts sleeping until the reported reset.
///
/// The upstream counter moves in non-uniform jumps, so waiting for zero would
/// regularly overshoot into a hard block.
pub const SAFETY_THRESHOLD: u64 = 50;

/// Sleep used when the reported reset time is missing or already in the past.
pub const FALLBACK_WAIT: Duration = Duration::from_secs(10);

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

/// Last observed rate-limit window. Updated after every response,
/// last-write-wins; absent headers leave the previous observation in place.
#[derive(Debug, Clone)]
pub struct RateLimit {
    pub max: u64,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max: 300,
            remaining: None,
            reset_at: None,
        }
    }
}

impl RateLimit {
    /// Updates the window from the headers of the latest response. All three
    /// headers are optional; `max` is only ever overwritten from an
    /// authoritative header, never guessed downward.
    pub fn observe(&mut self, headers: &HeaderMap) {
        if let Some(max) = header_u64(headers, HEADER_LIMIT) {
            self.max = max;
        }
        if let Some(remaining) = header_u64(headers, HEADER_REMAINING) {
            self.remaining = Some(remaining);
        }
        if let Some(reset) = headers
            .get(HEADER_RESET)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_reset)
        {
            self.reset_at = Some(reset);
        }
        debug!(
            "Rate limit window: {:?}/{} resets {:?}",
            self.remaining, self.max, self.reset_at
        );
    }

    /// How long the calling flow must suspend before the next request, if at
    /// all. Returns the time until the reported reset once `remaining` drops
    /// to the safety threshold, or [`FALLBACK_WAIT`] when the reset timestamp
    /// is absent or stale. Never negative, never unbounded.
    #[must_use]
    pub fn wait_needed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.remaining?;
        if remaining > SAFETY_THRESHOLD {
            return None;
        }

        match self.reset_at {
            Some(reset) if reset > now => {
                let until_reset = (reset - now).to_std().unwrap_or(FALLBACK_WAIT);
                Some(until_reset)
            }
            _ => Some(FALLBACK_WAIT),
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// The reset header is an RFC-formatted timestamp; some deployments emit
/// epoch seconds instead, so that form is accepted too.
fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return Utc.timestamp_opt(epoch, 0).single();
    }

    None
}
