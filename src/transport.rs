//! Single-request plumbing: fixed identity headers, bounded retries with
//! exponential backoff, JSON decoding and `Link` header extraction.
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::sleep;

use crate::client::Client;
use crate::error::{ClientError, Result};

/// Browser identity presented on every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Response body size kept in error details before truncation.
const DETAIL_LIMIT: usize = 200;

/// One decoded response plus the pagination metadata from its envelope.
#[derive(Debug)]
pub struct Envelope {
    /// Decoded JSON body, passed through verbatim.
    pub body: Value,
    /// URL of the next page, taken from the `Link` header's `rel="next"`
    /// segment. Absent means pagination ends here.
    pub next: Option<String>,
}

/// GET statuses that are worth another attempt. The set is closed; 5xx codes
/// outside it (501, 505 and up) fail immediately like any other error.
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 413 | 429 | 500 | 502 | 503 | 504)
}

impl Client {
    /// Issues one authenticated GET against an API path, retrying transient
    /// failures, and returns the decoded body plus the next-page link.
    pub(crate) async fn fetch(&mut self, path: &str, query: &[(&str, String)]) -> Result<Envelope> {
        let url = self.api_url(path);
        self.fetch_url(&url, query).await
    }

    /// Like [`fetch`](Self::fetch) but takes a full URL, so the paginator can
    /// follow absolute next-page links from the `Link` header.
    pub(crate) async fn fetch_url(&mut self, url: &str, query: &[(&str, String)]) -> Result<Envelope> {
        self.ensure_authenticated().await?;
        let token = self.token().unwrap_or_default().to_string();

        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!("GET {url} (attempt {attempts})");

            let request = self.http().get(url).query(query).bearer_auth(&token);

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) if (err.is_timeout() || err.is_connect()) && attempts < MAX_ATTEMPTS => {
                    warn!("Connection error on {url}, retrying in {delay:?}: {err}");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                    continue;
                }
                Err(err) => return Err(ClientError::Connection(err)),
            };

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await.map_err(ClientError::Connection)?;

            // Rate-limit headers can show up on error responses too, so the
            // tracker sees every response before retry/failure is decided.
            self.observe_rate_limit(&headers).await;

            if status.is_success() {
                let value: Value = serde_json::from_str(&body)?;
                return Ok(Envelope {
                    body: value,
                    next: next_link(&headers),
                });
            }

            if is_retryable_status(status) && attempts < MAX_ATTEMPTS {
                warn!("Status {status} on {url}, retrying in {delay:?}");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                continue;
            }

            return Err(ClientError::RequestFailed {
                path: url.to_string(),
                status: status.as_u16(),
                attempts,
                detail: truncate_detail(&body),
            });
        }
    }

    async fn observe_rate_limit(&mut self, headers: &HeaderMap) {
        self.rate_limit_mut().observe(headers);
        if let Some(wait) = self.rate_limit().wait_needed(Utc::now()) {
            warn!("Approaching rate limit; sleeping for {wait:?}");
            sleep(wait).await;
        }
    }
}

/// Extracts the `rel="next"` URL from a `Link` header value of the form
/// `<url>; rel="next", <url>; rel="prev"`. Returns `None` for anything that
/// does not match that grammar exactly.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    parse_next_link(header)
}

pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    for segment in header.split(',') {
        let mut parts = segment.splitn(2, ';');
        let url = parts.next()?.trim();
        let Some(rel) = parts.next() else { continue };

        if rel.trim() == "rel=\"next\"" && url.starts_with('<') && url.ends_with('>') {
            return Some(url[1..url.len() - 1].to_string());
        }
    }
    None
}

fn truncate_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= DETAIL_LIMIT {
        trimmed.to_string()
    } else {
        let cut = trimmed
            .char_indices()
            .take_while(|(idx, _)| *idx < DETAIL_LIMIT)
            .last()
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        format!("{}...", &trimmed[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_among_multiple_relations() {
        let header = "<https://example.com/api/v1/accounts/1/followers?max_id=99>; rel=\"next\", \
                      <https://example.com/api/v1/accounts/1/followers?since_id=200>; rel=\"prev\"";
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://example.com/api/v1/accounts/1/followers?max_id=99")
        );
    }

    #[test]
    fn missing_next_relation_means_no_more_pages() {
        let header = "<https://example.com/page2>; rel=\"prev\"";
        assert!(parse_next_link(header).is_none());
        assert!(parse_next_link("").is_none());
    }

    #[test]
    fn malformed_segments_are_skipped() {
        assert!(parse_next_link("https://no-brackets; rel=\"next\"").is_none());
        assert!(parse_next_link("<https://example.com/a>").is_none());
        assert!(parse_next_link("rel=\"next\"; <https://backwards>").is_none());

        let header = "garbage, <https://example.com/ok>; rel=\"next\"";
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://example.com/ok")
        );
    }

    #[test]
    fn retryable_status_set_matches_policy() {
        for code in [408u16, 413, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        for code in [400u16, 401, 403, 404, 422, 501, 505, 599] {
            assert!(!is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn detail_truncation_keeps_prefix() {
        let long = "x".repeat(500);
        let detail = truncate_detail(&long);
        assert!(detail.len() <= DETAIL_LIMIT + 3);
        assert!(detail.ends_with("..."));
        assert_eq!(truncate_detail("  short  "), "short");
    }
}
