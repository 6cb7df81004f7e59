//! Reverse-chronological status walking with boundary cutoffs.
use chrono::{DateTime, Utc};
use log::{debug, error};
use serde_json::{json, Value};

use crate::client::Client;
use crate::error::{ClientError, Result};

/// Caller-supplied shape of a status pull.
///
/// Both boundaries are exclusive: a post whose `created_at` equals
/// `created_after`, or whose id equals `since_id`, is NOT yielded.
#[derive(Debug, Clone, Default)]
pub struct TimelineOptions {
    /// Include replies. When false the server is asked to exclude them at
    /// URL-construction time rather than filtering after the fact.
    pub replies: bool,
    /// Pull only pinned posts; assumed single-page, stops after one fetch.
    pub pinned: bool,
    /// Yield only posts created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Yield only posts with ids strictly greater than this.
    pub since_id: Option<String>,
}

/// Walks a user's statuses page by page, newest first.
///
/// Every page is re-sorted by id descending before use (source order is not
/// trusted), then the oldest id on the page becomes the `max_id` upper bound
/// for the next request. That sliding window guarantees each later page
/// holds only strictly older posts. The first post at or past a boundary
/// stops the walk and drops the rest of the page, which is safe precisely
/// because of the explicit sort.
pub struct StatusWalker<'a> {
    client: &'a mut Client,
    path: String,
    max_id: Option<String>,
    options: TimelineOptions,
    done: bool,
    pages: u64,
}

impl<'a> StatusWalker<'a> {
    pub(crate) fn new(client: &'a mut Client, user_id: &str, options: TimelineOptions) -> Self {
        let mut path = format!("/v1/accounts/{user_id}/statuses");
        if options.pinned {
            path.push_str("?pinned=true&with_muted=true");
        } else if !options.replies {
            path.push_str("?exclude_replies=true");
        }

        Self {
            client,
            path,
            max_id: None,
            options,
            done: false,
            pages: 0,
        }
    }

    /// Fetches, sorts and filters the next page of statuses. Returns `None`
    /// when the feed is exhausted or a boundary was crossed. Transport and
    /// decode failures surface as errors and end the walk at the current
    /// point; pages already returned stay valid.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }

        let mut params = Vec::new();
        if let Some(id) = &self.max_id {
            params.push(("max_id", id.clone()));
        }

        let envelope = match self.client.fetch(&self.path, &params).await {
            Ok(envelope) => envelope,
            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };

        if let Some(detail) = envelope.body.get("error") {
            self.done = true;
            error!("API returned an error while pulling statuses: {detail}");
            return Err(ClientError::UpstreamApi(detail.to_string()));
        }

        let Value::Array(mut posts) = envelope.body else {
            self.done = true;
            error!("Status page was not a list; aborting walk");
            return Err(ClientError::UnexpectedShape {
                expected: "status array",
            });
        };

        if posts.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.pages += 1;
        debug!("Status page {} with {} posts", self.pages, posts.len());

        // Reverse chronological order, recent first. Ids sort lexically the
        // same way they sort numerically at fixed width.
        posts.sort_by(|a, b| post_id(b).cmp(&post_id(a)));

        // Without an id on the oldest post there is no max_id bound for the
        // next request, and an unbounded request would re-fetch page one.
        self.max_id = posts.last().and_then(|p| post_id(p).map(String::from));
        if self.max_id.is_none() {
            self.done = true;
            error!("Status page had no usable post ids; aborting walk");
            return Err(ClientError::UnexpectedShape {
                expected: "status with an id",
            });
        }

        if self.options.pinned {
            // Pinned listings are assumed to fit one page.
            self.done = true;
        }

        let pulled_at = Utc::now().to_rfc3339();
        let mut page = Vec::with_capacity(posts.len());
        for mut post in posts {
            if beyond_boundary(&self.options, &post) {
                // The page is in descending order: this post and everything
                // after it are older than the boundary.
                self.done = true;
                break;
            }

            if let Value::Object(fields) = &mut post {
                fields.insert("_pulled".to_string(), json!(pulled_at));
            }
            page.push(post);
        }

        if page.is_empty() {
            return Ok(None);
        }
        Ok(Some(page))
    }
}

/// True when the post sits at or past one of the configured boundaries.
fn beyond_boundary(options: &TimelineOptions, post: &Value) -> bool {
    if let Some(cutoff) = options.created_after {
        let created = post
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        if matches!(created, Some(at) if at <= cutoff) {
            return true;
        }
    }

    if let Some(since) = &options.since_id {
        if matches!(post_id(post), Some(id) if id <= since.as_str()) {
            return true;
        }
    }

    false
}

fn post_id(post: &Value) -> Option<&str> {
    post.get("id").and_then(Value::as_str)
}

/// Timestamps from the API are RFC 3339; treat anything else as absent
/// rather than guessing.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
