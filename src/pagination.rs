//! Link-header cursor pagination.
use log::debug;
use serde_json::Value;

use crate::client::Client;
use crate::error::{ClientError, Result};

/// Lazy, single-pass walk over a link-paginated listing.
///
/// Each [`next_page`](Paginator::next_page) call performs exactly one fetch
/// and follows the `rel="next"` URL the server handed back with the previous
/// page. The walk ends when a response carries no next-link; that is the
/// only termination condition at this layer, callers impose their own caps.
///
/// Consuming the walk advances server-side cursor state, so there is no
/// rewinding; resuming after an interruption means constructing a new
/// paginator with an explicit `max_id` cursor.
pub struct Paginator<'a> {
    client: &'a mut Client,
    next: Option<String>,
    params: Vec<(&'static str, String)>,
    pages_served: u64,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(
        client: &'a mut Client,
        path: &str,
        params: Vec<(&'static str, String)>,
        resume: Option<&str>,
    ) -> Self {
        let mut url = client.api_url(path);
        if let Some(cursor) = resume {
            // The resume cursor is an upper bound: first page starts just
            // below it instead of at the newest record.
            url.push_str(&format!("?max_id={cursor}"));
        }

        Self {
            client,
            next: Some(url),
            params,
            pages_served: 0,
        }
    }

    /// Fetches and returns the next page, or `None` once the server stopped
    /// offering a next-link. A page body that is not an array fails with
    /// [`ClientError::UnexpectedShape`] and ends the walk.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        // Explicit params only apply to the first request; next-links carry
        // their full query string already.
        let params = std::mem::take(&mut self.params);
        let envelope = self.client.fetch_url(&url, &params).await?;
        self.next = envelope.next;
        self.pages_served += 1;
        debug!(
            "Page {} fetched, next link {}",
            self.pages_served,
            self.next.as_deref().unwrap_or("absent")
        );

        match envelope.body {
            Value::Array(items) => Ok(Some(items)),
            _ => Err(ClientError::UnexpectedShape {
                expected: "listing array",
            }),
        }
    }

    /// Number of pages already handed out.
    #[must_use]
    pub fn pages_served(&self) -> u64 {
        self.pages_served
    }
}
