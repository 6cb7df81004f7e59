//! The API client and the thin operation layer composed on top of the
//! transport, paginator and timeline walker.
use clap::ArgEnum;
use log::debug;
use serde_json::Value;

use crate::config::{Credentials, ProxySettings};
use crate::error::{ClientError, Result};
use crate::pagination::Paginator;
use crate::ratelimit::RateLimit;
use crate::timeline::{StatusWalker, TimelineOptions};
use crate::transport::USER_AGENT;

/// Production host. Tests point the client elsewhere with
/// [`Client::with_base_url`].
pub const BASE_URL: &str = "https://truthsocial.com";

/// Offset step used by the search endpoint's offset pagination.
const SEARCH_PAGE_SIZE: u32 = 40;

/// Page size requested when listing the users who liked a post.
const LIKES_PAGE_LIMIT: u32 = 80;

/// Categories understood by the search endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum)]
pub enum SearchType {
    Accounts,
    Statuses,
    Hashtags,
    Groups,
}

impl SearchType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Statuses => "statuses",
            Self::Hashtags => "hashtags",
            Self::Groups => "groups",
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateful API client: owns the HTTP connection pool, the credential/token
/// state and the rate-limit window.
///
/// All state-touching methods take `&mut self`; a single instance is meant
/// for one sequential flow of calls. Concurrent pulls run one client each.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: Option<String>,
    ratelimit: RateLimit,
}

impl Client {
    /// Builds a client with the fixed browser identity and any proxies from
    /// the environment. Credentials are captured once here; a token in the
    /// credentials is cached immediately.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_proxies(credentials, ProxySettings::from_env())
    }

    pub fn with_proxies(credentials: Credentials, proxies: ProxySettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(url) = &proxies.http {
            builder = builder.proxy(reqwest::Proxy::http(url)?);
        }
        if let Some(url) = &proxies.https {
            builder = builder.proxy(reqwest::Proxy::https(url)?);
        }

        let token = credentials.token.clone();
        Ok(Self {
            http: builder.build()?,
            base_url: BASE_URL.to_string(),
            credentials,
            token,
            ratelimit: RateLimit::default(),
        })
    }

    /// Overrides the upstream host, mainly for tests against a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Last observed rate-limit window.
    #[must_use]
    pub fn rate_limit(&self) -> &RateLimit {
        &self.ratelimit
    }

    pub(crate) fn rate_limit_mut(&mut self) -> &mut RateLimit {
        &mut self.ratelimit
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn cache_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Looks up a user's account record by handle.
    pub async fn lookup(&mut self, handle: &str) -> Result<Value> {
        let envelope = self
            .fetch("/v1/accounts/lookup", &[("acct", handle.to_string())])
            .await?;
        Ok(envelope.body)
    }

    /// Starts a link-header page walk over an API path. The sequence is
    /// lazy and single-pass; restart by calling this again with an explicit
    /// resume cursor.
    pub fn paginate<'a>(
        &'a mut self,
        path: &str,
        params: Vec<(&'static str, String)>,
        resume: Option<&str>,
    ) -> Paginator<'a> {
        Paginator::new(self, path, params, resume)
    }

    /// Starts a timeline walk over a user's statuses. Prefer
    /// [`pull_statuses`](Self::pull_statuses) unless page-by-page control is
    /// needed.
    pub fn status_walker<'a>(
        &'a mut self,
        user_id: &str,
        options: TimelineOptions,
    ) -> StatusWalker<'a> {
        StatusWalker::new(self, user_id, options)
    }

    /// Pulls a user's statuses in reverse chronological order, honoring the
    /// boundaries in `options`. Each returned post carries an added
    /// `_pulled` timestamp marking local retrieval time.
    ///
    /// A failure mid-walk ends the pull early but never discards pages that
    /// already arrived: the posts collected so far come back together with
    /// the error that stopped the walk.
    pub async fn pull_statuses(
        &mut self,
        handle: &str,
        options: TimelineOptions,
    ) -> (Vec<Value>, Option<ClientError>) {
        let user_id = match self.resolve_user_id(handle).await {
            Ok(id) => id,
            Err(err) => return (Vec::new(), Some(err)),
        };
        let mut walker = self.status_walker(&user_id, options);

        let mut statuses = Vec::new();
        loop {
            match walker.next_page().await {
                Ok(Some(page)) => statuses.extend(page),
                Ok(None) => return (statuses, None),
                Err(err) => return (statuses, Some(err)),
            }
        }
    }

    /// Searches one category, paging by offset until the server returns a
    /// response whose category arrays are all empty, or `max_pages` is hit.
    /// Returns the raw per-page result objects.
    pub async fn search(
        &mut self,
        kind: SearchType,
        query: &str,
        limit: u32,
        resolve: bool,
        max_pages: u32,
    ) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        let mut offset = 0;

        for _ in 0..max_pages {
            let params = [
                ("q", query.to_string()),
                ("resolve", resolve.to_string()),
                ("limit", limit.to_string()),
                ("type", kind.as_str().to_string()),
                ("offset", offset.to_string()),
                ("min_id", "0".to_string()),
            ];
            let envelope = self.fetch("/v2/search", &params).await?;

            let Value::Object(categories) = &envelope.body else {
                return Err(ClientError::UnexpectedShape {
                    expected: "search result object",
                });
            };
            // Exhaustion means every category is literally an empty array;
            // scalar metadata fields keep the walk alive.
            let exhausted = categories
                .values()
                .all(|v| matches!(v, Value::Array(items) if items.is_empty()));
            if exhausted {
                break;
            }

            pages.push(envelope.body);
            offset += SEARCH_PAGE_SIZE;
        }

        Ok(pages)
    }

    /// Lists a user's followers, newest first, up to `maximum` entries.
    /// `resume` is a `max_id` cursor from a previous, interrupted listing.
    pub async fn user_followers(
        &mut self,
        handle: &str,
        maximum: usize,
        resume: Option<&str>,
    ) -> Result<Vec<Value>> {
        let user_id = self.resolve_user_id(handle).await?;
        let path = format!("/v1/accounts/{user_id}/followers");
        self.capped_listing(&path, Vec::new(), maximum, resume).await
    }

    /// Lists the users a given user follows, up to `maximum` entries.
    pub async fn user_following(
        &mut self,
        handle: &str,
        maximum: usize,
        resume: Option<&str>,
    ) -> Result<Vec<Value>> {
        let user_id = self.resolve_user_id(handle).await?;
        let path = format!("/v1/accounts/{user_id}/following");
        self.capped_listing(&path, Vec::new(), maximum, resume).await
    }

    /// Lists the most recent users who liked a post, up to `maximum`.
    /// Accepts a bare status id or a full status URL.
    pub async fn user_likes(&mut self, post: &str, maximum: usize) -> Result<Vec<Value>> {
        let post_id = last_path_segment(post);
        let path = format!("/v1/statuses/{post_id}/favourited_by");
        let params = vec![("limit", LIKES_PAGE_LIMIT.to_string())];
        self.capped_listing(&path, params, maximum, None).await
    }

    /// Lists replies to a post, oldest first, up to `maximum`. With
    /// `only_first`, keeps only direct replies to the post itself.
    pub async fn pull_comments(
        &mut self,
        post: &str,
        maximum: usize,
        only_first: bool,
    ) -> Result<Vec<Value>> {
        let post_id = last_path_segment(post).to_string();
        let path = format!("/v1/statuses/{post_id}/context/descendants");
        let params = vec![("sort", "oldest".to_string())];

        let mut comments = Vec::new();
        let mut pager = self.paginate(&path, params, None);
        'pages: while let Some(page) = pager.next_page().await? {
            for comment in page {
                if only_first
                    && comment.get("in_reply_to_id").and_then(Value::as_str) != Some(&post_id)
                {
                    continue;
                }
                comments.push(comment);
                if comments.len() >= maximum {
                    break 'pages;
                }
            }
        }
        Ok(comments)
    }

    /// Accumulates a group timeline by `max_id` cursor until `target` posts
    /// were collected or the server runs out.
    pub async fn group_posts(&mut self, group_id: &str, target: usize) -> Result<Vec<Value>> {
        let path = format!("/v1/timelines/group/{group_id}");
        let mut timeline: Vec<Value> = Vec::new();
        let mut max_id: Option<String> = None;

        while timeline.len() < target {
            let want = target - timeline.len();
            let mut params = vec![("limit", want.to_string())];
            if let Some(id) = &max_id {
                params.push(("max_id", id.clone()));
            }

            let envelope = self.fetch(&path, &params).await?;
            let Value::Array(posts) = envelope.body else {
                return Err(ClientError::UnexpectedShape {
                    expected: "group timeline array",
                });
            };
            if posts.is_empty() {
                break;
            }

            max_id = posts
                .last()
                .and_then(|p| p.get("id"))
                .and_then(Value::as_str)
                .map(String::from);
            timeline.extend(posts);

            if max_id.is_none() {
                // No cursor to continue from; stop rather than loop on page one.
                break;
            }
        }

        Ok(timeline)
    }

    /// Returns trending statuses. `limit` caps the count (upstream max 20).
    pub async fn trending(&mut self, limit: u32) -> Result<Value> {
        let envelope = self
            .fetch("/v1/truth/trending/truths", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.body)
    }

    /// Returns trending tags.
    pub async fn tags(&mut self) -> Result<Value> {
        Ok(self.fetch("/v1/trends", &[]).await?.body)
    }

    /// Returns trending groups.
    pub async fn trending_groups(&mut self, limit: u32) -> Result<Value> {
        let envelope = self
            .fetch("/v1/truth/trends/groups", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.body)
    }

    /// Returns trending group tags.
    pub async fn group_tags(&mut self) -> Result<Value> {
        Ok(self.fetch("/v1/groups/tags", &[]).await?.body)
    }

    /// Returns suggested users to follow.
    pub async fn suggested(&mut self, maximum: u32) -> Result<Value> {
        let envelope = self
            .fetch("/v2/suggestions", &[("limit", maximum.to_string())])
            .await?;
        Ok(envelope.body)
    }

    /// Returns suggested groups to follow.
    pub async fn suggested_groups(&mut self, maximum: u32) -> Result<Value> {
        let envelope = self
            .fetch(
                "/v1/truth/suggestions/groups",
                &[("limit", maximum.to_string())],
            )
            .await?;
        Ok(envelope.body)
    }

    /// Returns the ad inventory served for the given device class.
    pub async fn ads(&mut self, device: &str) -> Result<Value> {
        let envelope = self
            .fetch("/v3/truth/ads", &[("device", device.to_string())])
            .await?;
        Ok(envelope.body)
    }

    async fn resolve_user_id(&mut self, handle: &str) -> Result<String> {
        let account = self.lookup(handle).await?;
        account
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or(ClientError::UnexpectedShape {
                expected: "account object with an id",
            })
    }

    async fn capped_listing(
        &mut self,
        path: &str,
        params: Vec<(&'static str, String)>,
        maximum: usize,
        resume: Option<&str>,
    ) -> Result<Vec<Value>> {
        if maximum == 0 {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        let mut pager = Paginator::new(self, path, params, resume);
        'pages: while let Some(page) = pager.next_page().await? {
            for item in page {
                items.push(item);
                if items.len() >= maximum {
                    debug!("Reached listing cap of {maximum} on {path}");
                    break 'pages;
                }
            }
        }
        Ok(items)
    }
}

/// `https://host/@user/posts/123` and `123` both mean status id `123`.
fn last_path_segment(post: &str) -> &str {
    post.rsplit('/').next().unwrap_or(post)
}
