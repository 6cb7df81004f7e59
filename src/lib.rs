//! Client library for pulling public data out of the Truth Social REST API.
//!
//! The crate is built around a single stateful [`Client`] that owns the HTTP
//! pool, the credential and bearer-token state and the observed rate-limit
//! window. On top of it sit a link-header [`Paginator`], a reverse
//! chronological [`StatusWalker`] and a set of one-call operations for
//! lookups, searches, follower listings, likes, comments and group
//! timelines.
//!
//! ```no_run
//! use truthpull::{Client, Credentials, TimelineOptions};
//!
//! # async fn run() -> truthpull::Result<()> {
//! let mut client = Client::new(Credentials::from_env())?;
//! let (posts, failure) = client
//!     .pull_statuses("someuser", TimelineOptions::default())
//!     .await;
//! println!("pulled {} posts", posts.len());
//! if let Some(err) = failure {
//!     eprintln!("walk ended early: {err}");
//! }
//! # Ok(())
//! # }
//! ```
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod ratelimit;
pub mod timeline;
pub mod transport;

pub use client::{Client, SearchType, BASE_URL};
pub use config::{Credentials, ProxySettings};
pub use error::{ClientError, Result};
pub use pagination::Paginator;
pub use ratelimit::RateLimit;
pub use timeline::{StatusWalker, TimelineOptions};
