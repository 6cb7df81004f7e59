//! Command-line surface. Thin by design: argument shaping only, all behavior
//! lives in the client.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};

use crate::client::SearchType;

#[derive(Parser, Debug)]
#[clap(name = "truthpull", author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub mode: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull a user's metadata
    User {
        handle: String,
    },

    /// Pull a user's statuses
    Statuses {
        username: String,

        /// Include replies when pulling posts
        #[clap(long)]
        replies: bool,

        /// Only pull pinned posts
        #[clap(long)]
        pinned: bool,

        /// Only pull posts created strictly after this datetime, e.g.
        /// 2021-10-02 or 2011-11-04T00:05:23+04:00. UTC is assumed when no
        /// timezone is given.
        #[clap(long, value_parser = parse_created_after, value_name = "DATETIME")]
        created_after: Option<DateTime<Utc>>,

        /// Only pull posts with ids strictly greater than this
        #[clap(long, value_name = "ID")]
        since_id: Option<String>,
    },

    /// Search for users, statuses, groups, or hashtags
    Search {
        query: String,

        /// Category to search
        #[clap(long, arg_enum, ignore_case = true, default_value_t = SearchType::Accounts)]
        searchtype: SearchType,

        /// Page size requested from the server
        #[clap(long, default_value_t = 40)]
        limit: u32,

        /// Attempt to resolve non-local accounts
        #[clap(long)]
        resolve: bool,

        /// Stop after this many result pages
        #[clap(long, default_value_t = 25, value_name = "PAGES")]
        max_pages: u32,
    },

    /// Pull a user's followers
    Followers {
        handle: String,

        /// Maximum number of followers to pull
        #[clap(long, default_value_t = 1000)]
        maximum: usize,

        /// `max_id` cursor to resume from (pull this from logs to resume a
        /// failed or stalled export)
        #[clap(long, value_name = "CURSOR")]
        resume: Option<String>,
    },

    /// Pull the users a given user follows
    Following {
        handle: String,

        /// Maximum number of followed users to pull
        #[clap(long, default_value_t = 1000)]
        maximum: usize,

        /// `max_id` cursor to resume from
        #[clap(long, value_name = "CURSOR")]
        resume: Option<String>,
    },

    /// Pull the most recent users who liked a post
    Likes {
        post: String,

        /// Maximum number of users to pull
        #[clap(long, default_value_t = 40)]
        maximum: usize,
    },

    /// Pull the oldest comments on a post
    Comments {
        post: String,

        /// Maximum number of comments to pull
        #[clap(long, default_value_t = 40)]
        maximum: usize,

        /// Return only direct replies to the post
        #[clap(long)]
        onlyfirst: bool,
    },

    /// Pull posts from a group timeline
    Groupposts {
        group_id: String,

        /// Limit the number of items returned
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },

    /// Pull trendy truths
    Trends {
        #[clap(long, default_value_t = 10)]
        limit: u32,
    },

    /// Pull trendy tags
    Tags,

    /// Pull group tags
    Grouptags,

    /// Pull group trends
    Grouptrends {
        #[clap(long, default_value_t = 10)]
        limit: u32,
    },

    /// Pull group suggestions
    Groupsuggest {
        #[clap(long, default_value_t = 50)]
        maximum: u32,
    },

    /// Pull the list of suggested users
    Suggestions {
        #[clap(long, default_value_t = 50)]
        maximum: u32,
    },

    /// Pull ads
    Ads {
        #[clap(long, default_value = "desktop")]
        device: String,
    },
}

/// Accepts a bare date, a naive datetime or a full RFC 3339 datetime.
/// Naive forms are taken as UTC.
pub fn parse_created_after(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(format!(
        "'{value}' is not a date (2021-10-02) or datetime (2011-11-04T00:05:23+04:00)"
    ))
}
