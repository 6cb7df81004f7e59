use anyhow::Result;
use clap::Parser;
use serde_json::Value;

use truthpull::cli::{Cli, Commands};
use truthpull::{Client, Credentials, TimelineOptions};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder().format_timestamp(None).init();

    let args = Cli::parse();
    let mut client = Client::new(Credentials::from_env())?;

    match args.mode {
        Commands::User { handle } => {
            print_record(&client.lookup(&handle).await?)?;
        }
        Commands::Statuses {
            username,
            replies,
            pinned,
            created_after,
            since_id,
        } => {
            let options = TimelineOptions {
                replies,
                pinned,
                created_after,
                since_id,
            };
            // Posts pulled before a mid-walk failure still reach stdout.
            let (posts, failure) = client.pull_statuses(&username, options).await;
            print_lines(&posts)?;
            if let Some(err) = failure {
                return Err(err.into());
            }
        }
        Commands::Search {
            query,
            searchtype,
            limit,
            resolve,
            max_pages,
        } => {
            let pages = client
                .search(searchtype, &query, limit, resolve, max_pages)
                .await?;
            print_lines(&pages)?;
        }
        Commands::Followers {
            handle,
            maximum,
            resume,
        } => {
            let followers = client
                .user_followers(&handle, maximum, resume.as_deref())
                .await?;
            print_lines(&followers)?;
        }
        Commands::Following {
            handle,
            maximum,
            resume,
        } => {
            let following = client
                .user_following(&handle, maximum, resume.as_deref())
                .await?;
            print_lines(&following)?;
        }
        Commands::Likes { post, maximum } => {
            print_lines(&client.user_likes(&post, maximum).await?)?;
        }
        Commands::Comments {
            post,
            maximum,
            onlyfirst,
        } => {
            print_lines(&client.pull_comments(&post, maximum, onlyfirst).await?)?;
        }
        Commands::Groupposts { group_id, limit } => {
            print_lines(&client.group_posts(&group_id, limit).await?)?;
        }
        Commands::Trends { limit } => {
            print_record(&client.trending(limit).await?)?;
        }
        Commands::Tags => {
            print_record(&client.tags().await?)?;
        }
        Commands::Grouptags => {
            print_record(&client.group_tags().await?)?;
        }
        Commands::Grouptrends { limit } => {
            print_record(&client.trending_groups(limit).await?)?;
        }
        Commands::Groupsuggest { maximum } => {
            print_record(&client.suggested_groups(maximum).await?)?;
        }
        Commands::Suggestions { maximum } => {
            print_record(&client.suggested(maximum).await?)?;
        }
        Commands::Ads { device } => {
            print_record(&client.ads(&device).await?)?;
        }
    }

    Ok(())
}

/// One compact JSON document per line, shell-pipeable into `jq`.
fn print_lines(records: &[Value]) -> Result<()> {
    for record in records {
        print_record(record)?;
    }
    Ok(())
}

fn print_record(record: &Value) -> Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}
