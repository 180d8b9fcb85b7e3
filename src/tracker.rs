//! The end-to-end run: fetch posts and comments, extract fields, write the report.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::extract::ExtractionStrategy;
use crate::reddit::RedditClient;
use crate::report::{render_report, write_report, Entry, ReportOptions};
use crate::{TARGET_EXTRACT, TARGET_WEB_REQUEST};

/// Case-insensitive substring test against any keyword.
pub fn mentions_keyword(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
}

/// Runs `strategy` over one body and wraps a hit in an [`Entry`].
pub async fn extract_entry(
    strategy: &ExtractionStrategy,
    text: &str,
    source: String,
    permalink: &str,
) -> Option<Entry> {
    match strategy.extract(text).await {
        Some(extraction) => Some(Entry {
            source,
            permalink: permalink.to_string(),
            extraction,
        }),
        None => {
            debug!(target: TARGET_EXTRACT, "No fields extracted for {} ({})", source, permalink);
            None
        }
    }
}

/// Collects entries from the newest posts of the configured subreddit and writes
/// the HTML report. Returns the number of entries written.
pub async fn run(config: &Config) -> Result<usize> {
    let strategy = config.build_strategy()?;
    info!("Using {} extraction", strategy.mode());

    let client = RedditClient::connect(&config.reddit).await?;
    let posts = client.new_posts(&config.subreddit, config.post_limit).await?;

    let mut entries = Vec::new();
    for post in &posts {
        if mentions_keyword(&post.selftext, &config.keywords) {
            info!("Processing post: {}", post.title);
            if let Some(entry) = extract_entry(
                &strategy,
                &post.selftext,
                format!("Post: {}", post.title),
                &post.permalink,
            )
            .await
            {
                entries.push(entry);
            }
        }

        let comments = match client.comments(post).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(target: TARGET_WEB_REQUEST, "Skipping comments for {}: {:#}", post.permalink, e);
                continue;
            }
        };

        for comment in comments
            .iter()
            .filter(|comment| mentions_keyword(&comment.body, &config.keywords))
        {
            info!("Processing comment by {}", comment.author);
            if let Some(entry) = extract_entry(
                &strategy,
                &comment.body,
                format!("Comment in post: {}", post.title),
                &comment.permalink,
            )
            .await
            {
                entries.push(entry);
            }
        }
    }

    let html = render_report(
        &entries,
        &ReportOptions {
            subreddit: &config.subreddit,
        },
        Utc::now(),
    );
    write_report(&config.output_path, &html)?;

    info!(
        "Generated {} with {} entries found.",
        config.output_path.display(),
        entries.len()
    );
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn keywords() -> Vec<String> {
        vec!["interview".to_string(), "invite".to_string()]
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        assert!(mentions_keyword("Got an INTERVIEW at Mac!", &keywords()));
        assert!(mentions_keyword("invited to Queens", &keywords()));
        assert!(!mentions_keyword("MCAT study schedule", &keywords()));
        assert!(!mentions_keyword("", &keywords()));
    }

    #[test]
    fn test_blank_keywords_never_match() {
        assert!(!mentions_keyword("anything", &["".to_string()]));
    }

    #[tokio::test]
    async fn test_extract_entry_keeps_source_and_link() {
        let entry = extract_entry(
            &ExtractionStrategy::Lenient,
            "Interview invite!\nProgram: MD\nGeography: IP",
            "Post: UofT".to_string(),
            "https://reddit.com/r/premed/comments/abc/",
        )
        .await
        .unwrap();

        assert_eq!(entry.source, "Post: UofT");
        assert_eq!(entry.permalink, "https://reddit.com/r/premed/comments/abc/");
        assert_eq!(entry.extraction.get(Field::Geography), Some("IP"));
    }

    #[tokio::test]
    async fn test_extract_entry_skips_non_matching_text() {
        let entry = extract_entry(
            &ExtractionStrategy::Strict,
            "Got my interview invite, no stats sorry",
            "Post: x".to_string(),
            "https://reddit.com/x",
        )
        .await;
        assert!(entry.is_none());
    }
}
