//! Minimal Reddit JSON API client: newest posts of a subreddit and the comment
//! tree under each post.

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::RedditConfig;
use crate::TARGET_WEB_REQUEST;

const PUBLIC_BASE_URL: &str = "https://www.reddit.com";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const ACCESS_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const PERMALINK_HOST: &str = "https://reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_LISTING_LIMIT: u32 = 100;

/// Minimum spacing between requests; the public API allows far fewer calls than OAuth.
pub const PUBLIC_REQUEST_PAUSE: Duration = Duration::from_secs(6);
pub const OAUTH_REQUEST_PAUSE: Duration = Duration::from_secs(1);
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(120);
pub const MAX_RETRIES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData<T> {
    pub children: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct PostThing {
    pub data: PostData,
}

#[derive(Debug, Deserialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(CommentData),
    /// "Load more comments" stub; never expanded.
    #[serde(rename = "more")]
    More(IgnoredAny),
}

#[derive(Debug, Deserialize)]
pub struct CommentData {
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    pub permalink: String,
    #[serde(default)]
    pub replies: Option<Replies>,
}

/// Reddit sends `""` instead of an empty listing for comments without replies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Replies {
    Listing(Listing<CommentThing>),
    Empty(IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

pub fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{}{}", PERMALINK_HOST, permalink)
    }
}

pub fn posts_from_listing(listing: Listing<PostThing>) -> Vec<Post> {
    listing
        .data
        .children
        .into_iter()
        .map(|thing| Post {
            id: thing.data.id,
            title: thing.data.title,
            selftext: thing.data.selftext,
            permalink: absolute_permalink(&thing.data.permalink),
        })
        .collect()
}

/// Flattens a comment tree depth-first, parents before their replies.
pub fn flatten_comments(things: Vec<CommentThing>) -> Vec<Comment> {
    let mut comments = Vec::new();
    collect_comments(things, &mut comments);
    comments
}

fn collect_comments(things: Vec<CommentThing>, out: &mut Vec<Comment>) {
    for thing in things {
        let CommentThing::Comment(data) = thing else {
            continue;
        };

        out.push(Comment {
            author: data.author.unwrap_or_else(|| "[deleted]".to_string()),
            body: data.body,
            permalink: absolute_permalink(&data.permalink),
        });

        if let Some(Replies::Listing(listing)) = data.replies {
            collect_comments(listing.data.children, out);
        }
    }
}

pub struct RedditClient {
    http: reqwest::Client,
    base_url: &'static str,
    access_token: Option<String>,
    request_pause: Duration,
    last_request: Mutex<Option<Instant>>,
}

/// How long to wait before retrying a rate-limited request, or `None` to give up.
///
/// Only 429 is retried. `Retry-After` (seconds) wins, then Reddit's
/// `x-ratelimit-reset`, then an exponential backoff from [`RETRY_DELAY`].
/// Waits are capped at [`MAX_RETRY_WAIT`].
pub fn retry_delay(status: StatusCode, headers: &HeaderMap, attempt: usize) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS || attempt >= MAX_RETRIES {
        return None;
    }

    let header_secs = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
    };

    let delay = header_secs(header::RETRY_AFTER.as_str())
        .or_else(|| header_secs("x-ratelimit-reset"))
        .map(|secs| Duration::from_secs_f64(secs.ceil()))
        .unwrap_or_else(|| RETRY_DELAY * 2u32.pow(attempt as u32));

    Some(delay.min(MAX_RETRY_WAIT))
}

impl RedditClient {
    /// Builds the HTTP client and, if credentials are configured, obtains an
    /// application-only OAuth token. Without credentials the public JSON
    /// endpoints are used.
    pub async fn connect(config: &RedditConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let Some((client_id, client_secret)) = config.credentials() else {
            info!(target: TARGET_WEB_REQUEST, "No Reddit credentials configured, using public API");
            return Ok(Self {
                http,
                base_url: PUBLIC_BASE_URL,
                access_token: None,
                request_pause: PUBLIC_REQUEST_PAUSE,
                last_request: Mutex::new(None),
            });
        };

        let token: AccessToken = http
            .post(ACCESS_TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Reddit token request failed")?
            .error_for_status()
            .context("Reddit rejected the client credentials")?
            .json()
            .await
            .context("Invalid Reddit token response")?;

        info!(target: TARGET_WEB_REQUEST, "Authenticated with Reddit OAuth");
        Ok(Self {
            http,
            base_url: OAUTH_BASE_URL,
            access_token: Some(token.access_token),
            request_pause: OAUTH_REQUEST_PAUSE,
            last_request: Mutex::new(None),
        })
    }

    /// Sleeps until `request_pause` has passed since the previous request.
    async fn pace(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.request_pause {
                sleep(self.request_pause - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt = 0;
        let response = loop {
            self.pace().await;
            debug!(target: TARGET_WEB_REQUEST, "GET {} {:?}", url, query);

            let mut request = self
                .http
                .get(&url)
                .query(query)
                .header(header::ACCEPT, "application/json");
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Request to {} failed", url))?;

            match retry_delay(response.status(), response.headers(), attempt) {
                Some(delay) => {
                    attempt += 1;
                    warn!(
                        target: TARGET_WEB_REQUEST,
                        "Rate limited by {}, retrying in {:?} ({}/{})",
                        url, delay, attempt, MAX_RETRIES
                    );
                    sleep(delay).await;
                }
                None => break response,
            }
        };

        response
            .error_for_status()
            .with_context(|| format!("Request to {} returned an error status", url))?
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }

    pub async fn new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>> {
        let query = [
            ("limit", limit.min(MAX_LISTING_LIMIT).to_string()),
            ("raw_json", "1".to_string()),
        ];
        let listing: Listing<PostThing> = self
            .get_json(&format!("/r/{}/new.json", subreddit), &query)
            .await?;

        let posts = posts_from_listing(listing);
        info!(target: TARGET_WEB_REQUEST, "Fetched {} posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    /// Every loaded comment under `post`, flattened.
    pub async fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
        let query = [("raw_json", "1".to_string())];
        let (_post, thread): (IgnoredAny, Listing<CommentThing>) = self
            .get_json(&format!("/comments/{}.json", post.id), &query)
            .await?;

        let comments = flatten_comments(thread.data.children);
        debug!(target: TARGET_WEB_REQUEST, "Fetched {} comments for post {}", comments.len(), post.id);
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_listing() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_abc",
                "children": [
                    {"kind": "t3", "data": {"id": "abc", "title": "Queens II",
                        "selftext": "Program: MD", "permalink": "/r/premed/comments/abc/queens_ii/",
                        "score": 12}},
                    {"kind": "t3", "data": {"id": "def", "title": "Link post",
                        "permalink": "/r/premed/comments/def/link_post/"}}
                ]
            }
        }"#;
        let listing: Listing<PostThing> = serde_json::from_str(json).unwrap();
        let posts = posts_from_listing(listing);

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "abc");
        assert_eq!(posts[0].selftext, "Program: MD");
        assert_eq!(posts[0].permalink, "https://reddit.com/r/premed/comments/abc/queens_ii/");
        assert_eq!(posts[1].selftext, "");
    }

    #[test]
    fn test_comment_tree_flattened_depth_first() {
        let json = r#"[
            {"kind": "Listing", "data": {"children": []}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"author": "a", "body": "first", "permalink": "/c/1/",
                    "replies": {"kind": "Listing", "data": {"children": [
                        {"kind": "t1", "data": {"author": "b", "body": "reply", "permalink": "/c/2/", "replies": ""}},
                        {"kind": "more", "data": {"count": 4, "children": ["x", "y"]}}
                    ]}}}},
                {"kind": "t1", "data": {"author": null, "body": "[removed]", "permalink": "/c/3/", "replies": ""}},
                {"kind": "more", "data": {"count": 10}}
            ]}}
        ]"#;
        let (_post, thread): (IgnoredAny, Listing<CommentThing>) = serde_json::from_str(json).unwrap();
        let comments = flatten_comments(thread.data.children);

        let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "reply", "[removed]"]);
        assert_eq!(comments[1].author, "b");
        assert_eq!(comments[2].author, "[deleted]");
        assert_eq!(comments[0].permalink, "https://reddit.com/c/1/");
    }

    #[test]
    fn test_retry_only_on_too_many_requests() {
        let headers = HeaderMap::new();
        assert_eq!(retry_delay(StatusCode::OK, &headers, 0), None);
        assert_eq!(retry_delay(StatusCode::FORBIDDEN, &headers, 0), None);
        assert_eq!(retry_delay(StatusCode::INTERNAL_SERVER_ERROR, &headers, 0), None);
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, MAX_RETRIES),
            None
        );
    }

    #[test]
    fn test_retry_honours_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, "7".parse().unwrap());
        headers.insert("x-ratelimit-reset", "40".parse().unwrap());
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 0),
            Some(Duration::from_secs(7))
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", "12.4".parse().unwrap());
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 1),
            Some(Duration::from_secs(13))
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, "3600".parse().unwrap());
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 0),
            Some(MAX_RETRY_WAIT)
        );
    }

    #[test]
    fn test_retry_backoff_without_headers() {
        let headers = HeaderMap::new();
        assert_eq!(retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 0), Some(RETRY_DELAY));
        assert_eq!(retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 1), Some(RETRY_DELAY * 2));
        assert_eq!(retry_delay(StatusCode::TOO_MANY_REQUESTS, &headers, 2), Some(RETRY_DELAY * 4));
    }

    #[test]
    fn test_absolute_permalink_keeps_full_urls() {
        assert_eq!(
            absolute_permalink("https://www.reddit.com/r/premed/"),
            "https://www.reddit.com/r/premed/"
        );
    }
}
