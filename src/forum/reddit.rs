//! Reddit API client
//!
//! Implements the forum boundary over Reddit's OAuth2 API: a password-grant
//! token fetch, subreddit listing reads, and the comment write path.

use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{ForumClient, ForumError};
use crate::model::{RedditCredentials, SortOrder, Thread, TimeWindow};

const AUTH_BASE_URL: &str = "https://www.reddit.com";
const API_BASE_URL: &str = "https://oauth.reddit.com";
const AUTH_BASE_URL_ENV: &str = "REDDIT_AUTH_BASE_URL";
const API_BASE_URL_ENV: &str = "REDDIT_API_BASE_URL";

/// Refresh the token this long before Reddit's reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Thread,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentResponseBody,
}

#[derive(Debug, Deserialize)]
struct CommentResponseBody {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Client for the Reddit API, scoped to one subreddit
pub struct RedditClient {
    client: Client,
    credentials: Option<RedditCredentials>,
    subreddit: String,
    auth_base_url: String,
    api_base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    /// Create a new Reddit client
    ///
    /// Base URLs default to reddit.com / oauth.reddit.com and can be
    /// overridden via `REDDIT_AUTH_BASE_URL` / `REDDIT_API_BASE_URL`.
    pub fn new(
        credentials: Option<RedditCredentials>,
        subreddit: &str,
        user_agent: &str,
    ) -> Self {
        let auth_base_url =
            env::var(AUTH_BASE_URL_ENV).unwrap_or_else(|_| AUTH_BASE_URL.to_string());
        let api_base_url = env::var(API_BASE_URL_ENV).unwrap_or_else(|_| API_BASE_URL.to_string());

        Self {
            client: Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| Client::new()),
            credentials,
            subreddit: subreddit.to_string(),
            auth_base_url,
            api_base_url,
            token: Mutex::new(None),
        }
    }

    /// Get a valid access token, fetching a new one if the cached token is
    /// missing or about to expire
    async fn access_token(&self) -> Result<String, ForumError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ForumError::Auth("Reddit credentials not configured".to_string()))?;

        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        tracing::debug!(subreddit = %self.subreddit, "Requesting new Reddit access token");

        let url = format!("{}/api/v1/access_token", self.auth_base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForumError::Auth(format!(
                "token request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ForumError::Parse(format!("failed to deserialize token: {}", e)))?;

        let expires_in = Duration::from_secs(parsed.expires_in);
        let expires_at = Instant::now() + expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at,
        });

        tracing::info!(subreddit = %self.subreddit, "Reddit access token refreshed");

        Ok(parsed.access_token)
    }

    /// Build the listing path for a sort order. Only `top` takes the time
    /// window parameter.
    fn listing_path(&self, sort: SortOrder, window: TimeWindow, limit: u32) -> String {
        match sort {
            SortOrder::Top => format!(
                "/r/{}/top.json?limit={}&t={}&raw_json=1",
                self.subreddit,
                limit,
                window.as_str()
            ),
            other => format!(
                "/r/{}/{}.json?limit={}&raw_json=1",
                self.subreddit,
                other.as_str(),
                limit
            ),
        }
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    async fn fetch(
        &self,
        sort: SortOrder,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Thread>, ForumError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_base_url, self.listing_path(sort, window, limit));

        tracing::debug!(sort = %sort.as_str(), window = %window.as_str(), limit = limit, url = %url, "Fetching subreddit listing");

        let response = self.client.get(&url).bearer_auth(&token).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ForumError::Auth(format!(
                "listing request rejected with status {}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForumError::Parse(format!(
                "unexpected status {}: {}",
                status, body
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| ForumError::Parse(format!("failed to deserialize listing: {}", e)))?;

        let threads: Vec<Thread> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect();

        tracing::debug!(
            sort = %sort.as_str(),
            thread_count = threads.len(),
            "Fetched subreddit listing"
        );

        Ok(threads)
    }

    async fn reply(&self, thread_id: &str, text: &str) -> Result<(), ForumError> {
        let token = self.access_token().await?;
        let url = format!("{}/api/comment", self.api_base_url);

        tracing::debug!(thread = %thread_id, "Posting reply");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .form(&[
                ("api_type", "json"),
                ("thing_id", &format!("t3_{}", thread_id)),
                ("text", text),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ForumError::Auth(format!(
                "reply rejected with status {}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForumError::Rejected(format!(
                "unexpected status {}: {}",
                status, body
            )));
        }

        // Reddit reports comment failures (e.g. rate limits) as a 200 with
        // an errors array in the body.
        let parsed: CommentResponse = response
            .json()
            .await
            .map_err(|e| ForumError::Parse(format!("failed to deserialize reply result: {}", e)))?;

        if !parsed.json.errors.is_empty() {
            return Err(ForumError::Rejected(format!(
                "{:?}",
                parsed.json.errors
            )));
        }

        tracing::info!(thread = %thread_id, "Reply posted");

        Ok(())
    }
}
