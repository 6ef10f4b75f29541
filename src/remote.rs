//! Remote quote source.
//!
//! The store pulls batches from the remote on every sync tick and pushes
//! locally created quotes to it. Both directions are fallible and neither
//! blocks local operations.

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::errors::RemoteError;
use crate::quote::Quote;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Candidate quotes to reconcile, ids already assigned by the remote.
    async fn fetch_batch(&self) -> Result<Vec<Quote>, RemoteError>;

    /// Publish one locally created quote.
    async fn push_one(&self, quote: &Quote) -> Result<(), RemoteError>;
}

/// Post shape served by the remote endpoint; only `id` and `title` are used.
#[derive(Debug, Deserialize)]
struct RemotePost {
    id: u64,
    title: String,
}

/// HTTP remote backed by a JSON posts endpoint.
///
/// GET returns an array of posts, the first `limit` of which become quotes
/// in `category`. POST accepts a quote as JSON.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: reqwest::Client,
    url: String,
    limit: usize,
    category: String,
}

impl HttpRemoteSource {
    pub fn new(
        url: &str,
        limit: usize,
        category: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            limit,
            category: category.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        Self::new(
            &config.remote_url,
            config.remote_limit,
            config.remote_category.clone(),
            config.request_timeout,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Map decoded posts to quotes, keeping at most `limit`.
    fn to_quotes(&self, posts: Vec<RemotePost>) -> Vec<Quote> {
        posts
            .into_iter()
            .take(self.limit)
            .map(|post| Quote::new(post.id, post.title, self.category.clone()))
            .collect()
    }

    /// Decode a raw GET body into a batch.
    pub fn decode_batch(&self, body: &str) -> Result<Vec<Quote>, RemoteError> {
        let posts: Vec<RemotePost> = serde_json::from_str(body)?;
        Ok(self.to_quotes(posts))
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_batch(&self) -> Result<Vec<Quote>, RemoteError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::status(status.as_u16(), body));
        }

        let batch = self.decode_batch(&body)?;
        debug!("Fetched {} remote quotes from {}", batch.len(), self.url);
        Ok(batch)
    }

    async fn push_one(&self, quote: &Quote) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(quote)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::status(status.as_u16(), body));
        }

        debug!("Pushed quote {} to {} ({})", quote.id, self.url, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(limit: usize) -> HttpRemoteSource {
        HttpRemoteSource::new(
            "https://example.invalid/posts/",
            limit,
            "Server",
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_batch_maps_title_and_category() {
        let body = r#"[
            {"userId": 1, "id": 1, "title": "first title", "body": "ignored"},
            {"userId": 1, "id": 2, "title": "second title", "body": "ignored"}
        ]"#;

        let batch = source(10).decode_batch(body).unwrap();

        assert_eq!(
            batch,
            vec![
                Quote::new(1, "first title", "Server"),
                Quote::new(2, "second title", "Server"),
            ]
        );
    }

    #[test]
    fn test_decode_batch_truncates_to_limit() {
        let posts: Vec<serde_json::Value> = (1..=25)
            .map(|id| serde_json::json!({"id": id, "title": format!("t{}", id)}))
            .collect();
        let body = serde_json::to_string(&posts).unwrap();

        let batch = source(10).decode_batch(&body).unwrap();

        assert_eq!(batch.len(), 10);
        assert_eq!(batch.last().map(|q| q.id), Some(10));
    }

    #[test]
    fn test_decode_batch_rejects_non_array() {
        let err = source(10).decode_batch(r#"{"error": "down"}"#).unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }

    #[test]
    fn test_url_is_normalized() {
        assert_eq!(source(1).url(), "https://example.invalid/posts");
    }
}
