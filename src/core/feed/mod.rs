pub mod fetcher;
pub mod parser;
pub mod types;

use async_trait::async_trait;

use fetcher::{fetch_feed_with_retry, FetchError};
use parser::{parse_feed_bytes, FeedParseError};
use types::FeedEntry;

const FETCH_MAX_RETRIES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("feed parse failed: {0}")]
    Parse(#[from] FeedParseError),
}

/// Produces the entries of one poll. Implementations keep no cursor state.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let fetched = fetch_feed_with_retry(&self.client, &self.url, FETCH_MAX_RETRIES).await?;
        let parsed = parse_feed_bytes(&fetched.body)?;
        tracing::debug!(
            url = %self.url,
            feed = %parsed.title,
            entries = parsed.entries.len(),
            "feed fetched"
        );
        Ok(parsed.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    #[tokio::test]
    async fn http_feed_source_reports_unparseable_body_as_parse_error() {
        let app = Router::new().route("/feed.xml", get(|| async { "   " }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });

        let source = HttpFeedSource::new(reqwest::Client::new(), format!("http://{address}/feed.xml"));
        let error = source
            .fetch_entries()
            .await
            .expect_err("blank body must not parse");

        assert!(matches!(error, FeedError::Parse(FeedParseError::EmptyPayload)));
        server_task.abort();
    }
}
