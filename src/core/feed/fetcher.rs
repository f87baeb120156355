use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(_) => true,
            FetchError::HttpStatus(code) => *code >= 500,
        }
    }
}

pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<FetchedFeed, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let body = response.bytes().await?.to_vec();

    Ok(FetchedFeed { body })
}

pub async fn fetch_feed_with_retry(
    client: &reqwest::Client,
    url: &str,
    max_retries: usize,
) -> Result<FetchedFeed, FetchError> {
    let mut attempt = 0_usize;
    loop {
        match fetch_feed(client, url).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::debug!(%url, attempt, error = %err, "retrying feed fetch");
                tokio::time::sleep(Duration::from_millis(40 * attempt as u64)).await;
            }
        }
    }
}
