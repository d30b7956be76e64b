use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::cancel::CancelToken;
use crate::news_utils::text;
use crate::types::{AggregatorError, FetchConfig, ProviderTag, Result};

/// Thin JSON-over-HTTP client shared by the provider clients.
///
/// Does one GET per call; retrying is the caller's business.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }

    /// `base` + `path` with `params` appended as query pairs.
    pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
        let mut url = Url::parse(&joined)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// 429 maps to [`AggregatorError::RateLimited`], every other non-2xx to
    /// [`AggregatorError::Status`].
    pub async fn get_json<T>(&self, provider: ProviderTag, url: Url, cancel: &CancelToken) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let start_time = Instant::now();
        // Query strings carry API keys, only the path goes to the logs.
        let path = url.path().to_string();
        debug!(%provider, "Fetching {}", path);

        let response = cancel.run(async { Ok::<_, AggregatorError>(self.client.get(url).send().await?) }).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%provider, "Rate limited on {}", path);
            return Err(AggregatorError::RateLimited { provider });
        }

        let body = cancel.run(async { Ok::<_, AggregatorError>(response.text().await?) }).await?;

        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            return Err(AggregatorError::Status {
                provider,
                status: status.as_u16(),
                message: text::truncate(&message, 200),
            });
        }

        info!(
            %provider,
            "Fetched {} ({} bytes in {}ms)",
            path,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(serde_json::from_str(&body)?)
    }
}

/// Providers put their error text under `message` (NewsAPI, Guardian) or
/// `fault.faultstring` (NYT).
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("response").and_then(|r| r.get("message")))
        .or_else(|| value.get("fault").and_then(|f| f.get("faultstring")))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
