//! HTTP client for the results feed.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::metrics::{FETCHES_TOTAL, FETCH_DURATION};

use super::parse::parse_table;
use super::types::{DataKind, FeedError, RallyClass, TabularResponse};

/// Accept header sent with every request.
const ACCEPT_VALUE: &str = "text/csv,application/json,text/plain,*/*";

/// Fetches one table from the feed.
///
/// Implementations never fail: transport and parse problems come back as a
/// failed [`TabularResponse`]. No retries are performed.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Fetch `kind` for `class`, optionally scoped to one stage.
    async fn fetch(
        &self,
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<&str>,
    ) -> TabularResponse;
}

/// Feed client backed by reqwest.
pub struct HttpFeedClient {
    client: Client,
    config: FeedConfig,
}

impl HttpFeedClient {
    /// Create a client with the configured timeout, user agent and pool size.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| FeedError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the feed URL for one fetch.
    fn build_url(&self, kind: DataKind, class: RallyClass, stage_id: Option<&str>) -> String {
        let mut url = format!(
            "{}?oszt={}&error={}&a={}&ert=ALL&noform=1&csv=1",
            self.config.base_url,
            urlencoding::encode(class.id()),
            urlencoding::encode(&self.config.access_code),
            kind.code()
        );

        if let Some(stage) = stage_id {
            url.push_str(&format!("&s={}", urlencoding::encode(stage)));
        }

        url
    }

    async fn fetch_rows(
        &self,
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<&str>,
    ) -> Result<Vec<Vec<String>>, FeedError> {
        let url = self.build_url(kind, class, stage_id);
        debug!(kind = %kind, class = %class, stage = ?stage_id, "Fetching from feed");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else if e.is_connect() {
                FeedError::ConnectionFailed(e.to_string())
            } else {
                FeedError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let payload = response
            .text()
            .await
            .map_err(|e| FeedError::Transport(format!("failed to read body: {}", e)))?;
        debug!(kind = %kind, bytes = payload.len(), "Feed response received");

        parse_table(&payload)
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<&str>,
    ) -> TabularResponse {
        let start = Instant::now();
        let stage = stage_id.map(str::to_string);

        let response = match self.fetch_rows(kind, class, stage_id).await {
            Ok(rows) => TabularResponse::success(kind, class, stage, rows),
            Err(e) => {
                warn!(kind = %kind, class = %class, stage = ?stage_id, error = %e, "Feed fetch failed");
                TabularResponse::failure(kind, class, stage, e.to_string())
            }
        };

        let result = if response.succeeded() { "success" } else { "failed" };
        FETCHES_TOTAL
            .with_label_values(&[kind.name(), result])
            .inc();
        FETCH_DURATION
            .with_label_values(&[kind.name()])
            .observe(start.elapsed().as_secs_f64());

        response
    }
}
