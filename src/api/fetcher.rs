use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{
  PageLoader, error::FetchError, model::ApiResponse, query::ListQuery,
  transform::PageResult,
};
use crate::{
  client::{Client, ClientConfig, Response},
  image::hosts::AssetHosts,
  util::ConfigError,
};

pub const DEFAULT_BASE_URL: &str = "https://suitmedia-backend.suitdev.com/api";
const LISTING_PATH: &str = "ideas";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RetryConfig {
  #[serde(default = "default_max_attempts")]
  max_attempts: u32,
  #[serde(default = "default_base_delay")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  base_delay: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      base_delay: default_base_delay(),
    }
  }
}

impl RetryConfig {
  #[cfg(test)]
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self {
      max_attempts,
      base_delay,
    }
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts.max(1)
  }

  /// Wait after the given failed attempt (counted from 1):
  /// `base_delay * 2^attempt`.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpstreamConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub client: ClientConfig,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      retry: RetryConfig::default(),
      client: ClientConfig::default(),
    }
  }
}

/// Client for the upstream listing API.
pub struct IdeasApi {
  base: Url,
  client: Client,
  retry: RetryConfig,
  hosts: Arc<AssetHosts>,
}

impl IdeasApi {
  pub fn new(
    base: Url,
    client: Client,
    retry: RetryConfig,
    hosts: Arc<AssetHosts>,
  ) -> Self {
    Self {
      base: with_trailing_slash(base),
      client,
      retry,
      hosts,
    }
  }

  pub fn from_config(
    config: &UpstreamConfig,
    hosts: Arc<AssetHosts>,
  ) -> Result<Self, ConfigError> {
    let base = Url::parse(&config.base_url)?;
    if !matches!(base.scheme(), "http" | "https") {
      return Err(ConfigError::Message(format!(
        "upstream base_url must be http(s): {base}"
      )));
    }
    let client = config.client.build()?;
    Ok(Self::new(base, client, config.retry.clone(), hosts))
  }

  pub fn listing_url(&self, query: &ListQuery) -> Result<Url, FetchError> {
    let mut url = self.base.join(LISTING_PATH)?;
    url.query_pairs_mut().extend_pairs(query.to_query_pairs());
    Ok(url)
  }

  fn probe_url(&self) -> Result<Url, FetchError> {
    let mut url = self.base.join(LISTING_PATH)?;
    url
      .query_pairs_mut()
      .append_pair("page[number]", "1")
      .append_pair("page[size]", "1");
    Ok(url)
  }

  /// Fetches one page, retrying server and transport failures with
  /// exponential backoff. Client errors are returned right away.
  pub async fn fetch_page(
    &self,
    query: &ListQuery,
  ) -> Result<ApiResponse, FetchError> {
    let url = self.listing_url(query)?;
    let max_attempts = self.retry.max_attempts();
    let mut attempt = 1;

    loop {
      match self.fetch_once(&url).await {
        Ok(page) => return Ok(page),
        Err(e) if !e.is_retryable() || attempt >= max_attempts => {
          warn!("fetching {url} failed after {attempt} attempt(s): {e}");
          return Err(e);
        }
        Err(e) => {
          let delay = self.retry.delay_for(attempt);
          warn!(
            "fetching {url} failed (attempt {attempt}/{max_attempts}): {e}; \
             retrying in {delay:?}"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }

  async fn fetch_once(&self, url: &Url) -> Result<ApiResponse, FetchError> {
    let (resp, fresh) = match self.client.cached(url) {
      Some(resp) => (resp, false),
      None => (self.client.get_fresh(url).await?, true),
    };
    let status = resp.status();

    if status.is_client_error() {
      return Err(FetchError::ClientRequest {
        status,
        message: resp.error_message(),
      });
    }

    if !status.is_success() {
      return Err(FetchError::ServerRequest {
        status,
        message: resp.error_message(),
      });
    }

    let page = resp.json()?;
    if fresh {
      self.client.remember(url, &resp);
    }
    Ok(page)
  }

  /// Whether the upstream answers a minimal listing request. Never
  /// served from the response cache.
  pub async fn probe(&self) -> bool {
    let Ok(url) = self.probe_url() else {
      return false;
    };

    match self.client.get_fresh(&url).await {
      Ok(resp) => {
        debug!("probe {} answered {}", resp.url(), resp.status());
        resp.status().is_success()
      }
      Err(e) => {
        warn!("probe {url} failed: {e}");
        false
      }
    }
  }

  /// Forwards a GET for `path` (relative to the base URL) upstream, once.
  pub async fn forward(
    &self,
    path: &str,
    query: Option<&str>,
  ) -> Result<Response, FetchError> {
    let path = path.trim_start_matches('/');
    if path.split('/').any(|segment| matches!(segment, "." | "..")) {
      return Err(FetchError::InvalidPath(path.to_owned()));
    }

    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| FetchError::InvalidPath(path.to_owned()))?
      .pop_if_empty()
      .extend(path.split('/'));
    url.set_query(query.filter(|q| !q.is_empty()));

    debug!("forwarding to {url}");
    Ok(self.client.get_fresh(&url).await?)
  }
}

#[async_trait::async_trait]
impl PageLoader for IdeasApi {
  async fn load(&self, query: &ListQuery) -> Result<PageResult, FetchError> {
    if !self.probe().await {
      return Err(FetchError::Connectivity);
    }

    let resp = self.fetch_page(query).await?;
    Ok(PageResult::from_response(resp, query, &self.hosts))
  }
}

fn with_trailing_slash(mut url: Url) -> Url {
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_owned()
}

fn default_max_attempts() -> u32 {
  3
}

fn default_base_delay() -> Duration {
  Duration::from_secs(1)
}
