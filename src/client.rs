mod cache;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::util::ConfigError;

pub use self::cache::{Response, ResponseCache};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
  user_agent: Option<String>,
  #[serde(default = "default_accept")]
  accept: String,
  #[serde(default = "default_cache_size")]
  cache_size: usize,
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  #[serde(default = "default_cache_ttl")]
  cache_ttl: Duration,
  #[serde(default = "default_timeout")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      accept: default_accept(),
      cache_size: default_cache_size(),
      cache_ttl: default_cache_ttl(),
      timeout: default_timeout(),
    }
  }
}

impl ClientConfig {
  #[cfg(test)]
  pub fn uncached() -> Self {
    Self {
      cache_size: 0,
      ..Default::default()
    }
  }

  fn to_builder(&self) -> Result<reqwest::ClientBuilder, ConfigError> {
    let mut builder = reqwest::Client::builder();

    if let Some(user_agent) = &self.user_agent {
      builder = builder.user_agent(user_agent);
    } else {
      builder = builder.user_agent(crate::util::USER_AGENT);
    }

    let mut header_map = HeaderMap::new();
    header_map.append("Accept", HeaderValue::try_from(&self.accept)?);
    builder = builder.default_headers(header_map);

    builder = builder.timeout(self.timeout);

    Ok(builder)
  }

  pub fn build(&self) -> Result<Client, ConfigError> {
    let reqwest_client = self.to_builder()?.build()?;
    Ok(Client::new(self.cache_size, self.cache_ttl, reqwest_client))
  }
}

/// HTTP client for the upstream API. Responses handed to
/// [`Client::remember`] are reused until the cache TTL runs out.
pub struct Client {
  cache: ResponseCache,
  client: reqwest::Client,
}

impl Client {
  fn new(
    cache_size: usize,
    cache_ttl: Duration,
    client: reqwest::Client,
  ) -> Self {
    Self {
      cache: ResponseCache::new(cache_size, cache_ttl),
      client,
    }
  }

  pub fn cached(&self, url: &Url) -> Option<Response> {
    self.cache.get_cached(url)
  }

  /// Keeps a response for reuse. Only call this once the response has
  /// proven usable; non-success statuses are never kept.
  pub fn remember(&self, url: &Url, resp: &Response) {
    if resp.status().is_success() {
      self.cache.insert(url.clone(), resp.clone());
    }
  }

  /// Bypasses the response cache in both directions.
  pub async fn get_fresh(&self, url: &Url) -> reqwest::Result<Response> {
    let resp = self.client.get(url.clone()).send().await?;
    Response::from_reqwest_resp(resp).await
  }
}

fn default_accept() -> String {
  "application/json".into()
}

fn default_cache_size() -> usize {
  32
}

fn default_timeout() -> Duration {
  Duration::from_secs(10)
}

fn default_cache_ttl() -> Duration {
  Duration::from_secs(60)
}
