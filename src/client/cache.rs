use std::sync::Arc;

use mime::Mime;
use reqwest::{StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;
use url::Url;

use crate::cache::TimedLruCache;

pub type ResponseCache = TimedLruCache<Url, Response>;

/// A fully buffered upstream response, cheap to clone.
#[derive(Clone, Debug)]
pub struct Response {
  inner: Arc<InnerResponse>,
}

#[derive(Debug)]
struct InnerResponse {
  url: Url,
  status: StatusCode,
  headers: HeaderMap,
  body: Box<[u8]>,
}

impl Response {
  pub async fn from_reqwest_resp(
    resp: reqwest::Response,
  ) -> reqwest::Result<Self> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let url = resp.url().clone();
    let body = resp.bytes().await?.to_vec().into_boxed_slice();
    let resp = InnerResponse {
      url,
      status,
      headers,
      body,
    };

    Ok(Self {
      inner: Arc::new(resp),
    })
  }

  #[cfg(test)]
  pub fn new(
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Box<[u8]>,
  ) -> Self {
    Self {
      inner: Arc::new(InnerResponse {
        url,
        status,
        headers,
        body,
      }),
    }
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.inner.headers.get(name).and_then(|v| v.to_str().ok())
  }

  pub fn content_type(&self) -> Option<Mime> {
    self.header("content-type").and_then(|v| v.parse().ok())
  }

  pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
    serde_json::from_slice(self.body())
  }

  /// The `message` field of a JSON error body, if the upstream sent one.
  pub fn error_message(&self) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
      message: Option<String>,
    }

    self
      .json::<ErrorBody>()
      .ok()
      .and_then(|body| body.message)
      .filter(|message| !message.trim().is_empty())
  }

  pub fn url(&self) -> &Url {
    &self.inner.url
  }

  pub fn status(&self) -> StatusCode {
    self.inner.status
  }

  pub fn body(&self) -> &[u8] {
    &self.inner.body
  }
}
