use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  body::Bytes,
  extract::{Query, State},
  response::{IntoResponse, Response},
  routing::get,
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::{RELAY_ROUTE, hosts::AssetHosts};
use crate::{error::ErrorReport, util::ConfigError};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
   AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

const CORS_HEADERS: [(header::HeaderName, &str); 3] = [
  (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
  (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
  (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

lazy_static::lazy_static! {
  static ref IMAGE_URL: Regex = Regex::new(
    r"(?i)^https?://.+\.(jpg|jpeg|png|gif|webp|avif|svg)(\?.*)?$"
  ).expect("bad image url pattern");
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
  /// Send the browser to the original URL when a known asset host
  /// answers 403, instead of passing the 403 on.
  #[serde(default = "default_redirect_forbidden")]
  redirect_forbidden: bool,
  #[serde(default = "default_timeout")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
}

impl Default for RelayConfig {
  fn default() -> Self {
    Self {
      redirect_forbidden: default_redirect_forbidden(),
      timeout: default_timeout(),
    }
  }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RelayQuery {
  url: Option<String>,
}

#[derive(Error, Debug)]
pub enum RelayError {
  #[error("Image URL is required")]
  MissingUrl,
  #[error("Invalid image URL format")]
  InvalidUrl(String),
  #[error("upstream answered {0}")]
  UpstreamStatus(StatusCode),
  #[error("upstream refused {0}")]
  Forbidden(Url),
  #[error("upstream sent {0}, not an image")]
  UnsupportedMediaType(String),
  #[error("{0}")]
  Upstream(#[from] reqwest::Error),
}

impl IntoResponse for RelayError {
  fn into_response(self) -> Response {
    match self {
      RelayError::MissingUrl | RelayError::InvalidUrl(_) => {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
      }
      RelayError::UpstreamStatus(status) => status.into_response(),
      RelayError::Forbidden(url) => match HeaderValue::from_str(url.as_str()) {
        Ok(location) => {
          (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)])
            .into_response()
        }
        Err(_) => StatusCode::FORBIDDEN.into_response(),
      },
      RelayError::UnsupportedMediaType(_) => {
        StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response()
      }
      RelayError::Upstream(_) => {
        let report = ErrorReport::from_error(&self);
        let body = format!("Internal Server Error: {}", report.message);
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
      }
    }
  }
}

pub struct RelayedImage {
  content_type: HeaderValue,
  body: Bytes,
}

impl IntoResponse for RelayedImage {
  fn into_response(self) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, self.content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
    for (name, value) in CORS_HEADERS {
      headers.insert(name, HeaderValue::from_static(value));
    }
    (StatusCode::OK, headers, self.body).into_response()
  }
}

/// Fetches third-party images on behalf of the browser.
#[derive(Clone)]
pub struct Relay {
  client: reqwest::Client,
  hosts: Arc<AssetHosts>,
  redirect_forbidden: bool,
}

impl Relay {
  pub fn from_config(
    config: &RelayConfig,
    hosts: Arc<AssetHosts>,
  ) -> Result<Self, ConfigError> {
    let mut default_headers = HeaderMap::new();
    default_headers
      .insert(header::ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));

    let client = reqwest::Client::builder()
      .user_agent(BROWSER_USER_AGENT)
      .default_headers(default_headers)
      .referer(false)
      .timeout(config.timeout)
      .build()?;

    Ok(Self {
      client,
      hosts,
      redirect_forbidden: config.redirect_forbidden,
    })
  }

  pub fn router(self) -> Router {
    Router::new()
      .route(RELAY_ROUTE, get(handler).options(preflight))
      .with_state(self)
  }

  fn validate(&self, url: Option<&str>) -> Result<(Url, Url), RelayError> {
    let raw = url
      .map(str::trim)
      .filter(|url| !url.is_empty())
      .ok_or(RelayError::MissingUrl)?;

    if !IMAGE_URL.is_match(raw) {
      return Err(RelayError::InvalidUrl(raw.to_owned()));
    }

    let invalid = |_| RelayError::InvalidUrl(raw.to_owned());
    let original = Url::parse(raw).map_err(invalid)?;
    let target = Url::parse(&self.hosts.apply_scheme(raw)).map_err(invalid)?;
    Ok((original, target))
  }

  pub async fn fetch(
    &self,
    url: Option<&str>,
  ) -> Result<RelayedImage, RelayError> {
    let (original, target) = self.validate(url)?;

    let mut req = self
      .client
      .get(target.clone())
      .header(header::CACHE_CONTROL, "no-cache");
    if let Some(referer) = self.hosts.referer_for(&target) {
      req = req.header(header::REFERER, referer);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let known_host = self.hosts.find(&target).is_some();
      let redirect = self.redirect_forbidden && known_host;
      if status == StatusCode::FORBIDDEN && redirect {
        return Err(RelayError::Forbidden(original));
      }
      return Err(RelayError::UpstreamStatus(status));
    }

    let content_type = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .cloned()
      .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    let is_image = content_type
      .to_str()
      .ok()
      .and_then(|value| value.parse::<mime::Mime>().ok())
      .is_some_and(|mime| mime.type_() == mime::IMAGE);
    if !is_image {
      let shown = String::from_utf8_lossy(content_type.as_bytes()).into_owned();
      return Err(RelayError::UnsupportedMediaType(shown));
    }

    let body = resp.bytes().await?;
    debug!("relayed {} ({} bytes)", target, body.len());
    Ok(RelayedImage { content_type, body })
  }
}

async fn handler(
  State(relay): State<Relay>,
  Query(RelayQuery { url }): Query<RelayQuery>,
) -> Result<RelayedImage, RelayError> {
  relay.fetch(url.as_deref()).await.inspect_err(|e| match e {
    RelayError::MissingUrl => debug!("rejected relay request: {e}"),
    RelayError::InvalidUrl(raw) => {
      debug!("rejected relay request for {raw:?}: {e}")
    }
    _ => warn!("image relay failed for {:?}: {e}", url),
  })
}

async fn preflight() -> impl IntoResponse {
  (StatusCode::NO_CONTENT, CORS_HEADERS)
}

fn default_redirect_forbidden() -> bool {
  true
}

fn default_timeout() -> Duration {
  Duration::from_secs(15)
}

#[cfg(test)]
mod test {
  use axum::body::Body;
  use http::Request;
  use tower::ServiceExt;
  use wiremock::matchers::{header as header_is, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::image::hosts::{AssetHost, Scheme};

  const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR fake";

  fn relay_router(hosts: AssetHosts) -> Router {
    Relay::from_config(&RelayConfig::default(), Arc::new(hosts))
      .unwrap()
      .router()
  }

  async fn get(router: Router, target: Option<&str>) -> Response {
    let uri = match target {
      Some(target) => {
        format!("{RELAY_ROUTE}?url={}&w=64", urlencoding::encode(target))
      }
      None => RELAY_ROUTE.to_owned(),
    };
    router
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap()
  }

  async fn body_bytes(resp: Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap()
  }

  fn local_http_hosts() -> AssetHosts {
    AssetHosts::new(vec![AssetHost::new("127.0.0.1", Scheme::Http)])
  }

  #[test]
  fn test_parse_config() {
    let parsed: RelayConfig = serde_json::from_value(serde_json::json!({}))
      .unwrap();
    assert_eq!(parsed, RelayConfig::default());

    let parsed: RelayConfig = serde_yaml::from_str(
      "redirect_forbidden: false\ntimeout: 3s\n",
    )
    .unwrap();
    assert!(!parsed.redirect_forbidden);
    assert_eq!(parsed.timeout, Duration::from_secs(3));
  }

  #[tokio::test]
  async fn test_rejects_bad_urls_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let router = relay_router(AssetHosts::default());
    let resp = get(router.clone(), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(resp).await, "Image URL is required");

    let resp = get(router.clone(), Some("not-a-url")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let text_file = format!("{}/file.txt", server.uri());
    let resp = get(router.clone(), Some(&text_file)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(resp).await, "Invalid image URL format");

    let resp = get(router, Some("ftp://host/a.png")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn test_relays_image_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/pics/cat.png"))
      .and(header_is("accept", IMAGE_ACCEPT))
      .respond_with(
        ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"),
      )
      .expect(1)
      .mount(&server)
      .await;

    let target = format!("{}/pics/cat.png?v=2", server.uri());
    let resp = get(relay_router(AssetHosts::default()), Some(&target)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    let cache_control = headers[header::CACHE_CONTROL].to_str().unwrap();
    assert!(cache_control.contains("immutable"));
    assert!(cache_control.contains("max-age=31536000"));
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_bytes(resp).await, PNG_BYTES);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("referer").is_none());
    let user_agent = requests[0].headers.get("user-agent").unwrap();
    assert!(user_agent.to_str().unwrap().starts_with("Mozilla/5.0"));
  }

  #[tokio::test]
  async fn test_non_image_content_type_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(
        ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"),
      )
      .mount(&server)
      .await;

    let target = format!("{}/fake.jpg", server.uri());
    let resp = get(relay_router(AssetHosts::default()), Some(&target)).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body_bytes(resp).await.is_empty());
  }

  #[tokio::test]
  async fn test_upstream_status_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
      .mount(&server)
      .await;

    let target = format!("{}/missing.webp", server.uri());
    let resp = get(relay_router(AssetHosts::default()), Some(&target)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
  }

  #[tokio::test]
  async fn test_forbidden_asset_host_redirects() {
    let server = MockServer::start().await;
    let origin = server.uri();
    Mock::given(method("GET"))
      .and(header_is("referer", origin.as_str()))
      .respond_with(ResponseTemplate::new(403))
      .expect(2)
      .mount(&server)
      .await;

    let hosts = local_http_hosts();
    let target = format!("{}/locked.jpg", server.uri());
    let resp = get(relay_router(hosts.clone()), Some(&target)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()[header::LOCATION], target.as_str());

    let config = RelayConfig {
      redirect_forbidden: false,
      ..Default::default()
    };
    let router =
      Relay::from_config(&config, Arc::new(hosts)).unwrap().router();
    let resp = get(router, Some(&target)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn test_asset_host_fetched_with_its_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/x.jpg"))
      .and(header_is("cache-control", "no-cache"))
      .respond_with(ResponseTemplate::new(403))
      .expect(1)
      .mount(&server)
      .await;

    // the mock only speaks plain http, so reaching it proves the rewrite
    let target = format!("{}/x.jpg", server.uri().replace("http:", "https:"));
    assert!(target.starts_with("https://127.0.0.1:"));
    let resp = get(relay_router(local_http_hosts()), Some(&target)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()[header::LOCATION], target.as_str());
  }

  #[tokio::test]
  async fn test_unreachable_upstream_is_500() {
    let resp = get(
      relay_router(AssetHosts::default()),
      Some("http://127.0.0.1:9/a.png"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(resp).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.starts_with("Internal Server Error: "), "{body}");
  }

  #[tokio::test]
  async fn test_preflight() {
    let router = relay_router(AssetHosts::default());
    let resp = router
      .oneshot(
        Request::builder()
          .method("OPTIONS")
          .uri(RELAY_ROUTE)
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
      resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
      "GET, OPTIONS"
    );
  }
}
