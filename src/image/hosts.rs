use std::borrow::Cow;

use glob_match::glob_match;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
  Http,
  Https,
}

impl Scheme {
  pub fn as_str(self) -> &'static str {
    match self {
      Scheme::Http => "http",
      Scheme::Https => "https",
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetHost {
  /// Host name of the asset server. Globbing is supported:
  /// "*.example.com" matches "cdn.example.com" but not "example.com".
  pub host: String,
  /// The only scheme images on this host are loaded with.
  pub scheme: Scheme,
}

impl AssetHost {
  pub fn new(host: impl Into<String>, scheme: Scheme) -> Self {
    Self {
      host: host.into(),
      scheme,
    }
  }
}

/// Asset hosts with a known TLS situation.
///
/// Every image URL on one of these hosts is rewritten to the host's
/// configured scheme, whether it ends up in post data, in a direct image
/// URL, or in a relay fetch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct AssetHosts(Vec<AssetHost>);

impl Default for AssetHosts {
  fn default() -> Self {
    Self(vec![
      AssetHost::new("assets.suitdev.com", Scheme::Http),
      AssetHost::new("suitmedia.static-assets.id", Scheme::Http),
    ])
  }
}

impl AssetHosts {
  #[cfg(test)]
  pub fn new(hosts: Vec<AssetHost>) -> Self {
    Self(hosts)
  }

  pub fn find(&self, url: &Url) -> Option<&AssetHost> {
    let host = url.host_str()?;
    self.0.iter().find(|asset| glob_match(&asset.host, host))
  }

  pub fn is_asset_url(&self, url: &str) -> bool {
    parse_http_url(url).is_some_and(|url| self.find(&url).is_some())
  }

  /// Rewrites the scheme of `url` if it points at a known asset host.
  /// The rest of the string is kept byte for byte; anything that is not
  /// an http(s) URL on a known host comes back untouched.
  pub fn apply_scheme<'a>(&self, url: &'a str) -> Cow<'a, str> {
    let Some(parsed) = parse_http_url(url) else {
      return Cow::Borrowed(url);
    };
    let Some(asset) = self.find(&parsed) else {
      return Cow::Borrowed(url);
    };

    let current = parsed.scheme();
    if current == asset.scheme.as_str() {
      return Cow::Borrowed(url);
    }

    // Url::parse trims surrounding whitespace and lowercases the scheme,
    // the input may have neither done.
    let trimmed = url.trim_matches(|c: char| c <= ' ');
    match trimmed.split_once(':') {
      Some((scheme, rest)) if scheme.eq_ignore_ascii_case(current) => {
        Cow::Owned(format!("{}:{rest}", asset.scheme.as_str()))
      }
      _ => Cow::Owned(with_scheme(parsed, asset.scheme)),
    }
  }

  /// The origin to send as Referer when fetching from an asset host.
  pub fn referer_for(&self, url: &Url) -> Option<String> {
    let asset = self.find(url)?;
    let host = url.host_str()?;
    let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
    Some(format!("{}://{host}{port}", asset.scheme.as_str()))
  }
}

/// Falls back to the normalized form when the raw string cannot be
/// spliced, e.g. when it carries tabs or newlines the parser dropped.
fn with_scheme(mut url: Url, scheme: Scheme) -> String {
  // switching between http and https never fails
  let _ = url.set_scheme(scheme.as_str());
  url.into()
}

fn parse_http_url(url: &str) -> Option<Url> {
  let parsed = Url::parse(url).ok()?;
  matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_default_policy_downgrades_legacy_hosts() {
    let hosts = AssetHosts::default();
    assert_eq!(
      hosts.apply_scheme("https://assets.suitdev.com/x.jpg"),
      "http://assets.suitdev.com/x.jpg"
    );
    assert_eq!(
      hosts.apply_scheme("https://suitmedia.static-assets.id/a/b.png?v=2"),
      "http://suitmedia.static-assets.id/a/b.png?v=2"
    );
    assert_eq!(
      hosts.apply_scheme("http://assets.suitdev.com/x.jpg"),
      "http://assets.suitdev.com/x.jpg"
    );
  }

  #[test]
  fn test_surrounding_whitespace_does_not_shift_scheme() {
    let hosts = AssetHosts::default();
    assert_eq!(
      hosts.apply_scheme(" https://assets.suitdev.com/x.jpg"),
      "http://assets.suitdev.com/x.jpg"
    );
    assert_eq!(
      hosts.apply_scheme("  https://assets.suitdev.com/x.jpg\n"),
      "http://assets.suitdev.com/x.jpg"
    );
    assert_eq!(
      hosts.apply_scheme("\thttps://assets.suitdev.com/x.jpg"),
      "http://assets.suitdev.com/x.jpg"
    );
    assert_eq!(
      hosts.apply_scheme("ht\ttps://assets.suitdev.com/x.jpg"),
      "http://assets.suitdev.com/x.jpg"
    );
  }

  #[test]
  fn test_unknown_hosts_untouched() {
    let hosts = AssetHosts::default();
    for url in [
      "https://other.com/a.jpg",
      "https://assets.suitdev.com.evil.net/a.jpg",
      "",
      "/local.png",
      "not a url",
      "ftp://assets.suitdev.com/x.jpg",
    ] {
      assert!(matches!(hosts.apply_scheme(url), Cow::Borrowed(_)), "{url}");
    }
  }

  #[test]
  fn test_upgrade_policy_and_glob() {
    let hosts = AssetHosts::new(vec![AssetHost::new(
      "*.suitdev.com",
      Scheme::Https,
    )]);
    assert_eq!(
      hosts.apply_scheme("HTTP://assets.suitdev.com/x.jpg"),
      "https://assets.suitdev.com/x.jpg"
    );
    assert!(hosts.is_asset_url("http://cdn.suitdev.com/y.webp"));
    assert!(!hosts.is_asset_url("http://suitdev.com/y.webp"));

    let url = Url::parse("http://assets.suitdev.com/x.jpg").unwrap();
    assert_eq!(
      hosts.referer_for(&url).as_deref(),
      Some("https://assets.suitdev.com")
    );
  }
}
