use std::sync::Arc;

use super::{RELAY_ROUTE, hosts::AssetHosts};

pub const DEFAULT_QUALITY: u8 = 75;

/// Decides where the browser loads an image from.
///
/// Local paths are served as-is, known asset hosts are loaded directly
/// with sizing hints, and everything else goes through the image relay.
#[derive(Clone, Debug, Default)]
pub struct ImageResolver {
  hosts: Arc<AssetHosts>,
}

impl ImageResolver {
  pub fn new(hosts: Arc<AssetHosts>) -> Self {
    Self { hosts }
  }

  pub fn resolve(&self, src: &str, width: u32, quality: Option<u8>) -> String {
    let quality = quality.unwrap_or(DEFAULT_QUALITY);

    if src.starts_with('/') {
      return src.to_owned();
    }

    if self.hosts.is_asset_url(src) {
      let url = self.hosts.apply_scheme(src);
      let separator = if url.contains('?') { '&' } else { '?' };
      return format!("{url}{separator}w={width}&q={quality}");
    }

    relay_url(src, width, quality)
  }
}

pub fn relay_url(src: &str, width: u32, quality: u8) -> String {
  let src = urlencoding::encode(src);
  format!("{RELAY_ROUTE}?url={src}&w={width}&q={quality}")
}
