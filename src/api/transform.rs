use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::model::{ApiResponse, ImageAsset, RawPost};
use super::query::ListQuery;
use crate::image::hosts::AssetHosts;
use crate::util::date::parse_published_at;

/// A post as the page renders it.
///
/// Image URLs are empty strings when the post has no image.
/// `published_at` is `None` when upstream sent an unparseable date.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPost {
  pub id: i64,
  pub slug: String,
  pub title: String,
  pub content: String,
  pub published_at: Option<DateTime<FixedOffset>>,
  pub image: String,
  pub medium_image: String,
}

impl DisplayPost {
  pub fn from_raw(raw: RawPost, hosts: &AssetHosts) -> Self {
    let image = first_image_url(&raw.small_image, hosts);
    let medium_image = first_image_url(&raw.medium_image, hosts);

    Self {
      id: raw.id,
      published_at: parse_published_at(&raw.published_at),
      slug: raw.slug,
      title: raw.title,
      content: raw.content,
      image,
      medium_image,
    }
  }
}

fn first_image_url(images: &[ImageAsset], hosts: &AssetHosts) -> String {
  images
    .first()
    .map(|image| hosts.apply_scheme(&image.url).into_owned())
    .unwrap_or_default()
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
  pub items: Vec<DisplayPost>,
  pub current_page: u32,
  pub total_pages: u32,
  pub total_items: u64,
  pub per_page: u32,
}

impl PageResult {
  pub fn from_response(
    resp: ApiResponse,
    query: &ListQuery,
    hosts: &AssetHosts,
  ) -> Self {
    let items = resp
      .data
      .into_iter()
      .map(|raw| DisplayPost::from_raw(raw, hosts))
      .collect();

    Self {
      items,
      current_page: resp.meta.current_page,
      total_pages: resp.meta.last_page,
      total_items: resp.meta.total,
      per_page: resp.meta.per_page.unwrap_or(query.page_size()).max(1),
    }
  }

  /// 1-based positions of the first and last item on this page within
  /// the whole listing.
  pub fn item_range(&self) -> Option<(u64, u64)> {
    if self.total_items == 0 || self.items.is_empty() {
      return None;
    }

    let per_page = u64::from(self.per_page);
    let start = u64::from(self.current_page.saturating_sub(1)) * per_page + 1;
    let end = (u64::from(self.current_page) * per_page).min(self.total_items);
    Some((start, end.max(start)))
  }
}
