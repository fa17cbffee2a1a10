use serde::{Deserialize, Deserializer, Serialize};

/// One page of the upstream `/ideas` listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiResponse {
  pub data: Vec<RawPost>,
  pub meta: Meta,
  #[serde(default)]
  pub links: Links,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawPost {
  pub id: i64,
  pub slug: String,
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub published_at: String,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
  #[serde(default)]
  pub deleted_at: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub small_image: Vec<ImageAsset>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub medium_image: Vec<ImageAsset>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
  #[serde(default)]
  pub id: Option<i64>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub mime: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub file_name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Meta {
  pub current_page: u32,
  pub last_page: u32,
  pub total: u64,
  // the paginator echoes back whatever it was given, often a string
  #[serde(default, deserialize_with = "number_or_string")]
  pub per_page: Option<u32>,
  #[serde(default)]
  pub from: Option<u64>,
  #[serde(default)]
  pub to: Option<u64>,
  #[serde(default)]
  pub path: Option<String>,
  #[serde(default)]
  pub links: Vec<MetaLink>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetaLink {
  pub url: Option<String>,
  pub label: String,
  #[serde(default)]
  pub active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Links {
  pub first: Option<String>,
  pub last: Option<String>,
  pub prev: Option<String>,
  pub next: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum NumberOrString {
    Number(u32),
    String(String),
  }

  Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
    Some(NumberOrString::Number(n)) => Some(n),
    Some(NumberOrString::String(s)) => s.trim().parse().ok(),
    None => None,
  })
}


#[cfg(test)]
mod test {
  use serde_json::json;

  use super::fixtures::*;
  use super::*;

  #[test]
  fn test_parse_listing() {
    let value = listing(
      vec![raw_post(1, Some("https://assets.suitdev.com/1.jpg"))],
      1,
      3,
    );
    let parsed: ApiResponse = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.data.len(), 1);
    assert_eq!(parsed.meta.per_page, Some(10));
    assert_eq!(parsed.meta.last_page, 3);
    assert_eq!(parsed.meta.links.len(), 2);
    assert_eq!(parsed.data[0].small_image[0].file_name, "cover.jpg");
    assert_eq!(parsed.links.prev, None);
  }

  #[test]
  fn test_null_and_missing_collections() {
    let parsed: RawPost = serde_json::from_value(json!({
      "id": 3,
      "slug": "s",
      "title": "t",
      "published_at": null,
      "small_image": null,
    }))
    .unwrap();
    assert!(parsed.small_image.is_empty());
    assert!(parsed.medium_image.is_empty());
    assert_eq!(parsed.published_at, "");
    assert_eq!(parsed.content, "");
  }

  #[test]
  fn test_numeric_per_page() {
    let meta: Meta = serde_json::from_value(json!({
      "current_page": 2,
      "last_page": 2,
      "total": 11,
      "per_page": 10,
    }))
    .unwrap();
    assert_eq!(meta.per_page, Some(10));

    let meta: Meta = serde_json::from_value(json!({
      "current_page": 2,
      "last_page": 2,
      "total": 11,
      "per_page": "lots",
    }))
    .unwrap();
    assert_eq!(meta.per_page, None);
  }
}
