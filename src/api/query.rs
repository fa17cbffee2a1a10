use serde::{Deserialize, Serialize};

pub const SORT_FIELD: &str = "published_at";
pub const IMAGE_VARIANTS: [&str; 2] = ["small_image", "medium_image"];

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(
  Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  Ascending,
  #[default]
  Descending,
}

impl SortDirection {
  /// The upstream sort token: the field name, prefixed with `-` for
  /// descending order.
  pub fn sort_token(self) -> String {
    match self {
      SortDirection::Ascending => SORT_FIELD.to_owned(),
      SortDirection::Descending => format!("-{SORT_FIELD}"),
    }
  }
}

/// Parameters of one listing request. Page and page size are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListQuery {
  page: u32,
  page_size: u32,
  sort: SortDirection,
}

impl Default for ListQuery {
  fn default() -> Self {
    Self::new(1, DEFAULT_PAGE_SIZE, SortDirection::Descending)
  }
}

impl ListQuery {
  pub fn new(page: u32, page_size: u32, sort: SortDirection) -> Self {
    Self {
      page: page.max(1),
      page_size: page_size.max(1),
      sort,
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn sort(&self) -> SortDirection {
    self.sort
  }

  pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("page[number]", self.page.to_string()),
      ("page[size]", self.page_size.to_string()),
    ];
    for variant in IMAGE_VARIANTS {
      pairs.push(("append[]", variant.to_owned()));
    }
    pairs.push(("sort", self.sort.sort_token()));
    pairs
  }
}
