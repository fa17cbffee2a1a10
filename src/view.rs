use std::{collections::HashMap, ops::RangeInclusive};

use crate::api::{ListQuery, SortDirection, query::DEFAULT_PAGE_SIZE};

/// Page sizes offered in the page-size selector. Any positive size is
/// accepted from the query string.
pub const PAGE_SIZES: [u32; 3] = [10, 20, 50];
const PAGE_WINDOW: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
  #[default]
  Newest,
  Oldest,
}

impl SortOrder {
  pub fn as_str(self) -> &'static str {
    match self {
      SortOrder::Newest => "newest",
      SortOrder::Oldest => "oldest",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "newest" => Some(SortOrder::Newest),
      "oldest" => Some(SortOrder::Oldest),
      _ => None,
    }
  }

  pub fn direction(self) -> SortDirection {
    match self {
      SortOrder::Newest => SortDirection::Descending,
      SortOrder::Oldest => SortDirection::Ascending,
    }
  }
}

/// What the listing shows: read from the query string on load and
/// written back to it after every render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewState {
  pub page: u32,
  pub per_page: u32,
  pub sort: SortOrder,
}

impl Default for ViewState {
  fn default() -> Self {
    Self {
      page: 1,
      per_page: DEFAULT_PAGE_SIZE,
      sort: SortOrder::default(),
    }
  }
}

impl ViewState {
  /// Missing or invalid values fall back to their defaults one by one.
  pub fn from_query(params: &HashMap<String, String>) -> Self {
    let default = Self::default();
    let positive = |key: &str| {
      params
        .get(key)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&n| n >= 1)
    };

    Self {
      page: positive("page").unwrap_or(default.page),
      per_page: positive("per_page").unwrap_or(default.per_page),
      sort: params
        .get("sort")
        .and_then(|s| SortOrder::parse(s))
        .unwrap_or(default.sort),
    }
  }

  pub fn to_query_string(&self) -> String {
    format!(
      "page={}&per_page={}&sort={}",
      self.page,
      self.per_page,
      self.sort.as_str()
    )
  }

  pub fn list_query(&self) -> ListQuery {
    ListQuery::new(self.page, self.per_page, self.sort.direction())
  }

  pub fn with_page(self, page: u32) -> Self {
    Self {
      page: page.max(1),
      ..self
    }
  }

  pub fn with_per_page(self, per_page: u32) -> Self {
    Self {
      page: 1,
      per_page: per_page.max(1),
      ..self
    }
  }

  pub fn with_sort(self, sort: SortOrder) -> Self {
    Self {
      page: 1,
      sort,
      ..self
    }
  }
}

/// Page numbers shown in the pagination bar: at most five, centered on
/// the current page and clamped to both ends.
pub fn page_window(current: u32, total: u32) -> RangeInclusive<u32> {
  if total <= PAGE_WINDOW {
    return 1..=total;
  }

  let half = PAGE_WINDOW / 2;
  let start = if current <= half + 1 {
    1
  } else if current >= total - half {
    total - PAGE_WINDOW + 1
  } else {
    current - half
  };
  start..=start + PAGE_WINDOW - 1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

/// Tracks the view state and which load is the latest one.
///
/// Each navigation hands out a new ticket; a load that settles with an
/// older ticket is dropped, so a slow response can never overwrite the
/// page the user moved on to.
#[derive(Debug, Default)]
pub struct PageController {
  state: ViewState,
  latest: u64,
}

impl PageController {
  pub fn new(state: ViewState) -> Self {
    Self { state, latest: 0 }
  }

  pub fn state(&self) -> ViewState {
    self.state
  }

  pub fn navigate(&mut self, next: ViewState) -> Ticket {
    self.state = next;
    self.latest += 1;
    Ticket(self.latest)
  }

  pub fn is_current(&self, ticket: Ticket) -> bool {
    ticket.0 == self.latest
  }

  pub fn settle<T>(&self, ticket: Ticket, result: T) -> Option<T> {
    self.is_current(ticket).then_some(result)
  }
}
