use std::collections::HashMap;

use axum::extract::{Query, State};
use http::StatusCode;
use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::AppState;
use crate::{
  api::{DisplayPost, PageLoader, PageResult},
  error::ErrorReport,
  image::ImageResolver,
  view::{PAGE_SIZES, SortOrder, ViewState, page_window},
};

const CARD_IMAGE_WIDTH: u32 = 400;

pub(super) async fn handler(
  State(state): State<AppState>,
  Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Markup) {
  let view = ViewState::from_query(&params);

  match state.api.load(&view.list_query()).await {
    Ok(page) => (StatusCode::OK, render_page(&view, &page, &state.resolver)),
    Err(e) => {
      let report = ErrorReport::from(&e);
      (report.status(), render_error_page(&view, &report))
    }
  }
}

fn layout(view: &ViewState, body: Markup) -> Markup {
  html! {
    (DOCTYPE)
    html {
      head {
        meta charset="utf-8";
        meta name="viewport" content="width=device-width, initial-scale=1";
        meta name="referrer" content="no-referrer";
        title { "Ideas" }
        style { (PreEscaped(STYLES)) }
      }
      body {
        h1 { "Ideas" }
        (controls_fragment(view))
        main { (body) }
        (sync_url_script(view))
      }
    }
  }
}

fn render_page(
  view: &ViewState,
  page: &PageResult,
  resolver: &ImageResolver,
) -> Markup {
  layout(
    view,
    html! {
      p .summary {
        @match page.item_range() {
          Some((start, end)) => {
            "Showing " (start) " - " (end) " of " (page.total_items)
          },
          None => { "No ideas found" },
        }
      }
      ul .cards {
        @for post in &page.items {
          li { (post_card_fragment(post, resolver)) }
        }
      }
      (pagination_fragment(view, page))
    },
  )
}

fn render_error_page(view: &ViewState, report: &ErrorReport) -> Markup {
  layout(
    view,
    html! {
      section .error role="alert" {
        h3 { "Unable to Load Posts" }
        p { (report.message) }
        a href={ "?" (view.to_query_string()) } { "Try again" }
      }
    },
  )
}

fn controls_fragment(view: &ViewState) -> Markup {
  html! {
    form .controls method="get" action="/" {
      input type="hidden" name="page" value="1";
      label {
        "Show per page: "
        select name="per_page" onchange="this.form.submit()" {
          @if !PAGE_SIZES.contains(&view.per_page) {
            option value=(view.per_page) selected { (view.per_page) }
          }
          @for size in PAGE_SIZES {
            option value=(size) selected[size == view.per_page] { (size) }
          }
        }
      }
      label {
        "Sort by: "
        select name="sort" onchange="this.form.submit()" {
          @for sort in [SortOrder::Newest, SortOrder::Oldest] {
            option value=(sort.as_str()) selected[sort == view.sort] {
              (sort_label(sort))
            }
          }
        }
      }
      noscript { button type="submit" { "Apply" } }
    }
  }
}

fn post_card_fragment(post: &DisplayPost, resolver: &ImageResolver) -> Markup {
  html! {
    article .card {
      @if !post.image.is_empty() {
        img
          src=(resolver.resolve(&post.image, CARD_IMAGE_WIDTH, None))
          alt=(post.title)
          loading="lazy"
          referrerpolicy="no-referrer";
      } @else {
        div .placeholder {}
      }
      @match post.published_at {
        Some(date) => {
          time datetime=(date.to_rfc3339()) {
            (date.format("%B %-d, %Y"))
          }
        },
        None => { time { "Invalid date" } },
      }
      h3 { (post.title) }
    }
  }
}

fn pagination_fragment(view: &ViewState, page: &PageResult) -> Markup {
  let current = page.current_page.max(1);
  let href =
    |n: u32| format!("?{}", view.with_page(n).to_query_string());

  html! {
    @if page.total_pages > 1 {
      nav .pagination {
        @if current > 1 {
          a rel="prev" href=(href(current - 1)) { "‹" }
        }
        @for n in page_window(current, page.total_pages) {
          @if n == current {
            span .current aria-current="page" { (n) }
          } @else {
            a href=(href(n)) { (n) }
          }
        }
        @if current < page.total_pages {
          a rel="next" href=(href(current + 1)) { "›" }
        }
      }
    }
  }
}

/// Writes the view state back to the address bar without adding a
/// history entry.
fn sync_url_script(view: &ViewState) -> Markup {
  let search = serde_json::to_string(&format!("?{}", view.to_query_string()))
    .unwrap_or_else(|_| "\"\"".to_owned());
  html! {
    script {
      (PreEscaped(format!(
        "window.history.replaceState(null, \"\", \
         window.location.pathname + {search});"
      )))
    }
  }
}

fn sort_label(sort: SortOrder) -> &'static str {
  match sort {
    SortOrder::Newest => "Newest",
    SortOrder::Oldest => "Oldest",
  }
}

const STYLES: &str = r#"
  body { font-family: sans-serif; max-width: 64rem; margin: 0 auto; }
  .cards { list-style: none; padding: 0; display: grid;
           grid-template-columns: repeat(auto-fill, minmax(14rem, 1fr));
           gap: 1rem; }
  .card img, .card .placeholder { width: 100%; aspect-ratio: 4 / 3;
                                  object-fit: cover; background: #eee; }
  .pagination { display: flex; gap: .5rem; justify-content: center; }
  .pagination .current { font-weight: bold; }
  .error { text-align: center; color: #b00; }
"#;
