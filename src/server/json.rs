use std::collections::HashMap;

use axum::{
  Json, Router,
  extract::{Path, Query, RawQuery, State},
  response::{IntoResponse, Response},
  routing::get,
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use tower_http::cors::CorsLayer;
use tracing::warn;

use super::AppState;
use crate::{
  api::{FetchError, PageLoader, PageResult},
  error::ErrorReport,
  view::ViewState,
};

pub(super) fn router() -> Router<AppState> {
  Router::new()
    .route("/posts", get(list_posts))
    .route("/proxy/*path", get(proxy))
    .layer(CorsLayer::permissive())
}

struct ApiError {
  status: StatusCode,
  report: ErrorReport,
}

impl From<FetchError> for ApiError {
  fn from(e: FetchError) -> Self {
    let report = ErrorReport::from(&e);
    let status = match e {
      FetchError::InvalidPath(_) => StatusCode::BAD_REQUEST,
      _ => report.status(),
    };
    warn!("api request failed: {}", report.message);
    Self { status, report }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(self.report)).into_response()
  }
}

async fn list_posts(
  State(state): State<AppState>,
  Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PageResult>, ApiError> {
  let view = ViewState::from_query(&params);
  let page = state.api.load(&view.list_query()).await?;
  Ok(Json(page))
}

/// Relays one upstream call as-is: status, content type and body.
async fn proxy(
  State(state): State<AppState>,
  Path(path): Path<String>,
  RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
  let resp = state.api.forward(&path, query.as_deref()).await?;

  let mut headers = HeaderMap::new();
  if let Some(content_type) = resp
    .content_type()
    .and_then(|mime| HeaderValue::from_str(mime.as_ref()).ok())
  {
    headers.insert(header::CONTENT_TYPE, content_type);
  }

  Ok((resp.status(), headers, resp.body().to_vec()).into_response())
}
