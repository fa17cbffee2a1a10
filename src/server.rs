mod json;
mod page;

use std::sync::Arc;

use axum::{Router, routing::get};
use clap::Parser;
use http::StatusCode;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::{
  api::IdeasApi,
  config::AppConfig,
  image::{ImageResolver, RELAY_ROUTE},
  util::{ConfigError, Result},
};

#[derive(Parser)]
pub struct ServerConfig {
  #[clap(long, short, default_value = "127.0.0.1:4080")]
  bind: String,
}

#[derive(Clone)]
pub struct AppState {
  api: Arc<IdeasApi>,
  resolver: ImageResolver,
}

pub fn app(config: &AppConfig) -> Result<Router, ConfigError> {
  let state = AppState {
    api: Arc::new(config.build_api()?),
    resolver: config.resolver(),
  };
  let relay = config.build_relay()?;

  let app = Router::new()
    .route("/", get(page::handler))
    .nest("/api", json::router())
    .with_state(state)
    .merge(relay.router())
    .route("/health", get(|| async { "ok" }))
    .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
    .layer(CompressionLayer::new().gzip(true));

  Ok(app)
}

impl ServerConfig {
  pub async fn run(self, config: &AppConfig) -> Result<()> {
    let app = app(config)?;

    info!("listening on {}", self.bind);
    let listener = tokio::net::TcpListener::bind(&self.bind).await?;

    info!("upstream: {}", config.upstream.base_url);
    info!("routes: /, /api/posts, /api/proxy/*, {RELAY_ROUTE}, /health");
    info!("starting server");
    Ok(axum::serve(listener, app).await?)
  }
}
