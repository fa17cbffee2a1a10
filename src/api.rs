pub mod error;
pub mod fetcher;
pub mod model;
pub mod query;
pub mod transform;

pub use error::FetchError;
pub use fetcher::{IdeasApi, UpstreamConfig};
pub use query::{ListQuery, SortDirection};
pub use transform::{DisplayPost, PageResult};

/// Produces a display-ready page for a query.
#[async_trait::async_trait]
pub trait PageLoader: Send + Sync {
  async fn load(&self, query: &ListQuery) -> Result<PageResult, FetchError>;
}
