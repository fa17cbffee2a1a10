use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  api::{IdeasApi, UpstreamConfig},
  image::{AssetHosts, ImageResolver, Relay, RelayConfig},
  util::{ConfigError, Result},
};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub upstream: UpstreamConfig,
  #[serde(default)]
  pub asset_hosts: AssetHosts,
  #[serde(default)]
  pub relay: RelayConfig,
}

impl AppConfig {
  pub fn load_from_file(path: &Path) -> Result<Self> {
    let f = std::fs::File::open(path)?;
    let config = serde_yaml::from_reader(f).map_err(ConfigError::from)?;
    Ok(config)
  }

  /// Reads the config file when one is given; every field has a default.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(path) => {
        info!("loading config from {}", path.display());
        Self::load_from_file(path)
      }
      None => Ok(Self::default()),
    }
  }

  pub fn build_api(&self) -> Result<IdeasApi, ConfigError> {
    IdeasApi::from_config(&self.upstream, self.hosts())
  }

  pub fn build_relay(&self) -> Result<Relay, ConfigError> {
    Relay::from_config(&self.relay, self.hosts())
  }

  pub fn resolver(&self) -> ImageResolver {
    ImageResolver::new(self.hosts())
  }

  fn hosts(&self) -> Arc<AssetHosts> {
    Arc::new(self.asset_hosts.clone())
  }
}
