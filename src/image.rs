pub mod hosts;
pub mod relay;
pub mod resolver;

pub const RELAY_ROUTE: &str = "/image-relay";

pub use hosts::AssetHosts;
pub use relay::{Relay, RelayConfig};
pub use resolver::ImageResolver;
