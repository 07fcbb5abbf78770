//! Configuration module
//!
//! This module provides:
//! - Network lookup (`NetworkId`, `NetworkEndpoints`)
//! - SDK settings (`SdkConfig`) from environment or YAML
//! - Logging initialisation (`logging::init_logging`)

pub mod logging;
mod loader;
mod types;

pub use types::{
    KeepAliveConfig, NetworkEndpoints, NetworkId, SdkConfig, TimeoutConfig, ONE_MILLINEAR,
    ONE_NEAR,
};

pub use loader::{load_config, load_config_from_str};
