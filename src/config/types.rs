//! Configuration types for the SDK
//!
//! This module contains the network lookup table and the settings
//! that drive provisioning, REST signing and the private WebSocket.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// One NEAR, in yoctoNEAR
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// One milliNEAR, in yoctoNEAR
pub const ONE_MILLINEAR: u128 = ONE_NEAR / 1_000;

// ============================================================================
// Network lookup
// ============================================================================

/// NEAR network the account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    #[default]
    Testnet,
    Mainnet,
}

/// Fixed endpoints for a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEndpoints {
    pub contract_id: &'static str,
    pub near_rpc_url: &'static str,
    pub rest_base_url: &'static str,
    pub private_ws_url: &'static str,
    pub public_ws_url: &'static str,
}

const TESTNET_ENDPOINTS: NetworkEndpoints = NetworkEndpoints {
    contract_id: "asset-manager.orderly.testnet",
    near_rpc_url: "https://rpc.testnet.near.org",
    rest_base_url: "https://testnet-api.orderly.org",
    private_ws_url: "wss://testnet-ws-private.orderly.org/v2/ws/private/stream/",
    public_ws_url: "wss://testnet-ws.orderly.org/ws/stream/",
};

const MAINNET_ENDPOINTS: NetworkEndpoints = NetworkEndpoints {
    contract_id: "asset-manager.orderly-network.near",
    near_rpc_url: "https://rpc.near.org",
    rest_base_url: "https://api.orderly.org",
    private_ws_url: "wss://ws-private.orderly.org/v2/ws/private/stream/",
    public_ws_url: "wss://ws.orderly.org/ws/stream/",
};

impl NetworkId {
    /// Pure lookup of contract id, RPC, REST and WS endpoints
    pub fn endpoints(&self) -> NetworkEndpoints {
        match self {
            NetworkId::Testnet => TESTNET_ENDPOINTS,
            NetworkId::Mainnet => MAINNET_ENDPOINTS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Testnet => "testnet",
            NetworkId::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(NetworkId::Testnet),
            "mainnet" => Ok(NetworkId::Mainnet),
            other => Err(SdkError::Config(format!(
                "Unknown network id '{}' (expected testnet or mainnet)",
                other
            ))),
        }
    }
}

// ============================================================================
// Tunables
// ============================================================================

/// Timeouts applied to chain calls, REST calls and the WS handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_chain_call_ms")]
    pub chain_call_ms: u64,
    #[serde(default = "default_http_request_ms")]
    pub http_request_ms: u64,
    #[serde(default = "default_ws_auth_ms")]
    pub ws_auth_ms: u64,
}

fn default_chain_call_ms() -> u64 {
    30_000
}

fn default_http_request_ms() -> u64 {
    10_000
}

fn default_ws_auth_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            chain_call_ms: default_chain_call_ms(),
            http_request_ms: default_http_request_ms(),
            ws_auth_ms: default_ws_auth_ms(),
        }
    }
}

/// Private stream keep-alive cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_missed")]
    pub max_missed: u32,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_missed() -> u32 {
    3
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_missed: default_max_missed(),
        }
    }
}

// ============================================================================
// SdkConfig
// ============================================================================

/// Top-level SDK configuration
///
/// Secrets never come from YAML: they are skipped on (de)serialization and
/// filled from the environment by the loader.
#[derive(Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub network_id: NetworkId,
    pub account_id: String,
    #[serde(skip)]
    pub orderly_key_secret: String,
    /// Full-access key used for deposit-bearing chain calls.
    /// Falls back to the Orderly key when absent.
    #[serde(skip)]
    pub near_account_secret: Option<String>,
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: PathBuf,
    /// Minimum storage top-up before a key announcement, in milliNEAR
    #[serde(default = "default_storage_top_up_millinear")]
    pub storage_top_up_millinear: u64,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub keepalive: KeepAliveConfig,
}

fn default_credentials_dir() -> PathBuf {
    PathBuf::from(".orderly/credentials")
}

fn default_storage_top_up_millinear() -> u64 {
    1_000
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("network_id", &self.network_id)
            .field("account_id", &self.account_id)
            .field("orderly_key_secret", &"<redacted>")
            .field(
                "near_account_secret",
                &self.near_account_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("credentials_dir", &self.credentials_dir)
            .field("storage_top_up_millinear", &self.storage_top_up_millinear)
            .field("timeouts", &self.timeouts)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}

impl SdkConfig {
    /// Build config from environment variables
    ///
    /// Reads:
    /// - `ORDERLY_NETWORK_ID` (default `testnet`)
    /// - `ORDERLY_ACCOUNT_ID`
    /// - `ORDERLY_KEY_SECRET`
    /// - `NEAR_ACCOUNT_SECRET` (optional)
    /// - `ORDERLY_CREDENTIALS_DIR` (optional)
    /// - `ORDERLY_STORAGE_TOP_UP_MILLINEAR` (optional)
    pub fn from_env() -> Result<Self, SdkError> {
        let network_id = match std::env::var("ORDERLY_NETWORK_ID") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => NetworkId::default(),
        };

        let account_id = std::env::var("ORDERLY_ACCOUNT_ID")
            .map_err(|_| SdkError::MissingCredential("ORDERLY_ACCOUNT_ID not set".into()))?;

        let mut config = Self {
            network_id,
            account_id,
            orderly_key_secret: String::new(),
            near_account_secret: None,
            credentials_dir: default_credentials_dir(),
            storage_top_up_millinear: default_storage_top_up_millinear(),
            timeouts: TimeoutConfig::default(),
            keepalive: KeepAliveConfig::default(),
        };

        if let Ok(dir) = std::env::var("ORDERLY_CREDENTIALS_DIR") {
            if !dir.trim().is_empty() {
                config.credentials_dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = std::env::var("ORDERLY_STORAGE_TOP_UP_MILLINEAR") {
            config.storage_top_up_millinear = raw.trim().parse().map_err(|_| {
                SdkError::Config(format!(
                    "ORDERLY_STORAGE_TOP_UP_MILLINEAR must be an integer (got '{}')",
                    raw
                ))
            })?;
        }

        config.apply_env_secrets()?;
        config.validate()?;
        Ok(config)
    }

    /// Fill secret fields from the environment
    pub fn apply_env_secrets(&mut self) -> Result<(), SdkError> {
        self.orderly_key_secret = std::env::var("ORDERLY_KEY_SECRET")
            .map_err(|_| SdkError::MissingCredential("ORDERLY_KEY_SECRET not set".into()))?;

        self.near_account_secret = std::env::var("NEAR_ACCOUNT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(())
    }

    /// Validate identity fields and tunables
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.account_id.trim().is_empty() {
            return Err(SdkError::MissingCredential("account_id is empty".into()));
        }

        if self.orderly_key_secret.trim().is_empty() {
            return Err(SdkError::MissingCredential(
                "orderly_key_secret is empty".into(),
            ));
        }

        if self.keepalive.interval_secs == 0 {
            return Err(SdkError::Config(
                "keepalive.interval_secs must be > 0".to_string(),
            ));
        }

        if self.keepalive.max_missed == 0 {
            return Err(SdkError::Config(
                "keepalive.max_missed must be >= 1".to_string(),
            ));
        }

        if self.timeouts.chain_call_ms == 0
            || self.timeouts.http_request_ms == 0
            || self.timeouts.ws_auth_ms == 0
        {
            return Err(SdkError::Config(format!(
                "timeouts must be > 0 (got {:?})",
                self.timeouts
            )));
        }

        Ok(())
    }

    pub fn endpoints(&self) -> NetworkEndpoints {
        self.network_id.endpoints()
    }

    /// Configured storage top-up in yoctoNEAR
    pub fn storage_top_up_yocto(&self) -> u128 {
        u128::from(self.storage_top_up_millinear) * ONE_MILLINEAR
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SdkConfig {
        SdkConfig {
            network_id: NetworkId::Testnet,
            account_id: "alice.testnet".to_string(),
            orderly_key_secret: "ed25519:secret".to_string(),
            near_account_secret: None,
            credentials_dir: default_credentials_dir(),
            storage_top_up_millinear: 1_000,
            timeouts: TimeoutConfig::default(),
            keepalive: KeepAliveConfig::default(),
        }
    }

    #[test]
    fn test_endpoint_lookup_testnet() {
        let endpoints = NetworkId::Testnet.endpoints();
        assert_eq!(endpoints.contract_id, "asset-manager.orderly.testnet");
        assert_eq!(endpoints.near_rpc_url, "https://rpc.testnet.near.org");
        assert_eq!(endpoints.rest_base_url, "https://testnet-api.orderly.org");
    }

    #[test]
    fn test_endpoint_lookup_mainnet() {
        let endpoints = NetworkId::Mainnet.endpoints();
        assert_eq!(endpoints.contract_id, "asset-manager.orderly-network.near");
        assert_eq!(endpoints.near_rpc_url, "https://rpc.near.org");
        assert!(endpoints.private_ws_url.starts_with("wss://ws-private.orderly.org"));
    }

    #[test]
    fn test_network_id_parse() {
        assert_eq!("Mainnet".parse::<NetworkId>().unwrap(), NetworkId::Mainnet);
        assert_eq!(" testnet ".parse::<NetworkId>().unwrap(), NetworkId::Testnet);
        assert!("devnet".parse::<NetworkId>().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_account_id_is_missing_credential() {
        let mut config = valid_config();
        config.account_id = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SdkError::MissingCredential(_)), "Got: {}", err);
    }

    #[test]
    fn test_zero_keepalive_rejected() {
        let mut config = valid_config();
        config.keepalive.interval_secs = 0;
        assert!(matches!(config.validate(), Err(SdkError::Config(_))));
    }

    #[test]
    fn test_storage_top_up_conversion() {
        let config = valid_config();
        assert_eq!(config.storage_top_up_yocto(), ONE_NEAR);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = valid_config();
        config.near_account_secret = Some("ed25519:full-access".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ed25519:secret"), "Got: {}", debug);
        assert!(!debug.contains("full-access"), "Got: {}", debug);
        assert!(debug.contains("<redacted>"));
    }
}
