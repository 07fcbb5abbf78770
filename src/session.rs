//! Composition root: provision the account, then wire the signer into the
//! REST client and the private stream

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::SdkConfig;
use crate::error::SdkResult;
use crate::http::create_http_client;
use crate::keys::{AccountIdentity, CredentialStore, FileCredentialStore, NearKeyPair, OrderlyKeyPair};
use crate::near::{NearAssetManager, NearRpcClient};
use crate::provisioning::{
    AssetManagerContract, ProvisionedAccount, ProvisioningClient, ProvisioningSettings,
};
use crate::rest::RestClient;
use crate::signing::RequestSigner;
use crate::ws::{WebSocketAuthSession, WsSessionConfig};

/// A provisioned account with ready-to-use REST and stream clients
pub struct OrderlySession {
    provisioned: ProvisionedAccount,
    signer: Arc<RequestSigner>,
    rest: RestClient,
    stream: WebSocketAuthSession,
}

impl OrderlySession {
    /// Provision against the NEAR asset manager and open nothing yet
    ///
    /// Change calls are signed with `near_account_secret` when set, else
    /// with the Orderly key (which must then be a full-access key).
    pub async fn open(config: &SdkConfig) -> SdkResult<Self> {
        let (identity, orderly_key) = credentials(config)?;
        let endpoints = identity.endpoints();

        let chain_signer = match &config.near_account_secret {
            Some(secret) => NearKeyPair::from_secret_str(secret)?,
            None => orderly_key.near_key().clone(),
        };

        let chain_timeout = Duration::from_millis(config.timeouts.chain_call_ms);
        let rpc = NearRpcClient::new(
            create_http_client("near-rpc", chain_timeout),
            endpoints.near_rpc_url,
            chain_timeout,
        );
        let contract = NearAssetManager::new(
            rpc,
            endpoints.contract_id,
            identity.account_id(),
            chain_signer,
        );
        let store = FileCredentialStore::new(&config.credentials_dir);

        let provisioning = ProvisioningClient::new(contract, store, identity, orderly_key.public_key())
            .with_settings(ProvisioningSettings {
                call_timeout: chain_timeout,
                storage_top_up: config.storage_top_up_yocto(),
            });

        Self::open_with(config, &provisioning).await
    }

    /// Same as `open` over any contract backend and credential store
    pub async fn open_with<C, S>(
        config: &SdkConfig,
        provisioning: &ProvisioningClient<C, S>,
    ) -> SdkResult<Self>
    where
        C: AssetManagerContract,
        S: CredentialStore,
    {
        let (identity, orderly_key) = credentials(config)?;
        let account_id = identity.account_id().to_string();

        let provisioned = provisioning.provision().await?;
        info!(
            phase = "session",
            account_id = %account_id,
            writes = provisioned.writes.len(),
            "Account provisioned"
        );

        let mut signer = RequestSigner::new(identity.clone(), orderly_key);
        match &provisioned.trading_key {
            Some(key) => signer = signer.with_trading_key(key.clone()),
            None => warn!(
                account_id = %account_id,
                trading_key_id = %provisioned.trading_key_id,
                "Trading key registered without a local secret; order calls will fail"
            ),
        }
        let signer = Arc::new(signer);

        let http_timeout = Duration::from_millis(config.timeouts.http_request_ms);
        let rest = RestClient::new(
            create_http_client("orderly-rest", http_timeout),
            identity.endpoints().rest_base_url,
            Arc::clone(&signer),
            http_timeout,
        );
        let stream = WebSocketAuthSession::new(Arc::clone(&signer), WsSessionConfig::from(config));

        Ok(Self {
            provisioned,
            signer,
            rest,
            stream,
        })
    }

    pub fn provisioned(&self) -> &ProvisionedAccount {
        &self.provisioned
    }

    pub fn trading_key_id(&self) -> &str {
        &self.provisioned.trading_key_id
    }

    pub fn signer(&self) -> Arc<RequestSigner> {
        Arc::clone(&self.signer)
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn stream(&self) -> &WebSocketAuthSession {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut WebSocketAuthSession {
        &mut self.stream
    }

    /// Close the private stream if it is open
    pub async fn close(&mut self) -> SdkResult<()> {
        self.stream.close().await
    }
}

fn credentials(config: &SdkConfig) -> SdkResult<(AccountIdentity, OrderlyKeyPair)> {
    config.validate()?;
    let identity = AccountIdentity::new(config.account_id.clone(), config.network_id)?;
    let orderly_key = OrderlyKeyPair::from_secret_str(&config.orderly_key_secret)?;
    Ok((identity, orderly_key))
}
