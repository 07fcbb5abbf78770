//! Provisioning client
//!
//! Drives an account from "unregistered" to "fully provisioned":
//! 1. account registered with the asset manager
//! 2. Orderly key announced (storage topped up first if needed)
//! 3. trading key registered, with its secret persisted locally
//!
//! Each step reads its predicate first and writes only when it is false,
//! so running `provision()` on a provisioned account performs no writes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::contract::AssetManagerContract;
use crate::error::{SdkError, SdkResult};
use crate::keys::{AccountIdentity, CredentialStore, TradingKeyPair};

/// Sequence runs before giving up on a disagreeing chain state
const MAX_ATTEMPTS: u32 = 2;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for the provisioning sequence
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    /// Timeout applied to every chain call
    pub call_timeout: Duration,
    /// Minimum storage top-up before announcing, in yoctoNEAR
    pub storage_top_up: u128,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            storage_top_up: crate::config::ONE_NEAR,
        }
    }
}

/// A chain write performed during provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningWrite {
    RegisterAccount,
    StorageDeposit { amount: u128 },
    AnnounceKey,
    SetTradingKey { normalized_key_id: String },
}

/// The three provisioning predicates as read from the chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisioningState {
    pub account_exists: bool,
    pub key_announced: bool,
    pub trading_key_set: bool,
}

impl ProvisioningState {
    pub fn is_complete(&self) -> bool {
        self.account_exists && self.key_announced && self.trading_key_set
    }
}

/// Outcome of a successful `provision()`
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    /// Normalized id of the trading key registered on-chain
    pub trading_key_id: String,
    /// Local key pair; `None` when the key was registered elsewhere and no
    /// secret is persisted for this account and Orderly key
    pub trading_key: Option<TradingKeyPair>,
    /// Writes performed, in order
    pub writes: Vec<ProvisioningWrite>,
}

/// Idempotent provisioning over an `AssetManagerContract` and a `CredentialStore`
pub struct ProvisioningClient<C, S> {
    contract: C,
    store: S,
    identity: AccountIdentity,
    orderly_key: String,
    settings: ProvisioningSettings,
    in_flight: Mutex<()>,
}

impl<C, S> ProvisioningClient<C, S>
where
    C: AssetManagerContract,
    S: CredentialStore,
{
    /// # Arguments
    /// * `contract` - Asset manager handle
    /// * `store` - Trading key persistence
    /// * `identity` - Account to provision
    /// * `orderly_key` - Orderly public key (`ed25519:...`)
    pub fn new(contract: C, store: S, identity: AccountIdentity, orderly_key: impl Into<String>) -> Self {
        Self {
            contract,
            store,
            identity,
            orderly_key: orderly_key.into(),
            settings: ProvisioningSettings::default(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_settings(mut self, settings: ProvisioningSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read all three predicates
    pub async fn read_state(&self) -> SdkResult<ProvisioningState> {
        let account_id = self.identity.account_id();
        Ok(ProvisioningState {
            account_exists: self
                .call("account_exists", self.contract.account_exists(account_id))
                .await?,
            key_announced: self
                .call(
                    "is_key_announced",
                    self.contract.is_key_announced(account_id, &self.orderly_key),
                )
                .await?,
            trading_key_set: self
                .call(
                    "is_trading_key_set",
                    self.contract.is_trading_key_set(account_id, &self.orderly_key),
                )
                .await?,
        })
    }

    /// Run the provisioning sequence
    ///
    /// Concurrent calls on the same client are serialized. When writes
    /// were made, the predicates are re-read; a disagreement re-runs the
    /// sequence once and then fails with `ProvisioningConflict`.
    pub async fn provision(&self) -> SdkResult<ProvisionedAccount> {
        let _guard = self.in_flight.lock().await;
        self.require_credentials()?;

        let account_id = self.identity.account_id();
        info!(phase = "provisioning", account_id = %account_id, network = %self.identity.network_id(), "Starting provisioning");

        let mut writes = Vec::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let writes_before = writes.len();
            let (trading_key_id, trading_key) = self.run_sequence(&mut writes).await?;

            if writes.len() == writes_before {
                info!(
                    phase = "provisioning",
                    account_id = %account_id,
                    writes = writes.len(),
                    "Account fully provisioned"
                );
                return Ok(ProvisionedAccount {
                    trading_key_id,
                    trading_key,
                    writes,
                });
            }

            let state = self.read_state().await?;
            let key_matches = self
                .registered_key_matches(&writes[writes_before..], &trading_key_id)
                .await?;

            if state.is_complete() && key_matches {
                info!(
                    phase = "provisioning",
                    account_id = %account_id,
                    writes = writes.len(),
                    "Account fully provisioned"
                );
                return Ok(ProvisionedAccount {
                    trading_key_id,
                    trading_key,
                    writes,
                });
            }

            warn!(
                phase = "provisioning",
                account_id = %account_id,
                attempt,
                ?state,
                key_matches,
                "Chain state disagrees after provisioning writes"
            );

            if !key_matches {
                // another client registered a different key; ours is orphaned
                self.store.clear(account_id, &self.orderly_key)?;
            }
        }

        Err(SdkError::ProvisioningConflict(format!(
            "account '{}' not provisioned after {} attempts",
            account_id, MAX_ATTEMPTS
        )))
    }

    async fn run_sequence(
        &self,
        writes: &mut Vec<ProvisioningWrite>,
    ) -> SdkResult<(String, Option<TradingKeyPair>)> {
        self.ensure_account(writes).await?;
        self.ensure_key_announced(writes).await?;
        self.ensure_trading_key(writes).await
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn ensure_account(&self, writes: &mut Vec<ProvisioningWrite>) -> SdkResult<()> {
        let account_id = self.identity.account_id();
        if self
            .call("account_exists", self.contract.account_exists(account_id))
            .await?
        {
            debug!(step = "account", account_id = %account_id, "Account already registered");
            return Ok(());
        }

        info!(step = "account", account_id = %account_id, "Registering account");
        self.call("register_account", self.contract.register_account(account_id))
            .await?;
        writes.push(ProvisioningWrite::RegisterAccount);
        Ok(())
    }

    async fn ensure_key_announced(&self, writes: &mut Vec<ProvisioningWrite>) -> SdkResult<()> {
        let account_id = self.identity.account_id();
        if self
            .call(
                "is_key_announced",
                self.contract.is_key_announced(account_id, &self.orderly_key),
            )
            .await?
        {
            debug!(step = "announce", account_id = %account_id, "Orderly key already announced");
            return Ok(());
        }

        let cost = self
            .call(
                "storage_cost_of_announcement",
                self.contract.storage_cost_of_announcement(),
            )
            .await?;
        let balance = self
            .call("storage_balance_of", self.contract.storage_balance_of(account_id))
            .await?;
        let usage = self
            .call("storage_usage_of", self.contract.storage_usage_of(account_id))
            .await?;

        let required = usage.saturating_add(cost).saturating_sub(balance.total);
        if required > 0 {
            let amount = required.max(self.settings.storage_top_up);
            info!(
                step = "announce",
                account_id = %account_id,
                required = %required,
                amount = %amount,
                "Topping up storage before announcing key"
            );
            self.call(
                "storage_deposit",
                self.contract.storage_deposit(account_id, amount),
            )
            .await?;
            writes.push(ProvisioningWrite::StorageDeposit { amount });
        }

        info!(step = "announce", account_id = %account_id, orderly_key = %self.orderly_key, "Announcing Orderly key");
        self.call("announce_key", self.contract.announce_key()).await?;
        writes.push(ProvisioningWrite::AnnounceKey);
        Ok(())
    }

    async fn ensure_trading_key(
        &self,
        writes: &mut Vec<ProvisioningWrite>,
    ) -> SdkResult<(String, Option<TradingKeyPair>)> {
        let account_id = self.identity.account_id();
        let is_set = self
            .call(
                "is_trading_key_set",
                self.contract.is_trading_key_set(account_id, &self.orderly_key),
            )
            .await?;

        if is_set {
            // the store is scoped to this Orderly key, so a cached pair is the registered one
            if let Some(key) = self.store.load(account_id, &self.orderly_key)? {
                debug!(step = "trading_key", account_id = %account_id, "Using persisted trading key");
                return Ok((key.normalized_key_id().to_string(), Some(key)));
            }

            let key_id = self
                .call(
                    "get_trading_key_id",
                    self.contract.get_trading_key_id(account_id, &self.orderly_key),
                )
                .await?;
            warn!(
                step = "trading_key",
                account_id = %account_id,
                "Trading key registered but no local secret; order signing unavailable"
            );
            return Ok((key_id, None));
        }

        // An unregistered persisted key is reused rather than replaced
        let key = match self.store.load(account_id, &self.orderly_key)? {
            Some(key) => key,
            None => {
                let key = TradingKeyPair::generate();
                self.store.save(account_id, &self.orderly_key, &key)?;
                key
            }
        };

        info!(
            step = "trading_key",
            account_id = %account_id,
            trading_key_id = %key.normalized_key_id(),
            "Registering trading key"
        );
        self.call(
            "set_trading_key",
            self.contract.set_trading_key(key.normalized_key_id()),
        )
        .await?;
        writes.push(ProvisioningWrite::SetTradingKey {
            normalized_key_id: key.normalized_key_id().to_string(),
        });

        Ok((key.normalized_key_id().to_string(), Some(key)))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// After registering a trading key, confirm the chain holds our id
    async fn registered_key_matches(
        &self,
        attempt_writes: &[ProvisioningWrite],
        trading_key_id: &str,
    ) -> SdkResult<bool> {
        let wrote_key = attempt_writes
            .iter()
            .any(|w| matches!(w, ProvisioningWrite::SetTradingKey { .. }));
        if !wrote_key {
            return Ok(true);
        }

        let on_chain = self
            .call(
                "get_trading_key_id",
                self.contract
                    .get_trading_key_id(self.identity.account_id(), &self.orderly_key),
            )
            .await?;
        Ok(on_chain == trading_key_id)
    }

    fn require_credentials(&self) -> SdkResult<()> {
        if self.identity.account_id().trim().is_empty() {
            return Err(SdkError::MissingCredential("account_id is empty".into()));
        }
        if self.orderly_key.trim().is_empty() {
            return Err(SdkError::MissingCredential("orderly key is empty".into()));
        }
        Ok(())
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> SdkResult<T>
    where
        F: Future<Output = SdkResult<T>>,
    {
        let timeout = self.settings.call_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = timeout.as_millis() as u64, "Chain call timed out");
                Err(SdkError::NetworkTimeout(timeout.as_millis() as u64))
            }
        }
    }
}
