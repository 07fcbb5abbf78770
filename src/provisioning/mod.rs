//! On-chain provisioning of the key hierarchy

mod client;
mod contract;

pub use client::{
    ProvisionedAccount, ProvisioningClient, ProvisioningSettings, ProvisioningState,
    ProvisioningWrite,
};
pub use contract::{
    deserialize_yocto, AssetManagerContract, StorageBalance, METHOD_ANNOUNCE_KEY,
    METHOD_GET_TRADING_KEY, METHOD_IS_KEY_ANNOUNCED, METHOD_IS_TRADING_KEY_SET,
    METHOD_SET_TRADING_KEY, METHOD_STORAGE_BALANCE_OF, METHOD_STORAGE_COST_OF_ANNOUNCE_KEY,
    METHOD_STORAGE_DEPOSIT, METHOD_USER_ACCOUNT_EXISTS, METHOD_USER_STORAGE_USAGE,
};
