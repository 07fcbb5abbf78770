//! NEAR chain backend for the asset manager contract
//!
//! Provisioning goes through `AssetManagerContract`; deposits, withdrawals
//! and storage management are inherent methods on `NearAssetManager`.

mod asset_manager;
mod rpc;
mod transaction;

pub use asset_manager::{
    NearAssetManager, FT_TRANSFER_CALL_GAS, METHOD_DEPOSIT_NATIVE_TOKEN, METHOD_FT_TRANSFER_CALL,
    METHOD_GET_LISTED_TOKENS, METHOD_IS_SYMBOL_LISTED, METHOD_IS_TOKEN_LISTED,
    METHOD_REQUEST_WITHDRAW, METHOD_STORAGE_WITHDRAW, ONE_YOCTO, REGISTRATION_DEPOSIT,
};
pub use rpc::NearRpcClient;
pub use transaction::{
    Action, FunctionCallAction, SignedTransaction, Transaction, DEFAULT_FUNCTION_CALL_GAS,
};
