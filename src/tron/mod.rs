pub mod client;
pub mod signer;
pub mod types;

use alloy_primitives::Bytes;
use anyhow::Result;
use async_trait::async_trait;

use crate::artifact::AbiEntry;
use crate::translator::TronAddress;

pub use client::TronClient;
pub use signer::TronSigner;
pub use types::{Confirmation, ExecutionParams, ExecutionResult, TronTxId};

/// Capability to submit and query operations on the TRON network.
///
/// Submissions are signed with the bridge's own key; `owner` is the account
/// the operation executes as and must be that key's address.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Build, sign and broadcast a contract creation.
    async fn submit_create(
        &self,
        owner: &TronAddress,
        bytecode: &[u8],
        abi: &[AbiEntry],
        name: &str,
        params: &ExecutionParams,
    ) -> Result<TronTxId>;

    /// Build, sign and broadcast a contract call with raw calldata.
    async fn submit_call(
        &self,
        owner: &TronAddress,
        target: &TronAddress,
        data: &[u8],
        params: &ExecutionParams,
    ) -> Result<TronTxId>;

    /// Execution info for a transaction, or `None` while it is unconfirmed.
    async fn get_confirmation(&self, txid: &TronTxId) -> Result<Option<Confirmation>>;

    /// Bytecode stored for a deployed contract (empty if none).
    async fn get_deployed_bytecode(&self, address: &TronAddress) -> Result<Bytes>;
}
