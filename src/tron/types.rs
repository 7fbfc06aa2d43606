use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::translator::TronAddress;

/// Identifier of a TRON transaction (64 lowercase hex chars, no `0x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TronTxId(String);

impl TronTxId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.strip_prefix("0x").map(str::to_string).unwrap_or(id);
        Self(id.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TronTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed execution limits applied to every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionParams {
    /// Maximum TRX (in sun) the bridge account may burn per transaction
    pub fee_limit_sun: u64,
    /// Maximum energy the contract origin provides per call
    pub origin_energy_limit: u64,
    /// Share of energy cost paid by the caller rather than the origin (0-100)
    pub user_fee_percentage: u8,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            fee_limit_sun: 150_000_000,
            origin_energy_limit: 10_000_000,
            user_fee_percentage: 100,
        }
    }
}

/// Outcome of contract execution as reported by `gettransactioninfobyid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Failed(String),
    /// The transaction info carried no receipt object at all.
    Unreported,
}

impl ExecutionResult {
    /// Map a receipt `result` string.
    pub fn from_receipt_result(result: &str) -> Self {
        match result {
            "SUCCESS" => ExecutionResult::Success,
            // Misspelled variant seen from some TRON nodes; unconfirmed against current java-tron.
            "SUCESS" => {
                debug!("Receipt reported legacy result spelling SUCESS");
                ExecutionResult::Success
            }
            other => ExecutionResult::Failed(other.to_string()),
        }
    }

    /// Outcome of a confirmed transaction. A missing receipt reads as success;
    /// a receipt without a success result, or a top-level `FAILED`, does not.
    pub fn from_info(info: &TransactionInfo) -> Self {
        let outcome = match &info.receipt {
            None => ExecutionResult::Unreported,
            Some(receipt) => match receipt.result.as_deref() {
                Some(result) => Self::from_receipt_result(result),
                None => ExecutionResult::Failed("receipt without result".to_string()),
            },
        };

        match info.result.as_deref() {
            Some("FAILED") if outcome.is_success() => ExecutionResult::Failed("FAILED".to_string()),
            _ => outcome,
        }
    }

    /// Whether the receipt should report `status: 0x1`.
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionResult::Failed(_))
    }
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub block_number: Option<u64>,
    pub result: ExecutionResult,
    /// Contract created by the transaction, once TRON reports it
    pub contract_address: Option<TronAddress>,
}

// --- Wallet HTTP API wire types ---

/// Request body for `wallet/deploycontract`.
#[derive(Debug, Serialize)]
pub struct DeployContractRequest {
    pub owner_address: String,
    /// ABI as a JSON string of the form `{"entrys": [...]}`
    pub abi: String,
    pub bytecode: String,
    pub fee_limit: u64,
    pub call_value: u64,
    pub consume_user_resource_percent: u8,
    pub origin_energy_limit: u64,
    pub name: String,
    pub visible: bool,
}

/// Request body for `wallet/triggersmartcontract`.
#[derive(Debug, Serialize)]
pub struct TriggerContractRequest {
    pub owner_address: String,
    pub contract_address: String,
    /// Raw calldata (selector + encoded args), hex without `0x`
    pub data: String,
    pub call_value: u64,
    pub fee_limit: u64,
    pub visible: bool,
}

/// Response from `wallet/triggersmartcontract`.
#[derive(Debug, Deserialize)]
pub struct TriggerContractResponse {
    #[serde(default)]
    pub result: Option<ApiReturn>,
    #[serde(default)]
    pub transaction: Option<serde_json::Value>,
}

/// `Return` message used by several wallet endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ApiReturn {
    #[serde(default)]
    pub result: Option<bool>,
    #[serde(default)]
    pub code: Option<String>,
    /// Hex-encoded UTF-8 message
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from `wallet/broadcasttransaction`.
#[derive(Debug, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub result: Option<bool>,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from `wallet/gettransactioninfobyid`. Empty object while unconfirmed.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub receipt: Option<ResourceReceipt>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default, rename = "resMessage")]
    pub res_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceReceipt {
    #[serde(default)]
    pub result: Option<String>,
}

/// Response from `wallet/getcontract`. Nodes differ in which field carries the code.
#[derive(Debug, Default, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub bytecode: Option<String>,
    #[serde(default, rename = "byteCode")]
    pub byte_code: Option<String>,
    #[serde(default, rename = "runtimeBytecode")]
    pub runtime_bytecode_camel: Option<String>,
    #[serde(default)]
    pub runtime_bytecode: Option<String>,
    #[serde(default)]
    pub runtimecode: Option<String>,
}

impl ContractInfo {
    /// First non-empty code field, hex without `0x`.
    pub fn code_hex(&self) -> Option<&str> {
        [
            &self.bytecode,
            &self.byte_code,
            &self.runtime_bytecode_camel,
            &self.runtime_bytecode,
            &self.runtimecode,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.strip_prefix("0x").unwrap_or(s))
        .find(|s| !s.is_empty())
    }
}
