//! Ethereum-shaped receipt and transaction objects built from bridge records.
//!
//! TRON reports neither event logs in EVM form nor gas accounting for the
//! translated operation, so those fields are always empty/zero.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::{quantity, to_hex};
use crate::store::{TransactionRecord, TxKind};
use crate::tron::Confirmation;

/// Fixed gas price reported by `eth_gasPrice` (10 gwei).
pub const GAS_PRICE_WEI: u64 = 10_000_000_000;

/// Fixed gas estimate reported by `eth_estimateGas`.
pub const GAS_ESTIMATE: u64 = 8_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub status: String,
    pub contract_address: Option<String>,
    pub gas_used: String,
    pub cumulative_gas_used: String,
    pub effective_gas_price: String,
    pub logs: Vec<serde_json::Value>,
    pub logs_bloom: String,
    #[serde(rename = "type")]
    pub tx_type: String,
}

impl EthReceipt {
    /// Build a receipt for a confirmed record.
    ///
    /// For creations the reported contract address is always the
    /// precomputed CREATE address, never the one TRON reported.
    pub fn from_record(record: &TransactionRecord, confirmation: &Confirmation) -> Self {
        let (to, contract_address) = match &record.kind {
            TxKind::Call { target } => (Some(to_hex(target.as_slice())), None),
            TxKind::Create {
                expected_address, ..
            } => (None, Some(to_hex(expected_address.as_slice()))),
        };

        EthReceipt {
            transaction_hash: to_hex(record.eth_hash),
            transaction_index: quantity(0),
            block_hash: confirmation.block_number.map(|n| to_hex(block_hash(n))),
            block_number: confirmation.block_number.map(quantity),
            from: to_hex(record.sender.as_slice()),
            to,
            status: if confirmation.result.is_success() {
                "0x1".to_string()
            } else {
                "0x0".to_string()
            },
            contract_address,
            gas_used: quantity(0),
            cumulative_gas_used: quantity(0),
            effective_gas_price: quantity(GAS_PRICE_WEI),
            logs: Vec::new(),
            logs_bloom: format!("0x{}", "0".repeat(512)),
            tx_type: quantity(0),
        }
    }
}

/// Minimal transaction object for `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub nonce: String,
    pub input: String,
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub transaction_index: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: String,
}

impl EthTransaction {
    pub fn from_record(record: &TransactionRecord) -> Self {
        let to = match &record.kind {
            TxKind::Call { target } => Some(to_hex(target.as_slice())),
            TxKind::Create { .. } => None,
        };
        let block_number = record
            .confirmation
            .as_ref()
            .and_then(|c| c.block_number);

        EthTransaction {
            hash: to_hex(record.eth_hash),
            from: to_hex(record.sender.as_slice()),
            to,
            nonce: quantity(record.nonce),
            input: to_hex(&record.input),
            value: quantity(0),
            gas: quantity(GAS_ESTIMATE),
            gas_price: quantity(GAS_PRICE_WEI),
            block_hash: block_number.map(|n| to_hex(block_hash(n))),
            block_number: block_number.map(quantity),
            transaction_index: block_number.map(|_| quantity(0)),
            tx_type: quantity(0),
        }
    }
}

/// Deterministic stand-in for a block hash, derived from the TRON block number.
pub fn block_hash(block_number: u64) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(b"TRON_BLOCK_");
    hasher.update(block_number.to_be_bytes());
    B256::from_slice(&hasher.finalize())
}
