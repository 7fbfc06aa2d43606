use alloy_primitives::B256;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::translator::receipt::{GAS_ESTIMATE, GAS_PRICE_WEI};
use crate::translator::{decode_hex, parse_eth_address, quantity, to_hex};

/// Handler for eth_getTransactionCount
pub async fn get_transaction_count(bridge: &Bridge, params: &[Value]) -> BridgeResult<Value> {
    let address = parse_eth_address(str_param(params, 0, "address")?)?;
    let count = bridge.transaction_count(&address);
    debug!("eth_getTransactionCount: {} -> {}", address, count);
    Ok(Value::String(quantity(count)))
}

/// Handler for eth_estimateGas. TRON energy is bounded by the fee limit
/// instead, so a fixed generous estimate is returned.
pub async fn estimate_gas() -> BridgeResult<Value> {
    Ok(Value::String(quantity(GAS_ESTIMATE)))
}

/// Handler for eth_gasPrice
pub async fn gas_price() -> BridgeResult<Value> {
    Ok(Value::String(quantity(GAS_PRICE_WEI)))
}

/// Handler for eth_sendRawTransaction
pub async fn send_raw_transaction(bridge: &Bridge, params: &[Value]) -> BridgeResult<Value> {
    let raw = params
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| {
            BridgeError::MalformedTransaction(
                "eth_sendRawTransaction expects a 0x-prefixed hex string".to_string(),
            )
        })?;
    debug!("eth_sendRawTransaction: {} bytes", raw.len().saturating_sub(2) / 2);

    let hash = bridge.send_raw_transaction(raw).await?;
    Ok(Value::String(to_hex(hash)))
}

/// Handler for eth_getTransactionReceipt
pub async fn get_transaction_receipt(bridge: &Bridge, params: &[Value]) -> BridgeResult<Value> {
    let hash = parse_hash(str_param(params, 0, "transaction hash")?)?;
    let receipt = bridge.get_receipt(&hash).await;
    debug!(
        "eth_getTransactionReceipt: {} -> {}",
        hash,
        if receipt.is_some() { "ready" } else { "pending" }
    );
    to_json(receipt)
}

/// Handler for eth_getCode
pub async fn get_code(bridge: &Bridge, params: &[Value]) -> BridgeResult<Value> {
    let address = parse_eth_address(str_param(params, 0, "address")?)?;
    let block = params.get(1).filter(|v| !v.is_null()).cloned();
    let code = bridge.get_code(&address, block).await?;
    debug!("eth_getCode: {} -> {} bytes", address, code.len().saturating_sub(2) / 2);
    Ok(Value::String(code))
}

/// Handler for eth_getTransactionByHash
pub async fn get_transaction_by_hash(bridge: &Bridge, params: &[Value]) -> BridgeResult<Value> {
    let hash = parse_hash(str_param(params, 0, "transaction hash")?)?;
    to_json(bridge.get_transaction(&hash))
}

fn str_param<'a>(params: &'a [Value], index: usize, name: &str) -> BridgeResult<&'a str> {
    match params.get(index) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(BridgeError::InvalidParams(format!(
            "{} must be a string, got {}",
            name, other
        ))),
        None => Err(BridgeError::InvalidParams(format!("missing {}", name))),
    }
}

fn parse_hash(input: &str) -> BridgeResult<B256> {
    let bytes = decode_hex(input)
        .ok()
        .filter(|b| b.len() == 32 && input.starts_with("0x"))
        .ok_or_else(|| {
            BridgeError::InvalidParams(format!("{}: expected 0x followed by 64 hex digits", input))
        })?;
    Ok(B256::from_slice(&bytes))
}

fn to_json<T: Serialize>(value: Option<T>) -> BridgeResult<Value> {
    match value {
        Some(v) => serde_json::to_value(v).map_err(|e| BridgeError::Internal(e.to_string())),
        None => Ok(Value::Null),
    }
}
