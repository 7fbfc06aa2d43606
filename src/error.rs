use alloy_primitives::Address;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

use crate::translator::to_hex;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Request-level failures of the translation engine.
///
/// There is no "not ready" variant: pending receipts and code are
/// reported as `null` / `"0x"`, never as errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(
        "sender mismatch: raw tx sender={} but bridge key maps to {}; sign with the bridge key",
        to_hex(sender.as_slice()),
        to_hex(signer.as_slice())
    )]
    SignerMismatch { sender: Address, signer: Address },

    #[error("TRON broadcast failed: {0}")]
    BroadcastFailure(String),

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// JSON-RPC error code reported to the client.
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::InvalidAddress(_)
            | BridgeError::InvalidParams(_)
            | BridgeError::MalformedTransaction(_) => -32602,
            BridgeError::UnsupportedOperation(_) | BridgeError::SignerMismatch { .. } => -32000,
            BridgeError::BroadcastFailure(_) => -32003,
            BridgeError::UpstreamFailure(_) | BridgeError::Internal(_) => -32603,
        }
    }
}

impl From<BridgeError> for ErrorObjectOwned {
    fn from(err: BridgeError) -> Self {
        ErrorObjectOwned::owned(err.code(), err.to_string(), None::<()>)
    }
}
