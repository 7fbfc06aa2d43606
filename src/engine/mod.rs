//! Translation engine: turns Ethereum transaction submissions into TRON
//! operations and answers receipt/code queries from bridge state.
//!
//! ```text
//! eth_sendRawTransaction ──► dispatch ──► ChainClient (deploy / trigger)
//!                               │
//!                               ▼
//!                          BridgeStore (nonces, records, code)
//!                               ▲
//! eth_getTransactionReceipt ─► resolver ──► ChainClient (tx info, contract code)
//! eth_getCode ───────────────►    │
//!                                 └──────► Upstream (addresses we don't own)
//! ```

mod dispatch;
mod resolver;

use std::sync::Arc;

use alloy_primitives::Address;

use crate::artifact::ArtifactProvider;
use crate::store::BridgeStore;
use crate::tron::{ChainClient, ExecutionParams};
use crate::upstream::Upstream;

/// Shared engine state. Cheap to clone.
#[derive(Clone)]
pub struct Bridge {
    store: Arc<dyn BridgeStore>,
    chain: Arc<dyn ChainClient>,
    upstream: Arc<dyn Upstream>,
    artifacts: Arc<dyn ArtifactProvider>,
    /// Ethereum address of the bridge key; the only accepted sender
    signer: Address,
    params: ExecutionParams,
}

impl Bridge {
    pub fn new(
        store: Arc<dyn BridgeStore>,
        chain: Arc<dyn ChainClient>,
        upstream: Arc<dyn Upstream>,
        artifacts: Arc<dyn ArtifactProvider>,
        signer: Address,
        params: ExecutionParams,
    ) -> Self {
        Self {
            store,
            chain,
            upstream,
            artifacts,
            signer,
            params,
        }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }
}
