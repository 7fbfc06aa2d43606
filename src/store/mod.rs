//! Persistent bridge state: shadow nonces, the transaction registry and the
//! deployed-code cache.
//!
//! The engine only sees the [`BridgeStore`] trait; [`MemoryStore`] is the
//! process-local implementation used by the server.

pub mod memory;

use alloy_primitives::{Address, Bytes, B256};

use crate::translator::TronAddress;
use crate::tron::{Confirmation, TronTxId};

pub use memory::MemoryStore;

/// What a submitted Ethereum transaction does on TRON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    /// Contract call against an existing contract.
    Call { target: Address },
    /// Contract creation.
    Create {
        /// CREATE address derived from sender and nonce; what clients see
        expected_address: Address,
        /// Address TRON actually assigned, once reported
        resolved_address: Option<TronAddress>,
        /// Deployed runtime code, once fetched
        code: Option<Bytes>,
    },
}

/// Progress of handing a transaction to TRON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Registered but dispatch has not completed.
    Reserved,
    Submitted { foreign_tx_id: TronTxId },
    Failed { reason: String },
}

/// Everything the bridge remembers about one Ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub eth_hash: B256,
    pub sender: Address,
    pub nonce: u64,
    pub input: Bytes,
    pub kind: TxKind,
    pub submission: SubmissionState,
    /// Cached once TRON reports the transaction as confirmed
    pub confirmation: Option<Confirmation>,
}

impl TransactionRecord {
    pub fn foreign_tx_id(&self) -> Option<&TronTxId> {
        match &self.submission {
            SubmissionState::Submitted { foreign_tx_id } => Some(foreign_tx_id),
            _ => None,
        }
    }

    pub fn expected_address(&self) -> Option<Address> {
        match &self.kind {
            TxKind::Create {
                expected_address, ..
            } => Some(*expected_address),
            TxKind::Call { .. } => None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.submission, SubmissionState::Submitted { .. })
    }
}

/// Storage interface used by the translation engine.
///
/// Implementations must make each method atomic with respect to the others.
/// In particular a creation record and its expected-address index entry must
/// become visible together.
pub trait BridgeStore: Send + Sync {
    /// Next nonce to report for `sender` (0 if never seen).
    fn next_nonce(&self, sender: &Address) -> u64;

    /// Raise the shadow nonce so that `next_nonce(sender) > nonce`.
    fn observe_nonce(&self, sender: &Address, nonce: u64);

    /// Insert or replace a record keyed by its Ethereum hash.
    ///
    /// A creation only takes over the expected-address index from another
    /// record when that record is not `Submitted`.
    fn insert_transaction(&self, record: TransactionRecord);

    /// Insert a creation record unless a record with the same hash is already
    /// `Reserved` or `Submitted`. Returns whether the record was stored.
    fn reserve_creation(&self, record: TransactionRecord) -> bool;

    fn transaction(&self, hash: &B256) -> Option<TransactionRecord>;

    /// Apply `f` to the stored record and return the updated copy. A creation
    /// that becomes `Submitted` owns its expected-address index entry.
    fn update_transaction(
        &self,
        hash: &B256,
        f: &mut dyn FnMut(&mut TransactionRecord),
    ) -> Option<TransactionRecord>;

    /// Record of the creation whose expected address is `address`.
    fn transaction_for_expected(&self, address: &Address) -> Option<TransactionRecord>;

    fn cached_code(&self, address: &Address) -> Option<Bytes>;

    fn cache_code(&self, address: Address, code: Bytes);
}
