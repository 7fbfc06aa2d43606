use std::collections::HashMap;
use std::sync::RwLock;

use alloy_primitives::{Address, Bytes, B256};
use tracing::debug;

use super::{BridgeStore, SubmissionState, TransactionRecord};

/// Per-sender high-water mark of observed nonces.
#[derive(Debug, Default)]
pub struct NonceLedger {
    next: RwLock<HashMap<Address, u64>>,
}

impl NonceLedger {
    pub fn peek(&self, sender: &Address) -> u64 {
        let next = self.next.read().unwrap_or_else(|e| e.into_inner());
        next.get(sender).copied().unwrap_or(0)
    }

    pub fn observe(&self, sender: &Address, nonce: u64) {
        let mut next = self.next.write().unwrap_or_else(|e| e.into_inner());
        let entry = next.entry(*sender).or_insert(0);
        let candidate = nonce.saturating_add(1);
        if candidate > *entry {
            *entry = candidate;
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_hash: HashMap<B256, TransactionRecord>,
    by_expected: HashMap<Address, B256>,
}

impl RegistryInner {
    fn put(&mut self, record: TransactionRecord) {
        if let Some(expected) = record.expected_address() {
            // A landed creation keeps its address until another one lands
            let held_by_submitted = self
                .by_expected
                .get(&expected)
                .filter(|hash| **hash != record.eth_hash)
                .and_then(|hash| self.by_hash.get(hash))
                .is_some_and(TransactionRecord::is_submitted);
            if !held_by_submitted || record.is_submitted() {
                self.by_expected.insert(expected, record.eth_hash);
            }
        }
        self.by_hash.insert(record.eth_hash, record);
    }
}

/// Transaction records plus the expected-address index, under one lock.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    inner: RwLock<RegistryInner>,
}

impl TransactionRegistry {
    pub fn insert(&self, record: TransactionRecord) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.put(record);
    }

    /// Insert unless the hash is already in flight or submitted.
    pub fn reserve(&self, record: TransactionRecord) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = inner.by_hash.get(&record.eth_hash) {
            if !matches!(existing.submission, SubmissionState::Failed { .. }) {
                return false;
            }
        }
        inner.put(record);
        true
    }

    pub fn get(&self, hash: &B256) -> Option<TransactionRecord> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_hash.get(hash).cloned()
    }

    pub fn update(
        &self,
        hash: &B256,
        f: &mut dyn FnMut(&mut TransactionRecord),
    ) -> Option<TransactionRecord> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let record = inner.by_hash.get_mut(hash)?;
        f(record);
        let updated = record.clone();
        if updated.is_submitted() {
            if let Some(expected) = updated.expected_address() {
                inner.by_expected.insert(expected, *hash);
            }
        }
        Some(updated)
    }

    pub fn by_expected(&self, address: &Address) -> Option<TransactionRecord> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let hash = inner.by_expected.get(address)?;
        inner.by_hash.get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deployed code keyed by Ethereum address. Empty code is never cached.
#[derive(Debug, Default)]
pub struct CodeCache {
    code: RwLock<HashMap<Address, Bytes>>,
}

impl CodeCache {
    pub fn get(&self, address: &Address) -> Option<Bytes> {
        let code = self.code.read().unwrap_or_else(|e| e.into_inner());
        code.get(address).cloned()
    }

    pub fn insert(&self, address: Address, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        let mut code = self.code.write().unwrap_or_else(|e| e.into_inner());
        code.insert(address, bytes);
    }
}

/// Process-local [`BridgeStore`]. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nonces: NonceLedger,
    transactions: TransactionRegistry,
    code: CodeCache,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

impl BridgeStore for MemoryStore {
    fn next_nonce(&self, sender: &Address) -> u64 {
        self.nonces.peek(sender)
    }

    fn observe_nonce(&self, sender: &Address, nonce: u64) {
        self.nonces.observe(sender, nonce);
        debug!(
            "Shadow nonce for {} is now {}",
            sender,
            self.nonces.peek(sender)
        );
    }

    fn insert_transaction(&self, record: TransactionRecord) {
        self.transactions.insert(record);
    }

    fn reserve_creation(&self, record: TransactionRecord) -> bool {
        self.transactions.reserve(record)
    }

    fn transaction(&self, hash: &B256) -> Option<TransactionRecord> {
        self.transactions.get(hash)
    }

    fn update_transaction(
        &self,
        hash: &B256,
        f: &mut dyn FnMut(&mut TransactionRecord),
    ) -> Option<TransactionRecord> {
        self.transactions.update(hash, f)
    }

    fn transaction_for_expected(&self, address: &Address) -> Option<TransactionRecord> {
        self.transactions.by_expected(address)
    }

    fn cached_code(&self, address: &Address) -> Option<Bytes> {
        self.code.get(address)
    }

    fn cache_code(&self, address: Address, code: Bytes) {
        self.code.insert(address, code);
    }
}
