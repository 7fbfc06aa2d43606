//! Fixtures shared by unit tests: signed Ethereum transactions and in-memory
//! stand-ins for the TRON node and the upstream JSON-RPC endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use serde_json::Value;
use sha3::{Digest, Keccak256};
use tokio::sync::Notify;

use crate::artifact::AbiEntry;
use crate::error::{BridgeError, BridgeResult};
use crate::translator::TronAddress;
use crate::tron::{ChainClient, Confirmation, ExecutionParams, TronTxId};
use crate::upstream::{Upstream, UpstreamResponse};

/// Deterministic non-zero signing key.
pub fn test_key(seed: u8) -> SigningKey {
    let mut bytes = [0u8; 32];
    bytes[31] = seed.max(1);
    bytes[0] = 0x42;
    SigningKey::from_slice(&bytes).unwrap()
}

/// Fields of a transaction to be signed; fees and gas are fixed.
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: u64,
    pub data: Vec<u8>,
}

const GAS_PRICE: u64 = 1_000_000_000;
const GAS_LIMIT: u64 = 8_000_000;

fn append_to(stream: &mut RlpStream, to: &Option<Address>) {
    match to {
        Some(addr) => stream.append(&addr.to_vec()),
        None => stream.append_empty_data(),
    };
}

fn trimmed(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn sign(key: &SigningKey, payload: &[u8]) -> (Vec<u8>, Vec<u8>, u8) {
    let hash = Keccak256::digest(payload);
    let (signature, recid) = key.sign_prehash_recoverable(&hash).unwrap();
    let bytes = signature.to_bytes();
    (trimmed(&bytes[..32]), trimmed(&bytes[32..]), recid.to_byte())
}

/// Legacy transaction, EIP-155 protected when `chain_id` is given.
pub fn sign_legacy(key: &SigningKey, tx: &UnsignedTx, chain_id: Option<u64>) -> Vec<u8> {
    let fields = |stream: &mut RlpStream| {
        stream.append(&tx.nonce);
        stream.append(&GAS_PRICE);
        stream.append(&GAS_LIMIT);
        append_to(stream, &tx.to);
        stream.append(&tx.value);
        stream.append(&tx.data);
    };

    let mut unsigned = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
    fields(&mut unsigned);
    if let Some(id) = chain_id {
        unsigned.append(&id);
        unsigned.append_empty_data();
        unsigned.append_empty_data();
    }
    let (r, s, recid) = sign(key, &unsigned.out());

    let v = match chain_id {
        Some(id) => id * 2 + 35 + recid as u64,
        None => 27 + recid as u64,
    };
    let mut signed = RlpStream::new_list(9);
    fields(&mut signed);
    signed.append(&v);
    signed.append(&r);
    signed.append(&s);
    signed.out().to_vec()
}

/// EIP-1559 transaction with an empty access list.
pub fn sign_eip1559(key: &SigningKey, tx: &UnsignedTx, chain_id: u64) -> Vec<u8> {
    let fields = |stream: &mut RlpStream| {
        stream.append(&chain_id);
        stream.append(&tx.nonce);
        stream.append(&GAS_PRICE);
        stream.append(&GAS_PRICE);
        stream.append(&GAS_LIMIT);
        append_to(stream, &tx.to);
        stream.append(&tx.value);
        stream.append(&tx.data);
        stream.begin_list(0);
    };

    let mut unsigned = RlpStream::new_list(9);
    fields(&mut unsigned);
    let mut payload = vec![0x02];
    payload.extend_from_slice(&unsigned.out());
    let (r, s, recid) = sign(key, &payload);

    let mut signed = RlpStream::new_list(12);
    fields(&mut signed);
    signed.append(&(recid as u64));
    signed.append(&r);
    signed.append(&s);
    let mut raw = vec![0x02];
    raw.extend_from_slice(&signed.out());
    raw
}

pub fn raw_hex(raw: &[u8]) -> String {
    format!("0x{}", hex::encode(raw))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedCreate {
    pub owner: TronAddress,
    pub bytecode: Vec<u8>,
    pub abi_len: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedCall {
    pub owner: TronAddress,
    pub target: TronAddress,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MockChainState {
    pub submit_error: Option<String>,
    pub confirmation_error: Option<String>,
    pub next_txid: u64,
    pub creates: Vec<SubmittedCreate>,
    pub calls: Vec<SubmittedCall>,
    pub confirmations: HashMap<TronTxId, Confirmation>,
    pub confirmation_queries: usize,
    pub bytecode: HashMap<TronAddress, Bytes>,
    pub bytecode_queries: usize,
}

/// Scriptable [`ChainClient`] recording every submission and query.
#[derive(Debug, Default)]
pub struct MockChainClient {
    pub state: Mutex<MockChainState>,
    /// When set, the next `submit_create` parks until notified
    create_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_submissions(&self, reason: &str) {
        self.state.lock().unwrap().submit_error = Some(reason.to_string());
    }

    /// Hold the next creation inside `submit_create` until the returned
    /// handle is notified.
    pub fn hold_next_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn recover_submissions(&self) {
        self.state.lock().unwrap().submit_error = None;
    }

    pub fn fail_confirmations(&self, reason: Option<&str>) {
        self.state.lock().unwrap().confirmation_error = reason.map(str::to_string);
    }

    pub fn confirm(&self, txid: &TronTxId, confirmation: Confirmation) {
        self.state
            .lock()
            .unwrap()
            .confirmations
            .insert(txid.clone(), confirmation);
    }

    pub fn set_bytecode(&self, address: TronAddress, code: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .bytecode
            .insert(address, Bytes::from(code));
    }

    pub fn creates(&self) -> Vec<SubmittedCreate> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn calls(&self) -> Vec<SubmittedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn bytecode_queries(&self) -> usize {
        self.state.lock().unwrap().bytecode_queries
    }

    pub fn confirmation_queries(&self) -> usize {
        self.state.lock().unwrap().confirmation_queries
    }

    fn next_txid(state: &mut MockChainState) -> TronTxId {
        state.next_txid += 1;
        TronTxId::new(format!("{:064x}", state.next_txid))
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn submit_create(
        &self,
        owner: &TronAddress,
        bytecode: &[u8],
        abi: &[AbiEntry],
        name: &str,
        _params: &ExecutionParams,
    ) -> Result<TronTxId> {
        let gate = self.create_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.submit_error {
            return Err(anyhow!("broadcast rejected: {}", reason));
        }
        state.creates.push(SubmittedCreate {
            owner: *owner,
            bytecode: bytecode.to_vec(),
            abi_len: abi.len(),
            name: name.to_string(),
        });
        Ok(Self::next_txid(&mut state))
    }

    async fn submit_call(
        &self,
        owner: &TronAddress,
        target: &TronAddress,
        data: &[u8],
        _params: &ExecutionParams,
    ) -> Result<TronTxId> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.submit_error {
            return Err(anyhow!("broadcast rejected: {}", reason));
        }
        state.calls.push(SubmittedCall {
            owner: *owner,
            target: *target,
            data: data.to_vec(),
        });
        Ok(Self::next_txid(&mut state))
    }

    async fn get_confirmation(&self, txid: &TronTxId) -> Result<Option<Confirmation>> {
        let mut state = self.state.lock().unwrap();
        state.confirmation_queries += 1;
        if let Some(reason) = &state.confirmation_error {
            return Err(anyhow!("{}", reason));
        }
        Ok(state.confirmations.get(txid).cloned())
    }

    async fn get_deployed_bytecode(&self, address: &TronAddress) -> Result<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.bytecode_queries += 1;
        Ok(state.bytecode.get(address).cloned().unwrap_or_default())
    }
}

/// Scriptable [`Upstream`] recording forwarded requests.
#[derive(Debug, Default)]
pub struct MockUpstream {
    pub requests: Mutex<Vec<(Value, String, Value)>>,
    pub response: Mutex<Option<UpstreamResponse>>,
    pub fail: Mutex<bool>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, response: UpstreamResponse) {
        *self.response.lock().unwrap() = Some(response);
    }

    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<(Value, String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn forward(
        &self,
        id: Value,
        method: &str,
        params: Value,
    ) -> BridgeResult<UpstreamResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((id, method.to_string(), params));
        if *self.fail.lock().unwrap() {
            return Err(BridgeError::UpstreamFailure("connection refused".to_string()));
        }
        Ok(self
            .response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| UpstreamResponse::success(Value::Null)))
    }
}
