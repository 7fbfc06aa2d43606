use alloy_primitives::{Address, Bytes, B256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rlp::{Rlp, RlpStream};
use sha3::{Digest, Keccak256};
use tracing::debug;

use super::decode_hex;
use crate::error::{BridgeError, BridgeResult};

/// EIP-2718 type byte of an access-list transaction.
const EIP2930_TX_TYPE: u8 = 0x01;
/// EIP-2718 type byte of a dynamic-fee transaction.
const EIP1559_TX_TYPE: u8 = 0x02;

/// A signed Ethereum transaction with its sender recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    /// EIP-2718 type (0 for legacy)
    pub tx_type: u8,
    /// keccak256 of the raw envelope, as reported by Ethereum clients
    pub hash: B256,
    /// Recovered signer
    pub sender: Address,
    pub nonce: u64,
    /// Gas price for legacy/2930, max fee per gas for 1559
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Recipient (None for contract creation)
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    /// Chain ID (absent for pre-EIP-155 legacy transactions)
    pub chain_id: Option<u64>,
}

impl DecodedTransaction {
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Decode a `0x`-prefixed raw transaction as passed to `eth_sendRawTransaction`.
pub fn decode_raw_transaction_hex(raw_hex: &str) -> BridgeResult<DecodedTransaction> {
    if !raw_hex.starts_with("0x") {
        return Err(malformed("raw transaction must be a 0x-prefixed hex string"));
    }
    let raw = decode_hex(raw_hex).map_err(|e| malformed(format!("invalid hex: {}", e)))?;
    decode_raw_transaction(&raw)
}

/// RLP-decode a signed transaction and recover its sender.
/// Supports legacy (with or without EIP-155), EIP-2930 and EIP-1559 envelopes.
pub fn decode_raw_transaction(raw: &[u8]) -> BridgeResult<DecodedTransaction> {
    let first = *raw.first().ok_or_else(|| malformed("empty transaction"))?;

    let decoded = match first {
        EIP2930_TX_TYPE | EIP1559_TX_TYPE => decode_typed(first, raw)?,
        b if b >= 0xc0 => decode_legacy(raw)?,
        other => {
            return Err(malformed(format!(
                "unsupported transaction type 0x{:02x}",
                other
            )))
        }
    };

    debug!(
        "Decoded tx: type={}, hash=0x{}, nonce={}, create={}, data_len={}",
        decoded.tx_type,
        hex::encode(decoded.hash),
        decoded.nonce,
        decoded.is_create(),
        decoded.data.len()
    );

    Ok(decoded)
}

fn decode_legacy(raw: &[u8]) -> BridgeResult<DecodedTransaction> {
    let rlp = list(raw)?;
    let item_count = rlp.item_count().map_err(rlp_error)?;
    match item_count {
        9 => {}
        6 => return Err(malformed("transaction is not signed")),
        n => {
            return Err(malformed(format!(
                "unexpected RLP item count {} for legacy transaction",
                n
            )))
        }
    }

    let v: u64 = rlp.val_at(6).map_err(rlp_error)?;
    let (chain_id, recovery_byte) = match v {
        27 | 28 => (None, (v - 27) as u8),
        v if v >= 35 => (Some((v - 35) / 2), ((v - 35) % 2) as u8),
        v => return Err(malformed(format!("invalid signature v value {}", v))),
    };

    // Signing payload: the six unsigned fields, plus [chain_id, 0, 0] under EIP-155
    let mut stream = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
    for i in 0..6 {
        stream.append_raw(raw_item(&rlp, i)?, 1);
    }
    if let Some(id) = chain_id {
        stream.append(&id);
        stream.append_empty_data();
        stream.append_empty_data();
    }
    let signing_hash = keccak(&stream.out());

    let r: Vec<u8> = rlp.val_at(7).map_err(rlp_error)?;
    let s: Vec<u8> = rlp.val_at(8).map_err(rlp_error)?;
    let sender = recover_sender(&signing_hash, &r, &s, recovery_byte)?;

    Ok(DecodedTransaction {
        tx_type: 0,
        hash: keccak(raw),
        sender,
        nonce: rlp.val_at(0).map_err(rlp_error)?,
        gas_price: u256_at(&rlp, 1)?,
        gas_limit: rlp.val_at(2).map_err(rlp_error)?,
        to: address_at(&rlp, 3)?,
        value: u256_at(&rlp, 4)?,
        data: bytes_at(&rlp, 5)?,
        chain_id,
    })
}

fn decode_typed(tx_type: u8, raw: &[u8]) -> BridgeResult<DecodedTransaction> {
    let rlp = list(&raw[1..])?;
    let item_count = rlp.item_count().map_err(rlp_error)?;

    // 2930: [chain_id, nonce, gas_price, gas_limit, to, value, data, access_list, y, r, s]
    // 1559: [chain_id, nonce, max_priority_fee, max_fee, gas_limit, to, value, data, access_list, y, r, s]
    let unsigned_len = if tx_type == EIP1559_TX_TYPE { 9 } else { 8 };
    if item_count == unsigned_len {
        return Err(malformed("transaction is not signed"));
    }
    if item_count != unsigned_len + 3 {
        return Err(malformed(format!(
            "unexpected RLP item count {} for type {} transaction",
            item_count, tx_type
        )));
    }

    let mut stream = RlpStream::new_list(unsigned_len);
    for i in 0..unsigned_len {
        stream.append_raw(raw_item(&rlp, i)?, 1);
    }
    let mut payload = vec![tx_type];
    payload.extend_from_slice(&stream.out());
    let signing_hash = keccak(&payload);

    let y_parity: u64 = rlp.val_at(unsigned_len).map_err(rlp_error)?;
    if y_parity > 1 {
        return Err(malformed(format!("invalid y parity {}", y_parity)));
    }
    let r: Vec<u8> = rlp.val_at(unsigned_len + 1).map_err(rlp_error)?;
    let s: Vec<u8> = rlp.val_at(unsigned_len + 2).map_err(rlp_error)?;
    let sender = recover_sender(&signing_hash, &r, &s, y_parity as u8)?;

    // Offset of the fields after the fee fields
    let base = if tx_type == EIP1559_TX_TYPE { 4 } else { 3 };
    let fee_index = base - 1;

    Ok(DecodedTransaction {
        tx_type,
        hash: keccak(raw),
        sender,
        nonce: rlp.val_at(1).map_err(rlp_error)?,
        gas_price: u256_at(&rlp, fee_index)?,
        gas_limit: rlp.val_at(base).map_err(rlp_error)?,
        to: address_at(&rlp, base + 1)?,
        value: u256_at(&rlp, base + 2)?,
        data: bytes_at(&rlp, base + 3)?,
        chain_id: Some(rlp.val_at(0).map_err(rlp_error)?),
    })
}

/// Open `data` as a single RLP list spanning the whole input.
fn list(data: &[u8]) -> BridgeResult<Rlp<'_>> {
    let rlp = Rlp::new(data);
    if !rlp.is_list() {
        return Err(malformed("transaction RLP is not a list"));
    }
    let info = rlp.payload_info().map_err(rlp_error)?;
    if info.header_len + info.value_len != data.len() {
        return Err(malformed("trailing bytes after transaction RLP"));
    }
    Ok(rlp)
}

fn raw_item<'a>(rlp: &Rlp<'a>, index: usize) -> BridgeResult<&'a [u8]> {
    Ok(rlp.at(index).map_err(rlp_error)?.as_raw())
}

fn u256_at(rlp: &Rlp, index: usize) -> BridgeResult<U256> {
    let bytes: Vec<u8> = rlp.val_at(index).map_err(rlp_error)?;
    U256::try_from_be_slice(&bytes)
        .ok_or_else(|| malformed(format!("integer field {} exceeds 256 bits", index)))
}

fn address_at(rlp: &Rlp, index: usize) -> BridgeResult<Option<Address>> {
    let bytes: Vec<u8> = rlp.val_at(index).map_err(rlp_error)?;
    match bytes.len() {
        0 => Ok(None),
        20 => Ok(Some(Address::from_slice(&bytes))),
        n => Err(malformed(format!("recipient must be 20 bytes, got {}", n))),
    }
}

fn bytes_at(rlp: &Rlp, index: usize) -> BridgeResult<Bytes> {
    let bytes: Vec<u8> = rlp.val_at(index).map_err(rlp_error)?;
    Ok(Bytes::from(bytes))
}

fn recover_sender(
    signing_hash: &B256,
    r: &[u8],
    s: &[u8],
    recovery_byte: u8,
) -> BridgeResult<Address> {
    if r.len() > 32 || s.len() > 32 {
        return Err(malformed("signature component longer than 32 bytes"));
    }
    let mut compact = [0u8; 64];
    compact[32 - r.len()..32].copy_from_slice(r);
    compact[64 - s.len()..].copy_from_slice(s);

    let signature = Signature::from_slice(&compact)
        .map_err(|e| malformed(format!("invalid signature: {}", e)))?;
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| malformed(format!("invalid recovery id {}", recovery_byte)))?;
    let key = VerifyingKey::recover_from_prehash(signing_hash.as_slice(), &signature, recovery_id)
        .map_err(|e| malformed(format!("sender recovery failed: {}", e)))?;

    Ok(public_key_to_address(&key))
}

/// Ethereum address of a secp256k1 public key.
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn keccak(data: &[u8]) -> B256 {
    B256::from_slice(&Keccak256::digest(data))
}

fn malformed(message: impl Into<String>) -> BridgeError {
    BridgeError::MalformedTransaction(message.into())
}

fn rlp_error(e: rlp::DecoderError) -> BridgeError {
    malformed(format!("RLP parse error: {}", e))
}
