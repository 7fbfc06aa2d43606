//! Address mapping between Ethereum and TRON.
//!
//! A TRON address is the same 20-byte account identifier as on Ethereum
//! (keccak256 of the public key), prefixed with the mainnet version byte
//! `0x41`. The mapping is therefore injective in both directions for every
//! address this bridge produces.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

use super::decode_hex;
use crate::error::{BridgeError, BridgeResult};

/// Version byte carried by every TRON address.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// A 21-byte TRON address in its raw (hex) form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    /// Wrap 21 raw bytes. The prefix is not checked; use [`to_eth_format`]
    /// to find out whether the address is one of ours.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 21] = bytes.try_into().ok()?;
        Some(Self(raw))
    }

    /// TRON form of a typed Ethereum address.
    pub fn from_eth(address: &Address) -> Self {
        let mut raw = [0u8; 21];
        raw[0] = TRON_ADDRESS_PREFIX;
        raw[1..].copy_from_slice(address.as_slice());
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// 42 lowercase hex chars without `0x`, the form the wallet API takes with `visible=false`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TronAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)
            .map_err(|e| BridgeError::InvalidAddress(format!("{}: {}", s, e)))?;
        Self::from_slice(&bytes)
            .ok_or_else(|| BridgeError::InvalidAddress(format!("{}: expected 21 bytes", s)))
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_hex())
    }
}

/// Map a 20-byte Ethereum address into TRON's encoding.
pub fn to_foreign_format(address: &[u8]) -> BridgeResult<TronAddress> {
    if address.len() != 20 {
        return Err(BridgeError::InvalidAddress(format!(
            "expected 20 bytes, got {}",
            address.len()
        )));
    }
    Ok(TronAddress::from_eth(&Address::from_slice(address)))
}

/// Inverse of [`to_foreign_format`]. Returns `None` when the address does not
/// carry the TRON version prefix.
pub fn to_eth_format(address: &TronAddress) -> Option<Address> {
    if address.0[0] != TRON_ADDRESS_PREFIX {
        return None;
    }
    Some(Address::from_slice(&address.0[1..]))
}

/// Parse a `0x`-prefixed 40-hex-digit Ethereum address (any case).
pub fn parse_eth_address(input: &str) -> BridgeResult<Address> {
    let trimmed = input.trim();
    if !(trimmed.starts_with("0x") || trimmed.starts_with("0X")) || trimmed.len() != 42 {
        return Err(BridgeError::InvalidAddress(format!(
            "{}: expected 0x followed by 40 hex digits",
            input
        )));
    }
    let bytes =
        decode_hex(trimmed).map_err(|e| BridgeError::InvalidAddress(format!("{}: {}", input, e)))?;
    Ok(Address::from_slice(&bytes))
}

/// Ethereum CREATE address: `keccak256(rlp([sender, nonce]))[12..]`.
pub fn compute_create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender.to_vec());
    stream.append(&nonce);
    let hash = Keccak256::digest(stream.out());
    Address::from_slice(&hash[12..])
}
