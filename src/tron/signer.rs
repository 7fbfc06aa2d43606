use std::fmt;

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use k256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};

use crate::translator::tx::public_key_to_address;
use crate::translator::{decode_hex, TronAddress};

/// The bridge's secp256k1 key. Signs TRON transactions and defines the only
/// Ethereum sender the bridge accepts.
#[derive(Clone)]
pub struct TronSigner {
    key: SigningKey,
    eth_address: Address,
    tron_address: TronAddress,
}

impl TronSigner {
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let bytes = decode_hex(private_key.trim()).context("Private key is not valid hex")?;
        if bytes.len() != 32 {
            return Err(anyhow!(
                "Private key must be 32 bytes, got {}",
                bytes.len()
            ));
        }
        let key = SigningKey::from_slice(&bytes).context("Private key is not a valid scalar")?;
        Ok(Self::new(key))
    }

    pub fn new(key: SigningKey) -> Self {
        let eth_address = public_key_to_address(key.verifying_key());
        let tron_address = TronAddress::from_eth(&eth_address);
        Self {
            key,
            eth_address,
            tron_address,
        }
    }

    pub fn eth_address(&self) -> Address {
        self.eth_address
    }

    pub fn tron_address(&self) -> TronAddress {
        self.tron_address
    }

    /// Sign a TRON transaction id, returning the 65-byte `r || s || v`
    /// signature (`v = 27 + recovery id`).
    pub fn sign_txid(&self, txid: &[u8]) -> Result<[u8; 65]> {
        if txid.len() != 32 {
            return Err(anyhow!("txID must be 32 bytes, got {}", txid.len()));
        }
        let (signature, recid) = self
            .key
            .sign_prehash_recoverable(txid)
            .context("Failed to sign txID")?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(out)
    }

    /// Check that `txid` is the SHA-256 of `raw_data_hex` before signing it.
    pub fn verify_txid(raw_data_hex: &str, txid: &[u8]) -> Result<()> {
        let raw = decode_hex(raw_data_hex).context("raw_data_hex is not valid hex")?;
        let digest = Sha256::digest(&raw);
        if digest.as_slice() != txid {
            return Err(anyhow!("txID does not match sha256(raw_data_hex)"));
        }
        Ok(())
    }
}

impl fmt::Debug for TronSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TronSigner")
            .field("eth_address", &self.eth_address)
            .field("tron_address", &self.tron_address)
            .finish_non_exhaustive()
    }
}
