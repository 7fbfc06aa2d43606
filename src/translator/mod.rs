pub mod address;
pub mod receipt;
pub mod tx;

pub use address::{
    compute_create_address, parse_eth_address, to_eth_format, to_foreign_format, TronAddress,
};
pub use receipt::{EthReceipt, EthTransaction};
pub use tx::{decode_raw_transaction, decode_raw_transaction_hex, DecodedTransaction};

/// Render bytes as `0x`-prefixed lowercase hex.
pub fn to_hex<T: AsRef<[u8]>>(bytes: T) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Render an integer as an Ethereum JSON-RPC quantity (`0x`-prefixed, no leading zeros).
pub fn quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Decode hex with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(stripped)
}
