//! TRON Ethereum JSON-RPC Bridge
//!
//! This crate implements a JSON-RPC server that speaks the Ethereum dialect
//! used by deployment tooling (Foundry's `forge create`, `forge script
//! --broadcast --legacy`) and re-targets contract creations and calls to the
//! TRON network. Raw signed Ethereum transactions are decoded, checked
//! against the bridge key, and replayed on TRON as `deploycontract` /
//! `triggersmartcontract` operations signed with the same key. Receipts and
//! bytecode are then answered under Ethereum semantics, including the
//! deterministic CREATE address the tooling expects.
//!
//! # Architecture
//!
//! ```text
//! Developer (forge / cast / ethers.js)
//!     |
//!     | eth_* JSON-RPC calls
//!     v
//! Bridge (this crate) ---- unowned methods ----> TRON /jsonrpc
//!     |
//!     | wallet HTTP API (deploy, trigger, broadcast, query)
//!     v
//! TRON network (Nile/Shasta/mainnet)
//! ```
//!
//! # Modules
//!
//! - `config` - Environment and configuration management
//! - `server` - JSON-RPC server setup, method registration and forwarding
//! - `methods` - RPC method handlers
//! - `engine` - Transaction dispatch and receipt/code resolution
//! - `store` - Nonce, transaction and bytecode state
//! - `translator` - Address mapping, transaction decoding, response shapes
//! - `tron` - TRON wallet API client and transaction signing
//! - `artifact` - Foundry artifact (ABI/bytecode) loading
//! - `upstream` - Pass-through client for TRON's Ethereum-compatible endpoint

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod methods;
pub mod server;
pub mod store;
pub mod translator;
pub mod tron;
pub mod upstream;

#[cfg(test)]
mod test_utils;
