use alloy_primitives::{Address, B256};
use tracing::{debug, error, info, warn};

use super::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::store::{SubmissionState, TransactionRecord, TxKind};
use crate::translator::{
    compute_create_address, decode_raw_transaction_hex, to_foreign_format, DecodedTransaction,
};
use crate::tron::TronTxId;

impl Bridge {
    /// Shadow nonce for `eth_getTransactionCount`.
    pub fn transaction_count(&self, address: &Address) -> u64 {
        self.store.next_nonce(address)
    }

    /// Decode, validate and submit a signed Ethereum transaction to TRON.
    ///
    /// Returns the Ethereum transaction hash. The shadow nonce only advances
    /// once TRON has accepted the broadcast.
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> BridgeResult<B256> {
        let tx = decode_raw_transaction_hex(raw_hex)?;

        if tx.sender != self.signer {
            return Err(BridgeError::SignerMismatch {
                sender: tx.sender,
                signer: self.signer,
            });
        }
        if !tx.value.is_zero() {
            return Err(BridgeError::UnsupportedOperation(
                "non-zero value transfers are not supported".to_string(),
            ));
        }

        if let Some(existing) = self.store.transaction(&tx.hash) {
            if existing.is_submitted() {
                info!("Transaction {} already submitted, not re-broadcasting", tx.hash);
                return Ok(tx.hash);
            }
            debug!("Retrying transaction {} ({:?})", tx.hash, existing.submission);
        }

        match tx.to {
            None => {
                if !self.submit_creation(&tx).await? {
                    info!("Transaction {} already in flight, not re-broadcasting", tx.hash);
                    return Ok(tx.hash);
                }
            }
            Some(target) => self.submit_call(&tx, target).await?,
        }

        self.store.observe_nonce(&tx.sender, tx.nonce);
        Ok(tx.hash)
    }

    /// Reserve and dispatch a creation. Returns `false` without dispatching
    /// when the same transaction is already in flight or submitted.
    async fn submit_creation(&self, tx: &DecodedTransaction) -> BridgeResult<bool> {
        let bytecode = if tx.data.is_empty() {
            let fallback = self.artifacts.current_bytecode();
            if fallback.is_empty() {
                return Err(BridgeError::UnsupportedOperation(
                    "contract creation without bytecode".to_string(),
                ));
            }
            debug!("Creation payload empty, using artifact bytecode");
            fallback
        } else {
            tx.data.clone()
        };

        let expected_address = compute_create_address(&tx.sender, tx.nonce);
        let reserved = self.store.reserve_creation(TransactionRecord {
            eth_hash: tx.hash,
            sender: tx.sender,
            nonce: tx.nonce,
            input: tx.data.clone(),
            kind: TxKind::Create {
                expected_address,
                resolved_address: None,
                code: None,
            },
            submission: SubmissionState::Reserved,
            confirmation: None,
        });
        if !reserved {
            return Ok(false);
        }

        let submission = self
            .dispatch_create(&tx.sender, &bytecode)
            .await
            .map(|foreign_tx_id| {
                info!(
                    "Deploy broadcast: eth_hash={}, tron_txid={}, expected={}",
                    tx.hash, foreign_tx_id, expected_address
                );
                SubmissionState::Submitted { foreign_tx_id }
            });

        let state = match &submission {
            Ok(state) => state.clone(),
            Err(e) => SubmissionState::Failed {
                reason: e.to_string(),
            },
        };
        self.store
            .update_transaction(&tx.hash, &mut |record: &mut TransactionRecord| {
                record.submission = state.clone()
            });

        submission.map(|_| true)
    }

    async fn submit_call(&self, tx: &DecodedTransaction, target: Address) -> BridgeResult<()> {
        let foreign_tx_id = self.dispatch_call(&tx.sender, &target, &tx.data).await?;
        info!(
            "Call broadcast: eth_hash={}, tron_txid={}, target={}",
            tx.hash, foreign_tx_id, target
        );

        self.store.insert_transaction(TransactionRecord {
            eth_hash: tx.hash,
            sender: tx.sender,
            nonce: tx.nonce,
            input: tx.data.clone(),
            kind: TxKind::Call { target },
            submission: SubmissionState::Submitted { foreign_tx_id },
            confirmation: None,
        });
        Ok(())
    }

    /// Deploy `bytecode` on TRON as `sender` with the configured limits and
    /// the artifact provider's current ABI.
    pub async fn dispatch_create(
        &self,
        sender: &Address,
        bytecode: &[u8],
    ) -> BridgeResult<TronTxId> {
        let owner = to_foreign_format(sender.as_slice())?;
        let abi = self.artifacts.current_abi();
        let name = self.artifacts.contract_name();
        if abi.is_empty() {
            warn!("Deploying {} without an ABI", name);
        }

        self.chain
            .submit_create(&owner, bytecode, &abi, &name, &self.params)
            .await
            .map_err(|e| {
                error!("TRON deploy failed: {:#}", e);
                BridgeError::BroadcastFailure(format!("{:#}", e))
            })
    }

    /// Invoke `target` on TRON with raw calldata as `sender`.
    pub async fn dispatch_call(
        &self,
        sender: &Address,
        target: &Address,
        data: &[u8],
    ) -> BridgeResult<TronTxId> {
        let owner = to_foreign_format(sender.as_slice())?;
        let contract = to_foreign_format(target.as_slice())?;
        if let Some(signature) = self.artifacts.describe_call(data) {
            debug!("Dispatching {} to {}", signature, target);
        }

        self.chain
            .submit_call(&owner, &contract, data, &self.params)
            .await
            .map_err(|e| {
                error!("TRON call to {} failed: {:#}", target, e);
                BridgeError::BroadcastFailure(format!("{:#}", e))
            })
    }
}
