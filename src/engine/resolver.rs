use alloy_primitives::{Address, Bytes, B256};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::store::{TransactionRecord, TxKind};
use crate::translator::{to_eth_format, to_hex, EthReceipt, EthTransaction};
use crate::upstream::UpstreamResponse;

impl Bridge {
    /// Receipt for `hash`, or `None` while TRON has not confirmed it.
    ///
    /// Creation receipts are withheld until TRON reports the contract address,
    /// and then always carry the precomputed CREATE address.
    pub async fn get_receipt(&self, hash: &B256) -> Option<EthReceipt> {
        let record = self.store.transaction(hash)?;
        if !record.is_submitted() {
            return None;
        }

        let record = self.poll_confirmation(record).await?;
        self.ensure_code(&record, false).await;

        let confirmation = record.confirmation.as_ref()?;
        Some(EthReceipt::from_record(&record, confirmation))
    }

    /// Code at `address`, healing the cache for creations the bridge made.
    pub async fn get_code(&self, address: &Address, block: Option<Value>) -> BridgeResult<String> {
        if let Some(code) = self.store.cached_code(address) {
            return Ok(to_hex(&code));
        }

        if let Some(record) = self.store.transaction_for_expected(address) {
            if !record.is_submitted() {
                return Ok("0x".to_string());
            }
            let Some(record) = self.poll_confirmation(record).await else {
                return Ok("0x".to_string());
            };
            let code = self.ensure_code(&record, true).await.unwrap_or_default();
            return Ok(to_hex(&code));
        }

        let block = block.unwrap_or_else(|| json!("latest"));
        let params = json!([to_hex(address.as_slice()), block]);
        let result = self
            .upstream
            .forward(json!(1), "eth_getCode", params)
            .await?
            .into_result()?;

        match result {
            Value::Null => Ok("0x".to_string()),
            Value::String(code) => Ok(code),
            other => Err(BridgeError::UpstreamFailure(format!(
                "unexpected eth_getCode result: {}",
                other
            ))),
        }
    }

    /// Minimal transaction object from the registry; `None` for unknown hashes.
    pub fn get_transaction(&self, hash: &B256) -> Option<EthTransaction> {
        let record = self.store.transaction(hash)?;
        Some(EthTransaction::from_record(&record))
    }

    /// Relay a method the bridge does not own to the upstream endpoint.
    pub async fn forward(
        &self,
        id: Value,
        method: &str,
        params: Value,
    ) -> BridgeResult<UpstreamResponse> {
        self.upstream.forward(id, method, params).await
    }

    /// Cached confirmation, or a fresh poll of TRON. Polling failures read as
    /// "not ready". A creation only counts as confirmed once TRON reports its
    /// contract address.
    async fn poll_confirmation(&self, record: TransactionRecord) -> Option<TransactionRecord> {
        if record.confirmation.is_some() {
            return Some(record);
        }
        let txid = record.foreign_tx_id()?.clone();

        let confirmation = match self.chain.get_confirmation(&txid).await {
            Ok(Some(confirmation)) => confirmation,
            Ok(None) => {
                debug!("TRON tx {} not confirmed yet", txid);
                return None;
            }
            Err(e) => {
                debug!("Polling TRON tx {} failed, reporting pending: {:#}", txid, e);
                return None;
            }
        };

        let resolved = match &record.kind {
            TxKind::Call { .. } => None,
            TxKind::Create {
                expected_address, ..
            } => {
                let Some(reported) = confirmation.contract_address else {
                    debug!("TRON tx {} confirmed without contract address yet", txid);
                    return None;
                };
                if to_eth_format(&reported) != Some(*expected_address) {
                    warn!(
                        "TRON deployed {} at {} but CREATE address is {}; reporting {}",
                        record.eth_hash, reported, expected_address, expected_address
                    );
                }
                Some(reported)
            }
        };

        info!(
            "TRON tx {} confirmed (block {:?}, result {:?})",
            txid, confirmation.block_number, confirmation.result
        );
        self.store
            .update_transaction(&record.eth_hash, &mut |r: &mut TransactionRecord| {
                if let (TxKind::Create { resolved_address, .. }, Some(address)) =
                    (&mut r.kind, resolved)
                {
                    *resolved_address = Some(address);
                }
                r.confirmation = Some(confirmation.clone());
            })
    }

    /// Deployed code of a resolved creation, fetched from TRON at most once
    /// unless `refetch_empty` asks to retry an empty result.
    async fn ensure_code(&self, record: &TransactionRecord, refetch_empty: bool) -> Option<Bytes> {
        let TxKind::Create {
            expected_address,
            resolved_address: Some(resolved),
            code,
        } = &record.kind
        else {
            return None;
        };

        if let Some(cached) = self.store.cached_code(expected_address) {
            return Some(cached);
        }
        match code {
            Some(code) if !code.is_empty() || !refetch_empty => return Some(code.clone()),
            _ => {}
        }

        match self.chain.get_deployed_bytecode(resolved).await {
            Ok(bytes) => {
                if bytes.is_empty() {
                    debug!("No code at {} yet", resolved);
                } else {
                    info!(
                        "Cached {} bytes of code for {} (TRON {})",
                        bytes.len(),
                        expected_address,
                        resolved
                    );
                }
                self.store.cache_code(*expected_address, bytes.clone());
                let fetched = bytes.clone();
                self.store
                    .update_transaction(&record.eth_hash, &mut |r: &mut TransactionRecord| {
                        if let TxKind::Create { code, .. } = &mut r.kind {
                            *code = Some(fetched.clone());
                        }
                    });
                Some(bytes)
            }
            Err(e) => {
                debug!("Fetching code for {} failed: {:#}", resolved, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{harness, Harness};
    use crate::store::BridgeStore;
    use crate::test_utils::{raw_hex, sign_legacy, UnsignedTx};
    use crate::translator::{compute_create_address, TronAddress};
    use crate::tron::{Confirmation, ExecutionResult, TronTxId};
    use pretty_assertions::assert_eq;

    const CODE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

    async fn deploy(h: &Harness, nonce: u64) -> (B256, TronTxId, Address) {
        let tx = UnsignedTx {
            nonce,
            to: None,
            value: 0,
            data: vec![0x60, 0x80, 0x60, 0x40, 0x52],
        };
        let raw = sign_legacy(&h.key, &tx, Some(1));
        let hash = h.bridge.send_raw_transaction(&raw_hex(&raw)).await.unwrap();
        let txid = h
            .store
            .transaction(&hash)
            .unwrap()
            .foreign_tx_id()
            .cloned()
            .unwrap();
        let expected = compute_create_address(&h.bridge.signer(), nonce);
        (hash, txid, expected)
    }

    fn confirmed(contract: Option<TronAddress>) -> Confirmation {
        Confirmation {
            block_number: Some(100),
            result: ExecutionResult::Success,
            contract_address: contract,
        }
    }

    #[tokio::test]
    async fn test_unknown_hash_has_no_receipt() {
        let h = harness();
        assert!(h.bridge.get_receipt(&B256::repeat_byte(1)).await.is_none());
        assert!(h.bridge.get_transaction(&B256::repeat_byte(1)).is_none());
    }

    #[tokio::test]
    async fn test_call_receipt_after_confirmation() {
        let h = harness();
        let target = Address::repeat_byte(0x55);
        let tx = UnsignedTx {
            nonce: 0,
            to: Some(target),
            value: 0,
            data: vec![0x01],
        };
        let raw = sign_legacy(&h.key, &tx, Some(1));
        let hash = h.bridge.send_raw_transaction(&raw_hex(&raw)).await.unwrap();
        assert!(h.bridge.get_receipt(&hash).await.is_none());

        let txid = h.store.transaction(&hash).unwrap().foreign_tx_id().cloned().unwrap();
        h.chain.confirm(&txid, confirmed(None));

        let receipt = h.bridge.get_receipt(&hash).await.unwrap();
        assert_eq!(receipt.status, "0x1");
        assert_eq!(receipt.block_number.as_deref(), Some("0x64"));
        assert_eq!(receipt.to, Some(to_hex(target.as_slice())));
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.transaction_hash, to_hex(hash));
    }

    #[tokio::test]
    async fn test_create_receipt_waits_for_contract_address() {
        let h = harness();
        let (hash, txid, expected) = deploy(&h, 0).await;

        h.chain.confirm(&txid, confirmed(None));
        assert!(h.bridge.get_receipt(&hash).await.is_none());

        let tron = TronAddress::from_eth(&expected);
        h.chain.confirm(&txid, confirmed(Some(tron)));
        h.chain.set_bytecode(tron, CODE.to_vec());

        let receipt = h.bridge.get_receipt(&hash).await.unwrap();
        assert_eq!(
            receipt.contract_address,
            Some(to_hex(expected.as_slice()))
        );
        assert_eq!(receipt.to, None);
        assert_eq!(h.store.cached_code(&expected).unwrap().as_ref(), &CODE);
    }

    #[tokio::test]
    async fn test_create_receipt_reports_expected_address_on_mismatch() {
        let h = harness();
        let (hash, txid, expected) = deploy(&h, 0).await;

        let elsewhere = TronAddress::from_eth(&Address::repeat_byte(0x99));
        h.chain.confirm(&txid, confirmed(Some(elsewhere)));
        h.chain.set_bytecode(elsewhere, CODE.to_vec());

        let receipt = h.bridge.get_receipt(&hash).await.unwrap();
        assert_eq!(
            receipt.contract_address,
            Some(to_hex(expected.as_slice()))
        );
        // Code deployed at TRON's address is served under the expected one
        assert_eq!(
            h.bridge.get_code(&expected, None).await.unwrap(),
            "0x60806040"
        );
    }

    #[tokio::test]
    async fn test_bytecode_fetched_once_and_confirmation_cached() {
        let h = harness();
        let (hash, txid, expected) = deploy(&h, 0).await;
        let tron = TronAddress::from_eth(&expected);
        h.chain.confirm(&txid, confirmed(Some(tron)));
        h.chain.set_bytecode(tron, CODE.to_vec());

        let first = h.bridge.get_receipt(&hash).await.unwrap();
        let second = h.bridge.get_receipt(&hash).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, "0x1");
        assert_eq!(first.contract_address, Some(to_hex(expected.as_slice())));
        assert_eq!(
            h.bridge.get_code(&expected, None).await.unwrap(),
            "0x60806040"
        );

        assert_eq!(h.chain.bytecode_queries(), 1);
        assert_eq!(h.chain.confirmation_queries(), 1);
        assert!(h.upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_retry_does_not_hide_landed_deploy() {
        let h = harness();
        let (_, txid, expected) = deploy(&h, 0).await;

        // Different payload reusing nonce 0, rejected by TRON
        let retry = UnsignedTx {
            nonce: 0,
            to: None,
            value: 0,
            data: vec![0x60, 0x01],
        };
        let raw = raw_hex(&sign_legacy(&h.key, &retry, Some(1)));
        h.chain.fail_submissions("DUP_TRANSACTION_ERROR");
        assert!(h.bridge.send_raw_transaction(&raw).await.is_err());
        h.chain.recover_submissions();

        let tron = TronAddress::from_eth(&expected);
        h.chain.confirm(&txid, confirmed(Some(tron)));
        h.chain.set_bytecode(tron, CODE.to_vec());

        assert_eq!(
            h.bridge.get_code(&expected, None).await.unwrap(),
            "0x60806040"
        );
        assert!(h.upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_execution_has_zero_status() {
        let h = harness();
        let (hash, txid, expected) = deploy(&h, 0).await;
        h.chain.confirm(
            &txid,
            Confirmation {
                block_number: Some(7),
                result: ExecutionResult::Failed("REVERT".to_string()),
                contract_address: Some(TronAddress::from_eth(&expected)),
            },
        );

        let receipt = h.bridge.get_receipt(&hash).await.unwrap();
        assert_eq!(receipt.status, "0x0");
    }

    #[tokio::test]
    async fn test_polling_errors_read_as_pending() {
        let h = harness();
        let (hash, _, expected) = deploy(&h, 0).await;
        h.chain.fail_confirmations(Some("timeout"));

        assert!(h.bridge.get_receipt(&hash).await.is_none());
        assert_eq!(h.bridge.get_code(&expected, None).await.unwrap(), "0x");
    }

    #[tokio::test]
    async fn test_failed_deploy_has_no_receipt_and_empty_code() {
        let h = harness();
        let tx = UnsignedTx {
            nonce: 0,
            to: None,
            value: 0,
            data: vec![0x60],
        };
        let raw = sign_legacy(&h.key, &tx, Some(1));
        h.chain.fail_submissions("SIGERROR");
        let _ = h.bridge.send_raw_transaction(&raw_hex(&raw)).await;

        let expected = compute_create_address(&h.bridge.signer(), 0);
        let hash = h.store.transaction_for_expected(&expected).unwrap().eth_hash;
        assert!(h.bridge.get_receipt(&hash).await.is_none());
        assert_eq!(h.bridge.get_code(&expected, None).await.unwrap(), "0x");
        assert_eq!(h.chain.confirmation_queries(), 0);
        assert!(h.upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_code_self_heals_without_receipt() {
        let h = harness();
        let (_, txid, expected) = deploy(&h, 0).await;
        assert_eq!(h.bridge.get_code(&expected, None).await.unwrap(), "0x");

        let tron = TronAddress::from_eth(&expected);
        h.chain.confirm(&txid, confirmed(Some(tron)));
        // Confirmed but the node has not indexed the code yet
        assert_eq!(h.bridge.get_code(&expected, None).await.unwrap(), "0x");

        h.chain.set_bytecode(tron, CODE.to_vec());
        assert_eq!(
            h.bridge.get_code(&expected, None).await.unwrap(),
            "0x60806040"
        );
        assert_eq!(h.store.cached_code(&expected).unwrap().as_ref(), &CODE);
    }

    #[tokio::test]
    async fn test_get_code_forwards_unknown_addresses() {
        let h = harness();
        let address = Address::repeat_byte(0x77);
        h.upstream
            .respond_with(UpstreamResponse::success(json!("0x6001")));

        let code = h
            .bridge
            .get_code(&address, Some(json!("0x10")))
            .await
            .unwrap();
        assert_eq!(code, "0x6001");

        let requests = h.upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, "eth_getCode");
        assert_eq!(
            requests[0].2,
            json!(["0x7777777777777777777777777777777777777777", "0x10"])
        );
    }

    #[tokio::test]
    async fn test_get_code_forward_defaults() {
        let h = harness();
        let address = Address::repeat_byte(0x77);

        assert_eq!(h.bridge.get_code(&address, None).await.unwrap(), "0x");
        assert_eq!(h.upstream.requests()[0].2[1], json!("latest"));

        h.upstream.fail();
        let err = h.bridge.get_code(&address, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_transaction_object_tracks_confirmation() {
        let h = harness();
        let (hash, txid, expected) = deploy(&h, 3).await;

        let pending = h.bridge.get_transaction(&hash).unwrap();
        assert_eq!(pending.nonce, "0x3");
        assert_eq!(pending.to, None);
        assert_eq!(pending.block_number, None);
        assert_eq!(pending.from, to_hex(h.bridge.signer().as_slice()));

        h.chain
            .confirm(&txid, confirmed(Some(TronAddress::from_eth(&expected))));
        h.bridge.get_receipt(&hash).await.unwrap();

        let mined = h.bridge.get_transaction(&hash).unwrap();
        assert_eq!(mined.block_number.as_deref(), Some("0x64"));
        assert_eq!(mined.transaction_index.as_deref(), Some("0x0"));
    }
}
