use std::time::Duration;

use alloy_primitives::Bytes;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::signer::TronSigner;
use super::types::*;
use super::ChainClient;
use crate::artifact::{tron_abi_json, AbiEntry};
use crate::translator::{decode_hex, TronAddress};

const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Client for the TRON full-node wallet HTTP API.
///
/// Transactions are built by the node, signed locally with the bridge key and
/// broadcast back.
#[derive(Clone)]
pub struct TronClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    signer: TronSigner,
}

impl TronClient {
    pub fn new(
        base_url: &str,
        signer: TronSigner,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build TRON HTTP client")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            signer,
        })
    }

    pub fn signer(&self) -> &TronSigner {
        &self.signer
    }

    /// POST a JSON body to `wallet/<endpoint>` and decode the response.
    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/wallet/{}", self.base_url, endpoint);
        debug!("Sending TRON wallet request: {}", endpoint);

        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to wallet/{}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("TRON node returned HTTP {} for {}: {}", status, endpoint, body);
            return Err(anyhow!("TRON HTTP error: {} - {}", status, body));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse wallet/{} response", endpoint))
    }

    /// Sign an unsigned transaction object returned by the node.
    fn sign_transaction(&self, mut tx: Value) -> Result<Value> {
        let txid_hex = tx
            .get("txID")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Unsigned transaction has no txID"))?;
        let raw_data_hex = tx
            .get("raw_data_hex")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Unsigned transaction has no raw_data_hex"))?;

        let txid = decode_hex(txid_hex).context("txID is not valid hex")?;
        TronSigner::verify_txid(raw_data_hex, &txid)?;
        let signature = self.signer.sign_txid(&txid)?;

        let obj = tx
            .as_object_mut()
            .ok_or_else(|| anyhow!("Unsigned transaction is not an object"))?;
        obj.insert("signature".to_string(), json!([hex::encode(signature)]));
        Ok(tx)
    }

    async fn broadcast(&self, signed: &Value) -> Result<TronTxId> {
        let response: BroadcastResponse = self.post("broadcasttransaction", signed).await?;
        if response.result != Some(true) {
            let reason = rejection_message(response.code.as_deref(), response.message.as_deref());
            error!("TRON broadcast rejected: {}", reason);
            return Err(anyhow!("broadcast rejected: {}", reason));
        }

        let txid = response
            .txid
            .or_else(|| signed.get("txID").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| anyhow!("Broadcast succeeded without a txid"))?;
        Ok(TronTxId::new(txid))
    }
}

#[async_trait]
impl ChainClient for TronClient {
    async fn submit_create(
        &self,
        owner: &TronAddress,
        bytecode: &[u8],
        abi: &[AbiEntry],
        name: &str,
        params: &ExecutionParams,
    ) -> Result<TronTxId> {
        let request = DeployContractRequest {
            owner_address: owner.to_hex(),
            abi: tron_abi_json(abi)?,
            bytecode: hex::encode(bytecode),
            fee_limit: params.fee_limit_sun,
            call_value: 0,
            consume_user_resource_percent: params.user_fee_percentage,
            origin_energy_limit: params.origin_energy_limit,
            name: name.to_string(),
            visible: false,
        };

        let unsigned: Value = self.post("deploycontract", &request).await?;
        if let Some(err) = unsigned.get("Error").and_then(Value::as_str) {
            error!("TRON deploycontract failed: {}", err);
            return Err(anyhow!("deploycontract failed: {}", err));
        }

        let signed = self.sign_transaction(unsigned)?;
        let txid = self.broadcast(&signed).await?;
        info!("Broadcast contract creation {} ({} bytes)", txid, bytecode.len());
        Ok(txid)
    }

    async fn submit_call(
        &self,
        owner: &TronAddress,
        target: &TronAddress,
        data: &[u8],
        params: &ExecutionParams,
    ) -> Result<TronTxId> {
        let request = TriggerContractRequest {
            owner_address: owner.to_hex(),
            contract_address: target.to_hex(),
            data: hex::encode(data),
            call_value: 0,
            fee_limit: params.fee_limit_sun,
            visible: false,
        };

        let response: TriggerContractResponse =
            self.post("triggersmartcontract", &request).await?;
        let ret = response.result.unwrap_or_default();
        if ret.result != Some(true) {
            let reason = rejection_message(ret.code.as_deref(), ret.message.as_deref());
            error!("TRON triggersmartcontract failed: {}", reason);
            return Err(anyhow!("triggersmartcontract failed: {}", reason));
        }
        let unsigned = response
            .transaction
            .ok_or_else(|| anyhow!("triggersmartcontract returned no transaction"))?;

        let signed = self.sign_transaction(unsigned)?;
        let txid = self.broadcast(&signed).await?;
        info!("Broadcast contract call {} to {}", txid, target);
        Ok(txid)
    }

    async fn get_confirmation(&self, txid: &TronTxId) -> Result<Option<Confirmation>> {
        let info: TransactionInfo = self
            .post("gettransactioninfobyid", &json!({ "value": txid.as_str() }))
            .await?;

        // The node answers `{}` until the transaction is in a block
        if info.id.is_none() {
            return Ok(None);
        }

        if let Some(msg) = info.res_message.as_deref() {
            debug!("Transaction {} resMessage: {}", txid, decode_message(msg));
        }

        let contract_address = match info.contract_address.as_deref() {
            Some(addr) if !addr.is_empty() => Some(
                addr.parse::<TronAddress>()
                    .map_err(|e| anyhow!("Bad contract_address in transaction info: {}", e))?,
            ),
            _ => None,
        };

        Ok(Some(Confirmation {
            block_number: info.block_number,
            result: ExecutionResult::from_info(&info),
            contract_address,
        }))
    }

    async fn get_deployed_bytecode(&self, address: &TronAddress) -> Result<Bytes> {
        let info: ContractInfo = self
            .post(
                "getcontract",
                &json!({ "value": address.to_hex(), "visible": false }),
            )
            .await?;

        match info.code_hex() {
            Some(code) => {
                let bytes = decode_hex(code).context("Contract bytecode is not valid hex")?;
                Ok(Bytes::from(bytes))
            }
            None => Ok(Bytes::new()),
        }
    }
}

/// Wallet API messages are usually hex-encoded UTF-8.
fn decode_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

fn rejection_message(code: Option<&str>, message: Option<&str>) -> String {
    let message = message.map(decode_message).unwrap_or_default();
    match code {
        Some(code) if message.is_empty() => code.to_string(),
        Some(code) => format!("{}: {}", code, message),
        None if message.is_empty() => "unknown error".to_string(),
        None => message,
    }
}
