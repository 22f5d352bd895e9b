//! JSON-RPC client for the relay ledger.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    ChainError, Notification, RelayClient, RelayEvent, RelayHeader, StorageProof, TxStatus,
};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct HeaderJson {
    height: u32,
}

#[derive(Debug, Deserialize)]
struct EventJson {
    tx_hash: String,
    #[serde(default)]
    notifications: Vec<NotificationJson>,
}

#[derive(Debug, Deserialize)]
struct NotificationJson {
    contract_address: String,
    #[serde(default)]
    states: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ProofJson {
    audit_path: String,
}

pub struct HttpRelayClient {
    url: String,
    /// Address of the account submissions are attributed to.
    account: String,
    http: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(url: &str, account: &str) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            account: account.to_string(),
            http,
        })
    }

    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ChainError::Node(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }
        response
            .result
            .ok_or_else(|| ChainError::Response(format!("{method}: missing result")))
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn current_height(&self) -> Result<u32, ChainError> {
        self.rpc("getblockcount", json!([])).await
    }

    async fn header_by_height(&self, height: u32) -> Result<RelayHeader, ChainError> {
        let header: HeaderJson = self.rpc("getheaderbyheight", json!([height])).await?;
        Ok(RelayHeader {
            height: header.height,
        })
    }

    async fn events_by_block(&self, height: u32) -> Result<Vec<RelayEvent>, ChainError> {
        let events: Vec<EventJson> = self.rpc("geteventsbyblock", json!([height])).await?;
        Ok(events
            .into_iter()
            .map(|e| RelayEvent {
                tx_hash: e.tx_hash,
                notifications: e
                    .notifications
                    .into_iter()
                    .map(|n| Notification {
                        contract_address: n.contract_address,
                        states: n.states,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn storage_proof(&self, height: u32, key: &str) -> Result<StorageProof, ChainError> {
        let proof: ProofJson = self.rpc("getstorageproof", json!([height, key])).await?;
        let audit_path = hex::decode(proof.audit_path.trim_start_matches("0x"))
            .map_err(|e| ChainError::Response(format!("audit_path is not hex: {e}")))?;
        Ok(StorageProof { audit_path })
    }

    async fn submit_transfer(
        &self,
        side_chain_id: u64,
        payload: &[u8],
        height: u64,
        origin_tx_id: &[u8],
    ) -> Result<String, ChainError> {
        self.rpc(
            "submittransfer",
            json!([
                side_chain_id,
                hex::encode(payload),
                height,
                hex::encode(origin_tx_id),
                self.account,
            ]),
        )
        .await
    }

    async fn submit_signature(
        &self,
        side_chain_id: u64,
        subject: &[u8],
        signature: &[u8],
    ) -> Result<String, ChainError> {
        self.rpc(
            "submitsignature",
            json!([
                side_chain_id,
                hex::encode(subject),
                hex::encode(signature),
                self.account,
            ]),
        )
        .await
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus, ChainError> {
        let status: String = self.rpc("gettransactionstatus", json!([tx_hash])).await?;
        match status.as_str() {
            "pending" => Ok(TxStatus::Pending),
            "confirmed" => Ok(TxStatus::Confirmed),
            "failed" => Ok(TxStatus::Failed),
            other => Err(ChainError::Response(format!(
                "unknown transaction status \"{other}\""
            ))),
        }
    }

    async fn done_marker_exists(
        &self,
        side_chain_id: u64,
        cross_chain_id: &[u8],
    ) -> Result<bool, ChainError> {
        self.rpc(
            "getdonemarker",
            json!([side_chain_id, hex::encode(cross_chain_id)]),
        )
        .await
    }
}
