//! HTTP client for the source ledger's access-node REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ChainError, SourceClient, SourceEvent};

#[derive(Debug, Deserialize)]
struct BlockJson {
    header: BlockHeaderJson,
}

#[derive(Debug, Deserialize)]
struct BlockHeaderJson {
    height: String,
}

#[derive(Debug, Deserialize)]
struct BlockEventsJson {
    #[serde(default)]
    events: Vec<EventJson>,
}

#[derive(Debug, Deserialize)]
struct EventJson {
    #[serde(rename = "type")]
    event_type: String,
    transaction_id: String,
    payload: String,
}

pub struct HttpSourceClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSourceClient {
    pub fn new(base_url: &str) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn latest_height(&self) -> Result<u64, ChainError> {
        let url = format!("{}/v1/blocks?height=sealed", self.base_url);
        let blocks: Vec<BlockJson> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let block = blocks
            .first()
            .ok_or_else(|| ChainError::Response("empty sealed-block list".to_string()))?;
        block
            .header
            .height
            .parse()
            .map_err(|_| ChainError::Response(format!("bad height \"{}\"", block.header.height)))
    }

    async fn events_in_range(
        &self,
        event_type: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<SourceEvent>, ChainError> {
        let url = format!(
            "{}/v1/events?type={}&start_height={}&end_height={}",
            self.base_url, event_type, from, to
        );
        let blocks: Vec<BlockEventsJson> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut events = Vec::new();
        for block in blocks {
            for event in block.events {
                let tx_id = decode_hex("transaction_id", &event.transaction_id)?;
                let payload = decode_hex("payload", &event.payload)?;
                events.push(SourceEvent {
                    event_type: event.event_type,
                    tx_id,
                    payload,
                });
            }
        }
        Ok(events)
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| ChainError::Response(format!("{field} is not hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_sealed_block() {
        let json = r#"[{"header": {"height": "106"}}]"#;
        let blocks: Vec<BlockJson> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks[0].header.height, "106");
    }

    #[test]
    fn test_deserialize_block_events() {
        let json = r#"[
            {
                "events": [
                    {
                        "type": "A.bridge.TransferOut",
                        "transaction_id": "0a0b",
                        "payload": "deadbeef"
                    }
                ]
            },
            {}
        ]"#;
        let blocks: Vec<BlockEventsJson> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks[0].events.len(), 1);
        assert!(blocks[1].events.is_empty());
        assert_eq!(blocks[0].events[0].event_type, "A.bridge.TransferOut");
    }

    #[test]
    fn test_decode_hex_rejects_garbage() {
        assert!(decode_hex("payload", "zzzz").is_err());
        assert_eq!(decode_hex("payload", "0xdead").unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpSourceClient::new("http://localhost:8888/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8888");
    }
}
