//! Minimal typed JSON-RPC view of `getTransaction` in `jsonParsed`
//! encoding. Only the fields the verifier inspects are modeled; the rest
//! of the payload is ignored on deserialization.

use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// A confirmed transaction as returned by `getTransaction`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    pub slot: u64,
    /// Unix seconds; null when the node has not resolved the block time.
    #[serde(default)]
    pub block_time: Option<i64>,
    pub transaction: ParsedTransactionBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedTransactionBody {
    pub message: ParsedMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedMessage {
    pub instructions: Vec<ParsedInstruction>,
}

/// One instruction in `jsonParsed` form. Programs without a parser keep
/// `parsed` empty and are skipped by the verifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    #[serde(default)]
    pub program: Option<String>,
    pub program_id: String,
    #[serde(default)]
    pub parsed: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RpcEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client for the one read the verifier needs.
#[derive(Debug, Clone)]
pub struct SolanaRpc {
    url: Url,
    commitment: String,
    http: reqwest::Client,
}

impl SolanaRpc {
    pub fn new(url: Url, commitment: impl Into<String>) -> Self {
        Self::with_client(url, commitment, reqwest::Client::new())
    }

    /// Reuse an existing connection pool.
    pub fn with_client(url: Url, commitment: impl Into<String>, http: reqwest::Client) -> Self {
        SolanaRpc {
            url,
            commitment: commitment.into(),
            http,
        }
    }

    /// Fetch a transaction by signature. `Ok(None)` means the ledger does
    /// not know the transaction at the configured commitment.
    pub async fn get_parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, RpcError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                signature,
                {
                    "encoding": "jsonParsed",
                    "commitment": self.commitment,
                    "maxSupportedTransactionVersion": 0,
                }
            ],
        });

        let envelope: RpcEnvelope<ParsedTransaction> = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = envelope.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_transaction_decodes_rpc_shape() {
        let json = serde_json::json!({
            "slot": 1234,
            "blockTime": 1_700_000_000,
            "transaction": {
                "message": {
                    "instructions": [
                        {
                            "program": "spl-memo",
                            "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
                            "parsed": "n|h"
                        },
                        {
                            "programId": "11111111111111111111111111111111"
                        }
                    ]
                }
            }
        });

        let tx: ParsedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.block_time, Some(1_700_000_000));
        assert_eq!(tx.transaction.message.instructions.len(), 2);
        assert!(tx.transaction.message.instructions[1].parsed.is_none());
    }
}
