use std::fmt::Display;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Header carrying the base64url-encoded payment proof.
pub const PAYMENT_PROOF_HEADER: &str = "x-payment-proof";

/// Client-chosen opaque key enabling safe retries.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Set to `true` on responses served from the idempotency store.
pub const IDEMPOTENT_REPLAY_HEADER: &str = "x-idempotent-replay";

pub type Record<V> = std::collections::HashMap<String, V>;

/// Why an `X-Payment-Proof` header failed to decode. The gate treats
/// every variant the same way (an ordinary proof rejection); the split
/// exists for client-side diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ProofCodecError {
    #[error("Header is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Header payload is not a valid proof: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Protocol version carried in challenges and proofs. Serializes as the
/// bare integer `1`; any other value is rejected at decode time.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProtocolVersion {
    V1 = 1,
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version as u8
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = UnsupportedVersion;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolVersion::V1),
            other => Err(UnsupportedVersion(other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported protocol version: {0}")]
pub struct UnsupportedVersion(pub u8);

/// Represents a base64url-encoded header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64EncodedHeader(pub String);

impl Base64EncodedHeader {
    pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Base64EncodedHeader(URL_SAFE_NO_PAD.encode(json)))
    }

    pub(crate) fn decode_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProofCodecError> {
        // Tolerate padded base64url input from other encoders.
        let decoded = URL_SAFE_NO_PAD.decode(self.0.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&decoded)?)
    }
}

impl Serialize for Base64EncodedHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Base64EncodedHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Base64EncodedHeader(s))
    }
}

impl Display for Base64EncodedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
