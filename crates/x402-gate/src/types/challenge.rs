use bon::Builder;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::solana::USDC_DECIMALS;
use crate::types::{
    Base64EncodedHeader, PriceError, ProofCodecError, ProtocolVersion, Record, price_to_base_units,
};

/// Default challenge lifetime when neither the route pricing nor the gate
/// overrides it.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// A payment challenge, issued in the body of a 402 response.
///
/// Challenges are stateless on the server side: the `request_hash` binds
/// the challenge to the exact request bytes and is recomputed at
/// verification time, so nothing needs to be remembered between the
/// denial and the paid retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub version: ProtocolVersion,
    /// Scheme name, e.g. "exact".
    pub scheme: String,
    /// Decimal price string, e.g. "0.001".
    pub price: String,
    /// Asset symbol, e.g. "USDC".
    pub asset: String,
    /// Network name; "mock" for the offline HMAC pair.
    pub network: String,
    /// Destination address or account to pay to. Format depends on network.
    pub recipient: String,
    /// One-shot identifier; accepting a proof consumes it.
    pub nonce: String,
    /// Challenge expiry, RFC 3339 UTC.
    pub expires_at: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the canonical request.
    pub request_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Challenge {
    /// Issue a fresh challenge for a priced route.
    ///
    /// The nonce is a v4 UUID (128 random bits), unique for the lifetime
    /// of the process.
    pub fn issue(
        pricing: &PricingConfig,
        request_hash: impl Into<String>,
        default_ttl_seconds: u64,
    ) -> Self {
        let ttl = pricing.ttl_seconds.unwrap_or(default_ttl_seconds);
        Challenge {
            version: ProtocolVersion::V1,
            scheme: pricing
                .scheme
                .clone()
                .unwrap_or_else(|| "exact".to_string()),
            price: pricing.price.clone(),
            asset: pricing.asset.clone(),
            network: pricing
                .network
                .clone()
                .unwrap_or_else(|| "mock".to_string()),
            recipient: pricing.recipient.clone(),
            nonce: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::seconds(ttl as i64),
            request_hash: request_hash.into(),
            description: pricing.description.clone(),
        }
    }
}

/// The 402 body wrapper. Serializes with the canonical `x402` key; the
/// `challenge` key is accepted on decode for interoperability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeEnvelope {
    #[serde(rename = "x402", alias = "challenge")]
    pub challenge: Challenge,
}

impl From<Challenge> for ChallengeEnvelope {
    fn from(challenge: Challenge) -> Self {
        ChallengeEnvelope { challenge }
    }
}

/// Proof of payment, carried base64url-encoded in the `X-Payment-Proof`
/// header.
///
/// `nonce`, `request_hash`, and `expires_at` are copied verbatim from the
/// originating challenge. `signature` is scheme-specific: an HMAC hex
/// digest for the mock pair, a transaction signature for Solana.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub version: ProtocolVersion,
    pub nonce: String,
    pub request_hash: String,
    pub payer: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signature: String,
}

impl TryFrom<PaymentProof> for Base64EncodedHeader {
    type Error = serde_json::Error;

    fn try_from(value: PaymentProof) -> Result<Self, Self::Error> {
        Base64EncodedHeader::encode_json(&value)
    }
}

impl TryFrom<Base64EncodedHeader> for PaymentProof {
    type Error = ProofCodecError;

    fn try_from(value: Base64EncodedHeader) -> Result<Self, Self::Error> {
        value.decode_json()
    }
}

/// Per-route pricing configuration.
///
/// `scheme`, `network`, and `ttl_seconds` fall back to "exact", "mock",
/// and the gate default at challenge issuance.
#[derive(Builder, Debug, Clone)]
pub struct PricingConfig {
    /// Decimal price string, e.g. "0.001". Validated at config load.
    #[builder(into)]
    pub price: String,
    /// Asset symbol, e.g. "USDC".
    #[builder(into)]
    pub asset: String,
    #[builder(into)]
    pub network: Option<String>,
    /// Destination address or account to pay to.
    #[builder(into)]
    pub recipient: String,
    #[builder(into)]
    pub scheme: Option<String>,
    #[builder(into)]
    pub description: Option<String>,
    pub ttl_seconds: Option<u64>,
}

impl PricingConfig {
    /// Reject malformed or negative prices before any traffic is served.
    pub fn validate(&self) -> Result<(), PriceError> {
        price_to_base_units(&self.price, USDC_DECIMALS)?;
        Ok(())
    }
}

/// A response captured by the idempotency store, bound to the request
/// hash it answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub request_hash: String,
    pub status_code: u16,
    pub body: Vec<u8>,
    pub headers: Record<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing() -> PricingConfig {
        PricingConfig::builder()
            .price("0.001")
            .asset("USDC")
            .recipient("mock-recipient")
            .build()
    }

    #[test]
    fn test_issue_fills_defaults() {
        let challenge = Challenge::issue(&pricing(), "ab".repeat(32), DEFAULT_TTL_SECONDS);
        assert_eq!(challenge.scheme, "exact");
        assert_eq!(challenge.network, "mock");
        assert_eq!(challenge.price, "0.001");
        assert!(challenge.expires_at > Utc::now());
        assert_eq!(challenge.request_hash.len(), 64);
    }

    #[test]
    fn test_issue_nonces_are_unique() {
        let p = pricing();
        let a = Challenge::issue(&p, "ab".repeat(32), 300);
        let b = Challenge::issue(&p, "ab".repeat(32), 300);
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_envelope_uses_x402_key_and_accepts_challenge_alias() {
        let envelope = ChallengeEnvelope::from(Challenge::issue(&pricing(), "cd".repeat(32), 300));
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("x402").is_some());

        let renamed = serde_json::json!({ "challenge": json["x402"] });
        let decoded: ChallengeEnvelope = serde_json::from_value(renamed).unwrap();
        assert_eq!(decoded.challenge.nonce, envelope.challenge.nonce);
    }

    #[test]
    fn test_proof_header_round_trip() {
        let proof = PaymentProof {
            version: ProtocolVersion::V1,
            nonce: "n-1".to_string(),
            request_hash: "ab".repeat(32),
            payer: "payer-1".to_string(),
            timestamp: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(300),
            signature: "deadbeef".to_string(),
        };

        let header = Base64EncodedHeader::try_from(proof.clone()).unwrap();
        let decoded = PaymentProof::try_from(header).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_proof_decode_rejects_unknown_version() {
        let json = serde_json::json!({
            "version": 2,
            "nonce": "n",
            "requestHash": "ab",
            "payer": "p",
            "timestamp": "2026-01-01T00:00:00Z",
            "expiresAt": "2026-01-01T00:05:00Z",
            "signature": "s",
        });
        assert!(serde_json::from_value::<PaymentProof>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_price() {
        let bad = PricingConfig::builder()
            .price("0.0.1")
            .asset("USDC")
            .recipient("r")
            .build();
        assert!(bad.validate().is_err());
        assert!(pricing().validate().is_ok());
    }
}
