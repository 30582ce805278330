use bon::Builder;
use chrono::Utc;

use crate::payer::{PayContext, PayError, Payer};
use crate::types::{Challenge, PaymentProof};
use crate::verifier::{DEFAULT_MOCK_SECRET, hmac_signature};

/// Deterministic offline payer: HMAC-SHA256 over `"{nonce}|{request_hash}"`
/// under a shared secret, no ledger involved.
#[derive(Builder, Debug, Clone)]
pub struct MockPayer {
    #[builder(into, default = DEFAULT_MOCK_SECRET.to_string())]
    secret: String,
    #[builder(into, default = "mock-payer".to_string())]
    payer_address: String,
}

impl Default for MockPayer {
    fn default() -> Self {
        MockPayer::builder().build()
    }
}

impl Payer for MockPayer {
    async fn pay(&self, challenge: &Challenge, _ctx: &PayContext) -> Result<PaymentProof, PayError> {
        Ok(PaymentProof {
            version: challenge.version,
            nonce: challenge.nonce.clone(),
            request_hash: challenge.request_hash.clone(),
            payer: self.payer_address.clone(),
            timestamp: Utc::now(),
            expires_at: challenge.expires_at,
            signature: hmac_signature(
                self.secret.as_bytes(),
                &challenge.nonce,
                &challenge.request_hash,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricingConfig;

    #[tokio::test]
    async fn test_proof_copies_challenge_fields_verbatim() {
        let pricing = PricingConfig::builder()
            .price("0.001")
            .asset("USDC")
            .recipient("r")
            .build();
        let challenge = Challenge::issue(&pricing, "ab".repeat(32), 300);
        let ctx = PayContext {
            url: "http://localhost/weather".to_string(),
            method: "GET".to_string(),
        };

        let payer = MockPayer::builder().payer_address("alice").build();
        let proof = payer.pay(&challenge, &ctx).await.unwrap();

        assert_eq!(proof.nonce, challenge.nonce);
        assert_eq!(proof.request_hash, challenge.request_hash);
        assert_eq!(proof.expires_at, challenge.expires_at);
        assert_eq!(proof.payer, "alice");
        assert_eq!(proof.signature.len(), 64);
    }

    #[tokio::test]
    async fn test_signature_is_deterministic_per_challenge() {
        let pricing = PricingConfig::builder()
            .price("0.001")
            .asset("USDC")
            .recipient("r")
            .build();
        let challenge = Challenge::issue(&pricing, "ab".repeat(32), 300);
        let ctx = PayContext {
            url: "u".to_string(),
            method: "GET".to_string(),
        };

        let payer = MockPayer::default();
        let a = payer.pay(&challenge, &ctx).await.unwrap();
        let b = payer.pay(&challenge, &ctx).await.unwrap();
        assert_eq!(a.signature, b.signature);
    }
}
