use bon::Builder;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::types::{Base64EncodedHeader, PaymentProof, PricingConfig};
use crate::verifier::Verifier;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_MOCK_SECRET: &str = "mock-secret";

/// HMAC-SHA256 over `"{nonce}|{request_hash}"`, lowercase hex. Shared by
/// the mock payer and verifier.
pub fn hmac_signature(secret: &[u8], nonce: &str, request_hash: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(nonce.as_bytes());
    mac.update(b"|");
    mac.update(request_hash.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Offline verifier for testing: a symmetric secret stands in for a
/// ledger. Pricing carries no amount semantics in this mode.
#[derive(Builder, Debug, Clone)]
pub struct MockVerifier {
    #[builder(into, default = DEFAULT_MOCK_SECRET.to_string())]
    secret: String,
}

impl MockVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        MockVerifier {
            secret: secret.into(),
        }
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        MockVerifier::new(DEFAULT_MOCK_SECRET)
    }
}

impl Verifier for MockVerifier {
    async fn verify(&self, proof_header: &str, request_hash: &str, _pricing: &PricingConfig) -> bool {
        let Ok(proof) = PaymentProof::try_from(Base64EncodedHeader(proof_header.to_string()))
        else {
            return false;
        };

        if proof.request_hash != request_hash {
            return false;
        }
        if proof.expires_at <= Utc::now() {
            return false;
        }

        let expected = hmac_signature(self.secret.as_bytes(), &proof.nonce, &proof.request_hash);
        if expected.len() != proof.signature.len() {
            return false;
        }
        expected
            .as_bytes()
            .ct_eq(proof.signature.as_bytes())
            .into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::payer::{MockPayer, PayContext, Payer};
    use crate::types::{Challenge, PricingConfig};

    fn pricing() -> PricingConfig {
        PricingConfig::builder()
            .price("0.001")
            .asset("USDC")
            .recipient("mock-recipient")
            .build()
    }

    fn challenge(request_hash: &str) -> Challenge {
        Challenge::issue(&pricing(), request_hash, 300)
    }

    async fn proof_header(secret: &str, challenge: &Challenge) -> String {
        let payer = MockPayer::builder().secret(secret).build();
        let ctx = PayContext {
            url: "http://localhost/weather".to_string(),
            method: "GET".to_string(),
        };
        let proof = payer.pay(challenge, &ctx).await.unwrap();
        Base64EncodedHeader::try_from(proof).unwrap().0
    }

    #[tokio::test]
    async fn test_round_trip_under_shared_secret() {
        let hash = "ab".repeat(32);
        let header = proof_header("s3cret", &challenge(&hash)).await;

        let verifier = MockVerifier::new("s3cret");
        assert!(verifier.verify(&header, &hash, &pricing()).await);
    }

    #[tokio::test]
    async fn test_other_secret_fails() {
        let hash = "ab".repeat(32);
        let header = proof_header("s3cret", &challenge(&hash)).await;

        let verifier = MockVerifier::new("other");
        assert!(!verifier.verify(&header, &hash, &pricing()).await);
    }

    #[tokio::test]
    async fn test_other_request_hash_fails() {
        let hash = "ab".repeat(32);
        let header = proof_header("s3cret", &challenge(&hash)).await;

        let verifier = MockVerifier::new("s3cret");
        assert!(!verifier.verify(&header, &"cd".repeat(32), &pricing()).await);
    }

    #[tokio::test]
    async fn test_expired_proof_fails_despite_valid_signature() {
        let hash = "ab".repeat(32);
        let mut challenge = challenge(&hash);
        challenge.expires_at = Utc::now() - Duration::seconds(1);
        let header = proof_header("s3cret", &challenge).await;

        let verifier = MockVerifier::new("s3cret");
        assert!(!verifier.verify(&header, &hash, &pricing()).await);
    }

    #[tokio::test]
    async fn test_truncated_signature_fails() {
        let hash = "ab".repeat(32);
        let payer = MockPayer::builder().secret("s3cret").build();
        let ctx = PayContext {
            url: "http://localhost/weather".to_string(),
            method: "GET".to_string(),
        };
        let mut proof = payer.pay(&challenge(&hash), &ctx).await.unwrap();
        proof.signature.truncate(32);
        let header = Base64EncodedHeader::try_from(proof).unwrap().0;

        let verifier = MockVerifier::new("s3cret");
        assert!(!verifier.verify(&header, &hash, &pricing()).await);
    }

    #[tokio::test]
    async fn test_garbage_header_fails() {
        let verifier = MockVerifier::default();
        assert!(!verifier.verify("%%%not-base64url%%%", &"ab".repeat(32), &pricing()).await);
        let not_json = Base64EncodedHeader(
            base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, "hello"),
        );
        assert!(!verifier.verify(&not_json.0, &"ab".repeat(32), &pricing()).await);
    }
}
