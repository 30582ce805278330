//! Proof verification.
//!
//! A verifier answers one question: does this proof header pay for the
//! request with this hash under this pricing? Implementations are
//! selected at gate construction; failures are never distinguished to
//! the client.

mod mock;
mod solana;

pub use mock::{DEFAULT_MOCK_SECRET, MockVerifier, hmac_signature};
pub use solana::SolanaVerifier;

use std::future::Future;

use crate::types::PricingConfig;

pub trait Verifier: Send + Sync {
    /// Validate a raw `X-Payment-Proof` header against the recomputed
    /// request hash. Malformed headers are plain rejections.
    fn verify(
        &self,
        proof_header: &str,
        request_hash: &str,
        pricing: &PricingConfig,
    ) -> impl Future<Output = bool> + Send;
}
