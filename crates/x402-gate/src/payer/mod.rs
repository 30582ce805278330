//! Proof acquisition.
//!
//! A payer turns a 402 challenge into a proof of payment. The mock payer
//! signs with a shared secret; the Solana payer broadcasts a real SPL
//! transfer and returns its signature.

mod mock;
mod solana;

pub use mock::MockPayer;
pub use solana::{SolanaPayer, SolanaPayerConfig};

use std::future::Future;

use crate::types::{Challenge, PaymentProof, PriceError};

/// Request context handed to the payer alongside the challenge.
#[derive(Debug, Clone)]
pub struct PayContext {
    pub url: String,
    pub method: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PayError {
    #[error("Payer has no USDC token account")]
    MissingPayerTokenAccount,

    #[error("Recipient has no USDC token account")]
    MissingRecipientTokenAccount,

    #[error("Invalid payer key: {0}")]
    InvalidKey(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error("Instruction build failed: {0}")]
    Instruction(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

pub trait Payer: Send + Sync {
    /// Obtain proof of payment for a challenge. Failures surface to the
    /// caller of the retry loop; nothing is swallowed.
    fn pay(
        &self,
        challenge: &Challenge,
        ctx: &PayContext,
    ) -> impl Future<Output = Result<PaymentProof, PayError>> + Send;
}
