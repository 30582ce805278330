pub mod client;
pub mod hash;
pub mod idempotency;
pub mod nonce;
pub mod payer;
pub mod solana;
pub mod sweep;
pub mod tool;
pub mod types;
pub mod verifier;
