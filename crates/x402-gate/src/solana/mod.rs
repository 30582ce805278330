//! Solana constants and helpers shared by the on-chain verifier/payer pair.

use solana_sdk::pubkey::Pubkey;

pub mod rpc;

/// USDC mint on devnet.
pub const USDC_DEVNET_MINT: Pubkey =
    solana_sdk::pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

pub const USDC_DECIMALS: u8 = 6;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

pub const DEFAULT_COMMITMENT: &str = "confirmed";

/// Transactions older than this are rejected to stop stale-tx replay.
pub const MAX_TX_AGE_SECONDS: i64 = 600;

/// Deterministic per-(owner, mint) account holding the owner's balance.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}
