use std::str::FromStr;

use bon::Builder;
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use url::Url;

use crate::solana::rpc::{ParsedTransaction, SolanaRpc};
use crate::solana::{
    DEFAULT_COMMITMENT, DEFAULT_RPC_URL, MAX_TX_AGE_SECONDS, USDC_DECIMALS, USDC_DEVNET_MINT,
    associated_token_address,
};
use crate::types::{Base64EncodedHeader, PaymentProof, PricingConfig, price_to_base_units};
use crate::verifier::Verifier;

/// On-chain verifier for SPL-token payments.
///
/// A transaction pays for a challenge when it carries a `transferChecked`
/// of at least the priced amount of USDC to the recipient's associated
/// token account, plus a memo of exactly `"{nonce}|{request_hash}"`. The
/// memo binds the transaction to the specific challenge, so an unrelated
/// transfer to the same recipient can never be replayed as payment.
#[derive(Builder, Debug, Clone)]
pub struct SolanaVerifier {
    #[builder(default = default_rpc_url())]
    pub rpc_url: Url,
    #[builder(into, default = DEFAULT_COMMITMENT.to_string())]
    pub commitment: String,
    /// Accept transfers up to this many base units under the price.
    #[builder(default = 0)]
    pub amount_tolerance: u64,
    #[builder(skip = reqwest::Client::new())]
    http: reqwest::Client,
}

fn default_rpc_url() -> Url {
    Url::parse(DEFAULT_RPC_URL).expect("default RPC URL parses")
}

impl Default for SolanaVerifier {
    fn default() -> Self {
        SolanaVerifier::builder().build()
    }
}

impl SolanaVerifier {
    fn rpc(&self) -> SolanaRpc {
        SolanaRpc::with_client(
            self.rpc_url.clone(),
            self.commitment.clone(),
            self.http.clone(),
        )
    }
}

impl Verifier for SolanaVerifier {
    async fn verify(&self, proof_header: &str, request_hash: &str, pricing: &PricingConfig) -> bool {
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

        let Ok(expected_amount) = price_to_base_units(&pricing.price, USDC_DECIMALS) else {
            return false;
        };
        let Ok(recipient) = Pubkey::from_str(&pricing.recipient) else {
            return false;
        };

        let tx = match self.rpc().get_parsed_transaction(&proof.signature).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                tracing::debug!(signature = %proof.signature, "payment transaction not found");
                return false;
            }
            Err(err) => {
                tracing::debug!("payment transaction lookup failed: {err}");
                return false;
            }
        };

        let recipient_ata = associated_token_address(&recipient, &USDC_DEVNET_MINT);
        transaction_pays_challenge(
            &tx,
            &proof,
            expected_amount,
            &recipient_ata,
            self.amount_tolerance,
            Utc::now(),
        )
    }
}

/// Decision core, pure over an already-fetched transaction.
pub fn transaction_pays_challenge(
    tx: &ParsedTransaction,
    proof: &PaymentProof,
    expected_amount: u64,
    recipient_ata: &Pubkey,
    amount_tolerance: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(block_time) = tx.block_time else {
        return false;
    };
    if block_time > proof.expires_at.timestamp() {
        return false;
    }
    if block_time < now.timestamp() - MAX_TX_AGE_SECONDS {
        return false;
    }

    let token_program = spl_token::ID.to_string();
    let memo_program = spl_memo::ID.to_string();
    let mint = USDC_DEVNET_MINT.to_string();
    let destination = recipient_ata.to_string();
    let minimum = expected_amount.saturating_sub(amount_tolerance);
    let expected_memo = format!("{}|{}", proof.nonce, proof.request_hash);

    let instructions = &tx.transaction.message.instructions;

    let has_transfer = instructions.iter().any(|ix| {
        if ix.program_id != token_program {
            return false;
        }
        let Some(parsed) = &ix.parsed else {
            return false;
        };
        if parsed.get("type").and_then(|t| t.as_str()) != Some("transferChecked") {
            return false;
        }
        let Some(info) = parsed.get("info") else {
            return false;
        };
        info.get("mint").and_then(|m| m.as_str()) == Some(mint.as_str())
            && info.get("destination").and_then(|d| d.as_str()) == Some(destination.as_str())
            && info
                .get("tokenAmount")
                .and_then(|ta| ta.get("amount"))
                .and_then(|a| a.as_str())
                .and_then(|a| a.parse::<u64>().ok())
                .is_some_and(|amount| amount >= minimum)
    });

    let has_memo = instructions.iter().any(|ix| {
        ix.program_id == memo_program
            && ix.parsed.as_ref().and_then(|p| p.as_str()) == Some(expected_memo.as_str())
    });

    has_transfer && has_memo
}
