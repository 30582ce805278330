use std::str::FromStr;

use bon::Builder;
use chrono::Utc;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use crate::payer::{PayContext, PayError, Payer};
use crate::solana::{DEFAULT_RPC_URL, USDC_DECIMALS, USDC_DEVNET_MINT, associated_token_address};
use crate::types::{Challenge, PaymentProof, price_to_base_units};

/// Configuration for the on-chain payer. The private key is required;
/// everything else has devnet defaults.
#[derive(Builder, Debug, Clone)]
pub struct SolanaPayerConfig {
    /// Either a base58 string or a JSON byte array (auto-detected by a
    /// leading `[`).
    #[builder(into)]
    pub private_key: String,
    #[builder(into, default = DEFAULT_RPC_URL.to_string())]
    pub rpc_url: String,
    #[builder(default = CommitmentConfig::confirmed())]
    pub commitment: CommitmentConfig,
}

impl SolanaPayerConfig {
    /// Parse the key and open the RPC connection.
    pub fn connect(self) -> Result<SolanaPayer, PayError> {
        let keypair = parse_private_key(&self.private_key)?;
        let rpc = RpcClient::new_with_commitment(self.rpc_url, self.commitment);
        Ok(SolanaPayer { keypair, rpc })
    }
}

fn parse_private_key(raw: &str) -> Result<Keypair, PayError> {
    let trimmed = raw.trim();
    let bytes: Vec<u8> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|err| PayError::InvalidKey(err.to_string()))?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .map_err(|err| PayError::InvalidKey(err.to_string()))?
    };
    Keypair::from_bytes(&bytes).map_err(|err| PayError::InvalidKey(err.to_string()))
}

/// Pays challenges with real `transferChecked` + memo transactions on a
/// Solana-compatible ledger.
///
/// The payer never creates the recipient's token account: doing so would
/// shift the funding burden onto the payer, so a missing account is a
/// hard error instead.
pub struct SolanaPayer {
    keypair: Keypair,
    rpc: RpcClient,
}

impl Payer for SolanaPayer {
    async fn pay(&self, challenge: &Challenge, _ctx: &PayContext) -> Result<PaymentProof, PayError> {
        let amount = price_to_base_units(&challenge.price, USDC_DECIMALS)?;
        let recipient = Pubkey::from_str(&challenge.recipient)
            .map_err(|err| PayError::InvalidRecipient(err.to_string()))?;

        let sender = self.keypair.pubkey();
        let sender_ata = associated_token_address(&sender, &USDC_DEVNET_MINT);
        let recipient_ata = associated_token_address(&recipient, &USDC_DEVNET_MINT);

        // get_multiple_accounts distinguishes a missing account (None)
        // from an RPC failure.
        let accounts = self
            .rpc
            .get_multiple_accounts(&[sender_ata, recipient_ata])
            .await
            .map_err(|err| PayError::Rpc(err.to_string()))?;
        if accounts.first().map(Option::is_none).unwrap_or(true) {
            return Err(PayError::MissingPayerTokenAccount);
        }
        if accounts.get(1).map(Option::is_none).unwrap_or(true) {
            return Err(PayError::MissingRecipientTokenAccount);
        }

        let transfer = spl_token::instruction::transfer_checked(
            &spl_token::ID,
            &sender_ata,
            &USDC_DEVNET_MINT,
            &recipient_ata,
            &sender,
            &[],
            amount,
            USDC_DECIMALS,
        )
        .map_err(|err| PayError::Instruction(err.to_string()))?;

        let memo = spl_memo::build_memo(
            format!("{}|{}", challenge.nonce, challenge.request_hash).as_bytes(),
            &[&sender],
        );

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|err| PayError::Rpc(err.to_string()))?;
        let tx = Transaction::new_signed_with_payer(
            &[transfer, memo],
            Some(&sender),
            &[&self.keypair],
            blockhash,
        );

        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|err| PayError::Rpc(err.to_string()))?;

        tracing::info!(%signature, amount, "payment transaction confirmed");

        Ok(PaymentProof {
            version: challenge.version,
            nonce: challenge.nonce.clone(),
            request_hash: challenge.request_hash.clone(),
            payer: sender.to_string(),
            timestamp: Utc::now(),
            expires_at: challenge.expires_at,
            signature: signature.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_private_key_base58() {
        let keypair = Keypair::new();
        let parsed = parse_private_key(&keypair.to_base58_string()).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_private_key_json_byte_array() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let parsed = parse_private_key(&json).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_private_key_rejects_garbage() {
        assert!(matches!(
            parse_private_key("not-a-key-0OIl"),
            Err(PayError::InvalidKey(_))
        ));
        assert!(matches!(
            parse_private_key("[1,2,3]"),
            Err(PayError::InvalidKey(_))
        ));
    }
}
