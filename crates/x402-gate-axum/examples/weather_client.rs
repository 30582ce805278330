//! Paying client for the weather example, via the tool facade.
//!
//! `PAYMENT_MODE=mock` (default) signs proofs under `MOCK_SECRET`;
//! `PAYMENT_MODE=solana` pays with real devnet USDC from
//! `SOLANA_PRIVATE_KEY`.

use http::Method;
use serde_json::json;
use x402_gate::client::PayingClient;
use x402_gate::payer::{MockPayer, Payer, SolanaPayerConfig};
use x402_gate::tool::ToolDefinition;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mode = std::env::var("PAYMENT_MODE").unwrap_or_else(|_| "mock".to_string());
    match mode.as_str() {
        "solana" => {
            let config = SolanaPayerConfig::builder().private_key(
                std::env::var("SOLANA_PRIVATE_KEY").expect("SOLANA_PRIVATE_KEY not set"),
            );
            let config = match std::env::var("SOLANA_RPC_URL") {
                Ok(url) => config.rpc_url(url).build(),
                Err(_) => config.build(),
            };
            let payer = config.connect().expect("Invalid payer configuration");
            run(payer).await;
        }
        _ => {
            let secret =
                std::env::var("MOCK_SECRET").unwrap_or_else(|_| "mock-secret".to_string());
            run(MockPayer::builder().secret(secret).build()).await;
        }
    }
}

async fn run<P: Payer>(payer: P) {
    let server = std::env::var("SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3402".to_string());
    let client = PayingClient::builder().payer(payer).build();

    let tool = ToolDefinition::builder()
        .name("get_weather")
        .description("Current weather for a city")
        .input_schema(json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        }))
        .endpoint(
            format!("{server}/weather")
                .parse()
                .expect("Invalid SERVER_URL"),
        )
        .method(Method::GET)
        .build();

    let outcome = tool
        .invoke(&client, json!({ "city": "London" }))
        .await
        .expect("tool invocation failed");

    tracing::info!(status = %outcome.status, ok = outcome.ok, "tool call finished");
    println!("{}", serde_json::to_string_pretty(&outcome.data).expect("serializable"));
}
