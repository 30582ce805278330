//! Priced weather endpoint behind the payment gate.
//!
//! `PAYMENT_MODE=mock` (default) verifies HMAC proofs under
//! `MOCK_SECRET`; `PAYMENT_MODE=solana` verifies real devnet transfers
//! to `RECIPIENT_WALLET`.

use std::collections::HashMap;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use x402_gate::types::PricingConfig;
use x402_gate::verifier::{MockVerifier, SolanaVerifier, Verifier};
use x402_gate_axum::PaymentGate;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mode = std::env::var("PAYMENT_MODE").unwrap_or_else(|_| "mock".to_string());
    let recipient =
        std::env::var("RECIPIENT_WALLET").unwrap_or_else(|_| "mock-recipient".to_string());

    let pricing = PricingConfig::builder()
        .price("0.001")
        .asset("USDC")
        .network(if mode == "solana" { "solana-devnet" } else { "mock" })
        .recipient(recipient)
        .description("Current weather for a city")
        .build();

    let app = match mode.as_str() {
        "solana" => {
            let verifier = SolanaVerifier::builder();
            let verifier = match std::env::var("SOLANA_RPC_URL") {
                Ok(url) => verifier
                    .rpc_url(url.parse().expect("Invalid SOLANA_RPC_URL"))
                    .build(),
                Err(_) => verifier.build(),
            };
            weather_router(verifier, pricing)
        }
        _ => {
            let secret =
                std::env::var("MOCK_SECRET").unwrap_or_else(|_| "mock-secret".to_string());
            weather_router(MockVerifier::new(secret), pricing)
        }
    };

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3402".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .expect("bind failed");
    tracing::info!("Listening on http://{host}:{port} (mode: {mode})");
    axum::serve(listener, app).await.expect("server failed");
}

fn weather_router<V: Verifier + 'static>(verifier: V, pricing: PricingConfig) -> Router {
    let gate = PaymentGate::builder().verifier(verifier).build();

    Router::new().route(
        "/weather",
        get(weather).layer(gate.price(pricing).expect("invalid pricing")),
    )
}

async fn weather(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let city = params
        .get("city")
        .cloned()
        .unwrap_or_else(|| "London".to_string());

    Json(json!({
        "city": city,
        "temp": 15,
        "condition": "Cloudy",
        "humidity": 72,
        "unit": "celsius"
    }))
}
