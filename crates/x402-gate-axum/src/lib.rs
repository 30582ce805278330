//! Axum middleware for x402 payment gating.
//!
//! A [`PaymentGate`] owns the verifier, the nonce registry, and the
//! idempotency store. Calling [`PaymentGate::price`] with a route's
//! [`PricingConfig`](x402_gate::types::PricingConfig) yields a tower
//! layer; routes without the layer pass through untouched.

pub mod errors;
pub mod gate;
pub mod layer;

pub use errors::{GateBody, GateResponse};
pub use gate::{PaymentGate, PaymentState};
pub use layer::{PricedLayer, PricedService};
