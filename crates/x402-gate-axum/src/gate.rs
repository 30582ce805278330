use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::HeaderValue;
use x402_gate::hash::request_hash;
use x402_gate::idempotency::{IdempotencyStore, MemoryIdempotencyStore};
use x402_gate::nonce::NonceRegistry;
use x402_gate::sweep::SweeperHandle;
use x402_gate::types::{
    Base64EncodedHeader, Challenge, DEFAULT_TTL_SECONDS, IDEMPOTENCY_KEY_HEADER,
    IDEMPOTENT_REPLAY_HEADER, PAYMENT_PROOF_HEADER, PaymentProof, PriceError, PricingConfig,
    StoredResponse,
};
use x402_gate::verifier::Verifier;

use crate::errors::GateResponse;
use crate::layer::PricedLayer;

/// Largest request body the gate will buffer for hashing.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Accepted nonces outlive their proof by this much before eviction.
const NONCE_GRACE_MS: i64 = 60_000;

/// Payment identity attached to request extensions before the handler
/// runs, so handlers can observe who paid.
#[derive(Debug, Clone)]
pub struct PaymentState {
    pub payer: String,
    pub nonce: String,
}

/// The payment gate: one per middleware instance, shared across priced
/// routes.
///
/// Owns the verifier, the nonce registry, the idempotency store, and
/// their background sweeps. Dropping every clone of the gate aborts the
/// sweeps and releases the stores; nothing lives at module level.
pub struct PaymentGate<V> {
    inner: Arc<GateInner<V>>,
}

impl<V> Clone for PaymentGate<V> {
    fn clone(&self) -> Self {
        PaymentGate {
            inner: self.inner.clone(),
        }
    }
}

struct GateInner<V> {
    verifier: V,
    store: Arc<dyn IdempotencyStore>,
    nonces: Arc<NonceRegistry>,
    default_ttl_seconds: u64,
    max_body_bytes: usize,
    _sweepers: Vec<SweeperHandle>,
}

#[bon::bon]
impl<V: Verifier> PaymentGate<V> {
    /// Build a gate. Must be called inside a tokio runtime: the store
    /// sweeps are spawned here.
    #[builder]
    pub fn new(
        verifier: V,
        /// Defaults to a fresh in-memory store. A custom store manages
        /// its own eviction.
        idempotency_store: Option<Arc<dyn IdempotencyStore>>,
        #[builder(default = DEFAULT_TTL_SECONDS)] default_ttl_seconds: u64,
        #[builder(default = DEFAULT_MAX_BODY_BYTES)] max_body_bytes: usize,
    ) -> Self {
        let nonces = NonceRegistry::new();
        let mut sweepers = vec![nonces.spawn_sweeper()];

        let store = match idempotency_store {
            Some(store) => store,
            None => {
                let store = MemoryIdempotencyStore::new();
                sweepers.push(store.spawn_sweeper());
                store as Arc<dyn IdempotencyStore>
            }
        };

        PaymentGate {
            inner: Arc::new(GateInner {
                verifier,
                store,
                nonces,
                default_ttl_seconds,
                max_body_bytes,
                _sweepers: sweepers,
            }),
        }
    }
}

impl<V: Verifier> PaymentGate<V> {
    /// Turn a route pricing into a tower layer for that route. Malformed
    /// prices are refused here, before any traffic is served.
    pub fn price(&self, pricing: PricingConfig) -> Result<PricedLayer<V>, PriceError> {
        pricing.validate()?;
        Ok(PricedLayer::new(self.clone(), pricing))
    }

    /// Run the per-request payment flow around `handler`.
    ///
    /// Idempotency is checked before proof verification so a stored
    /// replay never needs a fresh proof; the nonce is reserved only
    /// after the signature checks out, so forged proofs cannot exhaust
    /// the nonce space.
    pub async fn handle<F, Fut, E>(
        &self,
        pricing: &PricingConfig,
        request: Request,
        handler: F,
    ) -> Result<Response, E>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response, E>>,
    {
        let (mut parts, body) = request.into_parts();
        let body_bytes = match to_bytes(body, self.inner.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(GateResponse::body_too_large().into_response()),
        };

        let hash = request_hash(
            parts.method.as_str(),
            parts.uri.path(),
            parts.uri.query().unwrap_or(""),
            &body_bytes,
        );

        let idempotency_key = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        if let Some(key) = &idempotency_key {
            if let Some(stored) = self.inner.store.get(key).await {
                if stored.request_hash == hash {
                    tracing::debug!(%key, "serving idempotent replay");
                    return Ok(replay_response(stored));
                }
                tracing::debug!(%key, "idempotency key conflict");
                return Ok(GateResponse::idempotency_conflict(key).into_response());
            }
        }

        let proof_header = parts
            .headers
            .get(PAYMENT_PROOF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let Some(proof_header) = proof_header else {
            let challenge = Challenge::issue(pricing, hash.as_str(), self.inner.default_ttl_seconds);
            tracing::debug!(nonce = %challenge.nonce, request_hash = %hash, "issuing payment challenge");
            return Ok(GateResponse::challenge(challenge).into_response());
        };

        if !self
            .inner
            .verifier
            .verify(&proof_header, &hash, pricing)
            .await
        {
            return Ok(GateResponse::invalid_proof().into_response());
        }

        // The verifier decoded the proof internally; decode again for
        // the nonce and expiry.
        let Ok(proof) = PaymentProof::try_from(Base64EncodedHeader(proof_header)) else {
            return Ok(GateResponse::invalid_proof().into_response());
        };

        let expiry_ms = proof.expires_at.timestamp_millis() + NONCE_GRACE_MS;
        if !self.inner.nonces.try_reserve(&proof.nonce, expiry_ms) {
            tracing::debug!(nonce = %proof.nonce, "nonce replay refused");
            return Ok(GateResponse::nonce_replay().into_response());
        }

        parts.extensions.insert(PaymentState {
            payer: proof.payer.clone(),
            nonce: proof.nonce.clone(),
        });

        // Re-offer the buffered bytes to downstream extractors.
        let request = Request::from_parts(parts, Body::from(body_bytes));
        let response = handler(request).await?;

        match idempotency_key {
            Some(key) => Ok(self.capture_response(&key, &hash, response).await),
            None => Ok(response),
        }
    }

    /// Persist the handler's response under the idempotency key. Runs
    /// only after the handler returns; earlier failures never cache.
    async fn capture_response(&self, key: &str, hash: &str, response: Response) -> Response {
        let (parts, body) = response.into_parts();
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("failed to buffer handler response for capture: {err}");
                return GateResponse::internal("Response buffering failed").into_response();
            }
        };

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        self.inner
            .store
            .set(
                key,
                StoredResponse {
                    request_hash: hash.to_string(),
                    status_code: parts.status.as_u16(),
                    body: bytes.to_vec(),
                    headers,
                },
            )
            .await;

        Response::from_parts(parts, Body::from(bytes))
    }
}

/// Rebuild a stored response, reproducing the captured headers and
/// marking it as a replay.
fn replay_response(stored: StoredResponse) -> Response {
    let mut builder = Response::builder().status(stored.status_code);
    for (name, value) in &stored.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    match builder.body(Body::from(stored.body)) {
        Ok(mut response) => {
            response
                .headers_mut()
                .insert(IDEMPOTENT_REPLAY_HEADER, HeaderValue::from_static("true"));
            response
        }
        Err(err) => {
            tracing::warn!("stored response could not be rebuilt: {err}");
            GateResponse::internal("Stored response could not be rebuilt").into_response()
        }
    }
}
