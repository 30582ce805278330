use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};
use x402_gate::types::PricingConfig;
use x402_gate::verifier::Verifier;

use crate::gate::PaymentGate;

/// Tower layer produced by [`PaymentGate::price`]; wraps one priced
/// route.
pub struct PricedLayer<V> {
    gate: PaymentGate<V>,
    pricing: Arc<PricingConfig>,
}

impl<V> PricedLayer<V> {
    pub(crate) fn new(gate: PaymentGate<V>, pricing: PricingConfig) -> Self {
        PricedLayer {
            gate,
            pricing: Arc::new(pricing),
        }
    }
}

impl<V> Clone for PricedLayer<V> {
    fn clone(&self) -> Self {
        PricedLayer {
            gate: self.gate.clone(),
            pricing: self.pricing.clone(),
        }
    }
}

impl<V, S> Layer<S> for PricedLayer<V> {
    type Service = PricedService<V, S>;

    fn layer(&self, inner: S) -> Self::Service {
        PricedService {
            gate: self.gate.clone(),
            pricing: self.pricing.clone(),
            inner,
        }
    }
}

pub struct PricedService<V, S> {
    gate: PaymentGate<V>,
    pricing: Arc<PricingConfig>,
    inner: S,
}

impl<V, S: Clone> Clone for PricedService<V, S> {
    fn clone(&self) -> Self {
        PricedService {
            gate: self.gate.clone(),
            pricing: self.pricing.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<V, S> Service<Request> for PricedService<V, S>
where
    V: Verifier + 'static,
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the ready service and leave the clone behind, per the
        // tower middleware contract.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        let pricing = self.pricing.clone();

        Box::pin(async move {
            gate.handle(&pricing, request, move |request| inner.call(request))
                .await
        })
    }
}
