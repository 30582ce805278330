//! Client-side retry loop.
//!
//! A [`PayingClient`] issues the request as given; on a 402 carrying a
//! challenge envelope it asks its payer for proof and re-issues the
//! request once per remaining retry with the `X-Payment-Proof` header
//! added. Caller-supplied headers, including `Idempotency-Key`, pass
//! through unchanged on the retry.

use std::borrow::Cow;

use bon::Builder;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::payer::{PayContext, PayError, Payer};
use crate::types::{Base64EncodedHeader, ChallengeEnvelope, PAYMENT_PROOF_HEADER, PaymentProof};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Payment(#[from] PayError),

    #[error("Proof encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A buffered HTTP response. Owning the bytes lets the retry loop peek at
/// a 402 body and still hand the response back unchanged when it turns
/// out not to be a challenge.
#[derive(Debug)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ClientResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Fetch wrapper that transparently settles 402 challenges.
#[derive(Builder, Debug, Clone)]
pub struct PayingClient<P: Payer> {
    pub payer: P,
    #[builder(default = reqwest::Client::new())]
    pub http: reqwest::Client,
    /// Payments per call; exactly one payment is made per retry.
    #[builder(default = 1)]
    pub max_retries: u32,
}

impl<P: Payer> PayingClient<P> {
    /// Issue a request, paying for it if the server demands it.
    pub async fn fetch(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<ClientResponse, FetchError> {
        let mut response = self
            .send(method.clone(), url.clone(), &headers, body.clone(), None)
            .await?;

        let mut attempts_left = self.max_retries;
        while response.status == StatusCode::PAYMENT_REQUIRED && attempts_left > 0 {
            attempts_left -= 1;

            // Not an x402 challenge: hand the 402 back unchanged.
            let Ok(envelope) = response.json::<ChallengeEnvelope>() else {
                return Ok(response);
            };

            tracing::debug!(
                nonce = %envelope.challenge.nonce,
                price = %envelope.challenge.price,
                "received payment challenge"
            );

            let ctx = PayContext {
                url: url.to_string(),
                method: method.to_string(),
            };
            let proof = self.payer.pay(&envelope.challenge, &ctx).await?;
            let proof_header = Base64EncodedHeader::try_from(proof)?;

            response = self
                .send(
                    method.clone(),
                    url.clone(),
                    &headers,
                    body.clone(),
                    Some(proof_header),
                )
                .await?;
        }

        Ok(response)
    }

    pub async fn get(&self, url: Url) -> Result<ClientResponse, FetchError> {
        self.fetch(Method::GET, url, HeaderMap::new(), None).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: &HeaderMap,
        body: Option<Bytes>,
        proof: Option<Base64EncodedHeader>,
    ) -> Result<ClientResponse, FetchError> {
        let mut request = self.http.request(method, url).headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body);
        }
        if let Some(proof) = proof {
            request = request.header(PAYMENT_PROOF_HEADER, proof.0);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }
}

/// Encode a proof the way the retry loop does; exposed for callers that
/// drive their own HTTP stack.
pub fn proof_header_value(proof: PaymentProof) -> Result<String, serde_json::Error> {
    Base64EncodedHeader::try_from(proof).map(|header| header.0)
}
