//! Tool facade: a declared HTTP endpoint with an input schema, invoked
//! through the paying client. Input validation is a thin required-field
//! check; the schema itself travels with the definition for discovery.

use bon::Builder;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::client::{FetchError, PayingClient};
use crate::payer::Payer;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(Method),

    #[error("Input encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A priced HTTP endpoint declared as an invokable tool.
#[derive(Builder, Debug, Clone)]
pub struct ToolDefinition {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub description: String,
    /// JSON schema for the input object; only `required` is enforced.
    pub input_schema: Value,
    pub endpoint: Url,
    pub method: Method,
    #[builder(default)]
    pub headers: HeaderMap,
}

/// Result of a tool invocation.
#[derive(Debug)]
pub struct ToolOutcome {
    pub ok: bool,
    pub status: StatusCode,
    /// Decoded JSON when the content type permits, else the raw text.
    pub data: Value,
}

impl ToolDefinition {
    pub async fn invoke<P: Payer>(
        &self,
        client: &PayingClient<P>,
        input: Value,
    ) -> Result<ToolOutcome, ToolError> {
        if let Some(field) = missing_required(&self.input_schema, &input) {
            return Err(ToolError::MissingField(field));
        }

        let mut url = self.endpoint.clone();
        let mut headers = self.headers.clone();
        let mut body = None;

        if self.method == Method::GET || self.method == Method::DELETE {
            if let Some(object) = input.as_object() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in object {
                    pairs.append_pair(key, &stringify(value));
                }
            }
        } else if self.method == Method::POST
            || self.method == Method::PUT
            || self.method == Method::PATCH
        {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            body = Some(Bytes::from(serde_json::to_vec(&input)?));
        } else {
            return Err(ToolError::UnsupportedMethod(self.method.clone()));
        }

        let response = client
            .fetch(self.method.clone(), url, headers, body)
            .await?;

        let is_json = response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let data = if is_json {
            response
                .json()
                .unwrap_or_else(|_| Value::String(response.text().into_owned()))
        } else {
            Value::String(response.text().into_owned())
        };

        Ok(ToolOutcome {
            ok: response.is_success(),
            status: response.status,
            data,
        })
    }
}

/// First name from `schema.required` that is absent or null in `input`.
fn missing_required(schema: &Value, input: &Value) -> Option<String> {
    let required = schema.get("required")?.as_array()?;
    for name in required.iter().filter_map(Value::as_str) {
        match input.get(name) {
            None | Some(Value::Null) => return Some(name.to_string()),
            Some(_) => {}
        }
    }
    None
}

/// Query-string rendering: strings stay bare, everything else uses its
/// JSON form.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
