//! Callbacks layering credentials and diagnostics onto every exchange.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderValue, AUTHORIZATION};

use crate::events::{EventBus, Phase};

/// An `authorization` header added to every outgoing request.
#[derive(Debug, Clone)]
pub struct HeaderAuth {
    value: HeaderValue,
}

impl HeaderAuth {
    /// Send `value` verbatim, e.g. `GoogleLogin Auth=...`.
    pub fn new(value: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(value)?;
        value.set_sensitive(true);
        Ok(HeaderAuth { value })
    }

    /// HTTP basic authentication.
    pub fn basic(name: &str, password: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        let encoded = STANDARD.encode(format!("{name}:{password}"));
        HeaderAuth::new(&format!("Basic {encoded}"))
    }

    /// A bearer token.
    pub fn bearer(token: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        HeaderAuth::new(&format!("Bearer {token}"))
    }

    /// Add the header to every request announced on `bus` from now on.
    pub fn register(self, bus: &EventBus) {
        bus.subscribe(
            // PRE on its own selects every request
            crate::events::Filter::pre(),
            move |headers, _, _| {
                headers.insert(AUTHORIZATION, self.value.clone());
                Ok(())
            },
        );
    }
}

/// Log both sides of every exchange announced on `bus`.
pub fn trace_exchanges(bus: &EventBus) {
    bus.subscribe(crate::events::Filter::any(), |headers, body, event| {
        match event.phase {
            Phase::Pre => tracing::debug!(
                uri = %event.uri,
                resource = %event.resource,
                operation = %event.operation,
                body_len = body.len(),
                "request"
            ),
            Phase::Post => tracing::debug!(
                uri = %event.uri,
                resource = %event.resource,
                operation = %event.operation,
                status = event.status.map(|s| s.as_u16()),
                content_type = headers
                    .get(http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok()),
                body_len = body.len(),
                "response"
            ),
        }
        Ok(())
    });
}
