use std::sync::Arc;

use serde::Serialize;

/// Text frame queued for a dashboard connection.
///
/// The payload is opaque to the fan-out layer. It is reference counted so a
/// single broadcast shares one allocation across every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage(Arc<str>);

impl OutboundMessage {
    pub fn text(payload: impl Into<Arc<str>>) -> Self {
        Self(payload.into())
    }

    /// Serialize a value to JSON once for all recipients
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_string(value)?.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for OutboundMessage {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}
