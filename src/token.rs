use std::fmt;

use serde_json::Value;

use crate::errors::Error;

/// Opaque bearer credential. The server alone knows when it expires; the client
/// learns of expiry only by observing a rejection. Replaced wholesale on refresh,
/// never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value for Authorization headers.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pulls a token out of a login/refresh response body. The field name varies
    /// across backend variants, so it comes from configuration.
    pub(crate) fn from_response_body(body: &Value, field: &str) -> Result<Self, Error> {
        match body.get(field).and_then(Value::as_str) {
            Some(value) if !value.is_empty() => Ok(Self::new(value)),
            _ => Err(Error::Config(format!(
                "token response has no '{field}' string field"
            ))),
        }
    }
}

// Token material stays out of logs; only the length is ever printed.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(len={})", self.0.len())
    }
}
