//! Session-lifecycle wire types.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Claims of the current access token as reported by the verify endpoint.
///
/// Backend variants disagree on the claim name for the granted permission set
/// (`scope` vs `scopes`); both deserialize onto `scopes`.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenClaims {
    pub sub: i64,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "scope")]
    pub scopes: Vec<String>,
}

impl TokenClaims {
    /// `*` grants everything.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == "*" || s == scope)
    }
}
