use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::descriptor::RequestDescriptor;
use crate::errors::Error;
use crate::session::SessionStore;

/// Performs a single outbound call for one descriptor. Holds no state between
/// calls; all retry and refresh behaviour lives above it.
pub struct Dispatcher {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl Dispatcher {
    pub(crate) fn new(http: Client, base_url: String, session: Arc<dyn SessionStore>) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    /// Dispatches the descriptor and classifies the outcome: 401 becomes
    /// `AuthExpired`, any other non-success status is an opaque `Api` error,
    /// transport failures map to `Http`.
    pub async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<Response, Error> {
        let url = format!("{}{}", self.base_url, descriptor.path());
        let mut request = self
            .http
            .request(descriptor.method().clone(), &url)
            .headers(descriptor.headers().clone());

        // The bearer is read at call time, not captured when the descriptor was
        // built, so a redispatched descriptor carries whatever token is current.
        if let Some(token) = self.session.access_token() {
            request = request.header("Authorization", format!("Bearer {}", token.reveal()));
        }
        if let Some(body) = descriptor.body() {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(
                method = %descriptor.method(),
                path = descriptor.path(),
                status = status.as_u16(),
                "dispatch.ok"
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                method = %descriptor.method(),
                path = descriptor.path(),
                status = status.as_u16(),
                is_refresh = descriptor.is_refresh(),
                retried = descriptor.is_retried(),
                "dispatch.auth_expired"
            );
            Err(Error::AuthExpired(status, body))
        } else {
            warn!(
                method = %descriptor.method(),
                path = descriptor.path(),
                status = status.as_u16(),
                "dispatch.failed"
            );
            Err(Error::Api(status, body))
        }
    }
}
