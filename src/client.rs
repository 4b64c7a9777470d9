use std::sync::Arc;

use reqwest::Response;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::api::{LoginRequest, TokenClaims};
use crate::config::Config;
use crate::descriptor::RequestDescriptor;
use crate::dispatch::Dispatcher;
use crate::errors::Error;
use crate::refresh::RefreshCoordinator;
use crate::session::{MemorySession, SessionEvent, SessionStore, SessionTeardown};
use crate::token::AccessToken;

const LOGIN_PATH: &str = "/api/login";
const LOGOUT_PATH: &str = "/api/logout";
const VERIFY_PATH: &str = "/api/verify_access_token";

/// Caller-facing client. Every request goes out with the current bearer token
/// and is transparently retried once behind a single-flight refresh when the
/// token expires; an unrecoverable refresh ends the session exactly once.
#[derive(Clone)]
pub struct SessionClient {
    dispatcher: Arc<Dispatcher>,
    coordinator: RefreshCoordinator,
    session: Arc<dyn SessionStore>,
    teardown: SessionTeardown,
    token_field: String,
}

impl SessionClient {
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_session(config, Arc::new(MemorySession::new()))
    }

    /// Builds a client over an application-owned session store.
    pub fn with_session(config: Config, session: Arc<dyn SessionStore>) -> Result<Self, Error> {
        // The cookie store carries the refresh credential the backend sets and
        // rotates out-of-band; this layer never reads it directly.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        let dispatcher = Arc::new(Dispatcher::new(
            http,
            config.base_url.clone(),
            Arc::clone(&session),
        ));
        let teardown = SessionTeardown::new(Arc::clone(&session));
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&dispatcher),
            Arc::clone(&session),
            teardown.clone(),
            config.refresh_path.clone(),
            config.token_field.clone(),
        );
        Ok(Self {
            dispatcher,
            coordinator,
            session,
            teardown,
            token_field: config.token_field,
        })
    }

    /// Behaves like a direct HTTP call from the caller's perspective; expiry
    /// handling is invisible apart from added latency and the possibility of a
    /// terminal `RefreshFailed`.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Response, Error> {
        match self.dispatcher.dispatch(&descriptor).await {
            Err(Error::AuthExpired(status, body)) => {
                self.coordinator
                    .handle_expired(descriptor, status, body)
                    .await
            }
            other => other,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, Error> {
        self.request(RequestDescriptor::get(path)).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Response, Error> {
        self.request(RequestDescriptor::post(path).json(body)?)
            .await
    }

    /// Authenticates and seeds the session store with the granted token.
    ///
    /// A 401 here means bad credentials, not an expired session, so it surfaces
    /// as a plain API error without entering the refresh flow.
    pub async fn login(&self, request: &LoginRequest) -> Result<(), Error> {
        let descriptor = RequestDescriptor::post(LOGIN_PATH).json(request)?;
        let response = match self.dispatcher.dispatch(&descriptor).await {
            Err(Error::AuthExpired(status, body)) => return Err(Error::Api(status, body)),
            other => other?,
        };
        let body = response.json::<serde_json::Value>().await?;
        let token = AccessToken::from_response_body(&body, &self.token_field)?;
        info!(token_len = token.len(), "session.login");
        self.session.set_access_token(token);
        Ok(())
    }

    /// Ends the session: best-effort server-side revocation, then teardown.
    /// Safe to race with a refresh-failure teardown.
    pub async fn logout(&self) {
        let revoke = RequestDescriptor::post(LOGOUT_PATH);
        if let Err(err) = self.dispatcher.dispatch(&revoke).await {
            warn!(error = %err, "session.logout revocation failed");
        }
        self.teardown.teardown();
    }

    /// Asks the backend which scopes the current token grants.
    pub async fn verify(&self) -> Result<TokenClaims, Error> {
        let response = self.request(RequestDescriptor::get(VERIFY_PATH)).await?;
        Ok(response.json::<TokenClaims>().await?)
    }

    /// Explicit teardown hook for the hosting application.
    pub fn teardown(&self) {
        self.teardown.teardown();
    }

    /// Session-ended notifications; one per genuine session-ending event.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.teardown.subscribe()
    }

    pub fn session(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.session)
    }
}
