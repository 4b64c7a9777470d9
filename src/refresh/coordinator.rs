use std::sync::Arc;

use reqwest::{Response, StatusCode};
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::descriptor::RequestDescriptor;
use crate::dispatch::Dispatcher;
use crate::errors::Error;
use crate::session::{SessionStore, SessionTeardown};
use crate::telemetry::RefreshTelemetry;
use crate::token::AccessToken;

/// One caller suspended on the in-flight refresh. Holds the caller's retried
/// descriptor and the continuation to resolve with its replay result.
struct RefreshWaiter {
    descriptor: RequestDescriptor,
    reply: oneshot::Sender<Result<Response, Error>>,
}

/// Invariants: `refresh_in_flight` is true iff a refresh descriptor has been
/// dispatched and not yet resolved, and `waiters` is empty whenever the flag is
/// false. Every check-or-mutate happens inside one lock acquisition with no
/// await in between.
#[derive(Default)]
struct CoordinatorState {
    refresh_in_flight: bool,
    waiters: Vec<RefreshWaiter>,
}

/// Single-flight refresh coordination.
///
/// However many concurrent requests observe an expired token, exactly one
/// refresh call goes out. The first observer becomes waiter #1 and drives the
/// refresh; everyone else queues behind the same outcome. On success all queued
/// descriptors are redispatched in arrival order with the new token; on failure
/// every waiter is rejected and the session is torn down once.
#[derive(Clone)]
pub(crate) struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<CoordinatorState>,
    dispatcher: Arc<Dispatcher>,
    session: Arc<dyn SessionStore>,
    teardown: SessionTeardown,
    refresh_path: String,
    token_field: String,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        session: Arc<dyn SessionStore>,
        teardown: SessionTeardown,
        refresh_path: String,
        token_field: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CoordinatorState::default()),
                dispatcher,
                session,
                teardown,
                refresh_path,
                token_field,
            }),
        }
    }

    /// Entry point for every `AuthExpired` classification coming off a dispatch.
    pub(crate) async fn handle_expired(
        &self,
        descriptor: RequestDescriptor,
        status: StatusCode,
        body: String,
    ) -> Result<Response, Error> {
        let inner = &self.inner;

        // Refresh calls and descriptors whose single retry is spent never
        // re-enter the refresh flow.
        if descriptor.is_refresh() || descriptor.is_retried() {
            return inner.reject_after_retry(status, body).await;
        }

        let (reply, result) = oneshot::channel();
        let waiter = RefreshWaiter {
            descriptor: descriptor.into_retried(),
            reply,
        };
        let drives = {
            let mut state = inner.state.lock().await;
            state.waiters.push(waiter);
            if state.refresh_in_flight {
                false
            } else {
                state.refresh_in_flight = true;
                true
            }
        };

        if drives {
            Inner::run_refresh(inner).await;
        } else {
            debug!("refresh already in flight, caller queued");
        }

        match result.await {
            Ok(outcome) => outcome,
            // Only reachable if the runtime drops a replay task mid-shutdown.
            Err(_) => Err(Error::RefreshFailed(
                "refresh resolved without a reply".into(),
            )),
        }
    }
}

impl Inner {
    /// Performs the one in-flight refresh and fans its outcome back out.
    async fn run_refresh(inner: &Arc<Inner>) {
        let telemetry = RefreshTelemetry::new("session.refresh");
        telemetry.emit_start();

        let refresh = RequestDescriptor::refresh(inner.refresh_path.clone());
        let outcome = match inner.dispatcher.dispatch(&refresh).await {
            Ok(response) => inner.token_from_response(response).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(token) => {
                let token_len = token.len();
                inner.session.set_access_token(token);
                let waiters = inner.leave_refreshing().await;
                telemetry.emit_success(token_len, waiters.len());
                // Replays start in arrival order; their completions are
                // independent of each other.
                for waiter in waiters {
                    let inner = Arc::clone(inner);
                    tokio::spawn(inner.replay(waiter));
                }
            }
            Err(err) => {
                let waiters = inner.leave_refreshing().await;
                telemetry.emit_failure(&err, waiters.len());
                let reason = err.to_string();
                for waiter in waiters {
                    let _ = waiter
                        .reply
                        .send(Err(Error::RefreshFailed(reason.clone())));
                }
                inner.teardown.teardown();
            }
        }
    }

    /// Clears the in-flight flag and takes the queue in one critical section,
    /// so the queue is never observably non-empty while the flag is false.
    async fn leave_refreshing(&self) -> Vec<RefreshWaiter> {
        let mut state = self.state.lock().await;
        state.refresh_in_flight = false;
        std::mem::take(&mut state.waiters)
    }

    async fn token_from_response(&self, response: Response) -> Result<AccessToken, Error> {
        let body = response.json::<serde_json::Value>().await?;
        AccessToken::from_response_body(&body, &self.token_field)
    }

    /// Redispatches one waiter's descriptor with the refreshed credential and
    /// resolves its continuation.
    async fn replay(self: Arc<Self>, waiter: RefreshWaiter) {
        let RefreshWaiter { descriptor, reply } = waiter;
        let outcome = match self.dispatcher.dispatch(&descriptor).await {
            Err(Error::AuthExpired(status, body)) => self.reject_after_retry(status, body).await,
            other => other,
        };
        // A caller that gave up while queued has dropped its receiver.
        let _ = reply.send(outcome);
    }

    /// A second rejection after the single retry (a brand-new token bounced,
    /// e.g. server-side revocation): terminal for this session. No re-queue; if
    /// no refresh is underway the session is torn down here.
    async fn reject_after_retry(
        &self,
        status: StatusCode,
        body: String,
    ) -> Result<Response, Error> {
        let idle = !self.state.lock().await.refresh_in_flight;
        if idle {
            self.teardown.teardown();
        }
        Err(Error::RefreshFailed(format!(
            "token rejected after refresh: {status} {body}"
        )))
    }
}
