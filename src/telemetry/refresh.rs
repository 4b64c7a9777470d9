use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Correlates the lifecycle of one refresh attempt across log lines.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, token_len: usize, waiters: usize) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            token_len,
            waiters,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error, waiters: usize) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            waiters,
            error = %error,
            "refresh.failure"
        );
    }
}
