//! Per-request context threaded through every operation and collaborator call

use tokio_util::sync::CancellationToken;

use crate::error::{ManagedGroupError, Result};
use crate::types::OutputFields;

/// User id of the unauthenticated actor
pub const ANONYMOUS_USER_ID: &str = "u_anon";

/// Request-scoped data: who is asking, what they asked to see, and
/// whether the caller has gone away.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Actor identifier
    pub user_id: String,

    /// Fields the client asked for; `None` means no restriction
    pub requested_fields: Option<OutputFields>,

    cancellation: CancellationToken,
}

impl RequestContext {
    /// Context for an identified actor
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            requested_fields: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Context for the anonymous actor
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER_ID)
    }

    /// Restrict the response to the given fields
    pub fn with_requested_fields(mut self, fields: OutputFields) -> Self {
        self.requested_fields = Some(fields);
        self
    }

    /// Tie this request to an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with `Canceled` once the request has been abandoned
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ManagedGroupError::Canceled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_propagates() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new("u_1234567890").with_cancellation(token.child_token());
        assert!(ctx.ensure_active().is_ok());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.ensure_active(), Err(ManagedGroupError::Canceled)));
    }

    #[test]
    fn test_anonymous_context() {
        let ctx = RequestContext::anonymous();
        assert_eq!(ctx.user_id, ANONYMOUS_USER_ID);
        assert!(ctx.requested_fields.is_none());
    }
}
