//! Request authentication stage.
//!
//! The bearer token is resolved before the handler runs and the resulting
//! [`RequestContext`] is moved into the handler as a parameter. Nothing about
//! the caller is stored anywhere else, and the context is dropped once the
//! handler returns.

use std::future::Future;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::auth::token::extract_bearer_token;
use crate::error::AppError;
use crate::models::{AccountId, Identity};
use crate::services::SessionService;

/// Per-request state handed to an authenticated handler
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub identity: Identity,
    pub started_at: Instant,
}

impl RequestContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            identity,
            started_at: Instant::now(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.identity.account_id()
    }
}

#[derive(Clone)]
pub struct AuthMiddleware {
    sessions: SessionService,
}

impl AuthMiddleware {
    pub fn new(sessions: SessionService) -> Self {
        Self { sessions }
    }

    /// Resolve an `Authorization` header value. Every failure, whatever the
    /// cause, is the same [`AppError::Unauthenticated`].
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<RequestContext, AppError> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or(AppError::Unauthenticated)?;
        let identity = self
            .sessions
            .resolve(token)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        Ok(RequestContext::new(identity))
    }

    /// Authenticate, then run `handler` with the context inside a request span
    pub async fn handle<F, Fut, T>(&self, authorization: Option<&str>, handler: F) -> Result<T, AppError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let ctx = self.authenticate(authorization).await?;
        let span = info_span!(
            "request",
            request_id = %ctx.request_id,
            account_id = ctx.account_id()
        );
        let started_at = ctx.started_at;
        async move {
            let result = handler(ctx).await;
            debug!(
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "request finished"
            );
            result
        }
        .instrument(span)
        .await
    }
}
