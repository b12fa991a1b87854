//! Per-action invocation quota and request logging.

use crate::bridge::Action;
use crate::error::RelayError;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, warn};

/// Quota key shared by every name that is not a known action.
const UNRECOGNIZED_KEY: &str = "unrecognized";

type ActionLimiter = RateLimiter<&'static str, DefaultKeyedStateStore<&'static str>, DefaultClock>;

/// Invocation quota, tracked separately for each action.
///
/// A burst of deregistrations cannot starve registrations and the reverse.
/// Unknown action names all draw from one shared bucket, so arbitrary
/// path segments never grow the key set.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<ActionLimiter>,
}

impl RateLimitState {
    /// Allow `per_action_per_minute` invocations of each action.
    pub fn new(per_action_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_action_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        }
    }

    /// Create a permissive rate limiter for testing.
    pub fn permissive() -> Self {
        Self::new(10_000)
    }

    /// Take one invocation of `action` from its bucket.
    pub fn admit(&self, action: &str) -> Result<(), RelayError> {
        let key = quota_key(action);

        self.limiter.check_key(&key).map_err(|_| {
            warn!(action, bucket = key, "Invocation quota exhausted");
            RelayError::RateLimitExceeded(action.to_string())
        })
    }
}

fn quota_key(action: &str) -> &'static str {
    action
        .parse::<Action>()
        .map(|action| action.as_str())
        .unwrap_or(UNRECOGNIZED_KEY)
}

/// Reject invocations over their action's quota with 429.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    Path(action): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    rate_limit.admit(&action)?;
    Ok(next.run(request).await)
}

/// One log line per request. Reply streams log when the headers go out,
/// not when the stream ends.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_client_error() || status.is_server_error() {
        warn!(%method, path, status = status.as_u16(), elapsed_ms, "Request rejected");
    } else {
        debug!(%method, path, status = status.as_u16(), elapsed_ms, "Request served");
    }

    response
}
