//! Whole-gateway request budget
//!
//! One token bucket shared by every route. Over-budget requests get `429`
//! with a `Retry-After` telling the client when the next token is due.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Serialize;

use super::ApiState;

/// Limiter shared by all handlers
pub type SharedLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Allow `requests_per_minute` requests, all of which may arrive at once
///
/// A budget of zero is treated as one.
#[must_use]
pub fn create_limiter(requests_per_minute: u32) -> SharedLimiter {
    let budget = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(budget)))
}

/// Whole seconds to wait, rounded up and never zero
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Spend one token per request when a limiter is configured
pub async fn rate_limit_middleware(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(limiter) = &state.rate_limiter else {
        return next.run(req).await;
    };

    match limiter.check() {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let retry_after = retry_after_secs(not_until.wait_time_from(limiter.clock().now()));
            tracing::warn!(path = %req.uri().path(), retry_after, "request budget exhausted");
            too_many_requests(retry_after)
        }
    }
}

fn too_many_requests(retry_after: u64) -> Response {
    #[derive(Serialize)]
    struct ErrorResponse {
        error: &'static str,
    }

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after.to_string())],
        Json(ErrorResponse {
            error: "Too many requests",
        }),
    )
        .into_response()
}
