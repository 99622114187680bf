use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};

use crate::utils::time::{Clock, SystemClock};

#[derive(Debug)]
struct WindowState {
    start: DateTime<Utc>,
    count: u32,
}

/// Fixed one-second window shared by every request through the layer.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    clock: Arc<dyn Clock>,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    pub fn new(rps: u32, clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            rps: rps.max(1),
            clock,
            window: Arc::new(Mutex::new(WindowState { start, count: 0 })),
        }
    }

    pub fn allow(&self) -> bool {
        let mut guard = self.window.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        if now - guard.start >= Duration::seconds(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.allow() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps, Arc::new(SystemClock))
}
