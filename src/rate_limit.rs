use crate::clock::Clock;
use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

// Stale windows are swept once the map grows past this.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Duration,
    count: u32,
}

/// Fixed-window request counter per client key.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        RateLimiter {
            window,
            max_requests,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`; false once the window's quota is spent.
    pub async fn check(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.lock().await;

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.saturating_sub(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_sub(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting requests over the limit with 429.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);
    if !limiter.check(&key).await {
        tracing::warn!(client = %key, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(Duration::from_millis(1000), 2, clock)
    }

    #[tokio::test]
    async fn quota_resets_with_the_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone());

        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);

        clock.advance(Duration::from_millis(999));
        assert!(!limiter.check("10.0.0.1").await);

        clock.advance(Duration::from_millis(1));
        assert!(limiter.check("10.0.0.1").await);
    }

    #[tokio::test]
    async fn clients_are_counted_separately() {
        let limiter = limiter(Arc::new(ManualClock::new()));

        assert!(limiter.check("a").await);
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
        assert!(limiter.check("b").await);
    }

    #[tokio::test]
    async fn middleware_answers_429_with_envelope() {
        let limiter = Arc::new(limiter(Arc::new(ManualClock::new())));
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit));

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri("/ping")
                        .header("x-forwarded-for", "203.0.113.7")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            statuses.push(response.status());

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
                assert_eq!(json["success"], false);
            }
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }
}
