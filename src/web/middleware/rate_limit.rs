//! Per-IP rate limiting with governor token buckets.
//!
//! Every request passes a global burst (5s) and sustained (1min) window.
//! Credential endpoints (`POST /login`, `POST /register`) additionally get
//! their own tight windows to slow down password guessing.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter, clock::Clock};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tracing::{trace, warn};

use crate::web::middleware::client_ip;

fn is_credential_endpoint(method: &Method, path: &str) -> bool {
    method == Method::POST && matches!(path, "/login" | "/register")
}

/// Quota helper: `count` requests per `period` with burst = count.
fn quota(count: u32, period: Duration) -> Quota {
    Quota::with_period(period / count)
        .expect("non-zero period")
        .allow_burst(NonZeroU32::new(count).expect("non-zero count"))
}

pub struct RateLimitState {
    global_burst: DefaultKeyedRateLimiter<IpAddr>,
    global_sustained: DefaultKeyedRateLimiter<IpAddr>,
    auth_burst: DefaultKeyedRateLimiter<IpAddr>,
    auth_sustained: DefaultKeyedRateLimiter<IpAddr>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            global_burst: RateLimiter::keyed(quota(30, Duration::from_secs(5))),
            global_sustained: RateLimiter::keyed(quota(240, Duration::from_secs(60))),
            auth_burst: RateLimiter::keyed(quota(5, Duration::from_secs(5))),
            auth_sustained: RateLimiter::keyed(quota(20, Duration::from_secs(60))),
        }
    }

    /// `Ok(())` if allowed, otherwise `Err(retry_after_secs)` for the longest wait.
    fn check(&self, ip: IpAddr, credential: bool) -> Result<(), u64> {
        let mut max_wait: Option<Duration> = None;
        let mut rejected = false;

        let mut check_limiter = |limiter: &DefaultKeyedRateLimiter<IpAddr>| {
            if let Err(not_until) = limiter.check_key(&ip) {
                let wait = not_until.wait_time_from(governor::clock::DefaultClock::default().now());
                if wait > max_wait.unwrap_or(Duration::ZERO) {
                    max_wait = Some(wait);
                }
                rejected = true;
            }
        };

        check_limiter(&self.global_burst);
        check_limiter(&self.global_sustained);
        if credential {
            check_limiter(&self.auth_burst);
            check_limiter(&self.auth_sustained);
        }

        if rejected {
            Err(max_wait.map(|d| d.as_secs().max(1)).unwrap_or(1))
        } else {
            Ok(())
        }
    }
}

pub type SharedRateLimitState = Arc<RateLimitState>;

#[derive(Clone)]
pub struct RateLimitLayer {
    state: SharedRateLimitState,
}

impl RateLimitLayer {
    pub fn new(state: SharedRateLimitState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: SharedRateLimitState,
}

impl<S, ResBody> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response<ResBody>> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug + Send,
    ResBody: Send + 'static,
    Body: Into<ResBody>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let Some(ip) = client_ip::resolve(req.headers(), req.extensions()) else {
            trace!(path = %req.uri().path(), "client IP unknown, skipping rate limit");
            return Box::pin(self.inner.call(req));
        };

        let credential = is_credential_endpoint(req.method(), req.uri().path());
        match self.state.check(ip, credential) {
            Ok(()) => Box::pin(self.inner.call(req)),
            Err(retry_after) => {
                warn!(
                    client_ip = %ip,
                    path = %req.uri().path(),
                    retry_after_secs = retry_after,
                    "Rate limit exceeded"
                );
                let resp = rate_limit_response(retry_after).map(Into::into);
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}

fn rate_limit_response(retry_after: u64) -> Response<Body> {
    let body = format!(
        r#"{{"code":"RATE_LIMITED","message":"Too many requests. Retry after {retry_after} seconds.","details":null}}"#
    );
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    let headers = response.headers_mut();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("retry-after", HeaderValue::from(retry_after));
    response
}
