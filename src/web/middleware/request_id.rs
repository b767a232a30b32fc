//! Per-request tracing spans with request IDs.
//!
//! An incoming `X-Request-Id` is reused when present so logs line up with an
//! upstream proxy; otherwise a ULID is generated. The resolved ID is echoed
//! back in the `X-Request-Id` response header.

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::Instrument;

use crate::utils::fmt_duration;

static REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

/// Successful responses are debug noise; client errors are info and server errors warn.
fn log_response(method: &Method, path: &str, status: StatusCode, elapsed: Duration) {
    let status = status.as_u16();
    let duration = fmt_duration(elapsed);
    if status >= 500 {
        tracing::warn!(%method, path, status, %duration, "response");
    } else if status >= 400 {
        tracing::info!(%method, path, status, %duration, "response");
    } else {
        tracing::debug!(%method, path, status, %duration, "response");
    }
}

/// Accept upstream IDs only when they are short and printable.
fn upstream_id(req: &Request) -> Option<String> {
    req.headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 64 && v.bytes().all(|b| b.is_ascii_graphic()))
        .map(String::from)
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
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
        let req_id = upstream_id(&req).unwrap_or_else(|| ulid::Ulid::new().to_string());

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", request_id = %req_id);
        let start = Instant::now();

        let future = self.inner.call(req);
        let header_value = HeaderValue::from_str(&req_id).ok();

        Box::pin(
            async move {
                let mut result = future.await;
                let elapsed = start.elapsed();

                match &result {
                    Ok(response) => log_response(&method, &path, response.status(), elapsed),
                    Err(e) => {
                        tracing::error!(%method, %path, error = ?e, duration = %fmt_duration(elapsed), "request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}
