//! Shared harness for the integration tests.
#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use healthrisk::model::features::{FIELDS, FieldKind};
use healthrisk::model::{HealthMetrics, ModelError, ModelSummary, RISK_COUNT, RiskPredictor};
use healthrisk::state::{AppState, WebSettings};
use healthrisk::web::create_router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// A predictor that returns the same percentages for every input.
pub struct FixedPredictor(pub [f64; RISK_COUNT]);

impl RiskPredictor for FixedPredictor {
    fn predict(&self, features: &[f64]) -> Result<[f64; RISK_COUNT], ModelError> {
        if features.len() != FIELDS.len() {
            return Err(ModelError::FeatureCount {
                expected: FIELDS.len(),
                got: features.len(),
            });
        }
        Ok(self.0)
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            kind: "fixed".to_owned(),
            n_features: FIELDS.len(),
            n_outputs: RISK_COUNT,
            n_estimators: 0,
            trained_at: None,
        }
    }
}

/// Obesity is the clear maximum.
pub const FIXED_RISKS: [f64; RISK_COUNT] = [12.346, 20.0, 61.5, 8.0, 33.333];

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    /// Wrap a migrated pool from `#[sqlx::test]`; uploads go to a temp dir.
    pub fn new(pool: SqlitePool) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let upload_dir = dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("failed to create upload dir");

        let state = AppState::new(
            pool,
            Arc::new(FixedPredictor(FIXED_RISKS)),
            WebSettings {
                upload_dir,
                session_ttl: Duration::from_secs(3600),
                secure_cookies: false,
            },
        );
        Self {
            router: create_router(state.clone()),
            state,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(build("GET", uri, cookie, None, Body::empty())).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: String) -> Response<Body> {
        self.send(build(
            "POST",
            uri,
            cookie,
            Some("application/x-www-form-urlencoded"),
            Body::from(body),
        ))
        .await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Response<Body> {
        self.send(build(
            "POST",
            uri,
            cookie,
            Some("application/json"),
            Body::from(body.to_string()),
        ))
        .await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(build("DELETE", uri, cookie, None, Body::empty())).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/register",
            None,
            format!("username={username}&password={password}"),
        )
        .await
    }

    /// Register and log in. Returns the `Cookie` header value for the session.
    pub async fn login_as(&self, username: &str, password: &str) -> String {
        self.register(username, password).await;
        let resp = self
            .post_form(
                "/login",
                None,
                format!("username={username}&password={password}"),
            )
            .await;
        assert_eq!(resp.status(), 303, "login for {username} should redirect");
        session_cookie(&resp).expect("login sets a session cookie")
    }
}

fn build(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}

/// `session=<id>` from the response's `Set-Cookie`, if one was set.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

pub fn location(resp: &Response<Body>) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("body is UTF-8")
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).expect("body is JSON")
}

/// A complete questionnaire: the first option for choices, fixed numbers otherwise.
pub fn metrics_pairs() -> Vec<(&'static str, String)> {
    FIELDS
        .iter()
        .map(|field| {
            let value = match field.kind {
                FieldKind::Integer => "3".to_owned(),
                FieldKind::Decimal => "22.5".to_owned(),
                FieldKind::Choice(options) => options[0].to_owned(),
            };
            (field.name, value)
        })
        .collect()
}

/// [`metrics_pairs`] parsed into the typed questionnaire.
pub fn sample_metrics() -> HealthMetrics {
    let pairs = metrics_pairs();
    HealthMetrics::from_lookup(|name| {
        pairs
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    })
    .expect("sample questionnaire is valid")
}

pub fn form_body(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
