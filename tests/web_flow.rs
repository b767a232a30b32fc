//! End-to-end tests that drive the router through `tower::ServiceExt::oneshot`.

mod helpers;

use axum::body::Body;
use axum::http::{Request, header};
use healthrisk::data::{predictions, profiles};
use healthrisk::model::features::{FIELDS, FieldKind};
use helpers::{
    TestApp, body_json, body_string, form_body, location, metrics_pairs, session_cookie,
};
use serde_json::{Map, Value, json};
use sqlx::SqlitePool;

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_register_login_logout(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let resp = app.register("alice", "s3cret").await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/?success=1"));

    let page = body_string(app.get("/?success=1", None).await).await;
    assert!(page.contains("Registration successful"));

    let resp = app.register("alice", "other").await;
    assert_eq!(resp.status(), 409);
    assert!(body_string(resp).await.contains("Username already exists."));

    let resp = app
        .post_form("/login", None, "username=alice&password=wrong".into())
        .await;
    assert_eq!(resp.status(), 401);
    assert!(session_cookie(&resp).is_none());
    assert!(body_string(resp).await.contains("Invalid credentials"));

    let resp = app
        .post_form("/login", None, "username=nobody&password=s3cret".into())
        .await;
    assert_eq!(resp.status(), 401);

    let resp = app
        .post_form("/login", None, "username=alice&password=s3cret".into())
        .await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/home"));
    let cookie = session_cookie(&resp).expect("session cookie");

    let resp = app.get("/home", Some(&cookie)).await;
    assert_eq!(resp.status(), 200);
    let page = body_string(resp).await;
    assert!(page.contains(r#"action="/predict""#));
    assert!(page.contains("alice"));

    let resp = app.get("/logout", Some(&cookie)).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/"));
    let cleared = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(cleared.contains("Max-Age=0"), "{cleared}");

    let resp = app.get("/home", Some(&cookie)).await;
    assert_eq!(resp.status(), 303, "revoked session no longer authenticates");
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_register_rejects_blank_credentials(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let resp = app
        .post_form("/register", None, "username=&password=x".into())
        .await;
    assert_eq!(resp.status(), 400);
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_anonymous_access(pool: SqlitePool) {
    let app = TestApp::new(pool);

    for uri in ["/home", "/history", "/profile"] {
        let resp = app.get(uri, None).await;
        assert_eq!(resp.status(), 303, "{uri}");
        assert_eq!(location(&resp), Some("/"), "{uri}");
    }

    let resp = app
        .get("/home", Some("session=not-a-real-session"))
        .await;
    assert_eq!(resp.status(), 303);

    let resp = app.delete("/delete-history/1", None).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(body_json(resp).await["code"], "UNAUTHORIZED");

    let resp = app.post_json("/api/predict", None, json!({})).await;
    assert_eq!(resp.status(), 401);

    let resp = app.get("/feedback", None).await;
    assert_eq!(resp.status(), 200, "feedback is open to everyone");
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_predict_renders_and_persists(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let cookie = app.login_as("bob", "pw").await;

    let mut pairs = metrics_pairs();
    for (name, value) in pairs.iter_mut() {
        if *name == "Age" {
            *value = "+30".into();
        }
    }
    pairs.push(("junk", "anything".into()));
    let resp = app
        .post_form("/predict", Some(&cookie), form_body(&pairs))
        .await;
    assert_eq!(resp.status(), 200);
    let page = body_string(resp).await;
    assert!(page.contains("Highest risk: Obesity Risk"));
    assert!(page.contains("12.35%"), "values are rounded to two decimals");
    assert!(page.contains("33.33%"));
    assert!(page.contains("Possible causes: High BMI, Poor diet"));

    let rows = predictions::list_for_user(&app.state.db_pool, "bob")
        .await
        .expect("query history");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.highest_risk, "Obesity Risk");
    assert_eq!(row.risks.get("CVD Risk"), Some(&12.35));
    assert_eq!(row.risks.len(), 5);
    assert_eq!(row.input_data.get("Age"), Some(&json!(30)), "trimmed and typed");
    assert_eq!(row.input_data.get("BMI"), Some(&json!(22.5)));
    assert_eq!(row.input_data.get("Gender"), Some(&json!("Male")));
    assert!(!row.input_data.contains_key("junk"), "unknown fields are dropped");
    assert!(
        row.input_data.keys().map(String::as_str).eq(FIELDS.iter().map(|f| f.name)),
        "stored in questionnaire order"
    );
    assert_eq!(row.date.len(), "2025-01-01 00:00:00".len());

    let history = body_string(app.get("/history", Some(&cookie)).await).await;
    assert!(history.contains(&format!(r#"data-id="{}""#, row.id)));
    assert!(history.contains("61.50%"));
    assert!(history.contains("<dt>BMI</dt><dd>22.5</dd>"));
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_predict_rejects_invalid_input(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let cookie = app.login_as("carol", "pw").await;

    let mut pairs = metrics_pairs();
    pairs.retain(|(name, _)| *name != "BMI");
    let resp = app.post_form("/predict", Some(&cookie), form_body(&pairs)).await;
    assert_eq!(resp.status(), 400);
    assert!(body_string(resp).await.contains("missing field 'BMI'"));

    let mut pairs = metrics_pairs();
    for (name, value) in pairs.iter_mut() {
        if *name == "Gender" {
            *value = "Other".into();
        }
    }
    let resp = app.post_form("/predict", Some(&cookie), form_body(&pairs)).await;
    assert_eq!(resp.status(), 400);
    assert!(body_string(resp).await.contains("Gender"));

    let rows = predictions::list_for_user(&app.state.db_pool, "carol")
        .await
        .expect("query history");
    assert!(rows.is_empty(), "rejected input is not stored");
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_delete_history_only_touches_own_rows(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let owner = app.login_as("dave", "pw").await;
    let intruder = app.login_as("eve", "pw").await;

    app.post_form("/predict", Some(&owner), form_body(&metrics_pairs()))
        .await;
    let id = predictions::list_for_user(&app.state.db_pool, "dave")
        .await
        .expect("query history")[0]
        .id;

    let resp = app
        .delete(&format!("/delete-history/{id}"), Some(&intruder))
        .await;
    assert_eq!(resp.status(), 404);
    assert_eq!(body_json(resp).await["code"], "NOT_FOUND");

    let resp = app.delete(&format!("/delete-history/{id}"), Some(&owner)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await, json!({ "status": "success" }));

    let resp = app.delete(&format!("/delete-history/{id}"), Some(&owner)).await;
    assert_eq!(resp.status(), 404, "already deleted");

    assert_eq!(
        predictions::count(&app.state.db_pool).await.expect("count"),
        0
    );
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_api_predict_returns_assessment(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let cookie = app.login_as("frank", "pw").await;

    let mut body = Map::new();
    for field in FIELDS {
        let value = match field.kind {
            FieldKind::Integer => json!(40),
            FieldKind::Decimal => json!(24.5),
            FieldKind::Choice(options) => json!(options[options.len() - 1]),
        };
        body.insert(field.name.to_owned(), value);
    }

    let resp = app
        .post_json("/api/predict", Some(&cookie), Value::Object(body))
        .await;
    assert_eq!(resp.status(), 200);
    let json = body_json(resp).await;
    assert_eq!(json["highestRisk"], "Obesity Risk");
    assert_eq!(json["risks"]["Mental Health Risk"], 33.33);
    assert!(json["recovery"].as_str().unwrap_or_default().starts_with("How to recover"));

    let rows = predictions::list_for_user(&app.state.db_pool, "frank")
        .await
        .expect("query history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, json["id"].as_i64().unwrap_or_default());
    assert_eq!(rows[0].input_data.get("Stress_Level"), Some(&json!("High")));

    let stored = &rows[0].input_data;
    assert_eq!(stored.get("Age"), Some(&json!(40)));
    assert!(
        stored.keys().map(String::as_str).eq(FIELDS.iter().map(|f| f.name)),
        "same stored shape as the form route"
    );

    let resp = app
        .post_json("/api/predict", Some(&cookie), json!({ "Age": 40 }))
        .await;
    assert_eq!(resp.status(), 400);
    let json = body_json(resp).await;
    assert_eq!(json["code"], "INVALID_INPUT");
    assert_eq!(json["message"], "Invalid JSON body");
    assert!(
        json["details"]["reason"]
            .as_str()
            .is_some_and(|r| r.contains("missing field")),
        "{json}"
    );
}

/// A `multipart/form-data` body with text fields and an optional file part.
fn multipart_body(boundary: &str, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"profile_photo\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn multipart_request(cookie: &str, body: Vec<u8>, boundary: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/save_profile")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_profile_save_with_photo(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let cookie = app.login_as("grace", "pw").await;
    let boundary = "X-BOUNDARY";

    let page = body_string(app.get("/profile", Some(&cookie)).await).await;
    assert!(page.contains("<form"), "no profile yet shows the form");

    let body = multipart_body(
        boundary,
        &[("full_name", "Grace Hopper"), ("age", "45"), ("city", "Arlington")],
        Some(("my photo.PNG", &b"\x89PNG fake image"[..])),
    );
    let resp = app.send(multipart_request(&cookie, body, boundary)).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/profile"));

    let stored = profiles::get_profile(&app.state.db_pool, "grace")
        .await
        .expect("query profile")
        .expect("profile exists");
    assert_eq!(stored.full_name.as_deref(), Some("Grace Hopper"));
    assert_eq!(stored.age, Some(45));
    assert_eq!(stored.email, None);
    let photo = stored.photo.expect("photo stored");
    assert!(photo.starts_with("grace_"), "{photo}");
    assert!(photo.ends_with("_my_photo.PNG"), "{photo}");

    let saved = app.state.settings.upload_dir.join(&photo);
    assert_eq!(std::fs::read(&saved).expect("photo written"), b"\x89PNG fake image");

    let resp = app.get(&format!("/static/uploads/{photo}"), None).await;
    assert_eq!(resp.status(), 200);

    let page = body_string(app.get("/profile", Some(&cookie)).await).await;
    assert!(page.contains("Grace Hopper"));
    assert!(page.contains(&format!("/static/uploads/{photo}")));
    assert!(!page.contains("<form"));

    // A save without a new file keeps the existing photo.
    let body = multipart_body(boundary, &[("full_name", "G. Hopper")], None);
    let resp = app.send(multipart_request(&cookie, body, boundary)).await;
    assert_eq!(resp.status(), 303);
    let stored = profiles::get_profile(&app.state.db_pool, "grace")
        .await
        .expect("query profile")
        .expect("profile exists");
    assert_eq!(stored.full_name.as_deref(), Some("G. Hopper"));
    assert_eq!(stored.age, None);
    assert_eq!(stored.photo.as_deref(), Some(photo.as_str()));
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_photo_names_do_not_collide_across_users(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let boundary = "X-BOUNDARY";

    // "a" + "b_c.png" and "a_b" + "c.png" share the same naive name.
    for (user, file) in [("a", "b_c.png"), ("a_b", "c.png")] {
        let cookie = app.login_as(user, "pw").await;
        let body = multipart_body(boundary, &[], Some((file, &b"img"[..])));
        let resp = app.send(multipart_request(&cookie, body, boundary)).await;
        assert_eq!(resp.status(), 303, "{user}");
    }

    let mut photos = Vec::new();
    for user in ["a", "a_b"] {
        let stored = profiles::get_profile(&app.state.db_pool, user)
            .await
            .expect("query profile")
            .expect("profile exists");
        photos.push(stored.photo.expect("photo stored"));
    }
    assert_ne!(photos[0], photos[1]);
    for photo in &photos {
        assert!(app.state.settings.upload_dir.join(photo).exists(), "{photo}");
    }
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_profile_rejects_bad_uploads(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let cookie = app.login_as("heidi", "pw").await;
    let boundary = "X-BOUNDARY";

    let body = multipart_body(boundary, &[], Some(("script.exe", &b"MZ"[..])));
    let resp = app.send(multipart_request(&cookie, body, boundary)).await;
    assert_eq!(resp.status(), 400);

    let body = multipart_body(boundary, &[("age", "old")], None);
    let resp = app.send(multipart_request(&cookie, body, boundary)).await;
    assert_eq!(resp.status(), 400);

    assert!(
        profiles::get_profile(&app.state.db_pool, "heidi")
            .await
            .expect("query profile")
            .is_none()
    );
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_feedback_is_stored(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let resp = app
        .post_form(
            "/feedback",
            None,
            "name=Ivan&email=ivan%40example.com&rating=4&message=Nice+tool".into(),
        )
        .await;
    assert_eq!(resp.status(), 200);
    assert!(body_string(resp).await.contains("Thank you"));

    let (name, rating): (String, i64) =
        sqlx::query_as("SELECT name, rating FROM feedback")
            .fetch_one(&app.state.db_pool)
            .await
            .expect("feedback row");
    assert_eq!((name.as_str(), rating), ("Ivan", 4));

    let resp = app
        .post_form(
            "/feedback",
            None,
            "name=Ivan&email=ivan%40example.com&rating=9&message=x".into(),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let resp = app
        .post_form(
            "/feedback",
            None,
            "name=Ivan&email=ivan%40example.com&rating=abc&message=x".into(),
        )
        .await;
    assert_eq!(resp.status(), 400, "unparseable rating is a bad request, not a 422");
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert!(body_string(resp).await.contains("Invalid form data"));

    let resp = app
        .post_form("/login", None, "username=ivan".into())
        .await;
    assert_eq!(resp.status(), 400, "missing password field renders an error page");
    assert!(body_string(resp).await.contains("Invalid form data"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
        .fetch_one(&app.state.db_pool)
        .await
        .expect("count feedback");
    assert_eq!(count, 1);
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_health_and_status(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let resp = app.get("/api/health", None).await;
    assert_eq!(resp.status(), 200);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");

    app.login_as("judy", "pw").await;
    let resp = app.get("/api/status", None).await;
    assert_eq!(resp.status(), 200);
    let json = body_json(resp).await;
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["users"], 1);
    assert_eq!(json["predictions"], 0);
    assert_eq!(json["model"]["kind"], "fixed");
    assert_eq!(json["model"]["nOutputs"], 5);
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_response_headers(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let resp = app.get("/", None).await;
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("content-security-policy"));
    assert!(!headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("x-request-id"));

    let resp = app
        .send(
            Request::builder()
                .uri("/")
                .header("x-request-id", "upstream-123")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await;
    assert_eq!(resp.headers()["x-request-id"], "upstream-123");

    let resp = app.get("/no/such/page", None).await;
    assert_eq!(resp.status(), 404);
}
