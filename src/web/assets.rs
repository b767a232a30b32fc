//! Stylesheet and script compiled into the binary.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;

const CACHE: &str = "public, max-age=3600";

const APP_CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 60rem; padding: 1rem; color: #222; }
header { display: flex; justify-content: space-between; align-items: baseline; flex-wrap: wrap; border-bottom: 1px solid #ddd; }
nav a, nav .user { margin-left: 0.75rem; }
label { display: block; margin: 0.4rem 0; }
input, select, textarea { margin-left: 0.5rem; }
form.metrics { columns: 2 20rem; }
form.metrics button { margin-top: 1rem; }
section.auth { display: flex; gap: 3rem; flex-wrap: wrap; }
table { border-collapse: collapse; margin: 1rem 0; }
th, td { border: 1px solid #ddd; padding: 0.3rem 0.6rem; text-align: left; }
tr.highest { background: #ffe9e6; font-weight: bold; }
.notice { background: #e6f6e6; padding: 0.5rem; }
.error { color: #a00; }
img.avatar { max-width: 10rem; border-radius: 50%; }
"#;

const APP_JS: &str = r#"
document.addEventListener("click", async (event) => {
  const button = event.target.closest("button.delete");
  if (!button) return;
  if (!confirm("Delete this prediction?")) return;
  const id = button.dataset.id;
  const response = await fetch(`/delete-history/${id}`, { method: "DELETE" });
  if (response.ok) {
    document.getElementById(`prediction-${id}`)?.remove();
  } else {
    alert("Could not delete prediction.");
  }
});
"#;

/// `GET /static/app.css`
pub async fn stylesheet() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/css; charset=utf-8"), (CACHE_CONTROL, CACHE)], APP_CSS)
}

/// `GET /static/app.js`
pub async fn script() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8"), (CACHE_CONTROL, CACHE)],
        APP_JS,
    )
}
