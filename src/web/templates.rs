//! Server-rendered HTML pages.
//!
//! Every value that originates from a user or the database passes through
//! [`text`] or [`attr`] before it reaches the markup.

use axum::http::StatusCode;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde_json::Value;

use crate::data::models::{Prediction, Profile};
use crate::model::features::{FIELDS, FieldKind, FieldSpec};
use crate::model::{RiskAssessment, RiskKind};

fn text(s: &str) -> String {
    encode_text(s).into_owned()
}

fn attr(s: &str) -> String {
    encode_double_quoted_attribute(s).into_owned()
}

fn layout(title: &str, user: Option<&str>, body: &str) -> String {
    let nav = match user {
        Some(username) => format!(
            r#"<nav><a href="/home">Assessment</a> <a href="/history">History</a> <a href="/profile">Profile</a> <a href="/feedback">Feedback</a> <span class="user">{}</span> <a href="/logout">Log out</a></nav>"#,
            text(username)
        ),
        None => r#"<nav><a href="/">Home</a> <a href="/feedback">Feedback</a></nav>"#.to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Health Risk</title>
<link rel="stylesheet" href="/static/app.css">
<script src="/static/app.js" defer></script>
</head>
<body>
<header><h1>Health Risk Predictor</h1>{nav}</header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
    )
}

pub fn landing(user: Option<&str>, registered: bool) -> String {
    let mut body = String::new();
    if registered {
        body.push_str(r#"<p class="notice">Registration successful. Please log in.</p>"#);
    }
    if let Some(username) = user {
        body.push_str(&format!(
            r#"<p>Logged in as <strong>{}</strong>. <a href="/home">Start an assessment</a>.</p>"#,
            text(username)
        ));
    } else {
        body.push_str(
            r#"<section class="auth">
<form method="post" action="/login">
<h2>Log in</h2>
<label>Username <input name="username" required autocomplete="username"></label>
<label>Password <input name="password" type="password" required autocomplete="current-password"></label>
<button type="submit">Log in</button>
</form>
<form method="post" action="/register">
<h2>Register</h2>
<label>Username <input name="username" required maxlength="64" autocomplete="username"></label>
<label>Password <input name="password" type="password" required autocomplete="new-password"></label>
<button type="submit">Create account</button>
</form>
</section>"#,
        );
    }
    layout("Welcome", user, &body)
}

fn field_input(field: &FieldSpec) -> String {
    let name = attr(field.name);
    let control = match field.kind {
        FieldKind::Integer => format!(r#"<input type="number" step="1" name="{name}" required>"#),
        FieldKind::Decimal => format!(r#"<input type="number" step="any" name="{name}" required>"#),
        FieldKind::Choice(options) => {
            let options: String = options
                .iter()
                .map(|o| format!(r#"<option value="{}">{}</option>"#, attr(o), text(o)))
                .collect();
            format!(r#"<select name="{name}" required>{options}</select>"#)
        }
    };
    format!("<label>{} {control}</label>\n", text(field.label))
}

pub fn home(username: &str) -> String {
    let inputs: String = FIELDS.iter().map(field_input).collect();
    let body = format!(
        r#"<h2>Your health metrics</h2>
<form method="post" action="/predict" class="metrics">
{inputs}<button type="submit">Predict</button>
</form>"#
    );
    layout("Assessment", Some(username), &body)
}

pub fn result(username: &str, assessment: &RiskAssessment) -> String {
    let rows: String = assessment
        .risks
        .iter()
        .map(|(kind, value)| {
            let class = if *kind == assessment.highest { r#" class="highest""# } else { "" };
            format!("<tr{class}><td>{}</td><td>{value:.2}%</td></tr>\n", text(kind.name()))
        })
        .collect();
    let highest = assessment.highest;
    let body = format!(
        r#"<h2>Your risk assessment</h2>
<table class="risks"><thead><tr><th>Risk</th><th>Estimate</th></tr></thead>
<tbody>
{rows}</tbody></table>
<section class="advice">
<h3>Highest risk: {name}</h3>
<p>{causes}</p>
<p>{recovery}</p>
</section>
<p><a href="/home">New assessment</a> <a href="/history">View history</a></p>"#,
        name = text(highest.name()),
        causes = text(highest.causes()),
        recovery = text(highest.recovery()),
    );
    layout("Result", Some(username), &body)
}

pub fn history(username: &str, predictions: &[Prediction]) -> String {
    if predictions.is_empty() {
        return layout(
            "History",
            Some(username),
            r#"<h2>Prediction history</h2><p>No predictions yet. <a href="/home">Start an assessment</a>.</p>"#,
        );
    }

    let headers: String = RiskKind::ALL
        .iter()
        .map(|k| format!("<th>{}</th>", text(k.name())))
        .collect();
    let rows: String = predictions
        .iter()
        .map(|p| {
            let cells: String = RiskKind::ALL
                .iter()
                .map(|k| match p.risks.get(k.name()) {
                    Some(v) => format!("<td>{v:.2}%</td>"),
                    None => "<td>-</td>".to_string(),
                })
                .collect();
            format!(
                r#"<tr id="prediction-{id}"><td>{date}</td>{cells}<td>{highest}</td><td>{inputs}</td><td><button type="button" class="delete" data-id="{id}">Delete</button></td></tr>
"#,
                id = p.id,
                date = text(&p.date),
                highest = text(&p.highest_risk),
                inputs = submitted_inputs(p),
            )
        })
        .collect();
    let body = format!(
        r#"<h2>Prediction history</h2>
<table class="history"><thead><tr><th>Date</th>{headers}<th>Highest</th><th>Inputs</th><th></th></tr></thead>
<tbody>
{rows}</tbody></table>"#
    );
    layout("History", Some(username), &body)
}

/// The stored questionnaire as a collapsed label/value list.
fn submitted_inputs(p: &Prediction) -> String {
    let items: String = p
        .input_data
        .iter()
        .map(|(name, value)| {
            let label = FIELDS
                .iter()
                .find(|f| f.name == name.as_str())
                .map_or(name.as_str(), |f| f.label);
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("<dt>{}</dt><dd>{}</dd>", text(label), text(&value))
        })
        .collect();
    format!(r#"<details><summary>Inputs</summary><dl class="inputs">{items}</dl></details>"#)
}

fn opt(value: &Option<String>) -> String {
    value.as_deref().map(attr).unwrap_or_default()
}

pub fn profile(username: &str, profile: Option<&Profile>, editing: bool) -> String {
    let body = match profile {
        Some(p) if !editing => {
            let photo = p
                .photo
                .as_deref()
                .map(|f| {
                    format!(
                        r#"<img class="avatar" src="/static/uploads/{}" alt="Profile photo">"#,
                        attr(f)
                    )
                })
                .unwrap_or_default();
            let row = |label: &str, value: Option<String>| {
                format!(
                    "<tr><th>{}</th><td>{}</td></tr>\n",
                    text(label),
                    text(value.as_deref().unwrap_or("-"))
                )
            };
            format!(
                r#"<h2>Your profile</h2>
{photo}
<table class="profile">
{}{}{}{}{}{}{}{}{}</table>
<p><a href="/profile?edit=1">Edit profile</a></p>"#,
                row("Full name", p.full_name.clone()),
                row("Age", p.age.map(|a| a.to_string())),
                row("Gender", p.gender.clone()),
                row("Email", p.email.clone()),
                row("Phone", p.phone.clone()),
                row("Address", p.address.clone()),
                row("City", p.city.clone()),
                row("State", p.state.clone()),
                row("Country", p.country.clone()),
            )
        }
        _ => {
            let blank = Profile::default();
            let p = profile.unwrap_or(&blank);
            let age = p.age.map(|a| a.to_string()).unwrap_or_default();
            format!(
                r#"<h2>Edit profile</h2>
<form method="post" action="/save_profile" enctype="multipart/form-data" class="profile">
<label>Full name <input name="full_name" value="{}"></label>
<label>Age <input name="age" type="number" min="0" value="{age}"></label>
<label>Gender <input name="gender" value="{}"></label>
<label>Email <input name="email" type="email" value="{}"></label>
<label>Phone <input name="phone" value="{}"></label>
<label>Address <input name="address" value="{}"></label>
<label>City <input name="city" value="{}"></label>
<label>State <input name="state" value="{}"></label>
<label>Country <input name="country" value="{}"></label>
<label>Photo <input name="profile_photo" type="file" accept=".png,.jpg,.jpeg"></label>
<button type="submit">Save</button>
</form>"#,
                opt(&p.full_name),
                opt(&p.gender),
                opt(&p.email),
                opt(&p.phone),
                opt(&p.address),
                opt(&p.city),
                opt(&p.state),
                opt(&p.country),
            )
        }
    };
    layout("Profile", Some(username), &body)
}

pub fn feedback(user: Option<&str>, thanks: bool) -> String {
    let body = if thanks {
        r#"<h2>Thank you!</h2><p>Your feedback has been received.</p>"#.to_string()
    } else {
        r#"<h2>Feedback</h2>
<form method="post" action="/feedback" class="feedback">
<label>Name <input name="name" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Rating <select name="rating"><option>5</option><option>4</option><option>3</option><option>2</option><option>1</option></select></label>
<label>Message <textarea name="message" required></textarea></label>
<button type="submit">Send</button>
</form>"#
            .to_string()
    };
    layout("Feedback", user, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<h2>{code} {reason}</h2>
<p class="error">{message}</p>
<p><a href="/">Back</a></p>"#,
        code = status.as_u16(),
        reason = text(status.canonical_reason().unwrap_or("Error")),
        message = text(message),
    );
    layout("Error", None, &body)
}
