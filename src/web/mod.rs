//! HTTP surface: router, handlers, middleware and page templates.

pub mod assets;
pub mod auth;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod history;
pub mod middleware;
pub mod predict;
pub mod profile;
pub mod routes;
pub mod status;
pub mod templates;

pub use routes::*;
