//! HTTP API handlers for rollcall-server

pub mod attendance;
pub mod auth;
pub mod health;
mod json;
pub mod marks;
pub mod reports;
pub mod students;
pub mod teachers;

pub use auth::{require_student, require_teacher};
pub use health::health_routes;
pub use json::ApiJson;

use serde_json::Value;

/// Required text field: present, a string or number, non-blank after trim
pub(crate) fn required_text(value: &Option<Value>) -> Option<String> {
    let text = match value.as_ref()? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
