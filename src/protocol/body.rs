//! JSON-Wire response body types.
//!
//! Defines the standard `{status, sessionId, value}` envelope every
//! JSON-Wire server returns, plus the server-side stack-trace rendering
//! used when composing error messages.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, SemanticErrorKind};

// ============================================================================
// WireBody
// ============================================================================

/// The standard JSON-Wire response body.
///
/// # Format
///
/// ```json
/// {
///   "status": 0,
///   "sessionId": "c32a...",
///   "value": { ... }
/// }
/// ```
///
/// `status == 0` is success; any other status translates through the fixed
/// table in [`SemanticErrorKind`](crate::SemanticErrorKind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireBody {
    /// Wire status code. Zero on success.
    #[serde(default)]
    pub status: i64,

    /// Session identifier, present on session-creation responses.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Command payload on success; error detail on failure.
    #[serde(default)]
    pub value: Value,
}

impl WireBody {
    /// Returns `true` if the wire status signals success.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Extracts the human-readable message from `value`.
    ///
    /// Uses `value.message` when present; otherwise renders `value` itself.
    #[must_use]
    pub fn message(&self) -> String {
        match self.value.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => match &self.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    /// Extracts the server-side class name from `value`, if any.
    #[inline]
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.value.get("class").and_then(Value::as_str)
    }

    /// Renders the nested `stackTrace` array from `value`, if any.
    #[inline]
    #[must_use]
    pub fn rendered_stack_trace(&self) -> Option<String> {
        render_stack_trace(&self.value)
    }

    /// Translates a nonzero wire status into its semantic error, with the
    /// rendered stack trace appended to the message.
    #[must_use]
    pub fn to_semantic_error(&self) -> Error {
        let kind = SemanticErrorKind::from_wire_status(self.status);
        let mut message = self.message();
        if let Some(trace) = self.rendered_stack_trace() {
            message.push('\n');
            message.push_str(&trace);
        }
        Error::semantic(kind, message)
    }
}

// ============================================================================
// StackFrame
// ============================================================================

/// One frame of a server-side stack trace.
///
/// Servers report frames as
/// `{methodName, className, fileName, lineNumber}`; missing fields render
/// as empty (or zero for the line number).
#[derive(Debug, Clone, Deserialize)]
pub struct StackFrame {
    /// Method name.
    #[serde(rename = "methodName", default)]
    pub method_name: String,

    /// Declaring class name.
    #[serde(rename = "className", default)]
    pub class_name: String,

    /// Source file name.
    #[serde(rename = "fileName", default)]
    pub file_name: String,

    /// Source line number.
    #[serde(rename = "lineNumber", default)]
    pub line_number: i64,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{} ({}:{})",
            self.method_name, self.class_name, self.file_name, self.line_number
        )
    }
}

// ============================================================================
// Stack Trace Rendering
// ============================================================================

/// Renders a `stackTrace` array nested in an error `value`.
///
/// Each frame renders as `methodName::className (fileName:lineNumber)`;
/// frames are joined by newlines. Entries that are not frame objects are
/// skipped. Returns `None` when no renderable frames exist.
#[must_use]
pub fn render_stack_trace(value: &Value) -> Option<String> {
    let frames = value.get("stackTrace")?.as_array()?;

    let lines: Vec<String> = frames
        .iter()
        .filter_map(|frame| serde_json::from_value::<StackFrame>(frame.clone()).ok())
        .map(|frame| frame.to_string())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

// ============================================================================
// Tests
// ============================================================================
