//! Response classification for the JSON-Wire protocol.
//!
//! Pure functions turning an HTTP response envelope into a value or a typed
//! error. Classification is by status-code band:
//!
//! | Band | Outcome |
//! |------|---------|
//! | 0–99 | Fatal anomaly, [`Error::UnknownStatus`] with raw body |
//! | 204 | Explicit empty result, no body parsing |
//! | 200–299 | Wire body: `status == 0` returns `value`; nonzero translates through the fixed table |
//! | 400–499 | [`Error::InvalidRequest`] with raw body |
//! | 500–599 | [`Error::CommandFailure`] composed from message, class, stack trace |
//! | other | [`Error::UnknownStatus`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::HttpResponse;

use super::body::WireBody;

// ============================================================================
// Classification
// ============================================================================

/// Classifies an HTTP response into a value or a typed error.
///
/// # Errors
///
/// See the module table; a 2xx body that is not valid JSON returns
/// [`Error::Json`].
pub fn parse_response(response: &HttpResponse) -> Result<Value> {
    match response.status {
        0..=99 => Err(Error::unknown_status(response.status, &*response.body)),
        204 => Ok(Value::Null),
        200..=299 => parse_wire_success(response),
        400..=499 => Err(Error::invalid_request(response.status, &*response.body)),
        500..=599 => Err(parse_command_failure(response)),
        _ => Err(Error::unknown_status(response.status, &*response.body)),
    }
}

/// Parses a 2xx wire body into its value or a semantic error.
fn parse_wire_success(response: &HttpResponse) -> Result<Value> {
    let body: WireBody = serde_json::from_str(&response.body)?;

    if body.is_success() {
        return Ok(body.value);
    }

    Err(body.to_semantic_error())
}

/// Composes a command-failure error from a 5xx response.
///
/// A non-JSON body falls back to the raw text.
fn parse_command_failure(response: &HttpResponse) -> Error {
    let mut parts: Vec<String> = Vec::new();

    match serde_json::from_str::<WireBody>(&response.body) {
        Ok(body) => {
            parts.push(body.message());
            if let Some(class) = body.class() {
                parts.push(format!("Class: {class}"));
            }
            if let Some(trace) = body.rendered_stack_trace() {
                parts.push(trace);
            }
        }
        Err(_) => parts.push(response.body.clone()),
    }

    Error::command_failure(parts.join("\n"))
}

// ============================================================================
// Tests
// ============================================================================
