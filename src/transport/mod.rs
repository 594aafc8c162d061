//! HTTP transport layer.
//!
//! This module owns everything below the protocol: request/response
//! envelopes and the retrying [`Connection`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌──────────────────┐
//! │  Driver (Rust)   │        HTTP/JSON         │  Remote server   │
//! │                  │─────────────────────────►│  (chromedriver,  │
//! │  Connection      │   /session/{id}/...      │   hub, hosted)   │
//! │  (retry loop)    │◄─────────────────────────│                  │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Retrying HTTP connection |
//! | `envelope` | Request/response envelopes |

// ============================================================================
// Submodules
// ============================================================================

/// Retrying HTTP connection.
pub mod connection;

/// HTTP request and response envelopes.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, Retry};
pub use envelope::{HttpRequest, HttpResponse};
