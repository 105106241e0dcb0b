//! Tunnel endpoint handed out by the sandbox REST API.
//!
//! The REST client itself lives elsewhere; this module only defines the
//! response shape and the request path so callers can feed the result
//! straight into a [`TerminalBuilder`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::SandboxId;
use crate::terminal::TerminalBuilder;

// ============================================================================
// TunnelInfo
// ============================================================================

/// Connection details for one terminal tunnel.
///
/// Returned by `POST /sandboxes/<id>/terminal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelInfo {
    /// Base connection URL.
    pub url: String,
    /// Short-lived access token.
    pub token: String,
}

impl TunnelInfo {
    /// REST path that issues tunnel info for `sandbox_id`.
    #[must_use]
    pub fn request_path(sandbox_id: &SandboxId) -> String {
        format!("/sandboxes/{sandbox_id}/terminal")
    }

    /// Seeds a builder with this tunnel's URL and token.
    #[must_use]
    pub fn builder(&self, sandbox_id: impl Into<SandboxId>) -> TerminalBuilder {
        TerminalBuilder::new()
            .url(self.url.as_str())
            .token(self.token.as_str())
            .sandbox_id(sandbox_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
