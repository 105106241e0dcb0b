//! Type-safe identifiers for tunnel entities.
//!
//! Newtype wrappers keep the client-chosen sandbox ID and the
//! server-assigned session ID from being mixed up at call sites.
//!
//! | Type | Assigned by | Used in |
//! |------|-------------|---------|
//! | [`SandboxId`] | Caller | `terminal:start` |
//! | [`SessionId`] | Server (`terminal:started`) | `terminal:input`, `terminal:resize` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// SandboxId
// ============================================================================

/// Identifier of the remote sandbox a terminal is opened on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SandboxId(String);

impl SandboxId {
    /// Creates a sandbox ID.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SandboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SandboxId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SandboxId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Server-assigned identifier of a remote pseudo-terminal.
///
/// Never empty: an empty ID in `terminal:started` is a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID, returning `None` for an empty string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id).ok_or_else(|| Error::protocol_violation("empty session ID"))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
