//! Handshake URL derivation.
//!
//! The REST collaborator hands out a base URL such as
//! `https://api.example.com/terminal?sandbox=abc123` plus a short-lived
//! token. The Socket.IO server is reached at a fixed handshake path on the
//! same host, while the original path names the namespace to join.
//!
//! ```text
//! https://api.example.com/terminal?sandbox=abc123   token=tok-1
//!                  │
//!                  ▼
//! wss://api.example.com/socket.io/?EIO=4&sandbox=abc123&token=tok-1&transport=websocket
//! namespace = /terminal
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Fixed Engine.IO handshake endpoint.
pub const HANDSHAKE_PATH: &str = "/socket.io/";

/// Namespace used when the base URL has no path at all.
pub const DEFAULT_NAMESPACE: &str = "/terminal";

/// Engine.IO protocol version marker.
const PROTOCOL_VERSION: (&str, &str) = ("EIO", "4");

/// Transport selector marker.
const TRANSPORT: (&str, &str) = ("transport", "websocket");

/// Query parameter carrying the bearer token.
const TOKEN_PARAM: &str = "token";

// ============================================================================
// Endpoint
// ============================================================================

/// Concrete dial target derived from a service-provided base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// WebSocket URL to dial.
    pub url: Url,
    /// Socket.IO namespace to join once connected.
    pub namespace: String,
}

impl Endpoint {
    /// Derives the handshake URL and namespace from `base_url` and `token`.
    ///
    /// Existing query parameters are kept; the version marker, transport
    /// selector and token are added or overwritten. Parameters are emitted
    /// sorted by key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] if `base_url` does not parse or its scheme is
    /// not one of `http`, `https`, `ws`, `wss`.
    pub fn from_base_url(base_url: &str, token: &str) -> Result<Self> {
        let mut url =
            Url::parse(base_url).map_err(|e| Error::invalid_url(base_url, e.to_string()))?;

        // `Url` reports "/" for a missing path too, so look at the raw input.
        let namespace = if has_path(base_url) {
            url.path().to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::invalid_url(
                    base_url,
                    format!("unsupported scheme: {other}"),
                ));
            }
        };
        if url.scheme() != scheme {
            url.set_scheme(scheme)
                .map_err(|()| Error::invalid_url(base_url, "cannot rewrite scheme"))?;
        }

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        for (key, value) in [PROTOCOL_VERSION, TRANSPORT, (TOKEN_PARAM, token)] {
            params.insert(key.to_string(), vec![value.to_string()]);
        }

        url.set_path(HANDSHAKE_PATH);
        url.query_pairs_mut().clear().extend_pairs(
            params
                .iter()
                .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str()))),
        );

        Ok(Self { url, namespace })
    }
}

/// Returns `true` if `base_url` spells out a path after its authority.
fn has_path(base_url: &str) -> bool {
    let rest = base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest);
    rest.find(['/', '?', '#'])
        .is_some_and(|at| rest[at..].starts_with('/'))
}

// ============================================================================
// Tests
// ============================================================================
