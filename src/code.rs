// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-code generation and constant-time comparison.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An opaque, URL-safe short code drawn from 6 random bytes (~8 printable chars).
///
/// Never compared with `==`; always go through [`equal`].
#[derive(Debug, Clone, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Code(String);

impl Code {
    /// Draw a fresh cryptographically random code.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 6];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an untrusted candidate value (a URL path segment or header) as a
    /// `Code` for comparison. Does not validate shape — a malformed
    /// candidate simply never equals a real code.
    pub fn from_wire(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[cfg(test)]
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Constant-time equality, independent of where `a` and `b` first differ.
///
/// Length mismatches return `false` without early-exiting on content, and a
/// comparison against an empty code never succeeds — callers must never
/// compare an absent code by passing an empty string.
pub fn equal(a: &Code, b: &Code) -> bool {
    equal_bytes(a.0.as_bytes(), b.0.as_bytes())
}

/// Byte-wise constant-time compare, the primitive both [`equal`] and the
/// `X-AUTH-CODE` HTTP guard build on (same shape as
/// `transport::auth::constant_time_eq`, generalized beyond `&str`).
pub fn equal_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

// `PartialEq` is intentionally NOT derived: every comparison of two codes
// must go through the constant-time path above, never `==`.
