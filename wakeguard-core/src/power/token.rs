// SPDX-License-Identifier: LGPL-3.0-only
//! Correlation tokens for portal requests.

/// Generate a fresh `handle_token`: `prefix` followed by a random `u32`.
///
/// Tokens become the last element of a request object path, so `prefix` must
/// only contain `[A-Za-z0-9_]`.
pub fn handle_token(prefix: &str) -> String {
    format!("{prefix}{}", fastrand::u32(..))
}
