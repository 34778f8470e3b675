// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient address normalization.
//!
//! Addresses arrive in whatever shape an operator typed into a spreadsheet.
//! Normalization strips everything that is not a digit, then canonicalizes
//! the two common Dutch national shapes to international form. Anything
//! else passes through unchanged; numbers already in international form
//! need no rewriting, and guessing a country for other shapes would
//! misroute messages.

/// Canonical digit-string for a raw address, or `None` when no digits
/// remain after stripping.
pub fn canonical_address(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(canonicalize_dutch(digits))
}

/// Rewrites the two Dutch national mobile shapes to international form.
///
/// `612345678` (9 digits, leading 6) and `0612345678` (10 digits, leading
/// 06) both become `31612345678`. Every other shape is returned as-is.
fn canonicalize_dutch(digits: String) -> String {
    let bytes = digits.as_bytes();
    match bytes.len() {
        9 if bytes[0] == b'6' => format!("31{digits}"),
        10 if bytes.starts_with(b"06") => format!("31{}", &digits[1..]),
        _ => digits,
    }
}
