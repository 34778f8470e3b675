// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing-code image rendering.
//!
//! The raw pairing code is rendered once, at issue time, into an SVG data
//! URL suitable for direct embedding in a web page. Rendering failures are
//! non-fatal: the raw code is still served for terminal display.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;
use tracing::warn;

/// Renders the pairing code as a base64 SVG data URL.
///
/// Returns `None` (after logging) if the code cannot be encoded.
pub fn pairing_svg_data_url(code: &str) -> Option<String> {
    let qr = match QrCode::new(code.as_bytes()) {
        Ok(qr) => qr,
        Err(e) => {
            warn!(error = %e, "pairing code image rendering failed");
            return None;
        }
    };

    let image = qr
        .render::<svg::Color<'_>>()
        .min_dimensions(512, 512)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Some(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}
