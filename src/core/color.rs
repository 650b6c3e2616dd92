//! Color utilities
//!
//! Marker colors are configured as hex strings and handed to the surface
//! as RGBA floats.

/// Parse hex color "#RRGGBB" to RGBA floats in [0.0, 1.0]
///
/// Falls back to blue (the default marker color) if the hex string is invalid.
///
/// # Examples
///
/// ```
/// use floormap_viewer::core::color::parse_hex_color;
///
/// assert_eq!(parse_hex_color("#FF0000", 1.0), [1.0, 0.0, 0.0, 1.0]);
/// assert_eq!(parse_hex_color("nope", 0.6), [0.0, 0.0, 1.0, 0.6]);
/// ```
pub fn parse_hex_color(hex: &str, alpha: f32) -> [f32; 4] {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) if hex.len() == 6 => [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            alpha,
        ],
        _ => [0.0, 0.0, 1.0, alpha],
    }
}

/// Convert RGBA back to a CSS color string "rgba(r, g, b, a)"
pub fn to_css_rgba(rgba: [f32; 4]) -> String {
    let r = (rgba[0] * 255.0).round() as u8;
    let g = (rgba[1] * 255.0).round() as u8;
    let b = (rgba[2] * 255.0).round() as u8;
    format!("rgba({}, {}, {}, {})", r, g, b, rgba[3])
}
