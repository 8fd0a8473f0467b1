//! Presentation helpers for raw location fields.
//!
//! The engine hands back field bytes untouched. Published QQWry files store
//! them in GBK and pad empty areas with a ` CZ88.NET` marker.

use encoding_rs::GBK;

/// Filler some releases store in place of an empty area.
pub const PLACEHOLDER_AREA: &str = "CZ88.NET";

/// Decode GBK bytes, replacing invalid sequences.
pub fn decode_gbk(bytes: &[u8]) -> String {
    GBK.decode_without_bom_handling(bytes).0.into_owned()
}

/// Decode bytes as UTF-8, replacing invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// True when `area` carries no information beyond the filler marker.
pub fn is_placeholder_area(area: &str) -> bool {
    area.trim() == PLACEHOLDER_AREA
}

/// Join `country` and `area` as `country, area`, or just `country` when the
/// area is empty.
pub fn format_location(country: &str, area: &str) -> String {
    if area.is_empty() {
        country.to_string()
    } else {
        format!("{}, {}", country, area)
    }
}

/// Decode both fields for display.
///
/// With `strip_placeholder`, a filler-only area becomes empty.
pub fn display_fields(
    country: &[u8],
    area: &[u8],
    gbk: bool,
    strip_placeholder: bool,
) -> (String, String) {
    let decode: fn(&[u8]) -> String = if gbk { decode_gbk } else { decode_lossy };
    let country = decode(country);
    let mut area = decode(area);
    if strip_placeholder && is_placeholder_area(&area) {
        area.clear();
    }
    (country, area)
}
