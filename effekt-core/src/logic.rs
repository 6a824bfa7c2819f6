//! Pure Farb-Funktionen
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use rgb::RGB8;

/// Parst eine Hex-Farbe im Format `#RRGGBB` (das `#` ist optional)
///
/// # Beispiele
///
/// ```
/// # use rgb::RGB8;
/// # use effekt_core::parse_color;
/// assert_eq!(parse_color("#FF2800"), Some(RGB8 { r: 255, g: 40, b: 0 }));
/// assert_eq!(parse_color("00ff00"), Some(RGB8 { r: 0, g: 255, b: 0 }));
/// assert_eq!(parse_color("#F00"), None);
/// ```
pub fn parse_color(token: &str) -> Option<RGB8> {
    let hex = token.strip_prefix('#').unwrap_or(token);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGB8 {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// Skaliert eine Farbe mit einer Helligkeit aus `[0, 1]`
pub fn scale_color(color: RGB8, brightness: f32) -> RGB8 {
    let scale = |c: u8| (c as f32 * brightness + 0.5) as u8;
    RGB8 {
        r: scale(color.r),
        g: scale(color.g),
        b: scale(color.b),
    }
}

/// Lineare Überblendung von `from` nach `to`, `t` in `[0, 1]`
pub fn blend(from: RGB8, to: RGB8, t: f32) -> RGB8 {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| {
        let v = a as f32 + (b as f32 - a as f32) * t;
        (v + 0.5) as u8
    };
    RGB8 {
        r: mix(from.r, to.r),
        g: mix(from.g, to.g),
        b: mix(from.b, to.b),
    }
}
