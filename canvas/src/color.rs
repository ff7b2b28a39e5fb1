//! Hex color helpers used by background patterns and shape strokes.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// An opaque RGB color parsed from a `#rrggbb` or `#rgb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse a CSS hex color. The leading `#` is optional.
    #[must_use]
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16);
        let (r, g, b) = match digits.len() {
            6 => (channel(&digits[0..2]), channel(&digits[2..4]), channel(&digits[4..6])),
            3 => {
                let expand = |i: usize| channel(&digits[i..=i]).map(|v| v * 17);
                (expand(0), expand(1), expand(2))
            }
            _ => return None,
        };
        match (r, g, b) {
            (Ok(r), Ok(g), Ok(b)) => Some(Self { r, g, b }),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb` form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn shift(self, delta: i32) -> Self {
        let adjust = |c: u8| u8::try_from((i32::from(c) + delta).clamp(0, 255)).unwrap_or(u8::MAX);
        Self { r: adjust(self.r), g: adjust(self.g), b: adjust(self.b) }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn amount_to_delta(amount: f64) -> i32 {
    (255.0 * amount.clamp(0.0, 1.0)).round() as i32
}

/// Subtract `round(255 * amount)` from every channel, clamping at 0.
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn darken(color: &str, amount: f64) -> String {
    match Rgb::parse(color) {
        Some(rgb) => rgb.shift(-amount_to_delta(amount)).to_hex(),
        None => color.to_owned(),
    }
}

/// Add `round(255 * amount)` to every channel, clamping at 255.
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn lighten(color: &str, amount: f64) -> String {
    match Rgb::parse(color) {
        Some(rgb) => rgb.shift(amount_to_delta(amount)).to_hex(),
        None => color.to_owned(),
    }
}

/// CSS `rgba(...)` string for `color` at the given opacity (clamped to `[0, 1]`).
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn with_opacity(color: &str, opacity: f64) -> String {
    match Rgb::parse(color) {
        Some(Rgb { r, g, b }) => format!("rgba({r}, {g}, {b}, {})", opacity.clamp(0.0, 1.0)),
        None => color.to_owned(),
    }
}

/// Blend `color` over `base` at `opacity`, returning an opaque hex color.
#[must_use]
pub fn blend_over(color: &str, base: &str, opacity: f64) -> Option<String> {
    let top = Rgb::parse(color)?;
    let bottom = Rgb::parse(base)?;
    let a = opacity.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mix = |t: u8, b: u8| (f64::from(t) * a + f64::from(b) * (1.0 - a)).round() as u8;
    Some(Rgb { r: mix(top.r, bottom.r), g: mix(top.g, bottom.g), b: mix(top.b, bottom.b) }.to_hex())
}
