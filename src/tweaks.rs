use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use thiserror::Error;

/// Default portal gradient start color.
pub const DEFAULT_PORTAL_COLOR_START: &str = "#000000";
/// Default portal gradient end color.
pub const DEFAULT_PORTAL_COLOR_END: &str = "#ffffff";
/// Default renderer clear color.
pub const DEFAULT_CLEAR_COLOR: &str = "#201919";
/// Default fireflies base size in pixels.
pub const DEFAULT_FIREFLIES_SIZE: f32 = 100.0;
/// Slider range enforced by the debug panel.
pub const FIREFLIES_SIZE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=500.0;

/// Error raised when a color string cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TweakError {
    #[error("malformed hex color: {input}")]
    MalformedColor { input: String },
}

/// Parses a `#rrggbb` string into an RGB triple in `[0, 1]`.
pub fn parse_hex_color(input: &str) -> Result<Vec3, TweakError> {
    let digits = input.strip_prefix('#').unwrap_or(input);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TweakError::MalformedColor {
            input: input.to_string(),
        });
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).expect("hex digits validated above")
    };
    Ok(Vec3::new(
        channel(0..2) as f32 / 255.0,
        channel(2..4) as f32 / 255.0,
        channel(4..6) as f32 / 255.0,
    ))
}

/// Live-tweakable debug values.
///
/// This replaces the reference implementation's ad-hoc global debug object
/// with an explicit struct the panel binds to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tweaks {
    pub portal_color_start: Vec3,
    pub portal_color_end: Vec3,
    pub clear_color: Vec3,
    pub fireflies_size: f32,
}

impl Default for Tweaks {
    fn default() -> Self {
        Self {
            portal_color_start: parse_hex_color(DEFAULT_PORTAL_COLOR_START)
                .expect("default color is well-formed"),
            portal_color_end: parse_hex_color(DEFAULT_PORTAL_COLOR_END)
                .expect("default color is well-formed"),
            clear_color: parse_hex_color(DEFAULT_CLEAR_COLOR)
                .expect("default color is well-formed"),
            fireflies_size: DEFAULT_FIREFLIES_SIZE,
        }
    }
}

/// Shared handle to the tweak state.
///
/// The panel's binding layer writes edits through this handle and the frame
/// loop snapshots it once per frame; cloning shares the same storage.
#[derive(Debug, Default)]
pub struct TweakHandle {
    inner: Arc<RwLock<Tweaks>>,
}

impl Clone for TweakHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl TweakHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current values.
    pub fn snapshot(&self) -> Tweaks {
        *self.inner.read()
    }

    /// Applies a mutation to the shared values.
    pub fn update<F, R>(&self, mutator: F) -> R
    where
        F: FnOnce(&mut Tweaks) -> R,
    {
        mutator(&mut self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#000000").unwrap(), Vec3::ZERO);
        assert_eq!(parse_hex_color("#ffffff").unwrap(), Vec3::ONE);
        let clear = parse_hex_color("#201919").unwrap();
        assert!((clear.x - 32.0 / 255.0).abs() < 1e-6);
        assert!((clear.y - 25.0 / 255.0).abs() < 1e-6);
        assert!((clear.z - 25.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn accepts_unprefixed_digits() {
        assert_eq!(parse_hex_color("ff8d00").unwrap(), {
            Vec3::new(1.0, 141.0 / 255.0, 0.0)
        });
    }

    #[test]
    fn rejects_malformed_colors() {
        for input in ["", "#fff", "#gggggg", "#12345", "#1234567"] {
            assert_eq!(
                parse_hex_color(input),
                Err(TweakError::MalformedColor {
                    input: input.to_string()
                })
            );
        }
    }

    #[test]
    fn handle_shares_updates() {
        let handle = TweakHandle::new();
        let other = handle.clone();
        handle.update(|tweaks| tweaks.fireflies_size = 321.0);
        assert_eq!(other.snapshot().fireflies_size, 321.0);
    }

    #[test]
    fn defaults_match_the_reference_scene() {
        let tweaks = Tweaks::default();
        assert_eq!(tweaks.portal_color_start, Vec3::ZERO);
        assert_eq!(tweaks.portal_color_end, Vec3::ONE);
        assert_eq!(tweaks.fireflies_size, 100.0);
    }
}
