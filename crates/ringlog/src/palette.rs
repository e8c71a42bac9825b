//! Per-source color derivation, for multi-source foreground/background
//! tagging: a base hue rotated by `source_id % N` steps, converted to RGB
//! with a plain HSV→RGB conversion rather than pulling in a color-math
//! crate for something this small.

use ringlog_core::line::SourceId;

/// Degrees rotated per source index.
const HUE_STEP_DEGREES: f64 = 5.0;
/// Number of distinct hues before the rotation wraps.
const HUE_WRAP: u32 = 72;

/// Derive a stable display color for `source`, shaded by `shade` in
/// `[-1.0, 1.0]` (negative darkens, positive lightens).
#[must_use]
pub fn color_for(source: SourceId, shade: f64) -> (u8, u8, u8) {
    let step = source.0 % HUE_WRAP;
    let hue = (f64::from(step) * HUE_STEP_DEGREES) % 360.0;
    hsv_to_rgb(hue, 0.65, shade_to_value(shade))
}

fn shade_to_value(shade: f64) -> f64 {
    let clamped = shade.clamp(-1.0, 1.0);
    (0.75 + clamped * 0.25).clamp(0.1, 1.0)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let c = v * s;
    let h_prime = h / 60.0;
    let x = c * (1.0 - (h_prime.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        (((r1 + m) * 255.0).round() as u8),
        (((g1 + m) * 255.0).round() as u8),
        (((b1 + m) * 255.0).round() as u8),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_source_is_stable() {
        let a = color_for(SourceId(7), 0.0);
        let b = color_for(SourceId(7), 0.0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_sources_usually_differ() {
        let a = color_for(SourceId(1), 0.0);
        let b = color_for(SourceId(2), 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn wraps_after_hue_wrap_sources() {
        let a = color_for(SourceId(3), 0.0);
        let b = color_for(SourceId(3 + HUE_WRAP), 0.0);
        assert_eq!(a, b);
    }
}
