//! RGB <-> HSL conversion and the scalar sort keys derived from a color.
//!
//! All colors are normalized `[f32; 4]` with alpha last. Hue is stored in
//! `[0, 1)` rather than degrees so every channel shares one range.

use crate::settings::SortKey;

pub type Rgba = [f32; 4];
pub type Hsla = [f32; 4];

const ONE_THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

pub fn rgb_to_hsl(rgba: Rgba) -> Hsla {
    let [r, g, b, a] = rgba;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) * 0.5;
    let delta = max - min;
    if delta <= 0.0 {
        return [0.0, 0.0, l, a];
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    [h / 6.0, s, l, a]
}

pub fn hsl_to_rgb(hsla: Hsla) -> Rgba {
    let [h, s, l, a] = hsla;
    if s <= 0.0 {
        return [l, l, l, a];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + ONE_THIRD),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - ONE_THIRD),
        a,
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t - t.floor();
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < TWO_THIRDS {
        p + (q - p) * (TWO_THIRDS - t) * 6.0
    } else {
        p
    }
}

pub fn lightness(rgba: Rgba) -> f32 {
    let [r, g, b, _] = rgba;
    (r.max(g).max(b) + r.min(g).min(b)) * 0.5
}

pub fn intensity(rgba: Rgba) -> f32 {
    (rgba[0] + rgba[1] + rgba[2]) / 3.0
}

/// Scalar used by the mask generator, computed straight from RGB.
pub fn key_of_rgb(key: SortKey, rgba: Rgba) -> f32 {
    match key {
        SortKey::Lightness => lightness(rgba),
        SortKey::Intensity => intensity(rgba),
        SortKey::Saturation => rgb_to_hsl(rgba)[1],
        SortKey::Hue => rgb_to_hsl(rgba)[0],
    }
}

/// Scalar used by the sorter, computed from the HSL buffer.
pub fn key_of_hsl(key: SortKey, hsla: Hsla) -> f32 {
    match key {
        SortKey::Hue => hsla[0],
        SortKey::Saturation => hsla[1],
        SortKey::Lightness => hsla[2],
        SortKey::Intensity => intensity(hsl_to_rgb(hsla)),
    }
}

pub fn rgba_from_u8(px: [u8; 4]) -> Rgba {
    px.map(|channel| f32::from(channel) / 255.0)
}

pub fn rgba_to_u8(rgba: Rgba) -> [u8; 4] {
    rgba.map(|channel| (channel * 255.0).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-4;

    fn assert_close(left: Rgba, right: Rgba) {
        for (channel, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            assert!(
                (l - r).abs() <= TOLERANCE,
                "channel {channel} differs: {left:?} vs {right:?}"
            );
        }
    }

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_close(rgb_to_hsl([1.0, 0.0, 0.0, 1.0]), [0.0, 1.0, 0.5, 1.0]);
        assert_close(rgb_to_hsl([0.0, 1.0, 0.0, 1.0]), [ONE_THIRD, 1.0, 0.5, 1.0]);
        assert_close(rgb_to_hsl([0.0, 0.0, 1.0, 1.0]), [TWO_THIRDS, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn grays_have_zero_saturation() {
        let hsl = rgb_to_hsl([0.25, 0.25, 0.25, 0.5]);
        assert_eq!(hsl, [0.0, 0.0, 0.25, 0.5]);
        assert_eq!(hsl_to_rgb(hsl), [0.25, 0.25, 0.25, 0.5]);
    }

    #[test]
    fn round_trip_over_a_coarse_rgb_grid() {
        let steps = 18;
        for ri in 0..=steps {
            for gi in 0..=steps {
                for bi in 0..=steps {
                    let rgba = [
                        ri as f32 / steps as f32,
                        gi as f32 / steps as f32,
                        bi as f32 / steps as f32,
                        0.75,
                    ];
                    assert_close(hsl_to_rgb(rgb_to_hsl(rgba)), rgba);
                }
            }
        }
    }

    #[test]
    fn round_trip_preserves_every_8bit_gray_and_magenta_ramp() {
        for level in 0..=255u8 {
            let gray = rgba_from_u8([level, level, level, 255]);
            assert_eq!(rgba_to_u8(hsl_to_rgb(rgb_to_hsl(gray))), [level, level, level, 255]);
            let magenta = rgba_from_u8([level, 0, 255 - level, 128]);
            assert_eq!(
                rgba_to_u8(hsl_to_rgb(rgb_to_hsl(magenta))),
                [level, 0, 255 - level, 128]
            );
        }
    }

    #[test]
    fn keys_agree_between_rgb_and_hsl_paths() {
        let rgba = [0.9, 0.3, 0.1, 1.0];
        let hsla = rgb_to_hsl(rgba);
        for key in [
            SortKey::Lightness,
            SortKey::Saturation,
            SortKey::Hue,
            SortKey::Intensity,
        ] {
            let direct = key_of_rgb(key, rgba);
            let via_hsl = key_of_hsl(key, hsla);
            assert!((direct - via_hsl).abs() <= TOLERANCE, "{key:?}: {direct} vs {via_hsl}");
        }
    }

    #[test]
    fn hue_stays_below_one() {
        let hsl = rgb_to_hsl([1.0, 0.0, 0.001, 1.0]);
        assert!(hsl[0] < 1.0 && hsl[0] >= 0.0);
    }
}
