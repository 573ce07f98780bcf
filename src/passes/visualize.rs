//! Diagnostic output passes. Each replaces the sort chain for the frame.

use crate::color::{hsl_to_rgb, Rgba};
use crate::dispatch::for_each_pixel;
use crate::frame::{FrameSize, SpanCell};
use crate::jitter::hash3;
use crate::settings::ScanDirection;

const SPAN_START_COLOR: Rgba = [1.0, 1.0, 1.0, 1.0];

/// False-color every span; pixels outside spans keep the source color.
///
/// Hue is hashed from the span identity, lightness ramps along the span and
/// the first pixel of each span is white so boundaries stand out.
pub fn visualize_spans(
    size: FrameSize,
    direction: ScanDirection,
    color: &[Rgba],
    spans: &[SpanCell],
    sorted: &mut [[f32; 4]],
) {
    for_each_pixel(size, sorted, |inv| {
        let span = spans[inv.index];
        if span.is_none() {
            return color[inv.index];
        }
        let (line, coord) = size.line_coords(direction, inv.index);
        let offset = coord - span.start as usize;
        if offset == 0 {
            return SPAN_START_COLOR;
        }
        let hue = hash3(line as u32, span.start as u32, span.length as u32) as f32 / u32::MAX as f32;
        let ramp = offset as f32 / span.length as f32;
        hsl_to_rgb([hue, 0.85, 0.25 + 0.5 * ramp, 1.0])
    });
}

pub fn mask_view(size: FrameSize, mask: &[f32], sorted: &mut [[f32; 4]]) {
    for_each_pixel(size, sorted, |inv| {
        let level = mask[inv.index];
        [level, level, level, 1.0]
    });
}

/// Span lengths as grayscale, normalized by the scan line length.
pub fn span_length_view(
    size: FrameSize,
    direction: ScanDirection,
    spans: &[SpanCell],
    sorted: &mut [[f32; 4]],
) {
    let line_len = size.line_len(direction).max(1) as f32;
    for_each_pixel(size, sorted, |inv| {
        let span = spans[inv.index];
        let level = if span.is_none() {
            0.0
        } else {
            span.length as f32 / line_len
        };
        [level, level, level, 1.0]
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_starts_are_highlighted_and_gaps_keep_source() {
        let size = FrameSize::new(5, 1);
        let color = vec![[0.1, 0.2, 0.3, 1.0]; 5];
        let spans = vec![
            SpanCell::NONE,
            SpanCell::new(1, 3),
            SpanCell::new(1, 3),
            SpanCell::new(1, 3),
            SpanCell::NONE,
        ];
        let mut out = vec![[0.0; 4]; 5];
        visualize_spans(size, ScanDirection::Horizontal, &color, &spans, &mut out);

        assert_eq!(out[0], color[0]);
        assert_eq!(out[1], SPAN_START_COLOR);
        assert_ne!(out[2], color[2]);
        assert_ne!(out[2], out[3], "lightness should ramp along the span");
        assert_eq!(out[4], color[4]);
    }

    #[test]
    fn span_length_view_scales_by_line_length() {
        let size = FrameSize::new(4, 1);
        let spans = vec![SpanCell::NONE, SpanCell::new(1, 2), SpanCell::new(1, 2), SpanCell::NONE];
        let mut out = vec![[9.0; 4]; 4];
        span_length_view(size, ScanDirection::Horizontal, &spans, &mut out);
        assert_eq!(out[0], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(out[1], [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn mask_view_is_black_and_white() {
        let size = FrameSize::new(2, 1);
        let mut out = vec![[0.5; 4]; 2];
        mask_view(size, &[0.0, 1.0], &mut out);
        assert_eq!(out, vec![[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]]);
    }
}
