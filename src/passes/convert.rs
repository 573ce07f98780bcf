use crate::color::{hsl_to_rgb, rgb_to_hsl, Hsla, Rgba};
use crate::dispatch::{for_each_pixel, update_each};
use crate::frame::FrameSize;

pub fn rgb_to_hsl_pass(size: FrameSize, color: &[Rgba], hsl: &mut [Hsla]) {
    for_each_pixel(size, hsl, |inv| rgb_to_hsl(color[inv.index]));
}

/// Converts the sorted buffer back to RGB in place.
pub fn hsl_to_rgb_pass(sorted: &mut [[f32; 4]]) {
    update_each(sorted, |_, px| *px = hsl_to_rgb(*px));
}
