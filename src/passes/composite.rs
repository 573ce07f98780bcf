use image::{Rgba as Pixel, RgbaImage};

use crate::color::{rgba_to_u8, Rgba};
use crate::dispatch::update_each;
use crate::frame::FrameSize;

/// Keep sorted values only where the mask selected the pixel.
pub fn composite(mask: &[f32], color: &[Rgba], sorted: &mut [[f32; 4]]) {
    update_each(sorted, |index, px| {
        if mask[index] <= 0.5 {
            *px = color[index];
        }
    });
}

/// Quantize the final buffer into the host image.
pub fn encode_output(size: FrameSize, buffer: &[[f32; 4]]) -> RgbaImage {
    RgbaImage::from_fn(size.width, size.height, |x, y| {
        let index = y as usize * size.width as usize + x as usize;
        Pixel(rgba_to_u8(buffer[index]))
    })
}
