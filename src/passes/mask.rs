use crate::color::{key_of_rgb, Rgba};
use crate::dispatch::for_each_pixel;
use crate::frame::FrameSize;
use crate::jitter::mask_threshold_offset;
use crate::settings::SortKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParams {
    pub key: SortKey,
    pub low: f32,
    pub high: f32,
    /// Threshold jitter bound in 1/255 steps, `0` for hard thresholds.
    pub jitter: i32,
    pub seed: u32,
}

/// Mark every pixel whose key lies inside the (jittered) threshold band.
pub fn create_mask(size: FrameSize, color: &[Rgba], mask: &mut [f32], params: &MaskParams) {
    for_each_pixel(size, mask, |inv| {
        let value = key_of_rgb(params.key, color[inv.index]);
        let offset = mask_threshold_offset(inv.x, inv.y, params.seed, params.jitter);
        let selected = params.low + offset <= value && value <= params.high + offset;
        if selected {
            1.0
        } else {
            0.0
        }
    });
}
