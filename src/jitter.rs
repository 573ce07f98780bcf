//! Seed-locked jitter for mask thresholds and span length caps.
//!
//! Every draw is a pure function of integer coordinates and the frame seed:
//! - no RNG state shared between workers
//! - 32-bit integer math only, so the WGSL kernels use the same hash
//! - a zero bound always yields a zero offset

/// One threshold jitter unit: a single 8-bit level.
pub const THRESHOLD_UNIT: f32 = 1.0 / 255.0;

const MASK_SALT: u32 = 0x6D61_736B;
const SPAN_SALT: u32 = 0x7370_616E;

/// PCG output permutation used as a stateless integer hash.
#[inline(always)]
pub fn pcg_hash(value: u32) -> u32 {
    let state = value.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

#[inline(always)]
pub fn hash3(a: u32, b: u32, c: u32) -> u32 {
    pcg_hash(a ^ pcg_hash(b ^ pcg_hash(c)))
}

/// Uniform integer in `[-bound, bound]`.
#[inline(always)]
pub fn signed_bounded(hash: u32, bound: u32) -> i32 {
    if bound == 0 {
        return 0;
    }
    let span = bound * 2 + 1;
    (hash % span) as i32 - bound as i32
}

/// Threshold offset for one pixel, in normalized threshold space.
///
/// The sign of `bound_units` flips the pattern; its magnitude bounds it.
pub fn mask_threshold_offset(x: u32, y: u32, seed: u32, bound_units: i32) -> f32 {
    if bound_units == 0 {
        return 0.0;
    }
    let steps = signed_bounded(hash3(x, y, seed ^ MASK_SALT), bound_units.unsigned_abs());
    (steps * bound_units.signum()) as f32 * THRESHOLD_UNIT
}

/// Change of the span cap for the run starting at `start` on scan line `line`.
pub fn span_length_offset(line: u32, start: u32, seed: u32, bound: u32) -> i32 {
    signed_bounded(hash3(line, start, seed ^ SPAN_SALT), bound)
}
