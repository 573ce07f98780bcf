//! Span-parallel counting-rank sort.
//!
//! No worker ever moves a value. The rank pass lets every span member count
//! how many members precede it in the requested order; the gather pass lets
//! every position look up the member whose rank equals its own offset and copy
//! that value in. Both passes are `O(length)` per pixel and read only buffers
//! finished by earlier passes, so each output cell has exactly one writer.

use crate::color::{key_of_hsl, Hsla};
use crate::dispatch::for_each_pixel;
use crate::frame::{FrameSize, SpanCell};
use crate::settings::{ScanDirection, SortKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortParams {
    pub direction: ScanDirection,
    pub key: SortKey,
    pub order: SortOrder,
}

/// True when `(key, coord)` belongs before `(own_key, own_coord)`.
///
/// Equal keys keep their scan order, which makes the order total.
#[inline(always)]
fn precedes(order: SortOrder, key: f32, coord: usize, own_key: f32, own_coord: usize) -> bool {
    let ahead = match order {
        SortOrder::Ascending => key < own_key,
        SortOrder::Descending => key > own_key,
    };
    ahead || (key == own_key && coord < own_coord)
}

/// Write each span member's rank within its span; `-1` outside spans.
pub fn rank_spans(
    size: FrameSize,
    hsl: &[Hsla],
    spans: &[SpanCell],
    ranks: &mut [i32],
    params: &SortParams,
) {
    for_each_pixel(size, ranks, |inv| {
        let span = spans[inv.index];
        if span.is_none() {
            return -1;
        }
        let (line, own_coord) = size.line_coords(params.direction, inv.index);
        let own_key = key_of_hsl(params.key, hsl[inv.index]);
        let start = span.start as usize;

        let mut rank = 0;
        for coord in start..start + span.length as usize {
            if coord == own_coord {
                continue;
            }
            let member = size.line_index(params.direction, line, coord);
            let key = key_of_hsl(params.key, hsl[member]);
            if precedes(params.order, key, coord, own_key, own_coord) {
                rank += 1;
            }
        }
        rank
    });
}

/// Fill every position with the value of the span member ranked at it.
/// Pixels outside any span pass their own HSL value through.
pub fn gather_sorted(
    size: FrameSize,
    hsl: &[Hsla],
    spans: &[SpanCell],
    ranks: &[i32],
    sorted: &mut [[f32; 4]],
    params: &SortParams,
) {
    for_each_pixel(size, sorted, |inv| {
        let span = spans[inv.index];
        if span.is_none() || span.length == 1 {
            return hsl[inv.index];
        }
        let (line, own_coord) = size.line_coords(params.direction, inv.index);
        let start = span.start as usize;
        let target = (own_coord - start) as i32;

        (start..start + span.length as usize)
            .map(|coord| size.line_index(params.direction, line, coord))
            .find(|&member| ranks[member] == target)
            .map_or(hsl[inv.index], |member| hsl[member])
    });
}
