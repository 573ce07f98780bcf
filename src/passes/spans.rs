//! Span identification: run-length encoding of the mask, one worker per line.
//!
//! A worker walks its line in increasing order and, whenever a run ends,
//! stamps `(start, length)` on every pixel of that run. Lines are independent;
//! the walk inside a line is sequential.

use crate::dispatch::{for_each_line, for_each_pixel};
use crate::frame::{FrameSize, SpanCell};
use crate::jitter::span_length_offset;
use crate::settings::ScanDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanParams {
    pub direction: ScanDirection,
    /// `0` means runs are never split.
    pub max_span_length: u32,
    pub jitter: u32,
    pub seed: u32,
}

impl SpanParams {
    /// Cap for the run that starts at `start` on `line`. Always at least 1.
    pub fn limit_for(&self, line: usize, start: usize) -> usize {
        if self.max_span_length == 0 {
            return usize::MAX;
        }
        let offset = span_length_offset(line as u32, start as u32, self.seed, self.jitter);
        (self.max_span_length as i64 + offset as i64).max(1) as usize
    }
}

/// Fill `spans` for every selected pixel. `spans` must already be cleared;
/// `scratch` is a same-sized buffer used by vertical scans.
pub fn identify_spans(
    size: FrameSize,
    mask: &[f32],
    spans: &mut [SpanCell],
    scratch: &mut [SpanCell],
    params: &SpanParams,
) {
    if size.is_empty() {
        return;
    }
    let line_len = size.line_len(params.direction);
    let selected = |line: usize, offset: usize| {
        mask[size.line_index(params.direction, line, offset)] > 0.5
    };

    match params.direction {
        ScanDirection::Horizontal => {
            for_each_line(line_len, spans, |line, row| {
                scan_line(line, row, |offset| selected(line, offset), params)
            });
        }
        ScanDirection::Vertical => {
            // Columns are strided in row-major memory, so each worker fills a
            // contiguous column-major chunk and a gather pass transposes it.
            scratch.copy_from_slice(spans);
            let height = size.height as usize;
            for_each_line(line_len, scratch, |line, column| {
                scan_line(line, column, |offset| selected(line, offset), params)
            });
            let by_column: &[SpanCell] = scratch;
            for_each_pixel(size, spans, |inv| {
                by_column[inv.x as usize * height + inv.y as usize]
            });
        }
    }
}

fn scan_line<F>(line: usize, out: &mut [SpanCell], selected: F, params: &SpanParams)
where
    F: Fn(usize) -> bool,
{
    let mut run_start = 0;
    let mut run_len = 0;
    let mut limit = usize::MAX;

    for offset in 0..out.len() {
        if selected(offset) {
            if run_len == 0 {
                run_start = offset;
                limit = params.limit_for(line, offset);
            }
            run_len += 1;
            if run_len >= limit {
                stamp(out, run_start, run_len);
                run_len = 0;
            }
        } else if run_len > 0 {
            stamp(out, run_start, run_len);
            run_len = 0;
        }
    }

    if run_len > 0 {
        stamp(out, run_start, run_len);
    }
}

fn stamp(out: &mut [SpanCell], start: usize, length: usize) {
    out[start..start + length].fill(SpanCell::new(start, length));
}
