//! Intermediate per-frame buffers and the frame timing handed in by the host.

use bytemuck::{Pod, Zeroable};
use tracing::info;

use crate::color::{rgba_from_u8, Hsla, Rgba};
use crate::settings::ScanDirection;

/// Sentinel written by the clear pass into float buffers.
pub const CLEARED: f32 = -1.0;

/// Encoded span membership of one pixel. Matches `vec2<i32>` in WGSL.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SpanCell {
    /// Scan-axis coordinate of the first pixel of the span.
    pub start: i32,
    pub length: i32,
}

impl SpanCell {
    pub const NONE: Self = Self {
        start: -1,
        length: -1,
    };

    pub fn new(start: usize, length: usize) -> Self {
        Self {
            start: start as i32,
            length: length as i32,
        }
    }

    pub fn is_none(&self) -> bool {
        self.start < 0 || self.length <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of scan lines along `direction`.
    pub fn line_count(&self, direction: ScanDirection) -> usize {
        match direction {
            ScanDirection::Horizontal => self.height as usize,
            ScanDirection::Vertical => self.width as usize,
        }
    }

    /// Number of pixels on one scan line along `direction`.
    pub fn line_len(&self, direction: ScanDirection) -> usize {
        match direction {
            ScanDirection::Horizontal => self.width as usize,
            ScanDirection::Vertical => self.height as usize,
        }
    }

    /// Row-major index of the pixel at `offset` on scan line `line`.
    #[inline(always)]
    pub fn line_index(&self, direction: ScanDirection, line: usize, offset: usize) -> usize {
        match direction {
            ScanDirection::Horizontal => line * self.width as usize + offset,
            ScanDirection::Vertical => offset * self.width as usize + line,
        }
    }

    /// `(line, offset)` of a row-major index along `direction`.
    #[inline(always)]
    pub fn line_coords(&self, direction: ScanDirection, index: usize) -> (usize, usize) {
        let width = self.width as usize;
        let (x, y) = (index % width, index / width);
        match direction {
            ScanDirection::Horizontal => (y, x),
            ScanDirection::Vertical => (x, y),
        }
    }

    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Host timing for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameClock {
    pub frame_index: u64,
    /// Seconds since the host started ticking.
    pub time_seconds: f32,
    /// Seconds since the previous tick.
    pub delta_seconds: f32,
}

impl FrameClock {
    /// Clock for frame `frame_index` of a fixed-rate sequence.
    pub fn at_fps(frame_index: u64, fps: f32) -> Self {
        let delta_seconds = if fps > 0.0 { 1.0 / fps } else { 0.0 };
        Self {
            frame_index,
            time_seconds: frame_index as f32 * delta_seconds,
            delta_seconds,
        }
    }
}

/// Every intermediate buffer of the pass graph, sized for one resolution.
pub struct FrameBuffers {
    pub size: FrameSize,
    pub color: Vec<Rgba>,
    pub mask: Vec<f32>,
    pub spans: Vec<SpanCell>,
    /// Column-major span scratch used by vertical scans.
    pub spans_by_line: Vec<SpanCell>,
    pub hsl: Vec<Hsla>,
    pub ranks: Vec<i32>,
    pub sorted: Vec<[f32; 4]>,
}

impl FrameBuffers {
    pub fn new(size: FrameSize) -> Self {
        let count = size.pixel_count();
        info!(
            width = size.width,
            height = size.height,
            "allocating pixel sort buffers"
        );
        Self {
            size,
            color: vec![[0.0; 4]; count],
            mask: vec![0.0; count],
            spans: vec![SpanCell::NONE; count],
            spans_by_line: vec![SpanCell::NONE; count],
            hsl: vec![[0.0; 4]; count],
            ranks: vec![-1; count],
            sorted: vec![[CLEARED; 4]; count],
        }
    }

    /// Snapshot the host frame into the normalized color buffer.
    pub fn capture(&mut self, source: &image::RgbaImage) {
        for (dst, px) in self.color.iter_mut().zip(source.pixels()) {
            *dst = rgba_from_u8(px.0);
        }
    }
}
