//! CPU dispatch: rayon parallel-for over pixel and scan-line index domains.
//!
//! Each helper is one pass. It returns only after every worker has finished,
//! which is the barrier between passes. A worker owns exactly the output cell
//! (or line chunk) it is handed and may only read shared immutable slices.

use rayon::prelude::*;

use crate::frame::FrameSize;

/// Identity of one pixel worker, the CPU analogue of `global_invocation_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub x: u32,
    pub y: u32,
    /// Row-major index of `(x, y)`.
    pub index: usize,
}

/// Run `kernel` once per pixel and store its result in that pixel's cell.
pub fn for_each_pixel<T, F>(size: FrameSize, out: &mut [T], kernel: F)
where
    T: Send,
    F: Fn(Invocation) -> T + Sync,
{
    let width = size.width as usize;
    if size.is_empty() {
        return;
    }
    debug_assert_eq!(out.len(), size.pixel_count());

    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = kernel(Invocation {
                    x: x as u32,
                    y: y as u32,
                    index: y * width + x,
                });
            }
        });
}

/// Run `kernel` once per cell, updating that cell in place. The kernel also
/// receives the cell index.
pub fn update_each<T, F>(out: &mut [T], kernel: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    out.par_iter_mut()
        .enumerate()
        .for_each(|(index, cell)| kernel(index, cell));
}

/// Run `kernel` once per contiguous line of `line_len` cells.
pub fn for_each_line<T, F>(line_len: usize, out: &mut [T], kernel: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if line_len == 0 {
        return;
    }
    out.par_chunks_mut(line_len)
        .enumerate()
        .for_each(|(line, chunk)| kernel(line, chunk));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pixel_is_visited_once_with_its_own_coordinates() {
        let size = FrameSize::new(9, 4);
        let mut out = vec![(u32::MAX, u32::MAX); size.pixel_count()];
        for_each_pixel(size, &mut out, |inv| (inv.x, inv.y));
        for (index, (x, y)) in out.iter().enumerate() {
            assert_eq!(*x as usize, index % 9);
            assert_eq!(*y as usize, index / 9);
        }
    }

    #[test]
    fn empty_frame_dispatches_nothing() {
        let mut out: Vec<u8> = Vec::new();
        for_each_pixel(FrameSize::new(0, 5), &mut out, |_| 1);
        assert!(out.is_empty());
    }

    #[test]
    fn lines_receive_their_index() {
        let mut out = vec![0usize; 12];
        for_each_line(4, &mut out, |line, chunk| chunk.fill(line));
        assert_eq!(out, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
