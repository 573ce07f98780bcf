//! Per-pass kernels of the pixel sort graph.
//!
//! Frame order:
//!   capture(source) -> mask -> clear(spans) -> spans -> clear(sorted)
//!   -> [mask view | span view | visualize
//!       | rgb_to_hsl -> rank -> gather -> hsl_to_rgb -> composite]
//!   -> encode
//!
//! Every function here is one barrier-separated pass: it reads only slices
//! written by earlier passes and writes only its own output slice.

pub mod clear;
pub mod composite;
pub mod convert;
pub mod mask;
pub mod sort;
pub mod spans;
pub mod visualize;
