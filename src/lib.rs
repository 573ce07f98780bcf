//! Data-parallel pixel sorting.
//!
//! A frame runs through a fixed graph of passes: threshold mask, span
//! identification, RGB->HSL, counting-rank sort inside spans, HSL->RGB and
//! compositing. [`PixelSorter`] dispatches the passes on the CPU with rayon,
//! [`GpuPixelSorter`] runs the same graph as wgpu compute kernels.

pub mod animation;
pub mod color;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod jitter;
pub mod passes;
pub mod pipeline;
pub mod settings;

pub use animation::AnimationState;
pub use error::{SortError, SortResult};
pub use frame::{FrameClock, FrameSize, SpanCell};
pub use gpu::GpuPixelSorter;
pub use pipeline::{PixelSorter, SortControls};
pub use settings::{
    load_settings, DebugFlags, OutputView, ScanDirection, SortKey, SortOrder, SortSettings,
};
