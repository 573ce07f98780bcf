use thiserror::Error;

/// Failures surfaced to the host before or around a frame dispatch.
///
/// Passes themselves never fail: anything that reaches a kernel has already
/// been validated against the buffer set and the settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SortError {
    /// Settings rejected before dispatch. The frame pipeline is not run.
    #[error("invalid sort settings: {0}")]
    Configuration(String),

    /// The frame does not match the allocated buffers. The host must call
    /// `resize` before rendering again.
    #[error("buffer size mismatch: buffers are {expected:?}, frame is {actual:?}")]
    ResourceMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// GPU backend setup, dispatch or readback failure.
    #[error("gpu backend: {0}")]
    Gpu(String),
}

impl SortError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type SortResult<T> = Result<T, SortError>;
