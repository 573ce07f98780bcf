//! Per-frame sort configuration.
//!
//! `SortSettings` is the whole option surface the host can tune. It loads from
//! YAML (or JSON for embedding hosts), fills omitted fields with defaults and
//! is validated before every dispatch.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{SortError, SortResult};

/// Largest magnitude accepted for `mask_threshold_jitter`.
pub const MAX_MASK_THRESHOLD_JITTER: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Lightness,
    Saturation,
    Hue,
    Intensity,
}

impl SortKey {
    /// Stable numeric code shared with the WGSL kernels.
    pub fn code(self) -> u32 {
        match self {
            Self::Lightness => 0,
            Self::Saturation => 1,
            Self::Hue => 2,
            Self::Intensity => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    #[default]
    Horizontal,
    Vertical,
}

impl ScanDirection {
    pub fn code(self) -> u32 {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn code(self) -> u32 {
        match self {
            Self::Ascending => 0,
            Self::Descending => 1,
        }
    }
}

/// Diagnostic switches. Several may be set; [`DebugFlags::view`] resolves the
/// one that wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugFlags {
    pub show_mask: bool,
    pub show_spans: bool,
    pub visualize_spans: bool,
    pub suppress_composite: bool,
}

/// What a frame writes to the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView {
    /// Sorted spans composited over the source.
    Composite,
    /// Sorted buffer without compositing.
    RawSorted,
    /// False-colored spans.
    VisualizeSpans,
    /// Span lengths as grayscale.
    Spans,
    /// Selection mask as grayscale.
    Mask,
}

impl OutputView {
    pub fn code(self) -> u32 {
        match self {
            Self::Composite => 0,
            Self::RawSorted => 1,
            Self::VisualizeSpans => 2,
            Self::Spans => 3,
            Self::Mask => 4,
        }
    }

    /// Views that never read the sorted buffer skip the sort chain.
    pub fn needs_sort(self) -> bool {
        matches!(self, Self::Composite | Self::RawSorted)
    }
}

impl DebugFlags {
    pub fn view(&self) -> OutputView {
        if self.show_mask {
            OutputView::Mask
        } else if self.show_spans {
            OutputView::Spans
        } else if self.visualize_spans {
            OutputView::VisualizeSpans
        } else if self.suppress_composite {
            OutputView::RawSorted
        } else {
            OutputView::Composite
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortSettings {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub sort_key: SortKey,
    pub scan_direction: ScanDirection,
    pub sort_order: SortOrder,
    /// Longest span in pixels. `0` disables the cap.
    pub max_span_length: u32,
    /// Per-span random change of the cap, in `[-j, j]` pixels.
    pub span_length_jitter: u32,
    /// Per-pixel random threshold offset bound, in 1/255 steps.
    pub mask_threshold_jitter: i32,
    pub animate: bool,
    /// How fast the jitter pattern evolves while animating, in reseeds per second.
    pub animation_rate: f32,
    pub debug: DebugFlags,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            low_threshold: 0.2,
            high_threshold: 0.8,
            sort_key: SortKey::Lightness,
            scan_direction: ScanDirection::Horizontal,
            sort_order: SortOrder::Ascending,
            max_span_length: 1080,
            span_length_jitter: 0,
            mask_threshold_jitter: 0,
            animate: false,
            animation_rate: 0.0,
            debug: DebugFlags::default(),
        }
    }
}

impl SortSettings {
    pub fn validate(&self) -> SortResult<()> {
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !low.is_finite() || !high.is_finite() {
            return Err(SortError::config(format!(
                "thresholds must be finite, got low={low} high={high}"
            )));
        }
        if !(0.0..=0.5).contains(&low) {
            return Err(SortError::config(format!(
                "low_threshold must lie in [0, 0.5], got {low}"
            )));
        }
        if !(0.5..=1.0).contains(&high) {
            return Err(SortError::config(format!(
                "high_threshold must lie in [0.5, 1], got {high}"
            )));
        }
        if low >= high {
            return Err(SortError::config(format!(
                "low_threshold ({low}) must be below high_threshold ({high})"
            )));
        }
        if self.mask_threshold_jitter.abs() > MAX_MASK_THRESHOLD_JITTER {
            return Err(SortError::config(format!(
                "mask_threshold_jitter must be within ±{MAX_MASK_THRESHOLD_JITTER}, got {}",
                self.mask_threshold_jitter
            )));
        }
        if !self.animation_rate.is_finite() || self.animation_rate < 0.0 {
            return Err(SortError::config(format!(
                "animation_rate must be finite and >= 0, got {}",
                self.animation_rate
            )));
        }
        Ok(())
    }

    pub fn output_view(&self) -> OutputView {
        self.debug.view()
    }
}

pub fn load_settings(path: &Path) -> Result<SortSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    let settings: SortSettings = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(
            "failed to parse yaml in {} at {}: {}",
            path.display(),
            location,
            error
        )
    })?;

    settings
        .validate()
        .with_context(|| format!("settings in {} rejected", path.display()))?;
    Ok(settings)
}

/// Parse and validate settings handed over as JSON by an embedding host.
pub fn from_json_str(raw: &str) -> SortResult<SortSettings> {
    let settings: SortSettings =
        serde_json::from_str(raw).map_err(|error| SortError::config(error.to_string()))?;
    settings.validate()?;
    Ok(settings)
}
