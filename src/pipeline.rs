//! CPU pixel sorter: owns the buffer set and the [`SortControls`], and runs
//! the pass graph once per frame.
//!
//! Architecture:
//!   - [`FrameBuffers`]: every intermediate buffer, sized for one resolution.
//!   - [`SortControls`]: settings and threshold drift, advanced by `tick`.
//!   - [`PixelSorter::render`]: validates, then dispatches the passes in order.

use image::RgbaImage;
use tracing::{debug, warn};

use crate::animation::AnimationState;
use crate::error::{SortError, SortResult};
use crate::frame::{FrameBuffers, FrameClock, FrameSize, SpanCell};
use crate::passes::clear::{clear_sorted, clear_spans};
use crate::passes::composite::{composite, encode_output};
use crate::passes::convert::{hsl_to_rgb_pass, rgb_to_hsl_pass};
use crate::passes::mask::{create_mask, MaskParams};
use crate::passes::sort::{gather_sorted, rank_spans, SortParams};
use crate::passes::spans::{identify_spans, SpanParams};
use crate::passes::visualize::{mask_view, span_length_view, visualize_spans};
use crate::settings::{OutputView, SortSettings};

/// Jitter seed for a frame. Static unless animating.
pub fn frame_seed(settings: &SortSettings, clock: &FrameClock) -> u32 {
    if !settings.animate {
        return 0;
    }
    (clock.time_seconds.max(0.0) * settings.animation_rate).floor() as u32
}

/// Settings plus the animation driver. Both backends hold one.
#[derive(Debug, Clone, PartialEq)]
pub struct SortControls {
    settings: SortSettings,
    animation: AnimationState,
}

impl SortControls {
    pub fn new(settings: SortSettings) -> SortResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            animation: AnimationState::default(),
        })
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    /// Replace the settings. Turning animation on restarts the drift from
    /// the closed band.
    ///
    /// Rejected settings are still stored and the error returned: every
    /// frame rendered with them fails with `Configuration` until valid
    /// settings replace them.
    pub fn set_settings(&mut self, settings: SortSettings) -> SortResult<()> {
        let verdict = settings.validate();
        if settings.animate && !self.settings.animate {
            self.animation = AnimationState::default();
        }
        self.settings = settings;
        verdict
    }

    pub fn animation(&self) -> AnimationState {
        self.animation
    }

    /// Advance the animation driver by one host tick.
    pub fn tick(&mut self, delta_seconds: f32) {
        if self.settings.animate {
            self.animation = self.animation.advance(delta_seconds);
        }
    }

    /// Thresholds the next frame will use.
    pub fn effective_thresholds(&self) -> (f32, f32) {
        if self.settings.animate {
            self.animation.thresholds()
        } else {
            (self.settings.low_threshold, self.settings.high_threshold)
        }
    }

    pub fn seed(&self, clock: &FrameClock) -> u32 {
        frame_seed(&self.settings, clock)
    }
}

/// Turn a `Configuration` error into an unmodified copy of the source.
pub(crate) fn pass_through_rejected(
    rendered: SortResult<RgbaImage>,
    source: &RgbaImage,
) -> SortResult<RgbaImage> {
    match rendered {
        Err(SortError::Configuration(reason)) => {
            warn!(%reason, "sort settings rejected, passing frame through");
            Ok(source.clone())
        }
        other => other,
    }
}

pub(crate) fn check_source(expected: FrameSize, source: &RgbaImage) -> SortResult<()> {
    let actual = source.dimensions();
    if actual != expected.as_tuple() {
        return Err(SortError::ResourceMismatch {
            expected: expected.as_tuple(),
            actual,
        });
    }
    Ok(())
}

pub struct PixelSorter {
    buffers: FrameBuffers,
    controls: SortControls,
}

impl PixelSorter {
    pub fn new(width: u32, height: u32, settings: SortSettings) -> SortResult<Self> {
        let controls = SortControls::new(settings)?;
        Ok(Self {
            buffers: FrameBuffers::new(FrameSize::new(width, height)),
            controls,
        })
    }

    pub fn size(&self) -> FrameSize {
        self.buffers.size
    }

    pub fn settings(&self) -> &SortSettings {
        self.controls.settings()
    }

    pub fn set_settings(&mut self, settings: SortSettings) -> SortResult<()> {
        self.controls.set_settings(settings)
    }

    /// Reallocate every buffer for a new resolution. Nothing from the old
    /// buffer set survives.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = FrameSize::new(width, height);
        if size != self.buffers.size {
            self.buffers = FrameBuffers::new(size);
        }
    }

    pub fn animation(&self) -> AnimationState {
        self.controls.animation()
    }

    pub fn tick(&mut self, delta_seconds: f32) {
        self.controls.tick(delta_seconds);
    }

    pub fn effective_thresholds(&self) -> (f32, f32) {
        self.controls.effective_thresholds()
    }

    pub fn mask(&self) -> &[f32] {
        &self.buffers.mask
    }

    pub fn spans(&self) -> &[SpanCell] {
        &self.buffers.spans
    }

    /// Run every pass for one frame and return the output image.
    pub fn render(&mut self, source: &RgbaImage, clock: &FrameClock) -> SortResult<RgbaImage> {
        let size = self.buffers.size;
        check_source(size, source)?;
        self.controls.settings.validate()?;
        if size.is_empty() {
            return Ok(RgbaImage::new(size.width, size.height));
        }

        let settings = &self.controls.settings;
        let (low, high) = self.controls.effective_thresholds();
        let seed = self.controls.seed(clock);
        let view = settings.output_view();
        let direction = settings.scan_direction;
        let buffers = &mut self.buffers;

        buffers.capture(source);

        let mask_params = MaskParams {
            key: settings.sort_key,
            low,
            high,
            jitter: settings.mask_threshold_jitter,
            seed,
        };
        create_mask(size, &buffers.color, &mut buffers.mask, &mask_params);

        clear_spans(&mut buffers.spans);
        let span_params = SpanParams {
            direction,
            max_span_length: settings.max_span_length,
            jitter: settings.span_length_jitter,
            seed,
        };
        identify_spans(
            size,
            &buffers.mask,
            &mut buffers.spans,
            &mut buffers.spans_by_line,
            &span_params,
        );

        clear_sorted(&mut buffers.sorted);
        match view {
            OutputView::Mask => mask_view(size, &buffers.mask, &mut buffers.sorted),
            OutputView::Spans => {
                span_length_view(size, direction, &buffers.spans, &mut buffers.sorted)
            }
            OutputView::VisualizeSpans => visualize_spans(
                size,
                direction,
                &buffers.color,
                &buffers.spans,
                &mut buffers.sorted,
            ),
            OutputView::Composite | OutputView::RawSorted => {
                let sort_params = SortParams {
                    direction,
                    key: settings.sort_key,
                    order: settings.sort_order,
                };
                rgb_to_hsl_pass(size, &buffers.color, &mut buffers.hsl);
                rank_spans(
                    size,
                    &buffers.hsl,
                    &buffers.spans,
                    &mut buffers.ranks,
                    &sort_params,
                );
                gather_sorted(
                    size,
                    &buffers.hsl,
                    &buffers.spans,
                    &buffers.ranks,
                    &mut buffers.sorted,
                    &sort_params,
                );
                hsl_to_rgb_pass(&mut buffers.sorted);
                if view == OutputView::Composite {
                    composite(&buffers.mask, &buffers.color, &mut buffers.sorted);
                }
            }
        }

        debug!(
            frame = clock.frame_index,
            low,
            high,
            seed,
            view = ?view,
            "pixel sort frame dispatched"
        );
        Ok(encode_output(size, &buffers.sorted))
    }

    /// Like [`render`](Self::render), but rejected settings degrade to an
    /// unmodified copy of the source instead of an error.
    pub fn render_or_passthrough(
        &mut self,
        source: &RgbaImage,
        clock: &FrameClock,
    ) -> SortResult<RgbaImage> {
        pass_through_rejected(self.render(source, clock), source)
    }
}
