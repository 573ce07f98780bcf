//! wgpu backend: the same pass graph as [`crate::PixelSorter`], one compute
//! kernel per pass.
//!
//! All kernels share a single bind group layout over the frame's storage
//! buffers, so a resize only rebuilds the buffers and the bind group. The
//! kernels live in `shaders/wgsl/pixelsort.wgsl`.

use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::animation::AnimationState;
use crate::error::{SortError, SortResult};
use crate::frame::{FrameClock, FrameSize, SpanCell};
use crate::pipeline::{check_source, pass_through_rejected, SortControls};
use crate::settings::{OutputView, SortSettings};

const SHADER_SOURCE: &str = include_str!("../shaders/wgsl/pixelsort.wgsl");

const PIXEL_WORKGROUP: u32 = 8;
const LINE_WORKGROUP: u32 = 64;

/// Uniform block shared by every kernel. Field order matches `SortUniforms`
/// in the WGSL source.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SortUniforms {
    pub width: u32,
    pub height: u32,
    pub direction: u32,
    pub sort_key: u32,
    pub sort_order: u32,
    pub view: u32,
    pub max_span_length: u32,
    pub span_jitter: u32,
    pub low: f32,
    pub high: f32,
    pub mask_jitter: i32,
    pub seed: u32,
}

impl SortUniforms {
    fn for_frame(size: FrameSize, controls: &SortControls, clock: &FrameClock) -> Self {
        let settings = controls.settings();
        let (low, high) = controls.effective_thresholds();
        Self {
            width: size.width,
            height: size.height,
            direction: settings.scan_direction.code(),
            sort_key: settings.sort_key.code(),
            sort_order: settings.sort_order.code(),
            view: settings.output_view().code(),
            // Kernels add the jitter in i32.
            max_span_length: settings.max_span_length.min(i32::MAX as u32),
            span_jitter: settings.span_length_jitter,
            low,
            high,
            mask_jitter: settings.mask_threshold_jitter,
            seed: controls.seed(clock),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    CreateMask,
    ClearSpans,
    IdentifySpans,
    ClearSorted,
    VisualizeSpans,
    MaskView,
    SpanLengthView,
    RgbToHsl,
    Rank,
    Gather,
    HslToRgb,
    Composite,
    EncodeOutput,
}

impl Kernel {
    const ALL: [Kernel; 13] = [
        Kernel::CreateMask,
        Kernel::ClearSpans,
        Kernel::IdentifySpans,
        Kernel::ClearSorted,
        Kernel::VisualizeSpans,
        Kernel::MaskView,
        Kernel::SpanLengthView,
        Kernel::RgbToHsl,
        Kernel::Rank,
        Kernel::Gather,
        Kernel::HslToRgb,
        Kernel::Composite,
        Kernel::EncodeOutput,
    ];

    fn entry_point(self) -> &'static str {
        match self {
            Kernel::CreateMask => "create_mask",
            Kernel::ClearSpans => "clear_spans",
            Kernel::IdentifySpans => "identify_spans",
            Kernel::ClearSorted => "clear_sorted",
            Kernel::VisualizeSpans => "visualize_spans",
            Kernel::MaskView => "mask_view",
            Kernel::SpanLengthView => "span_length_view",
            Kernel::RgbToHsl => "rgb_to_hsl_pass",
            Kernel::Rank => "rank_spans",
            Kernel::Gather => "gather_sorted",
            Kernel::HslToRgb => "hsl_to_rgb_pass",
            Kernel::Composite => "composite",
            Kernel::EncodeOutput => "encode_output",
        }
    }

    fn workgroups(self, size: FrameSize, settings: &SortSettings) -> (u32, u32) {
        match self {
            Kernel::IdentifySpans => (
                (size.line_count(settings.scan_direction) as u32).div_ceil(LINE_WORKGROUP),
                1,
            ),
            _ => (
                size.width.div_ceil(PIXEL_WORKGROUP),
                size.height.div_ceil(PIXEL_WORKGROUP),
            ),
        }
    }
}

/// The kernels a frame runs, in dispatch order.
fn schedule(view: OutputView) -> Vec<Kernel> {
    let mut kernels = vec![
        Kernel::CreateMask,
        Kernel::ClearSpans,
        Kernel::IdentifySpans,
        Kernel::ClearSorted,
    ];
    match view {
        OutputView::Mask => kernels.push(Kernel::MaskView),
        OutputView::Spans => kernels.push(Kernel::SpanLengthView),
        OutputView::VisualizeSpans => kernels.push(Kernel::VisualizeSpans),
        OutputView::Composite | OutputView::RawSorted => {}
    }
    if view.needs_sort() {
        kernels.extend([
            Kernel::RgbToHsl,
            Kernel::Rank,
            Kernel::Gather,
            Kernel::HslToRgb,
        ]);
    }
    if view == OutputView::Composite {
        kernels.push(Kernel::Composite);
    }
    kernels.push(Kernel::EncodeOutput);
    kernels
}

/// Storage bindings in binding order, with their element size in bytes.
const STORAGE_BINDINGS: [(&str, u64, bool); 7] = [
    ("spansort-color", 4, true),
    ("spansort-mask", 4, false),
    ("spansort-spans", std::mem::size_of::<SpanCell>() as u64, false),
    ("spansort-hsl", 16, false),
    ("spansort-ranks", 4, false),
    ("spansort-sorted", 16, false),
    ("spansort-output", 4, false),
];

/// Widest element of any storage binding, in bytes.
const WIDEST_ELEMENT: u64 = 16;

/// Reject a frame whose buffers the device cannot hold.
fn check_buffer_limits(size: FrameSize, limits: &wgpu::Limits) -> SortResult<()> {
    let bytes = size.pixel_count().max(1) as u64 * WIDEST_ELEMENT;
    let allowed = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    if bytes > allowed {
        return Err(SortError::Gpu(format!(
            "frame {}x{} needs {bytes}-byte storage buffers, device allows {allowed}",
            size.width, size.height
        )));
    }
    Ok(())
}

struct FrameResources {
    size: FrameSize,
    storage: Vec<wgpu::Buffer>,
    readback: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl FrameResources {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniforms: &wgpu::Buffer,
        size: FrameSize,
    ) -> SortResult<Self> {
        check_buffer_limits(size, &device.limits())?;
        // Zero-sized bindings are invalid; an empty frame still gets one cell.
        let cells = size.pixel_count().max(1) as u64;
        let storage: Vec<wgpu::Buffer> = STORAGE_BINDINGS
            .iter()
            .map(|&(label, element_size, _)| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: cells * element_size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                })
            })
            .collect();
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("spansort-readback"),
            size: cells * 4,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }];
        for (offset, buffer) in storage.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: offset as u32 + 1,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("spansort-bind-group"),
            layout,
            entries: &entries,
        });

        info!(
            width = size.width,
            height = size.height,
            "allocated GPU sort buffers"
        );
        Ok(Self {
            size,
            storage,
            readback,
            bind_group,
        })
    }

    fn color(&self) -> &wgpu::Buffer {
        &self.storage[0]
    }

    fn output(&self) -> &wgpu::Buffer {
        &self.storage[6]
    }
}

pub struct GpuPixelSorter {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    pipelines: Vec<(Kernel, wgpu::ComputePipeline)>,
    uniforms: wgpu::Buffer,
    resources: FrameResources,
    controls: SortControls,
}

impl GpuPixelSorter {
    pub async fn new(width: u32, height: u32, settings: SortSettings) -> SortResult<Self> {
        let controls = SortControls::new(settings)?;

        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| SortError::Gpu("no suitable GPU adapter found".into()))?;

        // Large frames need the adapter's buffer limits, not the defaults.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("spansort-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                },
                None,
            )
            .await
            .map_err(|error| SortError::Gpu(format!("failed to request wgpu device: {error}")))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("spansort-kernels"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let mut layout_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for (offset, (_, _, read_only)) in STORAGE_BINDINGS.iter().enumerate() {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: offset as u32 + 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: *read_only,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("spansort-bind-group-layout"),
            entries: &layout_entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("spansort-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipelines = Kernel::ALL
            .iter()
            .map(|kernel| {
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.entry_point()),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: kernel.entry_point(),
                    compilation_options: Default::default(),
                });
                (*kernel, pipeline)
            })
            .collect();

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("spansort-uniforms"),
            contents: bytemuck::bytes_of(&SortUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let resources = FrameResources::new(
            &device,
            &layout,
            &uniforms,
            FrameSize::new(width, height),
        )?;
        info!(adapter = ?adapter.get_info().name, "GPU pixel sorter ready");

        Ok(Self {
            device,
            queue,
            layout,
            pipelines,
            uniforms,
            resources,
            controls,
        })
    }

    pub fn size(&self) -> FrameSize {
        self.resources.size
    }

    pub fn settings(&self) -> &SortSettings {
        self.controls.settings()
    }

    pub fn set_settings(&mut self, settings: SortSettings) -> SortResult<()> {
        self.controls.set_settings(settings)
    }

    /// Reallocate the frame buffers. A size the device cannot hold is an
    /// error and leaves the current buffers in place.
    pub fn resize(&mut self, width: u32, height: u32) -> SortResult<()> {
        let size = FrameSize::new(width, height);
        if size != self.resources.size {
            self.resources =
                FrameResources::new(&self.device, &self.layout, &self.uniforms, size)?;
        }
        Ok(())
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

    pub fn render(&mut self, source: &RgbaImage, clock: &FrameClock) -> SortResult<RgbaImage> {
        let size = self.resources.size;
        check_source(size, source)?;
        self.controls.settings().validate()?;
        if size.is_empty() {
            return Ok(RgbaImage::new(size.width, size.height));
        }

        let uniforms = SortUniforms::for_frame(size, &self.controls, clock);
        self.queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
        self.queue
            .write_buffer(self.resources.color(), 0, source.as_raw());

        let settings = self.controls.settings();
        let view = settings.output_view();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spansort-frame"),
            });
        for kernel in schedule(view) {
            let pipeline = self
                .pipelines
                .iter()
                .find_map(|(candidate, pipeline)| (*candidate == kernel).then_some(pipeline))
                .ok_or_else(|| {
                    SortError::Gpu(format!("missing pipeline for {}", kernel.entry_point()))
                })?;
            let (groups_x, groups_y) = kernel.workgroups(size, settings);
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.resources.bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        let output_bytes = size.pixel_count() as u64 * 4;
        encoder.copy_buffer_to_buffer(
            self.resources.output(),
            0,
            &self.resources.readback,
            0,
            output_bytes,
        );
        self.queue.submit(Some(encoder.finish()));

        let pixels = self.read_output(output_bytes)?;
        debug!(
            frame = clock.frame_index,
            low = uniforms.low,
            high = uniforms.high,
            seed = uniforms.seed,
            view = ?view,
            "GPU pixel sort frame dispatched"
        );
        RgbaImage::from_raw(size.width, size.height, pixels)
            .ok_or_else(|| SortError::Gpu("readback size does not match the frame".into()))
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

    fn read_output(&self, bytes: u64) -> SortResult<Vec<u8>> {
        let buffer_slice = self.resources.readback.slice(..bytes);
        let (sender, receiver) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| SortError::Gpu("failed receiving GPU map callback".into()))?
            .map_err(|error| SortError::Gpu(format!("GPU buffer mapping failed: {error}")))?;

        let pixels = buffer_slice.get_mapped_range().to_vec();
        self.resources.readback.unmap();
        Ok(pixels)
    }
}
