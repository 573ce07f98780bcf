use image::{Rgba, RgbaImage};
use spansort::{
    DebugFlags, FrameClock, GpuPixelSorter, PixelSorter, ScanDirection, SortError, SortKey,
    SortOrder, SortSettings,
};

fn gpu_sorter(width: u32, height: u32, settings: SortSettings) -> Option<GpuPixelSorter> {
    match pollster::block_on(GpuPixelSorter::new(width, height, settings)) {
        Ok(sorter) => Some(sorter),
        Err(SortError::Gpu(reason)) => {
            eprintln!("Skipping test: {reason}");
            None
        }
        Err(other) => panic!("GPU sorter failed to initialize: {other:?}"),
    }
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x * 29 + y * 53) % 256) as u8;
        Rgba([v, v.wrapping_mul(3), 255 - v, 255])
    })
}

#[test]
fn gpu_sort_matches_the_requested_size_and_passes_unselected_pixels() {
    let settings = SortSettings {
        low_threshold: 0.3,
        high_threshold: 0.7,
        max_span_length: 16,
        ..SortSettings::default()
    };
    let Some(mut sorter) = gpu_sorter(37, 21, settings.clone()) else {
        return;
    };
    let source = gradient(37, 21);
    let out = sorter
        .render(&source, &FrameClock::default())
        .expect("GPU render should succeed");
    assert_eq!(out.dimensions(), (37, 21));

    // The CPU mask decides which pixels must come through unchanged.
    let mut reference = PixelSorter::new(37, 21, settings).expect("cpu sorter");
    reference
        .render(&source, &FrameClock::default())
        .expect("cpu render");
    for ((src, dst), mask) in source.pixels().zip(out.pixels()).zip(reference.mask()) {
        if *mask <= 0.5 {
            assert_eq!(src, dst);
        }
    }
}

#[test]
fn gpu_sorts_a_single_gray_span() {
    let settings = SortSettings {
        low_threshold: 0.0,
        high_threshold: 1.0,
        ..SortSettings::default()
    };
    let Some(mut sorter) = gpu_sorter(8, 1, settings) else {
        return;
    };
    let values = [204u8, 26, 230, 77, 179, 51, 153, 102];
    let source = RgbaImage::from_fn(8, 1, |x, _| {
        let v = values[x as usize];
        Rgba([v, v, v, 255])
    });
    let out = sorter
        .render(&source, &FrameClock::default())
        .expect("GPU render should succeed");
    let sorted: Vec<u8> = out.pixels().map(|px| px.0[0]).collect();
    assert_eq!(sorted, vec![26, 51, 77, 102, 153, 179, 204, 230]);
}

fn gray_row(values: &[u8]) -> RgbaImage {
    RgbaImage::from_fn(values.len() as u32, 1, |x, _| {
        let v = values[x as usize];
        Rgba([v, v, v, 255])
    })
}

#[test]
fn gpu_treats_a_huge_span_cap_as_no_cap() {
    let settings = SortSettings {
        low_threshold: 0.0,
        high_threshold: 1.0,
        max_span_length: 3_000_000_000,
        ..SortSettings::default()
    };
    let Some(mut sorter) = gpu_sorter(8, 1, settings) else {
        return;
    };
    let out = sorter
        .render(
            &gray_row(&[204, 26, 230, 77, 179, 51, 153, 102]),
            &FrameClock::default(),
        )
        .expect("GPU render should succeed");
    let sorted: Vec<u8> = out.pixels().map(|px| px.0[0]).collect();
    assert_eq!(sorted, vec![26, 51, 77, 102, 153, 179, 204, 230]);
}

#[test]
fn gpu_passes_frames_through_while_settings_are_rejected() {
    let Some(mut sorter) = gpu_sorter(8, 1, SortSettings::default()) else {
        return;
    };
    let source = gray_row(&[204, 26, 230, 77, 179, 51, 153, 102]);
    let inverted = SortSettings {
        low_threshold: 0.45,
        high_threshold: 0.4,
        ..SortSettings::default()
    };
    let error = sorter.set_settings(inverted).expect_err("inverted band");
    assert!(error.is_configuration());

    let error = sorter
        .render(&source, &FrameClock::default())
        .expect_err("render with rejected settings");
    assert!(error.is_configuration());
    let out = sorter
        .render_or_passthrough(&source, &FrameClock::default())
        .expect("pass-through");
    assert_eq!(out, source);
}

#[test]
fn gpu_frames_beyond_the_device_limits_fail_cleanly() {
    let Some(mut sorter) = gpu_sorter(8, 8, SortSettings::default()) else {
        return;
    };
    match sorter.resize(4100, 2100) {
        Err(SortError::Gpu(reason)) => {
            assert!(reason.contains("4100x2100"), "{reason}");
            assert_eq!(sorter.size().width, 8);
            let out = sorter
                .render(&gradient(8, 8), &FrameClock::default())
                .expect("old buffers still render");
            assert_eq!(out.dimensions(), (8, 8));
        }
        Err(other) => panic!("unexpected resize error: {other:?}"),
        Ok(()) => assert_eq!(
            (sorter.size().width, sorter.size().height),
            (4100, 2100)
        ),
    }
}

/// Colors whose lightness, saturation, hue and intensity are all pairwise
/// distinct and clear of the 0.25/0.75 band edges, so float noise between
/// backends cannot reorder them.
const PALETTE: [[u8; 3]; 9] = [
    [230, 40, 40],
    [40, 180, 60],
    [60, 80, 220],
    [250, 220, 60],
    [120, 40, 160],
    [30, 200, 200],
    [200, 110, 90],
    [20, 30, 70],
    [235, 225, 250],
];

fn palette_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let pick = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)) >> 7;
        let [r, g, b] = PALETTE[pick as usize % PALETTE.len()];
        Rgba([r, g, b, 255])
    })
}

fn debug_views() -> [(&'static str, DebugFlags); 5] {
    let off = DebugFlags::default();
    [
        ("composite", off),
        (
            "suppress_composite",
            DebugFlags {
                suppress_composite: true,
                ..off
            },
        ),
        (
            "visualize_spans",
            DebugFlags {
                visualize_spans: true,
                ..off
            },
        ),
        (
            "show_spans",
            DebugFlags {
                show_spans: true,
                ..off
            },
        ),
        (
            "show_mask",
            DebugFlags {
                show_mask: true,
                ..off
            },
        ),
    ]
}

#[test]
fn gpu_matches_the_cpu_across_keys_directions_orders_and_views() {
    let (width, height) = (24, 16);
    let Some(mut gpu) = gpu_sorter(width, height, SortSettings::default()) else {
        return;
    };
    let source = palette_frame(width, height);
    let clock = FrameClock::default();

    for key in [
        SortKey::Lightness,
        SortKey::Saturation,
        SortKey::Hue,
        SortKey::Intensity,
    ] {
        for direction in [ScanDirection::Horizontal, ScanDirection::Vertical] {
            for order in [SortOrder::Ascending, SortOrder::Descending] {
                for (view, debug) in debug_views() {
                    let settings = SortSettings {
                        low_threshold: 0.25,
                        high_threshold: 0.75,
                        sort_key: key,
                        scan_direction: direction,
                        sort_order: order,
                        max_span_length: 7,
                        span_length_jitter: 2,
                        mask_threshold_jitter: 0,
                        debug,
                        ..SortSettings::default()
                    };
                    let label = format!("{key:?} {direction:?} {order:?} {view}");

                    gpu.set_settings(settings.clone()).expect("valid settings");
                    let gpu_out = gpu.render(&source, &clock).expect("GPU render");
                    let mut cpu = PixelSorter::new(width, height, settings).expect("cpu sorter");
                    let cpu_out = cpu.render(&source, &clock).expect("CPU render");

                    let worst = cpu_out
                        .as_raw()
                        .iter()
                        .zip(gpu_out.as_raw())
                        .map(|(c, g)| c.abs_diff(*g))
                        .max()
                        .unwrap_or(0);
                    assert!(worst <= 1, "{label}: channels differ by {worst}");
                }
            }
        }
    }
}

#[test]
fn gpu_rejects_mismatched_frames_and_recovers_after_resize() {
    let Some(mut sorter) = gpu_sorter(16, 16, SortSettings::default()) else {
        return;
    };
    let error = sorter
        .render(&gradient(8, 8), &FrameClock::default())
        .expect_err("size mismatch");
    assert!(matches!(error, SortError::ResourceMismatch { .. }));

    sorter.resize(8, 8).expect("resize");
    let out = sorter
        .render(&gradient(8, 8), &FrameClock::default())
        .expect("render after resize");
    assert_eq!(out.dimensions(), (8, 8));
}
