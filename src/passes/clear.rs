use crate::dispatch::update_each;
use crate::frame::{SpanCell, CLEARED};

/// Reset the span buffer. The span scan only writes selected pixels, so
/// anything left over from the previous frame would survive otherwise.
pub fn clear_spans(spans: &mut [SpanCell]) {
    update_each(spans, |_, cell| *cell = SpanCell::NONE);
}

pub fn clear_sorted(sorted: &mut [[f32; 4]]) {
    update_each(sorted, |_, px| *px = [CLEARED; 4]);
}
