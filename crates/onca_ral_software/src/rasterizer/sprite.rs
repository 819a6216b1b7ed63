//! Sprite (axis-aligned quad) fill (§4.3): a solid untextured sprite bands
//! straight to `DrawRect` one band per worker; a textured one walks per-row
//! scanlines with the texture gradient held constant within a row.

use crate::backend::{DrawScanlineBackend, Rect};
use crate::edge_buffer::EdgeBuffer;
use crate::fixed::ceil_to_pixel;
use crate::ownership::{ScanlineOwnership, BAND_HEIGHT};
use crate::vertex::V;

/// Normalizes the two sprite corners to (top-left, bottom-right) order.
fn normalize(v0: V, v1: V) -> (V, V) {
    let min_p = v0.p.min(v1.p);
    let max_p = v0.p.max(v1.p);
    let min_t = if v0.p.x <= v1.p.x { v0.t } else { v1.t };
    let max_t = if v0.p.x <= v1.p.x { v1.t } else { v0.t };

    let mut lo = v0;
    lo.p = min_p;
    lo.t = min_t;
    let mut hi = v0;
    hi.p = max_p;
    hi.t = max_t;
    lo.c = v0.c;
    (lo, hi)
}

/// A solid, untextured sprite: emitted directly as one or more `DrawRect` calls,
/// banded by row ownership when there's more than one worker.
pub fn draw_solid_rect(v0: V, v1: V, scissor: Rect, ownership: &ScanlineOwnership, backend: &dyn DrawScanlineBackend) {
    let (lo, hi) = normalize(v0, v1);
    let rect = Rect {
        left: ceil_to_pixel(lo.p.x),
        top: ceil_to_pixel(lo.p.y),
        right: ceil_to_pixel(hi.p.x),
        bottom: ceil_to_pixel(hi.p.y),
    }
    .intersect(&scissor);

    if rect.is_empty() {
        return;
    }

    if ownership.threads() == 1 {
        backend.draw_rect(rect, lo);
        return;
    }

    let mut top = ownership.next_owned_row(rect.top);
    while top < rect.bottom {
        let band_end = ((top + BAND_HEIGHT) / BAND_HEIGHT) * BAND_HEIGHT;
        let bottom = band_end.min(rect.bottom);
        backend.draw_rect(Rect { top, bottom, ..rect }, lo);
        top = bottom + (ownership.threads() as i32 - 1) * BAND_HEIGHT;
    }
}

/// A textured (or alpha-blended) sprite: walked one interior scanline per row,
/// texture coordinates held constant across a row and advanced only per-row.
pub fn draw_textured_sprite(v0: V, v1: V, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) -> Option<V> {
    let (lo, hi) = normalize(v0, v1);
    let rect = Rect {
        left: ceil_to_pixel(lo.p.x),
        top: ceil_to_pixel(lo.p.y),
        right: ceil_to_pixel(hi.p.x),
        bottom: ceil_to_pixel(hi.p.y),
    }
    .intersect(&scissor);

    if rect.is_empty() {
        return None;
    }

    // Axis-aligned sprite: the t/s gradient across x and down y are both just
    // (delta texcoord / delta screen extent), so the same per-unit step serves
    // as both dscan (within a row) and dedge (between rows).
    let dt = (hi.t - lo.t) * (1.0 / (hi.p.x - lo.p.x).max(f32::EPSILON));
    let dedge_t = dt;
    let dscan = V::ZERO;

    let mut scan = lo;
    scan.t = lo.t + dt * (rect.left as f32 - lo.p.x);
    scan.p.x = rect.left as f32;

    let mut row = ownership.next_owned_row(rect.top);
    let width = rect.right - rect.left;
    let mut emitted = false;

    while row < rect.bottom {
        scan.p.y = row as f32;
        edge_buf.add_scanline(width, rect.left, row, scan);
        emitted = true;

        row += 1;
        if !ownership.owns_row(row) {
            row = ownership.next_owned_row(row);
        }
        scan.t += dedge_t;
    }

    emitted.then_some(dscan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use std::sync::Mutex;

    fn p(x: f32, y: f32) -> V {
        V::new(Vec4::new(x, y, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO)
    }

    fn owner() -> ScanlineOwnership {
        ScanlineOwnership::new(0, 1)
    }

    fn full_scissor() -> Rect {
        Rect { left: 0, top: 0, right: 1000, bottom: 1000 }
    }

    #[derive(Default)]
    struct RectRecorder {
        rects: Mutex<Vec<Rect>>,
    }

    impl DrawScanlineBackend for RectRecorder {
        fn begin_draw(&self, _param: &crate::selector::ScanlineGlobalData) {}
        fn setup_prim(&self, _vertices: &[V], _dscan: V) {}
        fn draw_scanline(&self, _run: crate::backend::ScanlineRun) {}
        fn draw_edge(&self, _fragment: crate::backend::EdgeFragment) {}
        fn draw_rect(&self, rect: Rect, _scan: V) {
            self.rects.lock().unwrap().push(rect);
        }
        fn end_draw(&self, _frame: u64, _ticks: u64, _pixels: u64) {}
        fn has_edge(&self) -> bool {
            false
        }
    }

    #[test]
    fn solid_rect_single_worker_is_one_draw_rect_call() {
        let backend = RectRecorder::default();
        draw_solid_rect(p(0.0, 0.0), p(10.0, 10.0), full_scissor(), &owner(), &backend);
        let rects = backend.rects.lock().unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect { left: 0, top: 0, right: 10, bottom: 10 });
    }

    #[test]
    fn textured_sprite_emits_one_scanline_per_row() {
        let mut buf = EdgeBuffer::new();
        let dscan = draw_textured_sprite(p(0.0, 0.0), p(10.0, 5.0), full_scissor(), &owner(), &mut buf);
        assert!(dscan.is_some());
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn empty_sprite_is_dropped() {
        let mut buf = EdgeBuffer::new();
        assert!(draw_textured_sprite(p(5.0, 5.0), p(5.0, 5.0), full_scissor(), &owner(), &mut buf).is_none());
        assert!(buf.is_empty());
    }
}
