//! Line primitives (§4.3): a horizontal-line fast path, a general DDA walk along
//! the major axis, and an edge-capable path when the back-end wants AA coverage.

use crate::backend::Rect;
use crate::edge_buffer::EdgeBuffer;
use crate::ownership::ScanlineOwnership;
use crate::rasterizer::edge::draw_edge;
use crate::vertex::V;

/// Draws a line's interior scanlines. Returns the `dscan` gradient to pass to
/// `EdgeBuffer::flush`, or `None` if nothing was drawn (degenerate or fully
/// outside the owned rows) and no flush should happen for the interior pass.
pub fn draw_line(v0: V, v1: V, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) -> Option<V> {
    let dv = v1 - v0;
    let dx = dv.p.x;
    let dy = dv.p.y;

    if dx.abs() <= dy.abs() {
        draw_dda(v0, v1, dv, Axis::Y, scissor, ownership, edge_buf)
    } else if dy == 0.0 {
        draw_horizontal(v0, v1, dv, scissor, ownership, edge_buf)
    } else {
        draw_dda(v0, v1, dv, Axis::X, scissor, ownership, edge_buf)
    }
}

/// Draws a line's two AA edge rails (§4.3.5), one per side of its ~1px thickness.
pub fn draw_line_edges(v0: V, v1: V, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) {
    let dv = v1 - v0;
    let orientation = dv.p.x.abs() < dv.p.y.abs();
    draw_edge(v0, v1, dv, orientation, false, scissor, ownership, edge_buf);
    draw_edge(v0, v1, dv, orientation, true, scissor, ownership, edge_buf);
}

fn draw_horizontal(v0: V, v1: V, dv: V, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) -> Option<V> {
    let (start, end) = if v0.p.x <= v1.p.x { (v0, v1) } else { (v1, v0) };
    let y = start.p.y as i32;

    if !(scissor.top <= y && y < scissor.bottom && ownership.owns_row(y)) {
        return None;
    }

    let l = start.p.x.ceil().max(scissor.left as f32) as i32;
    let r = end.p.x.ceil().min(scissor.right as f32) as i32;
    let pixels = r - l;
    if pixels <= 0 {
        return None;
    }

    let dscan = dv * (1.0 / dv.p.x);
    let scan = start + dscan * (l as f32 - start.p.x);
    edge_buf.add_scanline(pixels, l, y, scan);
    Some(dscan)
}

enum Axis {
    X,
    Y,
}

fn draw_dda(v0: V, _v1: V, dv: V, axis: Axis, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) -> Option<V> {
    let steps = match axis {
        Axis::X => dv.p.x.abs() as i32,
        Axis::Y => dv.p.y.abs() as i32,
    };
    if steps == 0 {
        return None;
    }

    let divisor = match axis {
        Axis::X => dv.p.x,
        Axis::Y => dv.p.y,
    };
    let dedge = dv * (1.0 / divisor);
    let mut edge = v0;
    let mut emitted_any = false;

    for _ in 0..=steps {
        let x = edge.p.x as i32;
        let y = edge.p.y as i32;

        if scissor.left <= x && x < scissor.right && scissor.top <= y && y < scissor.bottom && ownership.owns_row(y) {
            edge_buf.add_scanline(1, x, y, edge);
            emitted_any = true;
        }

        edge = edge + dedge;
    }

    emitted_any.then_some(dedge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn owner() -> ScanlineOwnership {
        ScanlineOwnership::new(0, 1)
    }

    fn full_scissor() -> Rect {
        Rect { left: 0, top: 0, right: 1000, bottom: 1000 }
    }

    #[test]
    fn horizontal_line_is_a_single_scanline() {
        let v0 = V::new(Vec4::new(0.0, 5.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let v1 = V::new(Vec4::new(10.0, 5.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let mut buf = EdgeBuffer::new();
        let dscan = draw_line(v0, v1, full_scissor(), &owner(), &mut buf);
        assert!(dscan.is_some());
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.pixels(), 0); // pixels is only tallied on flush
    }

    #[test]
    fn steep_line_steps_along_y() {
        let v0 = V::new(Vec4::new(0.0, 0.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let v1 = V::new(Vec4::new(1.0, 10.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let mut buf = EdgeBuffer::new();
        draw_line(v0, v1, full_scissor(), &owner(), &mut buf);
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn degenerate_point_line_emits_nothing() {
        let v0 = V::new(Vec4::new(5.0, 5.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let mut buf = EdgeBuffer::new();
        let dscan = draw_line(v0, v0, full_scissor(), &owner(), &mut buf);
        assert!(dscan.is_none());
        assert!(buf.is_empty());
    }
}
