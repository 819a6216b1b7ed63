//! Point primitives: a single covered pixel, no interpolation needed (§4.3).

use crate::backend::Rect;
use crate::edge_buffer::EdgeBuffer;
use crate::ownership::ScanlineOwnership;
use crate::vertex::V;

pub fn draw_point(v: V, scissor_test: bool, scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) {
    let x = v.p.x as i32;
    let y = v.p.y as i32;

    if scissor_test && !(scissor.left <= x && x < scissor.right && scissor.top <= y && y < scissor.bottom) {
        return;
    }

    if ownership.owns_row(y) {
        edge_buf.add_scanline(1, x, y, v);
    }
}
