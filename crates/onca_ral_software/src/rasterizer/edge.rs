//! Anti-aliased edge-fragment marching (§4.3.5).
//!
//! Each triangle/line edge is walked one sample per row (if it's closer to
//! vertical) or one sample per column (if closer to horizontal), emitting a
//! single-pixel fragment per step with a 16.16 coverage fraction of how far the
//! true edge falls from the sampled integer coordinate.

use crate::backend::Rect;
use crate::edge_buffer::EdgeBuffer;
use crate::fixed::{f32_to_16_16, fixed_16_16_frac, fixed_16_16_int};
use crate::ownership::ScanlineOwnership;
use crate::vertex::V;

/// `orientation`: true when the edge is closer to vertical (`|dx| < |dy|`), so it's
/// marched one row at a time. `side`: true for the top/left side of the shape
/// (coverage counts from the edge up to the sample), false for bottom/right.
#[allow(clippy::too_many_arguments)]
pub fn draw_edge(
    v0: V,
    v1: V,
    dv: V,
    orientation: bool,
    side: bool,
    scissor: Rect,
    ownership: &ScanlineOwnership,
    edge_buf: &mut EdgeBuffer,
) {
    if orientation {
        draw_edge_vertical(v0, v1, dv, side, scissor, ownership, edge_buf);
    } else {
        draw_edge_horizontal(v0, v1, dv, side, scissor, ownership, edge_buf);
    }
}

fn draw_edge_vertical(
    v0: V,
    v1: V,
    dv: V,
    side: bool,
    scissor: Rect,
    ownership: &ScanlineOwnership,
    edge_buf: &mut EdgeBuffer,
) {
    if dv.p.y == 0.0 {
        return;
    }

    let t = v0.p.y.ceil();
    let b = v1.p.y.ceil();
    let (t, b) = (t.min(b), t.max(b));

    let (top, bottom, edge) = if dv.p.y >= 0.0 {
        let top = t.max(scissor.top as f32) as i32;
        let bottom = b.min(scissor.bottom as f32) as i32;
        let dedge = dv * (1.0 / dv.p.y);
        let edge = v0 + dedge * (top as f32 - v0.p.y);
        (top, bottom, (edge, dedge))
    } else {
        let top = b.max(scissor.top as f32) as i32;
        let bottom = t.min(scissor.bottom as f32) as i32;
        let dedge = dv * (1.0 / dv.p.y);
        let edge = v1 + dedge * (top as f32 - v1.p.y);
        (top, bottom, (edge, dedge))
    };

    if top >= bottom {
        return;
    }

    let (mut scan, dedge) = edge;
    let mut row = top;

    while row < bottom {
        let x_fixed = f32_to_16_16(scan.p.x);
        let xi = if side { fixed_16_16_int(x_fixed) } else { fixed_16_16_int(x_fixed) + 1 };
        let frac = fixed_16_16_frac(x_fixed);
        let coverage = if side { (0x10000u32.wrapping_sub(frac)) & 0xffff } else { frac };

        if scissor.left <= xi && xi < scissor.right && ownership.owns_row(row) {
            edge_buf.add_edge(xi, row, scan, coverage as u16);
        }

        row += 1;
        scan = scan + dedge;
    }
}

fn draw_edge_horizontal(
    v0: V,
    v1: V,
    dv: V,
    side: bool,
    scissor: Rect,
    ownership: &ScanlineOwnership,
    edge_buf: &mut EdgeBuffer,
) {
    if dv.p.x == 0.0 {
        return;
    }

    let l = v0.p.x.ceil();
    let r = v1.p.x.ceil();
    let (l, r) = (l.min(r), l.max(r));

    let (left, right, edge) = if dv.p.x >= 0.0 {
        let left = l.max(scissor.left as f32) as i32;
        let right = r.min(scissor.right as f32) as i32;
        let dedge = dv * (1.0 / dv.p.x);
        let edge = v0 + dedge * (left as f32 - v0.p.x);
        (left, right, (edge, dedge))
    } else {
        let left = r.max(scissor.left as f32) as i32;
        let right = l.min(scissor.right as f32) as i32;
        let dedge = dv * (1.0 / dv.p.x);
        let edge = v1 + dedge * (left as f32 - v1.p.x);
        (left, right, (edge, dedge))
    };

    if left >= right {
        return;
    }

    let (mut scan, dedge) = edge;
    let mut col = left;

    while col < right {
        let y_fixed = f32_to_16_16(scan.p.y);
        let yi = if side { fixed_16_16_int(y_fixed) } else { fixed_16_16_int(y_fixed) + 1 };
        let frac = fixed_16_16_frac(y_fixed);
        let coverage = if side { (0x10000u32.wrapping_sub(frac)) & 0xffff } else { frac };

        if scissor.top <= yi && yi < scissor.bottom && ownership.owns_row(yi) {
            edge_buf.add_edge(col, yi, scan, coverage as u16);
        }

        col += 1;
        scan = scan + dedge;
    }
}
