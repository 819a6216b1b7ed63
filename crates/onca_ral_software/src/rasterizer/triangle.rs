//! Triangle fill (§4.3): sort vertices by y, fill the top and bottom sections
//! separately (each bounded by a shared "long" edge and one "short" edge), using
//! a single affine gradient for every interpolated attribute across the whole
//! triangle. Degenerate triangles (zero area, or all three vertices sharing a y)
//! are silently dropped.

use crate::backend::Rect;
use crate::edge_buffer::EdgeBuffer;
use crate::fixed::ceil_to_pixel;
use crate::ownership::ScanlineOwnership;
use crate::rasterizer::edge::draw_edge;
use crate::vertex::V;

struct Gradients {
    /// d(attribute)/dx, to advance across one scanline.
    dscan: V,
    /// d(attribute)/dy, to advance to the next row.
    dedge: V,
}

fn gradients(v0: V, v1: V, v2: V) -> Option<(Gradients, f32)> {
    let e1 = v1.p - v0.p;
    let e2 = v2.p - v0.p;
    let area = e1.x * e2.y - e1.y * e2.x;
    if area == 0.0 {
        return None;
    }

    let d1 = v1 - v0;
    let d2 = v2 - v0;
    let inv_area = 1.0 / area;

    let dscan = (d1 * e2.y - d2 * e1.y) * inv_area;
    let dedge = (d2 * e1.x - d1 * e2.x) * inv_area;

    Some((Gradients { dscan, dedge }, area))
}

fn edge_x_at_y(top: V, bottom: V, y: f32) -> f32 {
    let t = (y - top.p.y) / (bottom.p.y - top.p.y);
    top.p.x + (bottom.p.x - top.p.x) * t
}

/// Fills one of the two y-ranges a triangle splits into (above/below its middle
/// vertex), using `left`/`right` as the two edges bounding that range.
#[allow(clippy::too_many_arguments)]
fn fill_section(
    top_y: f32,
    bottom_y: f32,
    left_edge: (V, V),
    right_edge: (V, V),
    v0: V,
    grad: &Gradients,
    scissor: Rect,
    ownership: &ScanlineOwnership,
    edge_buf: &mut EdgeBuffer,
) {
    let top = ceil_to_pixel(top_y.max(scissor.top as f32));
    let bottom = ceil_to_pixel(bottom_y.min(scissor.bottom as f32));
    if top >= bottom {
        return;
    }

    let mut row = ownership.next_owned_row(top);

    while row < bottom {
        let y = row as f32;
        let x0 = edge_x_at_y(left_edge.0, left_edge.1, y);
        let x1 = edge_x_at_y(right_edge.0, right_edge.1, y);
        let (lf, rf) = (x0.min(x1), x0.max(x1));

        let left = ceil_to_pixel(lf.max(scissor.left as f32));
        let right = ceil_to_pixel(rf.min(scissor.right as f32));
        let pixels = right - left;

        if pixels > 0 {
            let dy = y - v0.p.y;
            let dx = left as f32 - v0.p.x;
            let scan = v0 + grad.dedge * dy + grad.dscan * dx;
            edge_buf.add_scanline(pixels, left, row, scan);
        }

        row += 1;
        if !ownership.owns_row(row) {
            row = ownership.next_owned_row(row);
        }
    }
}

/// Fills the triangle's interior. Returns the `dscan` gradient (for
/// `EdgeBuffer::flush`) together with the data needed to emit its AA edges, or
/// `None` if the triangle is degenerate.
pub fn draw_triangle(
    vertices: [V; 3],
    scissor: Rect,
    ownership: &ScanlineOwnership,
    edge_buf: &mut EdgeBuffer,
) -> Option<V> {
    let mut v = vertices;
    if v[0].p.y > v[1].p.y {
        v.swap(0, 1);
    }
    if v[1].p.y > v[2].p.y {
        v.swap(1, 2);
    }
    if v[0].p.y > v[1].p.y {
        v.swap(0, 1);
    }
    let [v0, v1, v2] = v;

    if v0.p.y == v2.p.y {
        return None; // every vertex shares one y: zero screen-space height
    }

    let (grad, _area) = gradients(v0, v1, v2)?;

    if v0.p.y < v1.p.y {
        fill_section(v0.p.y, v1.p.y, (v0, v1), (v0, v2), v0, &grad, scissor, ownership, edge_buf);
    }
    if v1.p.y < v2.p.y {
        fill_section(v1.p.y, v2.p.y, (v1, v2), (v0, v2), v0, &grad, scissor, ownership, edge_buf);
    }

    Some(grad.dscan)
}

/// Emits the triangle's three AA edges (§4.3.5), orientation/side chosen per
/// edge from the triangle's overall winding.
pub fn draw_triangle_edges(vertices: [V; 3], scissor: Rect, ownership: &ScanlineOwnership, edge_buf: &mut EdgeBuffer) {
    let [v0, v1, v2] = vertices;
    let dv01 = v1 - v0;
    let dv02 = v2 - v0;
    let dv12 = v2 - v1;

    let area = dv01.p.x * dv02.p.y - dv01.p.y * dv02.p.x;
    if area == 0.0 {
        return;
    }
    let winding_negative = area < 0.0;

    for (a, b, dv) in [(v0, v1, dv01), (v0, v2, dv02), (v1, v2, dv12)] {
        if dv.p.x == 0.0 && dv.p.y == 0.0 {
            continue;
        }
        let orientation = dv.p.x.abs() < dv.p.y.abs();
        let side = (orientation || dv.p.x < 0.0) != winding_negative;
        draw_edge(a, b, dv, orientation, side, scissor, ownership, edge_buf);
    }
}
