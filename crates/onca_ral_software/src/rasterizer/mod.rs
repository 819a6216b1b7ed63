//! The per-worker rasterizer core (§4.3): dispatches a draw's vertices to the
//! right primitive decomposition, batches interior scanlines (and, when the
//! back-end wants them, AA edge fragments) through an [`EdgeBuffer`], and
//! reports timing/pixel counters back onto the shared [`RasterizerData`].

mod edge;
mod line;
mod point;
mod sprite;
mod triangle;

use std::sync::Arc;
use std::time::Instant;

use crate::backend::DrawScanlineBackend;
use crate::edge_buffer::EdgeBuffer;
use crate::ownership::ScanlineOwnership;
use crate::raster_data::RasterizerData;
use crate::vertex::{PrimitiveClass, V};
use crate::worker_pool::DrawWorker;

/// One worker's rasterizer state: its row ownership, scratch edge buffer, and a
/// handle to the (shared, opaque) pixel back-end.
pub struct Rasterizer<B: DrawScanlineBackend> {
    ownership: ScanlineOwnership,
    backend: Arc<B>,
    edge_buf: EdgeBuffer,
}

impl<B: DrawScanlineBackend> Rasterizer<B> {
    pub fn new(ownership: ScanlineOwnership, backend: Arc<B>) -> Self {
        Rasterizer { ownership, backend, edge_buf: EdgeBuffer::new() }
    }

    fn flush_interior(&mut self, vertices: &[V], dscan: Option<V>) {
        if let Some(dscan) = dscan {
            self.edge_buf.flush(self.backend.as_ref(), vertices, dscan, false);
        }
    }

    fn flush_edges(&mut self, vertices: &[V]) {
        self.edge_buf.flush(self.backend.as_ref(), vertices, V::ZERO, true);
    }
}

impl<B: DrawScanlineBackend> DrawWorker for Rasterizer<B> {
    fn draw(&mut self, data: &RasterizerData) {
        let clipped = data.bbox.intersect(&data.scissor);
        let scissor_test = clipped.left != data.bbox.left
            || clipped.top != data.bbox.top
            || clipped.right != data.bbox.right
            || clipped.bottom != data.bbox.bottom;

        self.backend.begin_draw(&data.param);
        let start = Instant::now();
        let has_edge = self.backend.has_edge();

        match data.primclass {
            PrimitiveClass::Point => {
                for chunk in data.vertices.chunks_exact(1) {
                    point::draw_point(chunk[0], scissor_test, data.scissor, &self.ownership, &mut self.edge_buf);
                    self.flush_interior(chunk, Some(V::ZERO));
                }
            }
            PrimitiveClass::Line => {
                for chunk in data.vertices.chunks_exact(2) {
                    let (v0, v1) = (chunk[0], chunk[1]);
                    if has_edge {
                        line::draw_line_edges(v0, v1, data.scissor, &self.ownership, &mut self.edge_buf);
                        self.flush_edges(chunk);
                    } else {
                        let dscan = line::draw_line(v0, v1, data.scissor, &self.ownership, &mut self.edge_buf);
                        self.flush_interior(chunk, dscan);
                    }
                }
            }
            PrimitiveClass::Triangle => {
                for chunk in data.vertices.chunks_exact(3) {
                    let vertices = [chunk[0], chunk[1], chunk[2]];
                    let dscan = triangle::draw_triangle(vertices, data.scissor, &self.ownership, &mut self.edge_buf);
                    self.flush_interior(chunk, dscan);

                    if has_edge {
                        triangle::draw_triangle_edges(vertices, data.scissor, &self.ownership, &mut self.edge_buf);
                        self.flush_edges(chunk);
                    }
                }
            }
            PrimitiveClass::Sprite => {
                for chunk in data.vertices.chunks_exact(2) {
                    let (v0, v1) = (chunk[0], chunk[1]);
                    if data.solidrect {
                        sprite::draw_solid_rect(v0, v1, data.scissor, &self.ownership, self.backend.as_ref());
                    } else {
                        let dscan = sprite::draw_textured_sprite(v0, v1, data.scissor, &self.ownership, &mut self.edge_buf);
                        self.flush_interior(chunk, dscan);
                    }
                }
            }
        }

        let ticks = start.elapsed().as_nanos() as u64;
        data.add_ticks(ticks);
        data.add_pixels(self.edge_buf.pixels());
        self.edge_buf.reset_pixels();
        self.backend.end_draw(data.frame, ticks, data.pixels());
    }
}
