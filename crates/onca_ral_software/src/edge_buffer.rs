//! Per-worker scratch buffer of scanline descriptors, flushed to the back-end in
//! one batch per primitive (§4.2).

use crate::backend::{DrawScanlineBackend, EdgeFragment, ScanlineRun};
use crate::vertex::V;

/// Descriptors never exceed one per row of the largest supported surface.
pub const CAPACITY: usize = 2048;

enum Descriptor {
    Scanline { pixels: i32, left: i32, top: i32, scan: V },
    Edge { left: i32, top: i32, scan: V, coverage: u16 },
}

/// A fixed-capacity scratch array of scanline descriptors for one worker.
pub struct EdgeBuffer {
    descriptors: Vec<Descriptor>,
    pixels: u64,
}

impl EdgeBuffer {
    pub fn new() -> Self {
        EdgeBuffer { descriptors: Vec::with_capacity(CAPACITY), pixels: 0 }
    }

    /// Total pixels accumulated across all flushes since the last `reset_pixels`.
    pub fn pixels(&self) -> u64 {
        self.pixels
    }

    pub fn reset_pixels(&mut self) {
        self.pixels = 0;
    }

    /// Append an interior scanline run. Panics if the reserved capacity is exceeded —
    /// triangles/lines never produce more rows than the surface height allows, so this
    /// indicates a caller bug rather than a data-dependent condition.
    pub fn add_scanline(&mut self, pixels: i32, left: i32, top: i32, scan: V) {
        assert!(
            self.descriptors.len() < CAPACITY,
            "edge buffer exceeded its reserved capacity of {CAPACITY} descriptors"
        );
        self.descriptors.push(Descriptor::Scanline { pixels, left, top, scan });
    }

    /// Append a one-pixel AA edge fragment.
    pub fn add_edge(&mut self, left: i32, top: i32, scan: V, coverage: u16) {
        assert!(
            self.descriptors.len() < CAPACITY,
            "edge buffer exceeded its reserved capacity of {CAPACITY} descriptors"
        );
        self.descriptors.push(Descriptor::Edge { left, top, scan, coverage });
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Flush accumulated descriptors to the back-end: one `setup_prim`, then one
    /// `draw_scanline`/`draw_edge` per descriptor, accumulating pixel count and
    /// resetting the buffer for reuse.
    pub fn flush(&mut self, backend: &dyn DrawScanlineBackend, vertices: &[V], dscan: V, edge: bool) {
        if self.descriptors.is_empty() {
            return;
        }

        backend.setup_prim(vertices, dscan);

        for descriptor in self.descriptors.drain(..) {
            match descriptor {
                Descriptor::Scanline { pixels, left, top, scan } => {
                    debug_assert!(!edge, "scanline descriptor flushed through the edge path");
                    self.pixels += pixels as u64;
                    backend.draw_scanline(ScanlineRun { pixels, left, top, scan });
                }
                Descriptor::Edge { left, top, scan, coverage } => {
                    debug_assert!(edge, "edge descriptor flushed through the scanline path");
                    self.pixels += 1;
                    backend.draw_edge(EdgeFragment { left, top, scan, coverage });
                }
            }
        }
    }
}

impl Default for EdgeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        scanlines: Mutex<Vec<(i32, i32, i32)>>,
        edges: Mutex<Vec<(i32, i32, u16)>>,
    }

    impl DrawScanlineBackend for Recorder {
        fn begin_draw(&self, _param: &crate::selector::ScanlineGlobalData) {}
        fn setup_prim(&self, _vertices: &[V], _dscan: V) {}
        fn draw_scanline(&self, run: ScanlineRun) {
            self.scanlines.lock().unwrap().push((run.pixels, run.left, run.top));
        }
        fn draw_edge(&self, fragment: EdgeFragment) {
            self.edges.lock().unwrap().push((fragment.left, fragment.top, fragment.coverage));
        }
        fn draw_rect(&self, _rect: crate::backend::Rect, _scan: V) {}
        fn end_draw(&self, _frame: u64, _ticks: u64, _pixels: u64) {}
        fn has_edge(&self) -> bool {
            false
        }
    }

    #[test]
    fn flush_calls_setup_once_and_drains() {
        let mut buf = EdgeBuffer::new();
        buf.add_scanline(10, 0, 0, V::ZERO);
        buf.add_scanline(5, 0, 1, V::ZERO);

        let backend = Recorder::default();
        buf.flush(&backend, &[], V::ZERO, false);

        assert_eq!(backend.scanlines.lock().unwrap().len(), 2);
        assert_eq!(buf.pixels(), 15);
        assert!(buf.is_empty());
    }

    #[test]
    #[should_panic]
    fn add_scanline_asserts_capacity() {
        let mut buf = EdgeBuffer::new();
        for _ in 0..=CAPACITY {
            buf.add_scanline(1, 0, 0, V::ZERO);
        }
    }
}
