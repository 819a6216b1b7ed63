//! Per-draw payload handed from the renderer to the dispatcher (§3, §4.7).
//!
//! One `RasterizerData` is built per draw call and queued to every worker whose
//! row ownership might intersect it; it outlives the draw until every worker has
//! finished with it, at which point its page references are released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::Rect;
use crate::error::{Error, Result};
use crate::page_tracker::PageTracker;
use crate::selector::ScanlineGlobalData;
use crate::vertex::{PrimitiveClass, V};

/// Everything one draw needs, shared read-only across every worker that touches it.
#[derive(Debug)]
pub struct RasterizerData {
    pub primclass: PrimitiveClass,
    pub vertices: Vec<V>,
    pub bbox: Rect,
    pub scissor: Rect,
    /// Axis-aligned, untextured, alpha-disabled sprite: dispatched through the
    /// solid-rect fast path instead of per-scanline (§4.3 `DrawSprite`).
    pub solidrect: bool,
    /// Forces every worker to drain its queue before this draw is dispatched
    /// (§4.5): set when this draw's target pages alias an in-flight one, or the
    /// frame/Z-buffer base pointers changed since the previous draw.
    pub syncpoint: bool,
    pub param: ScanlineGlobalData,
    pub frame: u64,

    ticks: AtomicU64,
    pixels: AtomicU64,

    fb_pages: Vec<u32>,
    zb_pages: Vec<u32>,
    tex_pages: Vec<Vec<u32>>,
    page_tracker: Option<Arc<PageTracker>>,
}

impl RasterizerData {
    /// Build a draw payload and, if `page_tracker` is given, immediately register
    /// its target/source page references (§4.5 `UseTargetPages`/`UseSourcePages`).
    /// Returns the computed `syncpoint` flag alongside the data so the caller can
    /// decide whether to drain queues before dispatching it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        primclass: PrimitiveClass,
        vertices: Vec<V>,
        bbox: Rect,
        scissor: Rect,
        solidrect: bool,
        param: ScanlineGlobalData,
        frame: u64,
        fb_pages: Vec<u32>,
        zb_pages: Vec<u32>,
        tex_pages: Vec<Vec<u32>>,
        fzb_fingerprint: u64,
        page_tracker: Option<Arc<PageTracker>>,
    ) -> Result<Self> {
        let expected = primclass.vertices_per_primitive();
        if !vertices.len().is_multiple_of(expected) {
            return Err(Error::VertexCountMismatch { primclass, count: vertices.len() });
        }

        let mut syncpoint = false;
        if let Some(tracker) = &page_tracker {
            syncpoint = tracker.needs_target_syncpoint(
                fzb_fingerprint,
                &fb_pages,
                &zb_pages,
                param.sel.fwrite() != 0,
                param.sel.zwrite() != 0,
            )?;
            tracker.use_target(&fb_pages, &zb_pages)?;
            for pages in &tex_pages {
                if tracker.needs_source_syncpoint(pages)? {
                    syncpoint = true;
                }
                tracker.use_source(pages)?;
            }
        }

        Ok(RasterizerData {
            primclass,
            vertices,
            bbox,
            scissor,
            solidrect,
            syncpoint,
            param,
            frame,
            ticks: AtomicU64::new(0),
            pixels: AtomicU64::new(0),
            fb_pages,
            zb_pages,
            tex_pages,
            page_tracker,
        })
    }

    pub fn add_ticks(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn add_pixels(&self, pixels: u64) {
        self.pixels.fetch_add(pixels, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn pixels(&self) -> u64 {
        self.pixels.load(Ordering::Relaxed)
    }
}

impl Drop for RasterizerData {
    fn drop(&mut self) {
        if let Some(tracker) = &self.page_tracker {
            tracker.release_target(&self.fb_pages, &self.zb_pages).expect("page ref double-release");
            for pages in &self.tex_pages {
                tracker.release_source(pages).expect("page ref double-release");
            }
        }
    }
}
