//! External interfaces (§6): the pixel shader back-end, the texture cache and the
//! VRAM page-offset lookup. The rasterizer core treats all three as opaque
//! collaborators — it never inspects pixel formats or decodes texels itself.

use crate::selector::ScanlineGlobalData;
use crate::vertex::V;

/// An emitted interior scanline run: `pixels` contiguous fragments starting at
/// `(left, top)`, with `scan` holding the interpolated attributes at the leftmost one.
#[derive(Clone, Copy, Debug)]
pub struct ScanlineRun {
    pub pixels: i32,
    pub left: i32,
    pub top: i32,
    pub scan: V,
}

/// A single anti-aliased edge fragment; `coverage` is a 16-bit fraction (`0x10000` = full).
#[derive(Clone, Copy, Debug)]
pub struct EdgeFragment {
    pub left: i32,
    pub top: i32,
    pub scan: V,
    pub coverage: u16,
}

/// An axis-aligned solid rectangle fill (one `DrawRect` call covers the whole rect).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

/// The opaque pixel-shading back-end (`IDrawScanline`).
///
/// Implementations decide, via `has_edge`, whether they want AA edge fragments
/// (`draw_edge`) or plain interior scanlines only.
pub trait DrawScanlineBackend: Send + Sync {
    /// Called once when a draw starts, before any scanlines are emitted.
    fn begin_draw(&self, param: &ScanlineGlobalData);

    /// Called once per `EdgeBuffer::flush`, before its batch of scanlines/edges.
    fn setup_prim(&self, vertices: &[V], dscan: V);

    /// Emit one interior scanline run.
    fn draw_scanline(&self, run: ScanlineRun);

    /// Emit one anti-aliased edge fragment. Only called when `has_edge()` is true.
    fn draw_edge(&self, fragment: EdgeFragment);

    /// Emit a solid, untextured rectangle fill.
    fn draw_rect(&self, rect: Rect, scan: V);

    /// Called once when a draw completes on a given worker.
    fn end_draw(&self, frame: u64, ticks: u64, pixels: u64);

    /// Does this back-end want AA edge fragments instead of interior-only scanlines
    /// for line/triangle boundaries?
    fn has_edge(&self) -> bool;
}

/// A decoded texture level handle, as returned by `TextureCache::lookup`.
pub trait TextureHandle {
    /// Decode (or re-decode) the sub-rectangle actually sampled by the current draw.
    fn update(&self, rect: Rect);

    /// The emulated VRAM pages this texture level occupies.
    fn pages(&self) -> &[u32];

    /// Opaque identifier for this level's decoded texel buffer, stored verbatim into
    /// `ScanlineGlobalData::tex_levels` for the (external) pixel kernel to resolve.
    fn id(&self) -> usize;

    /// The level's decoded 256-entry CLUT, when the texture is palettized.
    fn clut(&self) -> Option<[u32; 256]>;
}

/// The texture cache (§6): decodes and caches VRAM texture data; opaque to the core.
pub trait TextureCache {
    type Handle: TextureHandle;

    /// Look up (and decode on first use) the texture described by a draw's texture
    /// state. Returns `None` when the lookup fails (format unsupported, OOM, ...).
    fn lookup(&self, tex0: u64, texa: u64) -> Option<Self::Handle>;
}

/// VRAM page enumeration for a rectangle, for the framebuffer and Z-buffer respectively
/// (§6 `offset.fb.GetPages`/`offset.zb.GetPages`).
pub trait PageOffsets {
    fn fb_pages(&self, rect: Rect) -> Vec<u32>;
    fn zb_pages(&self, rect: Rect) -> Vec<u32>;

    /// Identity-comparable fingerprint of the current `(FBP, ZBP)` pair; a change
    /// is a cheap, dominant signal that a syncpoint is needed (§4.5).
    fn fzb_fingerprint(&self) -> u64;
}
