//! The scanline selector (§4.4): compresses per-draw pixel-pipeline state into a
//! packed bitfield plus the uniform constants a pixel kernel needs.
//!
//! `Selector` is modeled the way the workspace's GPU register types are: a
//! `#[repr(transparent)]` wrapper over a raw integer with named
//! `FIELD_OFFSET`/`FIELD_WIDTH`/`FIELD_MASK` constants and `field()`/`set_field()`
//! accessors, rather than a `bitflags`-style derive — the packed integer itself is
//! what the (external) JIT cache keys its pixel kernels on, so the raw value must
//! stay the single source of truth.

use crate::backend::{Rect, TextureCache, TextureHandle};

macro_rules! bitfield_field {
    ($get:ident, $set:ident, $offset_const:ident, $width_const:ident, $mask_const:ident, $offset:expr, $width:expr, $ty:ty) => {
        pub const $offset_const: u32 = $offset;
        pub const $width_const: u32 = $width;
        pub const $mask_const: u64 = (1u64 << $width) - 1;

        #[inline(always)]
        pub fn $get(&self) -> $ty {
            (((self.0 >> Self::$offset_const) & Self::$mask_const) as $ty)
        }

        #[inline(always)]
        pub fn $set(&mut self, val: $ty) {
            let val = val as u64;
            self.0 = (self.0 & !(Self::$mask_const << Self::$offset_const))
                | ((val & Self::$mask_const) << Self::$offset_const);
        }
    };
}

/// Texture combine function (`tfx`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum TexFunction {
    Modulate = 0,
    Decal = 1,
    Highlight = 2,
    Highlight2 = 3,
}

impl From<u8> for TexFunction {
    fn from(v: u8) -> Self {
        match v & 0b11 {
            0 => TexFunction::Modulate,
            1 => TexFunction::Decal,
            2 => TexFunction::Highlight,
            _ => TexFunction::Highlight2,
        }
    }
}

/// Alpha test comparison function (`atst`), already normalized by `SelectorBuilder`
/// to the four the back-end implements (LEQUAL/GEQUAL/EQUAL/NOTEQUAL) plus
/// NEVER/ALWAYS as trivial discard-all/discard-none cases.
/// `Less`/`Greater` only ever appear on `DrawState::atst`, the raw register value;
/// `SelectorBuilder::try_alpha_test` rewrites them away before they reach `sel`, so
/// the back-end only ever implements four comparisons plus the trivial NEVER/ALWAYS.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AlphaTestFunc {
    Never = 0,
    Always = 1,
    Lequal = 2,
    Equal = 3,
    Gequal = 4,
    Notequal = 5,
    Less = 6,
    Greater = 7,
}

impl From<u8> for AlphaTestFunc {
    fn from(v: u8) -> Self {
        match v {
            0 => AlphaTestFunc::Never,
            1 => AlphaTestFunc::Always,
            2 => AlphaTestFunc::Lequal,
            3 => AlphaTestFunc::Equal,
            4 => AlphaTestFunc::Gequal,
            5 => AlphaTestFunc::Notequal,
            6 => AlphaTestFunc::Less,
            _ => AlphaTestFunc::Greater,
        }
    }
}

/// Depth test comparison function (`ztst`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum DepthTestFunc {
    Never = 0,
    Always = 1,
    Gequal = 2,
    Greater = 3,
}

impl From<u8> for DepthTestFunc {
    fn from(v: u8) -> Self {
        match v & 0b11 {
            0 => DepthTestFunc::Never,
            1 => DepthTestFunc::Always,
            2 => DepthTestFunc::Gequal,
            _ => DepthTestFunc::Greater,
        }
    }
}

/// Texture clamp mode (`wms`/`wmt`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ClampMode {
    Repeat = 0,
    Clamp = 1,
    RegionClamp = 2,
    RegionRepeat = 3,
}

impl From<u8> for ClampMode {
    fn from(v: u8) -> Self {
        match v & 0b11 {
            0 => ClampMode::Repeat,
            1 => ClampMode::Clamp,
            2 => ClampMode::RegionClamp,
            _ => ClampMode::RegionRepeat,
        }
    }
}

/// Mipmap minification filter (`mmin`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MipmapFilter {
    None = 0,
    Round = 1,
    Tri = 2,
}

/// The packed pixel-pipeline selector key (`sel`).
///
/// Two draws with an equal `.raw()` MUST produce byte-identical output from the
/// back-end — that equality is the cache key an external JIT/specialization layer
/// uses to reuse a compiled pixel kernel across draws.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[repr(transparent)]
pub struct Selector(u64);

impl Selector {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Selector(raw)
    }

    bitfield_field!(fpsm, set_fpsm, FPSM_OFFSET, FPSM_WIDTH, FPSM_MASK, 0, 2, u8);
    bitfield_field!(zpsm, set_zpsm, ZPSM_OFFSET, ZPSM_WIDTH, ZPSM_MASK, 2, 2, u8);
    bitfield_field!(iip, set_iip, IIP_OFFSET, IIP_WIDTH, IIP_MASK, 4, 1, u8);
    bitfield_field!(tfx, set_tfx_raw, TFX_OFFSET, TFX_WIDTH, TFX_MASK, 5, 2, u8);
    bitfield_field!(tcc, set_tcc, TCC_OFFSET, TCC_WIDTH, TCC_MASK, 7, 1, u8);
    bitfield_field!(fst, set_fst, FST_OFFSET, FST_WIDTH, FST_MASK, 8, 1, u8);
    bitfield_field!(ltf, set_ltf, LTF_OFFSET, LTF_WIDTH, LTF_MASK, 9, 1, u8);
    bitfield_field!(tlu, set_tlu, TLU_OFFSET, TLU_WIDTH, TLU_MASK, 10, 1, u8);
    bitfield_field!(wms, set_wms_raw, WMS_OFFSET, WMS_WIDTH, WMS_MASK, 11, 2, u8);
    bitfield_field!(wmt, set_wmt_raw, WMT_OFFSET, WMT_WIDTH, WMT_MASK, 13, 2, u8);
    bitfield_field!(atst, set_atst_raw, ATST_OFFSET, ATST_WIDTH, ATST_MASK, 15, 3, u8);
    bitfield_field!(afail, set_afail, AFAIL_OFFSET, AFAIL_WIDTH, AFAIL_MASK, 18, 2, u8);
    bitfield_field!(ababcd, set_ababcd, ABABCD_OFFSET, ABABCD_WIDTH, ABABCD_MASK, 20, 8, u8);
    bitfield_field!(pabe, set_pabe, PABE_OFFSET, PABE_WIDTH, PABE_MASK, 28, 1, u8);
    bitfield_field!(aa1, set_aa1, AA1_OFFSET, AA1_WIDTH, AA1_MASK, 29, 1, u8);
    bitfield_field!(abe, set_abe, ABE_OFFSET, ABE_WIDTH, ABE_MASK, 30, 1, u8);
    bitfield_field!(fge, set_fge, FGE_OFFSET, FGE_WIDTH, FGE_MASK, 31, 1, u8);
    bitfield_field!(dthe, set_dthe, DTHE_OFFSET, DTHE_WIDTH, DTHE_MASK, 32, 1, u8);
    bitfield_field!(date, set_date, DATE_OFFSET, DATE_WIDTH, DATE_MASK, 33, 1, u8);
    bitfield_field!(datm, set_datm, DATM_OFFSET, DATM_WIDTH, DATM_MASK, 34, 1, u8);
    bitfield_field!(colclamp, set_colclamp, COLCLAMP_OFFSET, COLCLAMP_WIDTH, COLCLAMP_MASK, 35, 1, u8);
    bitfield_field!(fba, set_fba, FBA_OFFSET, FBA_WIDTH, FBA_MASK, 36, 1, u8);
    bitfield_field!(rfb, set_rfb, RFB_OFFSET, RFB_WIDTH, RFB_MASK, 37, 1, u8);
    bitfield_field!(fwrite, set_fwrite, FWRITE_OFFSET, FWRITE_WIDTH, FWRITE_MASK, 38, 1, u8);
    bitfield_field!(ftest, set_ftest, FTEST_OFFSET, FTEST_WIDTH, FTEST_MASK, 39, 1, u8);
    bitfield_field!(zwrite, set_zwrite, ZWRITE_OFFSET, ZWRITE_WIDTH, ZWRITE_MASK, 40, 1, u8);
    bitfield_field!(ztest, set_ztest, ZTEST_OFFSET, ZTEST_WIDTH, ZTEST_MASK, 41, 1, u8);
    bitfield_field!(ztst, set_ztst_raw, ZTST_OFFSET, ZTST_WIDTH, ZTST_MASK, 42, 2, u8);
    bitfield_field!(zoverflow, set_zoverflow, ZOVERFLOW_OFFSET, ZOVERFLOW_WIDTH, ZOVERFLOW_MASK, 44, 1, u8);
    bitfield_field!(sprite, set_sprite, SPRITE_OFFSET, SPRITE_WIDTH, SPRITE_MASK, 45, 1, u8);
    bitfield_field!(mmin, set_mmin_raw, MMIN_OFFSET, MMIN_WIDTH, MMIN_MASK, 46, 2, u8);
    bitfield_field!(lcm, set_lcm, LCM_OFFSET, LCM_WIDTH, LCM_MASK, 48, 1, u8);
    bitfield_field!(tw, set_tw, TW_OFFSET, TW_WIDTH, TW_MASK, 49, 3, u8);

    pub fn set_tfx(&mut self, v: TexFunction) {
        self.set_tfx_raw(v as u8);
    }

    pub fn set_wms(&mut self, v: ClampMode) {
        self.set_wms_raw(v as u8);
    }

    pub fn set_wmt(&mut self, v: ClampMode) {
        self.set_wmt_raw(v as u8);
    }

    pub fn set_atst(&mut self, v: AlphaTestFunc) {
        self.set_atst_raw(v as u8);
    }

    pub fn set_ztst(&mut self, v: DepthTestFunc) {
        self.set_ztst_raw(v as u8);
    }

    pub fn set_mmin(&mut self, v: MipmapFilter) {
        self.set_mmin_raw(v as u8);
    }

    /// `false` iff the draw writes neither the frame buffer nor the Z buffer, in
    /// which case `SelectorBuilder` drops the whole draw (§4.4 last paragraph).
    pub fn writes_anything(&self) -> bool {
        self.fwrite() != 0 || self.zwrite() != 0
    }
}

/// Inclusive/exclusive texture clamp window for one axis (`t.min/max/mask/invmask`).
#[derive(Clone, Copy, Default, Debug)]
pub struct ClampWindow {
    pub min: u32,
    pub max: u32,
    pub mask: u32,
    pub invmask: u32,
}

/// Constant-LOD value, used when `lcm` is set.
#[derive(Clone, Copy, Default, Debug)]
pub struct ConstLod {
    pub integer: i32,
    pub fraction: u8,
}

/// Per-pixel LOD constants, used when `lcm` is not set.
#[derive(Clone, Copy, Default, Debug)]
pub struct PerPixelLod {
    pub mxl: i32,
    pub l: f32,
    pub k: f32,
}

/// Uniform draw-state constants the selector's `sel` doesn't need to distinguish
/// kernels on, but the pixel kernel still needs (§3 `ScanlineGlobalData`).
#[derive(Clone, Default, Debug)]
pub struct ScanlineGlobalData {
    pub sel: Selector,

    /// Owned CLUT copy; only populated when `sel.tlu()` is set (§4.4 "Palette").
    pub clut: Option<Box<[u32; 256]>>,

    /// Fog color split into R|B and G|A 8.8-packed pairs (§3, §4.4), mirroring
    /// `FOGCOL` split into `frb`/`fga` for parallel per-channel blending.
    pub fog_rb: u32,
    pub fog_ga: u32,
    pub alpha_fix: u8,
    pub alpha_ref: u8,

    pub clamp_s: ClampWindow,
    pub clamp_t: ClampWindow,

    /// Up to 7 mip levels (base + 6), each an opaque pointer to decoded texel data
    /// owned by the texture cache (§6), not by `ScanlineGlobalData`.
    pub tex_levels: [Option<usize>; 7],

    pub const_lod: ConstLod,
    pub per_pixel_lod: PerPixelLod,

    pub dither_matrix: [[i8; 4]; 4],

    pub frame_write_mask: u32,
    pub z_write_mask: u32,
}

/// Translates per-draw drawing-state into a `Selector` + `ScanlineGlobalData`.
///
/// The drawing-state input (`PRIM`/`TEX0`/`TEST`/`ALPHA`/... register snapshot in the
/// original) is represented here as `DrawState`, a plain struct of the fields
/// `SelectorBuilder` actually reads. A richer command-stream decoder sits in the
/// (out-of-scope, §1) layer that assembles `DrawState` from the register file.
#[derive(Clone, Debug)]
pub struct DrawState {
    pub fpsm: u8,
    pub zpsm: u8,
    pub iip: bool,
    pub textured: bool,
    pub tfx: TexFunction,
    pub tcc: bool,
    pub fst: bool,
    pub ltf: bool,
    pub palettized: bool,
    pub wms: ClampMode,
    pub wmt: ClampMode,
    pub atst: AlphaTestFunc,
    pub aref: u8,
    pub afail: u8,
    pub ababcd: u8,
    pub pabe: bool,
    pub aa1: bool,
    pub abe: bool,
    pub fge: bool,
    pub dthe: bool,
    pub date: bool,
    pub datm: bool,
    pub colclamp: bool,
    pub fba: bool,
    pub fb_write_mask: u32,
    pub z_write_mask: u32,
    pub ftest: bool,
    pub zwrite: bool,
    pub ztest: bool,
    pub ztst: DepthTestFunc,
    pub sprite: bool,
    pub mipmap_levels: u8,
    pub mipmap_filter: MipmapFilter,
    pub lod_is_constant: bool,
    /// `TEX1.K`, already converted to a LOD bias in the same units as `lod_l`.
    pub lod_k: f32,
    /// `TEX1.L`, the LOD-vs-distance slope exponent (0..3).
    pub lod_l: u8,
    pub tex_log2_width: u8,
    pub clamp_s: ClampWindow,
    pub clamp_t: ClampWindow,

    /// Fog color register (`FOGCOL`), low 24 bits R|G|B.
    pub fog_color: u32,

    /// `TEX0`/`TEXA` register values for the base (level 0) texture, passed
    /// opaquely to `TextureCache::lookup`.
    pub tex0: u64,
    pub texa: u64,
    /// The vertex-derived min/max UV rectangle to decode at level 0 (§4.4
    /// "Texture lookup"); halved per level for the mipmap chain.
    pub tex_sample_rect: Rect,
    /// `TEX0`-equivalent register value for mip levels 1..=6, built from
    /// `MIPTBP1`/`MIPTBP2`'s packed per-level TBP/TBW; only the first
    /// `mipmap_levels.saturating_sub(1)` entries (capped at 6) are consulted.
    pub mip_tex0: [u64; 6],
}

pub struct SelectorBuilder;

impl SelectorBuilder {
    /// Build `(sel, gd)` for a draw; returns `None` when the draw writes neither
    /// the frame buffer nor the Z buffer and should be dropped (§4.4), or when a
    /// textured draw's texture lookup fails (§7 "Texture-unavailable").
    pub fn build<TC: TextureCache>(state: &DrawState, cache: &TC) -> Option<ScanlineGlobalData> {
        let mut sel = Selector::default();

        sel.set_fpsm(state.fpsm);
        sel.set_zpsm(state.zpsm);
        sel.set_iip(state.iip as u8);
        if state.textured {
            sel.set_tcc(state.tcc as u8);
            sel.set_fst(state.fst as u8);
            sel.set_ltf(state.ltf as u8);
            sel.set_tlu(state.palettized as u8);
            sel.set_tfx(state.tfx);
            sel.set_wms(state.wms);
            sel.set_wmt(state.wmt);
        }
        sel.set_pabe(state.pabe as u8);
        sel.set_aa1(state.aa1 as u8);
        sel.set_abe(state.abe as u8);
        sel.set_fge(state.fge as u8);
        sel.set_dthe(state.dthe as u8);
        sel.set_date(state.date as u8);
        sel.set_datm(state.datm as u8);
        sel.set_colclamp(state.colclamp as u8);
        sel.set_fba(state.fba as u8);
        sel.set_ababcd(state.ababcd);
        sel.set_ztest(state.ztest as u8);
        sel.set_ztst(state.ztst);
        sel.set_sprite(state.sprite as u8);
        sel.set_mmin(state.mipmap_filter);
        sel.set_lcm(state.lod_is_constant as u8);
        sel.set_tw(state.tex_log2_width.saturating_sub(3));

        // Effective write masks: ATST == NEVER means the test always fails, so
        // nothing is ever written regardless of the configured mask (§4.4).
        let (fm, zm, ftest, atst, aref) = if state.atst == AlphaTestFunc::Never {
            (0xffff_ffffu32, 0xffff_ffffu32, false, state.atst, state.aref)
        } else {
            let (atst, aref) = Self::try_alpha_test(state);
            (state.fb_write_mask, state.z_write_mask, state.ftest, atst, aref)
        };

        sel.set_ftest(ftest as u8);
        sel.set_atst(atst);
        sel.set_afail(state.afail);
        sel.set_fwrite((fm != 0xffff_ffff) as u8);
        sel.set_zwrite((state.zwrite && zm != 0xffff_ffff) as u8);

        if !sel.writes_anything() {
            return None;
        }

        sel.set_rfb(Self::needs_read_framebuffer(state, fm));

        let mut gd = ScanlineGlobalData {
            sel,
            fog_rb: state.fog_color & 0x00ff_00ff,
            fog_ga: (state.fog_color >> 8) & 0x00ff_00ff,
            alpha_fix: 0,
            alpha_ref: aref,
            clamp_s: state.clamp_s,
            clamp_t: state.clamp_t,
            frame_write_mask: fm,
            z_write_mask: zm,
            ..ScanlineGlobalData::default()
        };

        if state.textured {
            Self::build_texture(state, &sel, cache, &mut gd)?;
        }

        Some(gd)
    }

    /// Texture lookup, CLUT copy and mipmap chain (§4.4 "Palette"/"Texture
    /// lookup"/"Mipmap"). Returns `None` when the base-level lookup fails.
    fn build_texture<TC: TextureCache>(
        state: &DrawState,
        sel: &Selector,
        cache: &TC,
        gd: &mut ScanlineGlobalData,
    ) -> Option<()> {
        let base = cache.lookup(state.tex0, state.texa)?;
        base.update(state.tex_sample_rect);
        gd.tex_levels[0] = Some(base.id());
        if sel.tlu() != 0 {
            gd.clut = base.clut().map(Box::new);
        }

        let mipmapping = state.mipmap_levels > 1 && !matches!(state.mipmap_filter, MipmapFilter::None);
        if !mipmapping {
            return Some(());
        }

        let mxl = (state.mipmap_levels - 1).min(6) as i32;

        if state.lod_is_constant {
            let mxl_fixed = mxl << 16;
            let k_fixed = (state.lod_k * 4096.0) as i32;
            let mut lod = k_fixed.clamp(0, mxl_fixed);
            if matches!(state.mipmap_filter, MipmapFilter::Round) {
                lod = (lod + 0x8000) & !0xffff;
            }
            gd.const_lod = ConstLod { integer: lod >> 16, fraction: ((lod & 0xffff) >> 8) as u8 };
        } else {
            gd.per_pixel_lod = PerPixelLod {
                mxl,
                l: -((0x1_0000i32 << state.lod_l) as f32),
                k: state.lod_k,
            };
        }

        let mut rect = state.tex_sample_rect;
        for i in 0..mxl as usize {
            rect = Rect {
                left: rect.left / 2,
                top: rect.top / 2,
                right: (rect.right + 1) / 2,
                bottom: (rect.bottom + 1) / 2,
            };
            let level = cache.lookup(state.mip_tex0[i], state.texa)?;
            level.update(rect);
            gd.tex_levels[i + 1] = Some(level.id());
        }

        Some(())
    }

    /// Rewrite LESS/GREATER to LEQUAL/GEQUAL with `aref` nudged by one, so the
    /// back-end only ever implements four comparisons (§4.4 "Try an early alpha
    /// test"). Returns the normalized `(atst, aref)` pair.
    fn try_alpha_test(state: &DrawState) -> (AlphaTestFunc, u8) {
        match state.atst {
            AlphaTestFunc::Less => (AlphaTestFunc::Lequal, state.aref.saturating_sub(1)),
            AlphaTestFunc::Greater => (AlphaTestFunc::Gequal, state.aref.saturating_add(1)),
            other => (other, state.aref),
        }
    }

    /// `rfb`: the back-end needs to read the existing framebuffer value (§4.4):
    /// DATE test, a blend coefficient reading dst, RGB-only AFAIL, or `fm` masking
    /// some but not all bits (a fully-set or fully-clear mask needs no read-back).
    fn needs_read_framebuffer(state: &DrawState, fm: u32) -> u8 {
        let date = state.date;
        let blend_reads_dst = state.abe && state.ababcd != 0b00_00_00_00;
        let rgb_only_afail = state.afail == 1 || state.afail == 3;
        let partial_mask = fm != 0 && fm != 0xffff_ffff;
        (date || blend_reads_dst || rgb_only_afail || partial_mask) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A handle backed by a fixed texel buffer id, an optional CLUT and no pages.
    struct TestHandle {
        id: usize,
        clut: Option<[u32; 256]>,
        last_update: Cell<Option<Rect>>,
    }

    impl TextureHandle for TestHandle {
        fn update(&self, rect: Rect) {
            self.last_update.set(Some(rect));
        }

        fn pages(&self) -> &[u32] {
            &[]
        }

        fn id(&self) -> usize {
            self.id
        }

        fn clut(&self) -> Option<[u32; 256]> {
            self.clut
        }
    }

    /// Returns one `TestHandle` per `tex0` value, keyed by value so mip levels get
    /// distinct ids; `palettized` controls whether a CLUT is attached.
    struct TestCache {
        palettized: bool,
        fail: bool,
    }

    impl TextureCache for TestCache {
        type Handle = TestHandle;

        fn lookup(&self, tex0: u64, _texa: u64) -> Option<Self::Handle> {
            if self.fail {
                return None;
            }
            Some(TestHandle {
                id: tex0 as usize,
                clut: self.palettized.then(|| {
                    let mut clut = [0u32; 256];
                    clut[1] = 0xff00_ff00;
                    clut
                }),
                last_update: Cell::new(None),
            })
        }
    }

    fn no_texture_cache() -> TestCache {
        TestCache { palettized: false, fail: false }
    }

    fn base_state() -> DrawState {
        DrawState {
            fpsm: 0,
            zpsm: 0,
            iip: true,
            textured: false,
            tfx: TexFunction::Modulate,
            tcc: false,
            fst: false,
            ltf: false,
            palettized: false,
            wms: ClampMode::Repeat,
            wmt: ClampMode::Repeat,
            atst: AlphaTestFunc::Always,
            aref: 0,
            afail: 0,
            ababcd: 0,
            pabe: false,
            aa1: false,
            abe: false,
            fge: false,
            dthe: false,
            date: false,
            datm: false,
            colclamp: true,
            fba: false,
            fb_write_mask: 0,
            z_write_mask: 0,
            ftest: false,
            zwrite: true,
            ztest: true,
            ztst: DepthTestFunc::Gequal,
            sprite: false,
            mipmap_levels: 1,
            mipmap_filter: MipmapFilter::None,
            lod_is_constant: true,
            lod_k: 0.0,
            lod_l: 0,
            tex_log2_width: 3,
            clamp_s: ClampWindow::default(),
            clamp_t: ClampWindow::default(),
            fog_color: 0,
            tex0: 0,
            texa: 0,
            tex_sample_rect: Rect { left: 0, top: 0, right: 8, bottom: 8 },
            mip_tex0: [0; 6],
        }
    }

    #[test]
    fn bitfield_roundtrips_every_field() {
        let mut sel = Selector::default();
        sel.set_fpsm(2);
        sel.set_zpsm(1);
        sel.set_iip(1);
        sel.set_tw(5);
        assert_eq!(sel.fpsm(), 2);
        assert_eq!(sel.zpsm(), 1);
        assert_eq!(sel.iip(), 1);
        assert_eq!(sel.tw(), 5);
    }

    #[test]
    fn fields_do_not_overlap() {
        let mut sel = Selector::default();
        sel.set_fpsm(0b11);
        sel.set_zpsm(0);
        assert_eq!(sel.zpsm(), 0, "setting fpsm must not bleed into zpsm");
    }

    #[test]
    fn atst_never_masks_every_write_and_drops_the_draw() {
        // ATST == NEVER means the alpha test always fails, so nothing is ever
        // written; SelectorBuilder folds that into a fully-masked write and drops
        // the draw rather than letting the back-end run a no-op pipeline.
        let mut state = base_state();
        state.atst = AlphaTestFunc::Never;
        state.fb_write_mask = 0;
        state.z_write_mask = 0;
        assert!(SelectorBuilder::build(&state, &no_texture_cache()).is_none());
    }

    #[test]
    fn discards_draw_that_writes_nothing() {
        let mut state = base_state();
        state.zwrite = false;
        state.fb_write_mask = 0xffff_ffff;
        assert!(SelectorBuilder::build(&state, &no_texture_cache()).is_none());
    }

    #[test]
    fn palettized_draw_copies_clut_from_the_texture_cache() {
        let mut state = base_state();
        state.textured = true;
        state.palettized = true;
        state.tex0 = 7;
        let cache = TestCache { palettized: true, fail: false };

        let gd = SelectorBuilder::build(&state, &cache).unwrap();

        let clut = gd.clut.expect("palettized draw must populate gd.clut");
        assert_eq!(clut[1], 0xff00_ff00);
        assert_eq!(gd.tex_levels[0], Some(7));
    }

    #[test]
    fn non_palettized_draw_leaves_clut_unset() {
        let mut state = base_state();
        state.textured = true;
        state.tex0 = 3;
        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert!(gd.clut.is_none());
        assert_eq!(gd.tex_levels[0], Some(3));
    }

    #[test]
    fn textured_draw_drops_when_lookup_fails() {
        let mut state = base_state();
        state.textured = true;
        let cache = TestCache { palettized: false, fail: true };
        assert!(SelectorBuilder::build(&state, &cache).is_none());
    }

    #[test]
    fn mipmapped_draw_populates_every_level_and_halves_the_sample_rect() {
        let mut state = base_state();
        state.textured = true;
        state.tex0 = 1;
        state.mipmap_levels = 4;
        state.mipmap_filter = MipmapFilter::Tri;
        state.mip_tex0 = [10, 11, 12, 0, 0, 0];
        state.tex_sample_rect = Rect { left: 0, top: 0, right: 64, bottom: 64 };
        state.lod_is_constant = false;

        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();

        assert_eq!(gd.tex_levels[0], Some(1));
        assert_eq!(gd.tex_levels[1], Some(10));
        assert_eq!(gd.tex_levels[2], Some(11));
        assert_eq!(gd.tex_levels[3], Some(12));
        assert_eq!(gd.tex_levels[4], None);
        assert_eq!(gd.per_pixel_lod.mxl, 3);
    }

    #[test]
    fn constant_lod_mipmap_computes_integer_and_fraction() {
        let mut state = base_state();
        state.textured = true;
        state.mipmap_levels = 3;
        state.mipmap_filter = MipmapFilter::Tri;
        state.lod_is_constant = true;
        state.lod_k = 20.0;

        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.const_lod.integer, 1);
    }

    #[test]
    fn alpha_test_less_rewrites_to_lequal_with_aref_minus_one() {
        let mut state = base_state();
        state.atst = AlphaTestFunc::Less;
        state.aref = 10;

        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.sel.atst(), AlphaTestFunc::Lequal as u8);
        assert_eq!(gd.alpha_ref, 9);
    }

    #[test]
    fn alpha_test_greater_rewrites_to_gequal_with_aref_plus_one() {
        let mut state = base_state();
        state.atst = AlphaTestFunc::Greater;
        state.aref = 10;

        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.sel.atst(), AlphaTestFunc::Gequal as u8);
        assert_eq!(gd.alpha_ref, 11);
    }

    #[test]
    fn alpha_test_aref_nudge_saturates_at_zero() {
        let mut state = base_state();
        state.atst = AlphaTestFunc::Less;
        state.aref = 0;

        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.alpha_ref, 0);
    }

    #[test]
    fn fog_color_splits_into_rb_and_ga_pairs() {
        let mut state = base_state();
        state.fog_color = 0x00_33_22_11; // B=0x33 G=0x22 R=0x11
        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.fog_rb, 0x0033_0011);
        assert_eq!(gd.fog_ga, 0x0000_0022);
    }

    #[test]
    fn fully_masked_write_does_not_need_framebuffer_read() {
        // fm == 0 means every bit is writable (no mask at all); that must not be
        // treated as a "partial" mask requiring a read-modify-write.
        let mut state = base_state();
        state.fb_write_mask = 0;
        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.sel.rfb(), 0);
    }

    #[test]
    fn partially_masked_write_needs_framebuffer_read() {
        let mut state = base_state();
        state.fb_write_mask = 0x0000_00ff;
        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.sel.rfb(), 1);
    }

    #[test]
    fn untextured_draw_never_sets_texture_derived_sel_fields() {
        let mut state = base_state();
        state.textured = false;
        state.tcc = true;
        state.palettized = true;
        state.ltf = true;
        let gd = SelectorBuilder::build(&state, &no_texture_cache()).unwrap();
        assert_eq!(gd.sel.tcc(), 0);
        assert_eq!(gd.sel.tlu(), 0);
        assert_eq!(gd.sel.ltf(), 0);
    }
}
