//! VRAM page-aliasing tracking and syncpoint decisions (§4.5, §6).
//!
//! Emulated VRAM is divided into 512 fixed-size pages. Every in-flight draw holds
//! a reference count on the pages it reads (as a texture source) or writes (as a
//! frame-buffer/Z-buffer target); a new draw that would alias an in-flight one is
//! forced to wait for a syncpoint instead of racing it.

use std::sync::atomic::{AtomicU16, Ordering};

use crate::backend::Rect;
use crate::error::{Error, Result};

/// Number of addressable VRAM pages.
pub const NUM_PAGES: usize = 512;

#[derive(Debug)]
struct PageCounters {
    fb: [AtomicU16; NUM_PAGES],
    zb: [AtomicU16; NUM_PAGES],
    tex: [AtomicU16; NUM_PAGES],
}

impl Default for PageCounters {
    fn default() -> Self {
        PageCounters {
            fb: std::array::from_fn(|_| AtomicU16::new(0)),
            zb: std::array::from_fn(|_| AtomicU16::new(0)),
            tex: std::array::from_fn(|_| AtomicU16::new(0)),
        }
    }
}

fn incr(counter: &AtomicU16, page: u32) -> Result<()> {
    let prev = counter.fetch_add(1, Ordering::AcqRel);
    if prev == u16::MAX {
        counter.fetch_sub(1, Ordering::AcqRel);
        return Err(Error::PageCounterOverflow(page));
    }
    Ok(())
}

fn decr(counter: &AtomicU16, page: u32) -> Result<()> {
    let prev = counter.fetch_sub(1, Ordering::AcqRel);
    if prev == 0 {
        counter.fetch_add(1, Ordering::AcqRel);
        return Err(Error::PageCounterUnderflow(page));
    }
    Ok(())
}

/// Tracks which VRAM pages are currently referenced by in-flight draws, and
/// decides when a new draw must force a syncpoint before it can be queued.
#[derive(Debug, Default)]
pub struct PageTracker {
    counters: PageCounters,
    /// Opaque fingerprint of the current `(FBP, ZBP)` pair; changing it is a cheap
    /// shortcut that dominates the exact per-page aliasing check (§4.5).
    last_fzb_fingerprint: std::sync::atomic::AtomicU64,
}

impl PageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_page(page: u32) -> Result<usize> {
        usize::try_from(page)
            .ok()
            .filter(|&p| p < NUM_PAGES)
            .ok_or(Error::PageOutOfRange(page))
    }

    /// Does this draw's frame/Z-buffer pages alias any in-flight draw's, forcing a
    /// syncpoint? `fzb_fingerprint` short-circuits the common case where the
    /// target has simply changed since the last draw.
    pub fn needs_target_syncpoint(
        &self,
        fzb_fingerprint: u64,
        fb_pages: &[u32],
        zb_pages: &[u32],
        write_fb: bool,
        write_zb: bool,
    ) -> Result<bool> {
        if self.last_fzb_fingerprint.swap(fzb_fingerprint, Ordering::AcqRel) != fzb_fingerprint {
            return Ok(true);
        }

        if write_fb {
            for &page in fb_pages {
                let idx = Self::check_page(page)?;
                if self.counters.zb[idx].load(Ordering::Acquire) != 0 {
                    return Ok(true);
                }
            }
        }

        if write_zb {
            for &page in zb_pages {
                let idx = Self::check_page(page)?;
                if self.counters.fb[idx].load(Ordering::Acquire) != 0 {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Record that a draw now targets `fb_pages`/`zb_pages`. Call unconditionally,
    /// after any syncpoint from [`PageTracker::needs_target_syncpoint`] has already
    /// been handled by the caller.
    pub fn use_target(&self, fb_pages: &[u32], zb_pages: &[u32]) -> Result<()> {
        for &page in fb_pages {
            let idx = Self::check_page(page)?;
            incr(&self.counters.fb[idx], page)?;
        }
        for &page in zb_pages {
            let idx = Self::check_page(page)?;
            incr(&self.counters.zb[idx], page)?;
        }
        Ok(())
    }

    pub fn release_target(&self, fb_pages: &[u32], zb_pages: &[u32]) -> Result<()> {
        for &page in fb_pages {
            let idx = Self::check_page(page)?;
            decr(&self.counters.fb[idx], page)?;
        }
        for &page in zb_pages {
            let idx = Self::check_page(page)?;
            decr(&self.counters.zb[idx], page)?;
        }
        Ok(())
    }

    /// Does this draw's texture source alias any page currently in use as a
    /// target? Used exactly like `needs_target_syncpoint` but for source pages,
    /// which never alias each other (only reads happen).
    pub fn needs_source_syncpoint(&self, tex_pages: &[u32]) -> Result<bool> {
        for &page in tex_pages {
            let idx = Self::check_page(page)?;
            if self.counters.fb[idx].load(Ordering::Acquire) != 0
                || self.counters.zb[idx].load(Ordering::Acquire) != 0
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn use_source(&self, tex_pages: &[u32]) -> Result<()> {
        for &page in tex_pages {
            let idx = Self::check_page(page)?;
            incr(&self.counters.tex[idx], page)?;
        }
        Ok(())
    }

    pub fn release_source(&self, tex_pages: &[u32]) -> Result<()> {
        for &page in tex_pages {
            let idx = Self::check_page(page)?;
            decr(&self.counters.tex[idx], page)?;
        }
        Ok(())
    }

    /// A host-side VRAM write (`BITBLTBUF` upload/local-copy) touches `pages`,
    /// which also happen to be a texture source or a draw target. Returns whether
    /// the caller must force a syncpoint before the write can proceed (§4.5).
    pub fn invalidate_video_mem(&self, pages: &[u32]) -> Result<bool> {
        for &page in pages {
            let idx = Self::check_page(page)?;
            if self.counters.fb[idx].load(Ordering::Acquire) != 0
                || self.counters.zb[idx].load(Ordering::Acquire) != 0
                || self.counters.tex[idx].load(Ordering::Acquire) != 0
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Like `invalidate_video_mem`, but for a local-memory-to-local-memory copy
    /// (`InvalidateLocalMem`): per Open Question 3, only blocks on pages in use as
    /// a draw target, not as a texture source.
    pub fn invalidate_local_mem(&self, pages: &[u32]) -> Result<bool> {
        for &page in pages {
            let idx = Self::check_page(page)?;
            if self.counters.fb[idx].load(Ordering::Acquire) != 0
                || self.counters.zb[idx].load(Ordering::Acquire) != 0
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Computes a cheap, order-independent fingerprint for a `(fb_block, zb_block)`
/// pair, suitable for `PageTracker::needs_target_syncpoint`.
pub fn fzb_fingerprint(fb_block: u32, zb_block: u32) -> u64 {
    (fb_block as u64) | ((zb_block as u64) << 32)
}

/// Enumerates the VRAM pages a rectangle covers at a given base pointer / buffer
/// width, in page units. A minimal stand-in for the host's `GSOffset::GetPages`;
/// real page geometry depends on pixel format and is supplied by the backend's
/// `PageOffsets` implementation for actual draws.
pub fn pages_for_rect(base_page: u32, pages_per_row: u32, rect: Rect, page_width: i32, page_height: i32) -> Vec<u32> {
    if rect.is_empty() || pages_per_row == 0 {
        return Vec::new();
    }

    let mut pages = Vec::new();
    let top_page_row = rect.top / page_height;
    let bottom_page_row = (rect.bottom - 1) / page_height;
    let left_page_col = rect.left / page_width;
    let right_page_col = (rect.right - 1) / page_width;

    for row in top_page_row..=bottom_page_row {
        for col in left_page_col..=right_page_col {
            pages.push(base_page + row as u32 * pages_per_row + col as u32);
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_then_release_restores_zero() {
        let tracker = PageTracker::new();
        tracker.use_target(&[1, 2, 3], &[4, 5]).unwrap();
        tracker.release_target(&[1, 2, 3], &[4, 5]).unwrap();
        assert!(!tracker.needs_source_syncpoint(&[1, 2, 3, 4, 5]).unwrap());
    }

    #[test]
    fn source_sync_needed_when_target_in_flight() {
        let tracker = PageTracker::new();
        tracker.use_target(&[10], &[]).unwrap();
        assert!(tracker.needs_source_syncpoint(&[10]).unwrap());
        assert!(!tracker.needs_source_syncpoint(&[11]).unwrap());
    }

    #[test]
    fn target_sync_needed_on_fb_zb_cross_alias() {
        let tracker = PageTracker::new();
        tracker.use_target(&[0], &[]).unwrap();
        assert!(tracker.needs_target_syncpoint(0, &[], &[0], false, true).unwrap());
    }

    #[test]
    fn fzb_fingerprint_change_forces_syncpoint() {
        let tracker = PageTracker::new();
        assert!(tracker.needs_target_syncpoint(1, &[], &[], false, false).unwrap());
        assert!(!tracker.needs_target_syncpoint(1, &[], &[], false, false).unwrap());
        assert!(tracker.needs_target_syncpoint(2, &[], &[], false, false).unwrap());
    }

    #[test]
    fn release_underflow_is_an_error() {
        let tracker = PageTracker::new();
        assert!(matches!(tracker.release_target(&[0], &[]), Err(Error::PageCounterUnderflow(0))));
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let tracker = PageTracker::new();
        assert!(matches!(tracker.use_target(&[9999], &[]), Err(Error::PageOutOfRange(9999))));
    }

    #[test]
    fn invalidate_local_mem_ignores_texture_sources() {
        let tracker = PageTracker::new();
        tracker.use_source(&[7]).unwrap();
        assert!(!tracker.invalidate_local_mem(&[7]).unwrap());
        assert!(tracker.invalidate_video_mem(&[7]).unwrap());
    }
}
