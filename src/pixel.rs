//! Per-pixel visual diff.
//!
//! Classifies every pixel of the union of the two input rectangles as
//! unchanged, brighter in the target (painted red, counted as added) or
//! darker in the target (painted blue, counted as removed). Pixels the
//! brightness test leaves unclassified keep the baseline's value even
//! when the channels differ. Where either input has no pixel at a
//! coordinate, the output is opaque white and nothing is counted.
//!
//! Inputs sharing an encoding are walked through their raw sample
//! buffers; mixed encodings fall back to the polymorphic accessor.

use std::ops::Range;
use std::ptr;
use std::sync::atomic::{AtomicI64, Ordering};

use rgb::RGBA8;

use crate::image::{Bounds, Image, RawSamples, Rgba8Image, WHITE};
use crate::parallel;
use crate::ycbcr::{ycbcr_to_rgba, YCbCrImage};
use crate::ImageDiffResult;

const ADDED: RGBA8 = RGBA8 {
    r: 255,
    g: 0,
    b: 0,
    a: 255,
};

const REMOVED: RGBA8 = RGBA8 {
    r: 0,
    g: 0,
    b: 255,
    a: 255,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum PixelClass {
    Added,
    Removed,
    Unchanged,
}

/// Pixel-level diff engine.
///
/// Immutable after construction; safe to share across threads and
/// reuse for any number of comparisons.
#[derive(Debug, Clone)]
pub struct PixelDiff {
    threshold: f64,
}

impl PixelDiff {
    /// Creates an engine with the given brightness threshold.
    ///
    /// A pixel pair whose normalized brightness delta exceeds the
    /// threshold in magnitude is classified added (brighter) or removed
    /// (darker); anything inside the band stays unchanged. See
    /// [`crate::DEFAULT_BRIGHTNESS_THRESHOLD`].
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured brightness threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compares `baseline` against `target`.
    ///
    /// The result image covers the union of the two input rectangles;
    /// `diff_amount` is the classified pixel count over the union area
    /// (0.0 when the union is empty). Passing the same image object for
    /// both sides short-circuits to the baseline and 0.0.
    #[must_use]
    pub fn calculate(&self, baseline: &Image, target: &Image) -> ImageDiffResult {
        if ptr::eq(baseline, target) {
            return ImageDiffResult {
                image: baseline.clone(),
                diff_amount: 0.0,
            };
        }

        let bounds = baseline.bounds().union(&target.bounds());
        let mut out = Rgba8Image::filled(bounds, WHITE);
        let added = AtomicI64::new(0);
        let removed = AtomicI64::new(0);

        match (baseline, target) {
            (Image::Rgba8(b), Image::Rgba8(t)) => {
                self.run_interleaved(b.raw(), t.raw(), &mut out, bounds, &added, &removed);
            }
            (Image::NRgba8(b), Image::NRgba8(t)) => {
                self.run_interleaved(b.raw(), t.raw(), &mut out, bounds, &added, &removed);
            }
            (Image::Rgba16(b), Image::Rgba16(t)) => {
                self.run_interleaved(b.raw(), t.raw(), &mut out, bounds, &added, &removed);
            }
            (Image::NRgba16(b), Image::NRgba16(t)) => {
                self.run_interleaved(b.raw(), t.raw(), &mut out, bounds, &added, &removed);
            }
            (Image::YCbCr(b), Image::YCbCr(t)) => {
                self.run_ycbcr(b, t, &mut out, bounds, &added, &removed);
            }
            _ => self.run_generic(baseline, target, &mut out, bounds, &added, &removed),
        }

        let total = i64::from(bounds.width()) * i64::from(bounds.height());
        let counted = added.load(Ordering::SeqCst) + removed.load(Ordering::SeqCst);
        let diff_amount = if total > 0 {
            counted as f64 / total as f64
        } else {
            0.0
        };

        ImageDiffResult {
            image: Image::Rgba8(out),
            diff_amount,
        }
    }

    fn run_interleaved(
        &self,
        bl: RawSamples<'_>,
        tg: RawSamples<'_>,
        out: &mut Rgba8Image,
        bounds: Bounds,
        added: &AtomicI64,
        removed: &AtomicI64,
    ) {
        let stride = out.stride();
        let height = bounds.height().max(0) as usize;
        parallel::for_each_band(out.pix_mut(), stride, height, |band, rows| {
            let (a, r) = self.band_interleaved(bl, tg, bounds, &band, rows, stride);
            added.fetch_add(a, Ordering::SeqCst);
            removed.fetch_add(r, Ordering::SeqCst);
        });
    }

    /// Walks one band of two same-encoding interleaved inputs.
    ///
    /// For the 16-bit encodings only byte offsets 1, 3, 5 and 7 of each
    /// sample take part in the comparison and the painted output.
    fn band_interleaved(
        &self,
        bl: RawSamples<'_>,
        tg: RawSamples<'_>,
        bounds: Bounds,
        band: &Range<usize>,
        rows: &mut [u8],
        stride: usize,
    ) -> (i64, i64) {
        let channel_step = bl.bytes_per_pixel / 4;
        let sample_off = channel_step - 1;
        let span = bl.bytes_per_pixel as i64 - 1;
        let width = bounds.width().max(0);
        let mut local_added = 0_i64;
        let mut local_removed = 0_i64;

        for (band_row, row) in band.clone().enumerate() {
            let y = bounds.min_y + row as i32;
            let out_row = band_row * stride;
            for col in 0..width {
                let x = bounds.min_x + col;
                let out_off = out_row + col as usize * 4;
                let b_off = bl.pix_offset(x, y);
                let t_off = tg.pix_offset(x, y);

                if bl.bounds.contains(x, y)
                    && tg.bounds.contains(x, y)
                    && b_off >= 0
                    && b_off + span < bl.pix.len() as i64
                    && t_off >= 0
                    && t_off + span < tg.pix.len() as i64
                {
                    let bp = read_channels(bl.pix, b_off as usize, channel_step, sample_off);
                    let tp = read_channels(tg.pix, t_off as usize, channel_step, sample_off);
                    if bp == tp {
                        write_px(rows, out_off, bp);
                    } else {
                        let (px, class) = self.classify(bp, tp);
                        write_px(rows, out_off, px);
                        match class {
                            PixelClass::Added => local_added += 1,
                            PixelClass::Removed => local_removed += 1,
                            PixelClass::Unchanged => {}
                        }
                    }
                } else {
                    write_px(rows, out_off, WHITE);
                }
            }
        }

        (local_added, local_removed)
    }

    fn run_ycbcr(
        &self,
        bl: &YCbCrImage,
        tg: &YCbCrImage,
        out: &mut Rgba8Image,
        bounds: Bounds,
        added: &AtomicI64,
        removed: &AtomicI64,
    ) {
        let stride = out.stride();
        let height = bounds.height().max(0) as usize;
        parallel::for_each_band(out.pix_mut(), stride, height, |band, rows| {
            let (a, r) = self.band_ycbcr(bl, tg, bounds, &band, rows, stride);
            added.fetch_add(a, Ordering::SeqCst);
            removed.fetch_add(r, Ordering::SeqCst);
        });
    }

    /// Walks one band of two planar YCbCr inputs.
    ///
    /// Raw `(Y, Cb, Cr)` equality settles most pixels without leaving
    /// the planes; unequal triples are converted and re-tested as RGBA
    /// before the brightness rule applies.
    fn band_ycbcr(
        &self,
        bl: &YCbCrImage,
        tg: &YCbCrImage,
        bounds: Bounds,
        band: &Range<usize>,
        rows: &mut [u8],
        stride: usize,
    ) -> (i64, i64) {
        let width = bounds.width().max(0);
        let mut local_added = 0_i64;
        let mut local_removed = 0_i64;

        for (band_row, row) in band.clone().enumerate() {
            let y = bounds.min_y + row as i32;
            let out_row = band_row * stride;
            for col in 0..width {
                let x = bounds.min_x + col;
                let out_off = out_row + col as usize * 4;
                match (bl.triple_at(x, y), tg.triple_at(x, y)) {
                    (Some(b), Some(t)) => {
                        if b == t {
                            write_px(rows, out_off, ycbcr_to_rgba(b.0, b.1, b.2));
                        } else {
                            let bp = ycbcr_to_rgba(b.0, b.1, b.2);
                            let tp = ycbcr_to_rgba(t.0, t.1, t.2);
                            if bp == tp {
                                write_px(rows, out_off, bp);
                            } else {
                                let (px, class) = self.classify(bp, tp);
                                write_px(rows, out_off, px);
                                match class {
                                    PixelClass::Added => local_added += 1,
                                    PixelClass::Removed => local_removed += 1,
                                    PixelClass::Unchanged => {}
                                }
                            }
                        }
                    }
                    _ => write_px(rows, out_off, WHITE),
                }
            }
        }

        (local_added, local_removed)
    }

    fn run_generic(
        &self,
        baseline: &Image,
        target: &Image,
        out: &mut Rgba8Image,
        bounds: Bounds,
        added: &AtomicI64,
        removed: &AtomicI64,
    ) {
        let stride = out.stride();
        let height = bounds.height().max(0) as usize;
        parallel::for_each_band(out.pix_mut(), stride, height, |band, rows| {
            let (a, r) = self.band_generic(baseline, target, bounds, &band, rows, stride);
            added.fetch_add(a, Ordering::SeqCst);
            removed.fetch_add(r, Ordering::SeqCst);
        });
    }

    /// Walks one band through the polymorphic accessor. Handles any
    /// pair of encodings.
    fn band_generic(
        &self,
        baseline: &Image,
        target: &Image,
        bounds: Bounds,
        band: &Range<usize>,
        rows: &mut [u8],
        stride: usize,
    ) -> (i64, i64) {
        let width = bounds.width().max(0);
        let mut local_added = 0_i64;
        let mut local_removed = 0_i64;

        for (band_row, row) in band.clone().enumerate() {
            let y = bounds.min_y + row as i32;
            let out_row = band_row * stride;
            for col in 0..width {
                let x = bounds.min_x + col;
                let out_off = out_row + col as usize * 4;
                match (baseline.at(x, y), target.at(x, y)) {
                    (Some(bp), Some(tp)) => {
                        if bp == tp {
                            write_px(rows, out_off, bp);
                        } else {
                            let (px, class) = self.classify(bp, tp);
                            write_px(rows, out_off, px);
                            match class {
                                PixelClass::Added => local_added += 1,
                                PixelClass::Removed => local_removed += 1,
                                PixelClass::Unchanged => {}
                            }
                        }
                    }
                    _ => write_px(rows, out_off, WHITE),
                }
            }
        }

        (local_added, local_removed)
    }

    /// Applies the brightness rule to an unequal pixel pair.
    ///
    /// The delta is `(Σ target RGB − Σ baseline RGB) / (255·3)`; above
    /// the threshold paints red, below its negation paints blue, and
    /// anything between keeps the baseline pixel unclassified.
    fn classify(&self, baseline: RGBA8, target: RGBA8) -> (RGBA8, PixelClass) {
        let baseline_brightness =
            i32::from(baseline.r) + i32::from(baseline.g) + i32::from(baseline.b);
        let target_brightness = i32::from(target.r) + i32::from(target.g) + i32::from(target.b);
        let normalized = f64::from(target_brightness - baseline_brightness) / (255.0 * 3.0);

        if normalized > self.threshold {
            (ADDED, PixelClass::Added)
        } else if normalized < -self.threshold {
            (REMOVED, PixelClass::Removed)
        } else {
            (baseline, PixelClass::Unchanged)
        }
    }
}

/// Reads the four channels of one pixel at 8 bits each.
///
/// `step` is the bytes per channel, `sample_off` selects which byte of
/// each multi-byte sample participates.
#[inline]
fn read_channels(pix: &[u8], off: usize, step: usize, sample_off: usize) -> RGBA8 {
    RGBA8 {
        r: pix[off + sample_off],
        g: pix[off + step + sample_off],
        b: pix[off + 2 * step + sample_off],
        a: pix[off + 3 * step + sample_off],
    }
}

#[inline]
fn write_px(rows: &mut [u8], off: usize, px: RGBA8) {
    rows[off] = px.r;
    rows[off + 1] = px.g;
    rows[off + 2] = px.b;
    rows[off + 3] = px.a;
}
