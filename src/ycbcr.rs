//! Planar YCbCr pixel buffers and the fixed-point BT.601 conversion.
//!
//! JPEG decoders produce this encoding directly: a full-resolution Y
//! plane plus Cb and Cr planes that may be subsampled horizontally
//! and/or vertically. `c_offset` maps a pixel coordinate to the chroma
//! sample index shared by its subsampling block.
//!
//! The conversion to RGB uses the JPEG full-range ITU-R BT.601 matrix
//! with coefficients scaled by 2^16 so the kernels stay in integer
//! arithmetic:
//!
//! ```text
//! R = Y + 1.402    · (Cr − 128)
//! G = Y − 0.344136 · (Cb − 128) − 0.714136 · (Cr − 128)
//! B = Y + 1.772    · (Cb − 128)
//! ```

use rgb::RGBA8;

use crate::image::Bounds;

// BT.601 coefficients × 2^16.
const CR_TO_R: i32 = 91881; // 1.402    * 65536
const CB_TO_G: i32 = 22554; // 0.344136 * 65536
const CR_TO_G: i32 = 46802; // 0.714136 * 65536
const CB_TO_B: i32 = 116130; // 1.772   * 65536

/// Converts one full-range YCbCr sample to opaque 8-bit RGBA.
#[must_use]
pub fn ycbcr_to_rgba(y: u8, cb: u8, cr: u8) -> RGBA8 {
    // y * 0x10101 replicates the 8-bit value across 24 bits, which is
    // y * 65536 once the >> 16 below is applied.
    let yy = i32::from(y) * 0x10101;
    let cb1 = i32::from(cb) - 128;
    let cr1 = i32::from(cr) - 128;

    let r = (yy + CR_TO_R * cr1) >> 16;
    let g = (yy - CB_TO_G * cb1 - CR_TO_G * cr1) >> 16;
    let b = (yy + CB_TO_B * cb1) >> 16;

    RGBA8 {
        r: r.clamp(0, 255) as u8,
        g: g.clamp(0, 255) as u8,
        b: b.clamp(0, 255) as u8,
        a: 255,
    }
}

/// Chroma subsampling ratio of a planar YCbCr buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsampleRatio {
    /// Full-resolution chroma.
    Ratio444,
    /// Chroma halved horizontally.
    Ratio422,
    /// Chroma halved in both axes.
    Ratio420,
    /// Chroma halved vertically.
    Ratio440,
    /// Chroma quartered horizontally.
    Ratio411,
    /// Chroma quartered horizontally, halved vertically.
    Ratio410,
}

/// Planar YCbCr image: full-resolution Y plane, subsampled Cb/Cr planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YCbCrImage {
    y: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
    y_stride: usize,
    c_stride: usize,
    ratio: SubsampleRatio,
    bounds: Bounds,
}

impl YCbCrImage {
    /// Creates a zero-filled image covering `bounds` at the given
    /// subsampling ratio. Plane dimensions round outward so every pixel
    /// has a chroma sample.
    #[must_use]
    pub fn new(bounds: Bounds, ratio: SubsampleRatio) -> Self {
        let w = bounds.width().max(0);
        let h = bounds.height().max(0);
        let (cw, ch) = match ratio {
            SubsampleRatio::Ratio444 => (w, h),
            SubsampleRatio::Ratio422 => ((bounds.max_x + 1) / 2 - bounds.min_x / 2, h),
            SubsampleRatio::Ratio420 => (
                (bounds.max_x + 1) / 2 - bounds.min_x / 2,
                (bounds.max_y + 1) / 2 - bounds.min_y / 2,
            ),
            SubsampleRatio::Ratio440 => (w, (bounds.max_y + 1) / 2 - bounds.min_y / 2),
            SubsampleRatio::Ratio411 => ((bounds.max_x + 3) / 4 - bounds.min_x / 4, h),
            SubsampleRatio::Ratio410 => (
                (bounds.max_x + 3) / 4 - bounds.min_x / 4,
                (bounds.max_y + 1) / 2 - bounds.min_y / 2,
            ),
        };
        let (cw, ch) = (cw.max(0) as usize, ch.max(0) as usize);
        let (w, h) = (w as usize, h as usize);
        Self {
            y: vec![0; w * h],
            cb: vec![0; cw * ch],
            cr: vec![0; cw * ch],
            y_stride: w,
            c_stride: cw,
            ratio,
            bounds,
        }
    }

    /// Wraps existing plane buffers.
    ///
    /// # Panics
    /// Panics if the Y plane doesn't match the bounds at `y_stride`, or
    /// the chroma planes differ in length.
    #[must_use]
    pub fn from_planes(
        y: Vec<u8>,
        cb: Vec<u8>,
        cr: Vec<u8>,
        y_stride: usize,
        c_stride: usize,
        ratio: SubsampleRatio,
        bounds: Bounds,
    ) -> Self {
        let height = bounds.height().max(0) as usize;
        assert_eq!(y.len(), y_stride * height);
        assert_eq!(cb.len(), cr.len());
        Self {
            y,
            cb,
            cr,
            y_stride,
            c_stride,
            ratio,
            bounds,
        }
    }

    /// Bounding rectangle of the image.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Subsampling ratio of the chroma planes.
    #[inline]
    #[must_use]
    pub fn ratio(&self) -> SubsampleRatio {
        self.ratio
    }

    /// The luma plane.
    #[inline]
    #[must_use]
    pub fn y_plane(&self) -> &[u8] {
        &self.y
    }

    /// The blue-difference chroma plane.
    #[inline]
    #[must_use]
    pub fn cb_plane(&self) -> &[u8] {
        &self.cb
    }

    /// The red-difference chroma plane.
    #[inline]
    #[must_use]
    pub fn cr_plane(&self) -> &[u8] {
        &self.cr
    }

    /// Samples per row of the Y plane.
    #[inline]
    #[must_use]
    pub fn y_stride(&self) -> usize {
        self.y_stride
    }

    /// Samples per row of the chroma planes.
    #[inline]
    #[must_use]
    pub fn c_stride(&self) -> usize {
        self.c_stride
    }

    /// Index into the Y plane for pixel `(x, y)`.
    ///
    /// May land outside the plane for out-of-rectangle coordinates;
    /// callers bounds-check before indexing.
    #[inline]
    #[must_use]
    pub fn y_offset(&self, x: i32, y: i32) -> i64 {
        i64::from(y - self.bounds.min_y) * self.y_stride as i64
            + i64::from(x - self.bounds.min_x)
    }

    /// Index into the Cb/Cr planes for pixel `(x, y)` under the image's
    /// subsampling ratio. Division truncates toward zero.
    #[inline]
    #[must_use]
    pub fn c_offset(&self, x: i32, y: i32) -> i64 {
        let b = self.bounds;
        let (row, col) = match self.ratio {
            SubsampleRatio::Ratio444 => (y - b.min_y, x - b.min_x),
            SubsampleRatio::Ratio422 => (y - b.min_y, x / 2 - b.min_x / 2),
            SubsampleRatio::Ratio420 => (y / 2 - b.min_y / 2, x / 2 - b.min_x / 2),
            SubsampleRatio::Ratio440 => (y / 2 - b.min_y / 2, x - b.min_x),
            SubsampleRatio::Ratio411 => (y - b.min_y, x / 4 - b.min_x / 4),
            SubsampleRatio::Ratio410 => (y / 2 - b.min_y / 2, x / 4 - b.min_x / 4),
        };
        i64::from(row) * self.c_stride as i64 + i64::from(col)
    }

    /// Reads the raw `(Y, Cb, Cr)` triple for pixel `(x, y)`, or `None`
    /// outside the bounds or past a plane's end.
    #[must_use]
    pub fn triple_at(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let yo = self.y_offset(x, y);
        let co = self.c_offset(x, y);
        if yo < 0 || yo >= self.y.len() as i64 || co < 0 || co >= self.cb.len() as i64 {
            return None;
        }
        Some((self.y[yo as usize], self.cb[co as usize], self.cr[co as usize]))
    }

    /// Decodes the pixel at `(x, y)` to 8-bit RGBA.
    #[must_use]
    pub fn rgba_at(&self, x: i32, y: i32) -> Option<RGBA8> {
        let (y_val, cb, cr) = self.triple_at(x, y)?;
        Some(ycbcr_to_rgba(y_val, cb, cr))
    }

    /// Writes the sample triple backing pixel `(x, y)`. Chroma writes
    /// land on the subsampling block shared with neighboring pixels.
    /// Writes outside the bounds are silently dropped.
    pub fn set(&mut self, x: i32, y: i32, y_val: u8, cb: u8, cr: u8) {
        if !self.bounds.contains(x, y) {
            return;
        }
        let yo = self.y_offset(x, y);
        if yo >= 0 && yo < self.y.len() as i64 {
            self.y[yo as usize] = y_val;
        }
        let co = self.c_offset(x, y);
        if co >= 0 && co < self.cb.len() as i64 {
            self.cb[co as usize] = cb;
            self.cr[co as usize] = cr;
        }
    }

    /// Fills all three planes with one sample triple.
    pub fn fill(&mut self, y_val: u8, cb: u8, cr: u8) {
        self.y.fill(y_val);
        self.cb.fill(cb);
        self.cr.fill(cr);
    }
}
