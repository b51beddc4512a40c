//! Region-level visual diff.
//!
//! Instead of painting individual pixels, this engine locates connected
//! regions of differing pixels and overlays their bounding rectangles on
//! the target image:
//!
//! 1. build a boolean diff map over the union of the input rectangles,
//! 2. flood-fill 8-connected components and take their bounding boxes,
//! 3. fold overlapping or nearby boxes together until stable,
//! 4. draw each surviving box as a 3-pixel red border on a copy of the
//!    target.
//!
//! `diff_amount` is the summed rectangle area over the union area, so
//! unchanged pixels inside a bounding box inflate the ratio. Callers
//! depend on that reading; it is not a pixel-accurate measure.

use std::collections::VecDeque;
use std::ops::Range;
use std::ptr;

use rgb::RGBA8;

use crate::image::{Bounds, Image, RawSamples, Rgba8Image, WHITE};
use crate::parallel;
use crate::ycbcr::YCbCrImage;
use crate::ImageDiffResult;

const BORDER_COLOR: RGBA8 = RGBA8 {
    r: 255,
    g: 0,
    b: 0,
    a: 255,
};

/// Border line count drawn around each rectangle.
const BORDER_THICKNESS: i32 = 3;

/// Rectangles closer than this (in both axes) are folded together.
const MERGE_DISTANCE: i32 = 10;

/// Components must exceed this edge length in both axes to survive.
const MIN_COMPONENT_EDGE: i32 = 2;

/// A detected difference region, in the coordinate space of the inputs.
///
/// `width` and `height` are strictly positive for every rectangle the
/// engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Horizontal extent.
    pub width: i32,
    /// Vertical extent.
    pub height: i32,
}

impl Rect {
    /// Pixel area of the rectangle.
    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// Whether the two rectangles share any pixel.
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.x + self.width <= other.x
            || other.x + other.width <= self.x
            || self.y + self.height <= other.y
            || other.y + other.height <= self.y)
    }

    /// Whether the rectangles come within `distance` pixels of each
    /// other in both axes.
    #[must_use]
    pub fn is_close(&self, other: &Rect, distance: i32) -> bool {
        self.expand(distance).overlaps(&other.expand(distance))
    }

    /// Grows the rectangle by `n` pixels on every side.
    #[must_use]
    pub fn expand(&self, n: i32) -> Rect {
        Rect {
            x: self.x - n,
            y: self.y - n,
            width: self.width + 2 * n,
            height: self.height + 2 * n,
        }
    }

    /// The axis-aligned union of the two rectangles.
    #[must_use]
    pub fn combine(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Rectangle-level diff engine.
///
/// Stateless; safe to share across threads and reuse for any number of
/// comparisons.
#[derive(Debug, Clone, Default)]
pub struct RectangleDiff;

impl RectangleDiff {
    /// Creates the engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compares `baseline` against `target`.
    ///
    /// The result image has the target's bounds: the target's pixels
    /// with a red border around each merged difference region.
    /// `diff_amount` is the summed region area over the union area (0.0
    /// when the union is empty). Passing the same image object for both
    /// sides short-circuits to the baseline and 0.0.
    #[must_use]
    pub fn calculate(&self, baseline: &Image, target: &Image) -> ImageDiffResult {
        if ptr::eq(baseline, target) {
            return ImageDiffResult {
                image: baseline.clone(),
                diff_amount: 0.0,
            };
        }

        let rectangles = self.find_rectangles(baseline, target);

        let target_bounds = target.bounds();
        let mut result = rasterize(target);
        for rect in &rectangles {
            draw_border(&mut result, target_bounds, rect);
        }

        let union = baseline.bounds().union(&target_bounds);
        let total_diff_area: i64 = rectangles.iter().map(Rect::area).sum();
        let total_area = i64::from(union.width()) * i64::from(union.height());
        let diff_amount = if total_area > 0 {
            total_diff_area as f64 / total_area as f64
        } else {
            0.0
        };

        ImageDiffResult {
            image: Image::Rgba8(result),
            diff_amount,
        }
    }

    /// Phases 1–3: diff map, connected components, merge.
    fn find_rectangles(&self, baseline: &Image, target: &Image) -> Vec<Rect> {
        let union = baseline.bounds().union(&target.bounds());
        let width = union.width().max(0) as usize;
        let height = union.height().max(0) as usize;
        let mut map = vec![false; width * height];

        match (baseline, target) {
            (Image::Rgba8(b), Image::Rgba8(t)) => {
                let (bl, tg) = (b.raw(), t.raw());
                parallel::for_each_band(&mut map, width, height, |band, rows| {
                    band_map_rgba(bl, tg, union, &band, rows, width);
                });
            }
            (Image::YCbCr(b), Image::YCbCr(t)) => {
                parallel::for_each_band(&mut map, width, height, |band, rows| {
                    band_map_ycbcr(b, t, union, &band, rows, width);
                });
            }
            _ => {
                parallel::for_each_band(&mut map, width, height, |band, rows| {
                    band_map_generic(baseline, target, union, &band, rows, width);
                });
            }
        }

        let mut visited = vec![false; width * height];
        let mut rectangles = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if map[y * width + x] && !visited[y * width + x] {
                    let rect = bounding_box(&map, &mut visited, x, y, width, height, union);
                    if rect.width > MIN_COMPONENT_EDGE && rect.height > MIN_COMPONENT_EDGE {
                        rectangles.push(rect);
                    }
                }
            }
        }

        merge_rectangles(rectangles)
    }
}

/// Copies the target's pixel content into a fresh RGBA8 buffer over the
/// target's bounds.
fn rasterize(target: &Image) -> Rgba8Image {
    if let Image::Rgba8(img) = target {
        return img.clone();
    }
    let bounds = target.bounds();
    let mut out = Rgba8Image::new(bounds);
    for y in bounds.min_y..bounds.max_y {
        for x in bounds.min_x..bounds.max_x {
            out.set(x, y, target.at(x, y).unwrap_or(WHITE));
        }
    }
    out
}

/// Paints the four border lines of `rect`, widened by each thickness
/// step, clipped to the target bounds.
fn draw_border(out: &mut Rgba8Image, bounds: Bounds, rect: &Rect) {
    for t in 0..BORDER_THICKNESS {
        for x in (rect.x - t)..(rect.x + rect.width + t) {
            if x >= 0 && x < bounds.max_x {
                if rect.y - t >= 0 {
                    out.set(x, rect.y - t, BORDER_COLOR);
                }
                if rect.y + rect.height + t < bounds.max_y {
                    out.set(x, rect.y + rect.height + t, BORDER_COLOR);
                }
            }
        }
        for y in (rect.y - t)..(rect.y + rect.height + t) {
            if y >= 0 && y < bounds.max_y {
                if rect.x - t >= 0 {
                    out.set(rect.x - t, y, BORDER_COLOR);
                }
                if rect.x + rect.width + t < bounds.max_x {
                    out.set(rect.x + rect.width + t, y, BORDER_COLOR);
                }
            }
        }
    }
}

/// Marks one band of the diff map from two RGBA8 inputs.
///
/// A side with no pixel at a coordinate reads as opaque white, so a
/// white pixel facing a missing one compares equal.
fn band_map_rgba(
    bl: RawSamples<'_>,
    tg: RawSamples<'_>,
    union: Bounds,
    band: &Range<usize>,
    rows: &mut [bool],
    width: usize,
) {
    for (band_row, row) in band.clone().enumerate() {
        let y = union.min_y + row as i32;
        let out_row = band_row * width;
        for col in 0..width {
            let x = union.min_x + col as i32;
            let bp = sample_or_white(bl, x, y);
            let tp = sample_or_white(tg, x, y);
            if bp != tp {
                rows[out_row + col] = true;
            }
        }
    }
}

fn sample_or_white(img: RawSamples<'_>, x: i32, y: i32) -> [u8; 4] {
    if img.bounds.contains(x, y) {
        let off = img.pix_offset(x, y);
        if off >= 0 && off + 3 < img.pix.len() as i64 {
            let off = off as usize;
            return [
                img.pix[off],
                img.pix[off + 1],
                img.pix[off + 2],
                img.pix[off + 3],
            ];
        }
    }
    [255, 255, 255, 255]
}

/// Marks one band of the diff map from two planar YCbCr inputs.
///
/// Raw sample triples are compared where both sides have a pixel; a
/// coordinate covered by exactly one side is always marked different.
fn band_map_ycbcr(
    bl: &YCbCrImage,
    tg: &YCbCrImage,
    union: Bounds,
    band: &Range<usize>,
    rows: &mut [bool],
    width: usize,
) {
    for (band_row, row) in band.clone().enumerate() {
        let y = union.min_y + row as i32;
        let out_row = band_row * width;
        for col in 0..width {
            let x = union.min_x + col as i32;
            match (bl.triple_at(x, y), tg.triple_at(x, y)) {
                (Some(b), Some(t)) => {
                    if b != t {
                        rows[out_row + col] = true;
                    }
                }
                (None, None) => {}
                _ => rows[out_row + col] = true,
            }
        }
    }
}

/// Marks one band of the diff map through the polymorphic accessor.
fn band_map_generic(
    baseline: &Image,
    target: &Image,
    union: Bounds,
    band: &Range<usize>,
    rows: &mut [bool],
    width: usize,
) {
    for (band_row, row) in band.clone().enumerate() {
        let y = union.min_y + row as i32;
        let out_row = band_row * width;
        for col in 0..width {
            let x = union.min_x + col as i32;
            let bp = baseline.at(x, y).unwrap_or(WHITE);
            let tp = target.at(x, y).unwrap_or(WHITE);
            if bp != tp {
                rows[out_row + col] = true;
            }
        }
    }
}

/// Breadth-first flood over the 8-connected component containing
/// `(start_x, start_y)`, returning its bounding box translated back
/// into input coordinates.
fn bounding_box(
    map: &[bool],
    visited: &mut [bool],
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    union: Bounds,
) -> Rect {
    let mut min_x = start_x;
    let mut min_y = start_y;
    let mut max_x = start_x;
    let mut max_y = start_y;

    let mut queue = VecDeque::new();
    queue.push_back((start_x, start_y));
    visited[start_y * width + start_x] = true;

    while let Some((px, py)) = queue.pop_front() {
        min_x = min_x.min(px);
        max_x = max_x.max(px);
        min_y = min_y.min(py);
        max_y = max_y.max(py);

        for dy in -1_i64..=1 {
            for dx in -1_i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = px as i64 + dx;
                let ny = py as i64 + dy;
                if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                    let idx = ny as usize * width + nx as usize;
                    if map[idx] && !visited[idx] {
                        visited[idx] = true;
                        queue.push_back((nx as usize, ny as usize));
                    }
                }
            }
        }
    }

    Rect {
        x: min_x as i32 + union.min_x,
        y: min_y as i32 + union.min_y,
        width: (max_x - min_x) as i32 + 1,
        height: (max_y - min_y) as i32 + 1,
    }
}

/// Folds rectangles that overlap or lie within [`MERGE_DISTANCE`] of
/// each other until a pass makes no change. Deterministic given the
/// row-major component order.
fn merge_rectangles(rects: Vec<Rect>) -> Vec<Rect> {
    if rects.len() <= 1 {
        return rects;
    }

    let mut merged = Vec::new();
    let mut used = vec![false; rects.len()];

    for i in 0..rects.len() {
        if used[i] {
            continue;
        }

        let mut current = rects[i];
        let mut merged_any = true;
        while merged_any {
            merged_any = false;
            for j in (i + 1)..rects.len() {
                if used[j] {
                    continue;
                }
                if current.overlaps(&rects[j]) || current.is_close(&rects[j], MERGE_DISTANCE) {
                    current = current.combine(&rects[j]);
                    used[j] = true;
                    merged_any = true;
                }
            }
        }

        merged.push(current);
    }

    merged
}
