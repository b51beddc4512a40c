//! Cross-engine integration properties.
//!
//! The band-parallel engines must produce bit-identical results for any
//! worker count, and every engine's ratio must stay inside `[0, 1]`.
//! The line diff must describe an edit script that actually rebuilds
//! the target from the baseline.

use proptest::prelude::*;
use snapdiff::{
    Bounds, Image, LineDiff, PixelDiff, RectangleDiff, Rgba8Image, DEFAULT_BRIGHTNESS_THRESHOLD,
    RGBA8,
};

/// Deterministic pseudo-random RGBA image, same for every run.
fn patterned(width: i32, height: i32, seed: u64) -> Image {
    let mut state = seed | 1;
    let mut next = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as u8
    };
    let mut img = Rgba8Image::new(Bounds::from_size(width, height));
    for y in 0..height {
        for x in 0..width {
            img.set(
                x,
                y,
                RGBA8 {
                    r: next(),
                    g: next(),
                    b: next(),
                    a: 255,
                },
            );
        }
    }
    Image::from(img)
}

fn pix_bytes(image: &Image) -> &[u8] {
    match image {
        Image::Rgba8(img) => img.pix(),
        _ => panic!("expected RGBA8 output"),
    }
}

fn with_pool<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> T {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("failed to build thread pool")
        .install(f)
}

/// Pixel diff output does not depend on the worker count.
#[test]
fn test_pixel_diff_deterministic_across_pools() {
    let baseline = patterned(131, 97, 7);
    let target = patterned(131, 97, 1234);
    let engine = PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD);

    let reference = with_pool(1, || engine.calculate(&baseline, &target));
    for threads in [2, 3, 7, 16] {
        let result = with_pool(threads, || engine.calculate(&baseline, &target));
        assert_eq!(
            result.diff_amount, reference.diff_amount,
            "diff_amount diverged with {threads} workers"
        );
        assert_eq!(
            pix_bytes(&result.image),
            pix_bytes(&reference.image),
            "output image diverged with {threads} workers"
        );
    }
}

/// Rectangle diff output does not depend on the worker count.
#[test]
fn test_rectangle_diff_deterministic_across_pools() {
    let baseline = patterned(131, 97, 7);
    let mut target = Rgba8Image::filled(
        Bounds::from_size(131, 97),
        RGBA8::new(255, 255, 255, 255),
    );
    for y in 20..40 {
        for x in 30..70 {
            target.set(x, y, RGBA8::new(0, 0, 0, 255));
        }
    }
    let target = Image::from(target);
    let engine = RectangleDiff::new();

    let reference = with_pool(1, || engine.calculate(&baseline, &target));
    for threads in [2, 3, 7, 16] {
        let result = with_pool(threads, || engine.calculate(&baseline, &target));
        assert_eq!(result.diff_amount, reference.diff_amount);
        assert_eq!(pix_bytes(&result.image), pix_bytes(&reference.image));
    }
}

/// Pixel diff output covers the union of the input rectangles; the
/// rectangle diff output keeps the target's rectangle.
#[test]
fn test_output_bounds() {
    let baseline = patterned(40, 60, 3);
    let target = patterned(64, 32, 4);

    let result = PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD).calculate(&baseline, &target);
    assert_eq!(result.image.bounds(), Bounds::from_size(64, 60));

    let result = RectangleDiff::new().calculate(&baseline, &target);
    assert_eq!(result.image.bounds(), target.bounds());
}

/// Identical content compared through distinct buffers still walks the
/// full path and reports zero difference.
#[test]
fn test_identical_buffers_full_path() {
    let a = patterned(50, 50, 42);
    let b = patterned(50, 50, 42);
    assert_eq!(
        PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD)
            .calculate(&a, &b)
            .diff_amount,
        0.0
    );
    assert_eq!(RectangleDiff::new().calculate(&a, &b).diff_amount, 0.0);
}

/// Splits a rendered diff back into prefixed lines.
fn diff_lines(diff: &[u8]) -> Vec<&[u8]> {
    if diff.is_empty() {
        return Vec::new();
    }
    diff.split(|&b| b == b'\n').collect()
}

/// Replays the edit script: kept and added lines rebuild the target,
/// kept and removed lines rebuild the baseline.
fn replay(diff: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut baseline_lines: Vec<&[u8]> = Vec::new();
    let mut target_lines: Vec<&[u8]> = Vec::new();
    for line in diff_lines(diff) {
        let (prefix, content) = line.split_at(2);
        match prefix {
            b"  " => {
                baseline_lines.push(content);
                target_lines.push(content);
            }
            b"+ " => target_lines.push(content),
            b"- " => baseline_lines.push(content),
            other => panic!("unexpected diff prefix {other:?}"),
        }
    }
    (baseline_lines.join(&b'\n'), target_lines.join(&b'\n'))
}

proptest! {
    /// The line diff's edit script reconstructs both inputs.
    #[test]
    fn prop_line_diff_round_trip(
        baseline_lines in prop::collection::vec("[abc]{0,3}", 0..10),
        target_lines in prop::collection::vec("[abc]{0,3}", 0..10),
    ) {
        let baseline = baseline_lines.join("\n");
        let target = target_lines.join("\n");
        let result = LineDiff::new()
            .calculate(baseline.as_bytes(), target.as_bytes())
            .expect("line diff cannot fail");

        let (rebuilt_baseline, rebuilt_target) = replay(&result.diff);
        prop_assert_eq!(rebuilt_baseline, baseline.into_bytes());
        prop_assert_eq!(rebuilt_target, target.into_bytes());
        prop_assert!((0.0..=1.0).contains(&result.diff_amount));
    }

    /// Image engines keep their ratio inside the unit interval for
    /// arbitrary small inputs, including degenerate empty ones.
    #[test]
    fn prop_image_ratio_in_unit_interval(
        bw in 0i32..24,
        bh in 0i32..24,
        tw in 0i32..24,
        th in 0i32..24,
        seed_b in any::<u64>(),
        seed_t in any::<u64>(),
    ) {
        let baseline = patterned(bw, bh, seed_b);
        let target = patterned(tw, th, seed_t);

        let pixel = PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD).calculate(&baseline, &target);
        prop_assert!((0.0..=1.0).contains(&pixel.diff_amount));
        prop_assert_eq!(
            pixel.image.bounds(),
            baseline.bounds().union(&target.bounds())
        );

        let rect = RectangleDiff::new().calculate(&baseline, &target);
        prop_assert!(rect.diff_amount >= 0.0);
        prop_assert_eq!(rect.image.bounds(), target.bounds());
    }

    /// A baseline compared against itself (distinct buffer) is clean
    /// for every engine.
    #[test]
    fn prop_self_comparison_is_clean(
        w in 1i32..24,
        h in 1i32..24,
        seed in any::<u64>(),
        text in "[ab\n]{0,20}",
    ) {
        let a = patterned(w, h, seed);
        let b = patterned(w, h, seed);
        prop_assert_eq!(
            PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD).calculate(&a, &b).diff_amount,
            0.0
        );
        prop_assert_eq!(RectangleDiff::new().calculate(&a, &b).diff_amount, 0.0);

        let result = LineDiff::new()
            .calculate(text.as_bytes(), text.as_bytes())
            .expect("line diff cannot fail");
        prop_assert_eq!(result.diff_amount, 0.0);
        for line in diff_lines(&result.diff) {
            prop_assert!(line.starts_with(b"  "));
        }
    }
}
