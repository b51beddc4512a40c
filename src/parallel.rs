//! Row-band partitioning for the data-parallel kernels.
//!
//! Both image engines walk their output grid in horizontal bands, one
//! band per worker. The partition is a pure computation; the dispatch
//! splits the flat output buffer into disjoint per-band row slices, so
//! no two workers ever write the same byte and the kernels need no
//! locking.
//!
//! The worker count is the rayon pool size, which derives from
//! `std::thread::available_parallelism` and therefore respects cgroup
//! CPU quotas inside containers.

use std::ops::Range;

use rayon::prelude::*;

/// Effective parallelism for band dispatch.
#[must_use]
pub(crate) fn worker_count() -> usize {
    rayon::current_num_threads()
}

/// Partitions `[0, height)` into `workers` contiguous bands of
/// `height / workers` rows each; the last band absorbs the remainder.
///
/// Bands may be empty when `workers > height`. The concatenation of the
/// returned ranges is always exactly `[0, height)`.
#[must_use]
pub(crate) fn band_rows(height: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let rows_per_worker = height / workers;
    (0..workers)
        .map(|i| {
            let start = i * rows_per_worker;
            let end = if i == workers - 1 {
                height
            } else {
                start + rows_per_worker
            };
            start..end
        })
        .collect()
}

/// Runs `f` once per band over disjoint row slices of `buf`.
///
/// `buf` must hold exactly `height` rows of `row_len` elements. Each
/// invocation receives the band's row range and the sub-slice covering
/// exactly those rows. Returns after every band has completed.
pub(crate) fn for_each_band<T, F>(buf: &mut [T], row_len: usize, height: usize, f: F)
where
    T: Send,
    F: Fn(Range<usize>, &mut [T]) + Sync,
{
    debug_assert_eq!(buf.len(), row_len * height);

    let bands = band_rows(height, worker_count());
    let mut slices = Vec::with_capacity(bands.len());
    let mut rest = buf;
    for band in &bands {
        let (head, tail) = rest.split_at_mut(band.len() * row_len);
        slices.push(head);
        rest = tail;
    }

    bands
        .into_par_iter()
        .zip(slices.into_par_iter())
        .for_each(|(band, slice)| f(band, slice));
}
