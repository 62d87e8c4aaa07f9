//! Byte-range partitioning for the parallel scans.

use memchr::memchr;
use std::ops::Range;

/// Split `data` into up to `workers` ranges of whole lines.
///
/// Raw boundaries at multiples of len/workers are snapped forward: a range
/// start (except the first) moves past the next `\n`, a range end moves to
/// the byte after the next `\n` or to the end of the buffer. Adjacent
/// ranges compute the same snap point, so every line lands in exactly one
/// range with no pre-scan of the newlines.
pub fn aligned_ranges(data: &[u8], workers: usize) -> Vec<Range<usize>> {
    let len = data.len();
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let chunk = len / workers;

    let mut ranges = Vec::with_capacity(workers);
    for w in 0..workers {
        let mut start = w * chunk;
        let mut end = if w + 1 == workers { len } else { (w + 1) * chunk };
        if w > 0 {
            start = match memchr(b'\n', &data[start..]) {
                Some(i) => start + i + 1,
                None => len,
            };
        }
        if end < len {
            end = match memchr(b'\n', &data[end..]) {
                Some(i) => end + i + 1,
                None => len,
            };
        }
        ranges.push(start..end);
    }
    ranges
}

/// Contiguous even split of `0..rows`; the last range absorbs the
/// remainder. Used for the aggregation scan, where rows are already
/// delimited.
pub fn row_ranges(rows: usize, workers: usize) -> Vec<Range<usize>> {
    if rows == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, rows);
    let chunk = rows / workers;
    (0..workers)
        .map(|w| {
            let start = w * chunk;
            let end = if w + 1 == workers { rows } else { start + chunk };
            start..end
        })
        .collect()
}
