//! Splitting of index ranges across workers.

use std::ops::Range;

/// Splits `range` into `min(workers, range.len())` contiguous chunks.
///
/// Every chunk but the last holds `len / affinity` items; the remainder is
/// folded into the last one. An empty range yields no chunks.
pub(crate) fn split_range(range: Range<usize>, workers: usize) -> Vec<Range<usize>> {
    let item_count = range.len();
    let affinity = workers.min(item_count);
    if affinity == 0 {
        return Vec::new();
    }
    let per_chunk = item_count / affinity;

    (0..affinity)
        .map(|index| {
            let begin = range.start + index * per_chunk;
            let end = if index + 1 == affinity {
                range.end
            } else {
                begin + per_chunk
            };
            begin..end
        })
        .collect()
}
