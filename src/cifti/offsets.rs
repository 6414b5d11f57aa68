//! Contiguous offset allocation over the composite index.

use std::ops::Range;

/// Column range of each count, in order. Ranges tile `0..sum(counts)`;
/// a zero count gets an empty range at the previous end.
pub fn allocate_offsets(counts: &[usize]) -> Vec<Range<usize>> {
    counts
        .iter()
        .scan(0usize, |next, &count| {
            let start = *next;
            *next += count;
            Some(start..*next)
        })
        .collect()
}
