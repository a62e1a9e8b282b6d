//! Parallel merge sort over sorted runs of doubling width.
//!
//! Each pass merges adjacent runs of width `w` into runs of width `2w`,
//! taking `log2(n)` passes. A pass is a single gather dispatch: every output
//! position locates its element with a co-rank binary search over the two
//! source runs, so no invocation writes outside its own slot. Runs from the
//! previous pass must be complete before the next pass reads them — the
//! dispatch boundary is that barrier. Equal keys always take the left run
//! first, which makes the sort stable.

use super::SortItem;
use crate::grid::ComputeGrid;

pub(crate) fn sort(grid: &ComputeGrid, items: &[SortItem]) -> Vec<SortItem> {
    let n = items.len();
    if n <= 1 {
        return items.to_vec();
    }

    let mut buf = items.to_vec();
    let mut width = 1;
    while width < n {
        let prev = buf;
        buf = grid.dispatch_map(n, |out| {
            let pair_start = out / (2 * width) * (2 * width);
            let left_len = width.min(n - pair_start);
            let right_start = pair_start + left_len;
            let right_len = if right_start < n {
                width.min(n - right_start)
            } else {
                0
            };
            let within = out - pair_start;

            // Co-rank search: how many elements the merged prefix of length
            // `within` takes from the left run.
            let mut lo = within.saturating_sub(right_len);
            let mut hi = within.min(left_len);
            while lo < hi {
                let take_left = (lo + hi) / 2;
                let take_right = within - take_left;
                if prev[right_start + take_right - 1].key >= prev[pair_start + take_left].key {
                    lo = take_left + 1;
                } else {
                    hi = take_left;
                }
            }
            let i = lo;
            let j = within - i;

            if i < left_len
                && (j >= right_len || prev[pair_start + i].key <= prev[right_start + j].key)
            {
                prev[pair_start + i]
            } else {
                prev[right_start + j]
            }
        });
        width *= 2;
    }
    buf
}
