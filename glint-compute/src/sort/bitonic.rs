//! Bitonic compare-exchange network.
//!
//! Data-oblivious: the comparator schedule depends only on the (padded)
//! element count, never on the values. Each step is one grid dispatch in
//! gather form — every invocation reads its own slot and its partner from
//! the previous buffer and keeps either the smaller or the larger of the
//! pair, so a step never races with itself. The dispatch return is the
//! barrier between steps; later steps read earlier steps' results.

use super::SortItem;
use crate::grid::ComputeGrid;

pub(crate) fn sort(grid: &ComputeGrid, items: &[SortItem]) -> Vec<SortItem> {
    let n = items.len();
    if n <= 1 {
        return items.to_vec();
    }

    // The network needs a power-of-two element count; padding keys sort
    // past every real key and are truncated afterwards.
    let padded = n.next_power_of_two();
    let mut buf = Vec::with_capacity(padded);
    buf.extend_from_slice(items);
    buf.resize(padded, SortItem::PADDING);

    let mut size = 2;
    while size <= padded {
        let mut stride = size / 2;
        while stride > 0 {
            let prev = buf;
            buf = grid.dispatch_map(padded, |i| {
                let partner = i ^ stride;
                let lo = prev[i.min(partner)];
                let hi = prev[i.max(partner)];
                // Both sides of the pair order (lo, hi) identically, so the
                // tie case keeps each element exactly once.
                let (smaller, larger) = if lo.key <= hi.key { (lo, hi) } else { (hi, lo) };
                let ascending = (i & size) == 0;
                if (i < partner) == ascending {
                    smaller
                } else {
                    larger
                }
            });
            stride /= 2;
        }
        size *= 2;
    }

    // Real keys may collide with the padding key, so strip padding by its
    // index sentinel rather than truncating.
    buf.retain(|item| item.index != u32::MAX);
    debug_assert_eq!(buf.len(), n);
    buf
}
