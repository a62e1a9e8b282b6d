//! LSB radix sort on the transformed depth key.
//!
//! Four passes of 8 bits each. Every pass runs a per-block histogram
//! dispatch, a host-side exclusive scan over (digit, block), and a scatter
//! dispatch into a fresh buffer; the buffers ping-pong between passes.
//! Scatter destinations are disjoint by construction — block `b` owns the
//! range `[offset[b][d], offset[b][d] + hist[b][d])` for each digit `d` —
//! which is what permits the unsynchronized writes. Processing blocks in
//! element order keeps each pass stable, so the pass sequence sorts the
//! full 32-bit key.

use super::SortItem;
use crate::grid::{ComputeGrid, ScatterBuffer};

const BLOCK: usize = 256;
const RADIX: usize = 256;
const PASSES: usize = 4;

pub(crate) fn sort(grid: &ComputeGrid, items: &[SortItem]) -> Vec<SortItem> {
    let n = items.len();
    if n <= 1 {
        return items.to_vec();
    }

    let num_blocks = n.div_ceil(BLOCK);
    let mut src = items.to_vec();

    for pass in 0..PASSES {
        let shift = pass * 8;

        // Local histogram per block.
        let histograms: Vec<[u32; RADIX]> = grid.dispatch_map(num_blocks, |b| {
            let start = b * BLOCK;
            let end = (start + BLOCK).min(n);
            let mut hist = [0u32; RADIX];
            for item in &src[start..end] {
                hist[((item.key >> shift) & 0xff) as usize] += 1;
            }
            hist
        });

        // Exclusive scan over (digit, block): global digit bases plus each
        // block's offset within its digit.
        let mut offsets = vec![[0u32; RADIX]; num_blocks];
        let mut running = 0u32;
        for digit in 0..RADIX {
            for block in 0..num_blocks {
                offsets[block][digit] = running;
                running += histograms[block][digit];
            }
        }

        // Scatter into the other buffer.
        let dst = ScatterBuffer::<SortItem>::new(n);
        grid.dispatch(num_blocks, |b| {
            let start = b * BLOCK;
            let end = (start + BLOCK).min(n);
            let mut cursors = offsets[b];
            for item in &src[start..end] {
                let digit = ((item.key >> shift) & 0xff) as usize;
                let pos = cursors[digit] as usize;
                cursors[digit] += 1;
                // SAFETY: the scan gives every (block, digit) a private,
                // non-overlapping destination range, and this block is the
                // only writer advancing its cursors.
                unsafe { dst.write(pos, *item) };
            }
        });
        src = dst.into_vec();
    }

    src
}
