//! Reference bubble sort.
//!
//! Sequential fallback for tiny inputs and for validating the parallel
//! strategies against a trivially-correct implementation.

use super::SortItem;

pub(crate) fn sort(items: &[SortItem]) -> Vec<SortItem> {
    let mut buf = items.to_vec();
    let n = buf.len();
    for end in (1..n).rev() {
        let mut swapped = false;
        for i in 0..end {
            if buf[i].key > buf[i + 1].key {
                buf.swap(i, i + 1);
                swapped = true;
            }
        }
        if !swapped {
            break;
        }
    }
    buf
}
