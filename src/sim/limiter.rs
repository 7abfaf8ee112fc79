//! Collection size caps
//!
//! Every bounded collection keeps its newest members: when a collection grows
//! past its maximum, the oldest (front) entries are dropped.

/// Keep at most `max` elements, dropping from the front (oldest first).
pub fn enforce_limit<T>(mut items: Vec<T>, max: usize) -> Vec<T> {
    enforce_limit_in_place(&mut items, max);
    items
}

/// In-place variant of [`enforce_limit`]. Returns how many elements were dropped.
pub fn enforce_limit_in_place<T>(items: &mut Vec<T>, max: usize) -> usize {
    let excess = excess_count(items.len(), max);
    if excess > 0 {
        items.drain(..excess);
    }
    excess
}

/// Number of elements that must be evicted from a collection of `len` to fit `max`
#[inline]
pub fn excess_count(len: usize, max: usize) -> usize {
    len.saturating_sub(max)
}
