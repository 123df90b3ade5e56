//! 24-bit modular sequence arithmetic.
//!
//! Sequence counters live in `[0, MAX_ACK_VALUE)`. Comparisons use the
//! quartile heuristic: a value above the top quartile compared against one
//! below the bottom quartile is treated as the older of the two, because the
//! smaller value must have wrapped. The heuristic is sound as long as the
//! distance between compared counters stays under a quarter of the sequence
//! space, which the in-flight cap guarantees.

use crate::constants::{MAX_ACK_VALUE, MAX_ACK_VALUE_BOTTOM_QUART, MAX_ACK_VALUE_TOP_QUART};

/// Whether the pair straddles the wrap point, with `high` on the pre-wrap
/// side and `low` just past it.
fn wrapped(high: u32, low: u32) -> bool {
    high > MAX_ACK_VALUE_TOP_QUART && low < MAX_ACK_VALUE_BOTTOM_QUART
}

/// The sequence index following `index`.
#[must_use]
pub fn next(index: u32) -> u32 {
    (index + 1) % MAX_ACK_VALUE
}

/// The sequence index preceding `index`.
#[must_use]
pub fn previous(index: u32) -> u32 {
    (index + MAX_ACK_VALUE - 1) % MAX_ACK_VALUE
}

/// Pick the newer of a tracked counter and a freshly observed value
/// (modular-max).
#[must_use]
pub fn newest(current: u32, observed: u32) -> u32 {
    if wrapped(current, observed) {
        observed
    } else if wrapped(observed, current) {
        // Stale pre-wrap observation; the tracked counter already wrapped.
        current
    } else {
        current.max(observed)
    }
}

/// Whether `sequence` is covered by a cumulative acknowledgment of `acked`.
#[must_use]
pub fn is_acked(sequence: u32, acked: u32) -> bool {
    if wrapped(sequence, acked) {
        true
    } else if wrapped(acked, sequence) {
        false
    } else {
        sequence <= acked
    }
}

/// Whether `sequence` is modularly ahead of `reference`, i.e. not yet
/// delivered when `reference` is the last in-order index.
#[must_use]
pub fn is_ahead(sequence: u32, reference: u32) -> bool {
    if wrapped(reference, sequence) {
        true
    } else if wrapped(sequence, reference) {
        false
    } else {
        sequence > reference
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        /// For counters within a quarter-space of each other, `is_ahead` and
        /// `is_acked` agree with true modular ordering.
        #[test]
        fn quartile_compare_matches_modular_order(
            reference in 0..MAX_ACK_VALUE,
            distance in 0..MAX_ACK_VALUE_BOTTOM_QUART,
        ) {
            let sequence = (reference + distance) % MAX_ACK_VALUE;
            prop_assert_eq!(is_ahead(sequence, reference), distance > 0);
            prop_assert_eq!(is_acked(sequence, reference), distance == 0);
        }

        #[test]
        fn newest_never_moves_backwards_in_window(
            current in 0..MAX_ACK_VALUE,
            distance in 0..MAX_ACK_VALUE_BOTTOM_QUART,
        ) {
            let observed = (current + distance) % MAX_ACK_VALUE;
            prop_assert_eq!(newest(current, observed), observed);
            prop_assert_eq!(newest(observed, current), observed);
        }
    }
}
