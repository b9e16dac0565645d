//! Gapped integer sibling ranks.
//!
//! # Responsibility
//! - Assign order keys for new and moved siblings without touching neighbors.
//!
//! # Invariants
//! - Append positions leave a `RANK_STEP` gap for later insertions.
//! - `rank_between` returns `None` when no integer fits between the
//!   neighbors; callers must then rebalance the whole sibling group.

/// Gap left between adjacent sibling ranks on append and rebalance.
pub const RANK_STEP: i64 = 1024;

/// Returns the rank for appending after the current last sibling.
pub fn rank_after(last: Option<i64>) -> i64 {
    match last {
        Some(value) => value.saturating_add(RANK_STEP),
        None => 0,
    }
}

/// Returns the rank for inserting before the current first sibling.
pub fn rank_before(first: i64) -> i64 {
    first.saturating_sub(RANK_STEP)
}

/// Returns a rank strictly between two neighbors, if one exists.
///
/// `None` on either side means open-ended in that direction.
pub fn rank_between(before: Option<i64>, after: Option<i64>) -> Option<i64> {
    match (before, after) {
        (None, None) => Some(0),
        (Some(low), None) => Some(rank_after(Some(low))),
        (None, Some(high)) => Some(rank_before(high)),
        (Some(low), Some(high)) => {
            if high - low >= 2 {
                Some(low + (high - low) / 2)
            } else {
                None
            }
        }
    }
}

/// Returns evenly re-gapped ranks for a sibling group of `len` entries.
pub fn rebalanced_ranks(len: usize) -> Vec<i64> {
    (0..len).map(|index| index as i64 * RANK_STEP).collect()
}

#[cfg(test)]
mod tests {
    use super::{rank_after, rank_before, rank_between, rebalanced_ranks, RANK_STEP};

    #[test]
    fn append_leaves_a_gap() {
        assert_eq!(rank_after(None), 0);
        assert_eq!(rank_after(Some(0)), RANK_STEP);
        assert_eq!(rank_after(Some(RANK_STEP)), 2 * RANK_STEP);
    }

    #[test]
    fn insert_before_first_goes_negative() {
        assert_eq!(rank_before(0), -RANK_STEP);
    }

    #[test]
    fn between_picks_the_midpoint() {
        assert_eq!(rank_between(Some(0), Some(RANK_STEP)), Some(RANK_STEP / 2));
        assert_eq!(rank_between(None, None), Some(0));
        assert_eq!(rank_between(Some(5), None), Some(5 + RANK_STEP));
        assert_eq!(rank_between(None, Some(5)), Some(5 - RANK_STEP));
    }

    #[test]
    fn exhausted_gap_requests_rebalance() {
        assert_eq!(rank_between(Some(3), Some(4)), None);
        assert_eq!(rank_between(Some(4), Some(4)), None);
    }

    #[test]
    fn rebalance_restores_even_gaps() {
        assert_eq!(rebalanced_ranks(3), vec![0, RANK_STEP, 2 * RANK_STEP]);
        assert!(rebalanced_ranks(0).is_empty());
    }
}
