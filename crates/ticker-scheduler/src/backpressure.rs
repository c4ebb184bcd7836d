// crates/ticker-scheduler/src/backpressure.rs
//
// Decides whether the confirmed range starting at `begin` holds a full epoch
// yet, and if not, how long to wait for the missing blocks.
//
// The wait is proportional: `missing_blocks * block_time`. Heights are
// compared as signed values because `head - head_offset` may fall below
// `begin` (fresh checkpoint ahead of a lagging node, or head below the
// offset), in which case the missing count grows accordingly.

use std::time::Duration;

/// Outcome of comparing the confirmed head against the next epoch's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeReadiness {
    /// `[begin, end]` holds at least one full epoch.
    Ready { end: u64 },
    /// Not enough confirmed blocks; sleep `delay` for `missing` more.
    Accumulating {
        /// Confirmed head after offsetting. Negative when head < head_offset.
        end: i128,
        missing: u64,
        delay: Duration,
    },
}

pub fn assess_range(
    begin: u64,
    head: u64,
    epoch_height: u64,
    head_offset: u64,
    block_time_secs: u64,
) -> RangeReadiness {
    let end = head as i128 - head_offset as i128;
    let available = end - begin as i128 + 1;

    if available >= epoch_height as i128 {
        // available >= 1 implies end >= begin >= 0.
        return RangeReadiness::Ready { end: end as u64 };
    }

    let missing = u64::try_from(epoch_height as i128 - available).unwrap_or(u64::MAX);
    RangeReadiness::Accumulating {
        end,
        missing,
        delay: Duration::from_secs(missing.saturating_mul(block_time_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_is_ready() {
        assert_eq!(
            assess_range(100, 109, 10, 0, 12),
            RangeReadiness::Ready { end: 109 }
        );
    }

    #[test]
    fn offset_is_subtracted_from_head() {
        assert_eq!(
            assess_range(100, 125, 10, 5, 12),
            RangeReadiness::Ready { end: 120 }
        );
    }

    #[test]
    fn delay_scales_with_missing_blocks() {
        // end = 104, 5 blocks available, 5 missing.
        assert_eq!(
            assess_range(100, 104, 10, 0, 12),
            RangeReadiness::Accumulating {
                end: 104,
                missing: 5,
                delay: Duration::from_secs(60),
            }
        );
        // end = 101 after a 3-block offset, 2 available, 8 missing.
        assert_eq!(
            assess_range(100, 104, 10, 3, 2),
            RangeReadiness::Accumulating {
                end: 101,
                missing: 8,
                delay: Duration::from_secs(16),
            }
        );
    }

    #[test]
    fn head_behind_begin_waits_longer() {
        // Checkpoint says begin=200 but the node reports head=195.
        match assess_range(200, 195, 10, 0, 1) {
            RangeReadiness::Accumulating { missing, delay, .. } => {
                // The range 200..=195 is -4 blocks long, so 14 are missing.
                assert_eq!(missing, 14);
                assert_eq!(delay, Duration::from_secs(14));
            }
            other => panic!("Expected Accumulating, got: {:?}", other),
        }
    }

    #[test]
    fn head_below_offset_does_not_underflow() {
        match assess_range(0, 3, 10, 5, 1) {
            RangeReadiness::Accumulating { end, missing, .. } => {
                assert_eq!(end, -2);
                assert_eq!(missing, 11);
            }
            other => panic!("Expected Accumulating, got: {:?}", other),
        }
    }

    #[test]
    fn backpressure_formula_holds_over_grid() {
        for begin in 50..70u64 {
            for head in 40..90u64 {
                for offset in 0..4u64 {
                    let height = 10u64;
                    let block_time = 3u64;
                    let end = head as i128 - offset as i128;
                    let len = end - begin as i128 + 1;
                    match assess_range(begin, head, height, offset, block_time) {
                        RangeReadiness::Ready { end: ready_end } => {
                            assert!(len >= height as i128);
                            assert_eq!(ready_end as i128, end);
                        }
                        RangeReadiness::Accumulating { missing, delay, .. } => {
                            assert!(len < height as i128);
                            assert_eq!(missing as i128, height as i128 - len);
                            assert_eq!(delay, Duration::from_secs(missing * block_time));
                        }
                    }
                }
            }
        }
    }
}
