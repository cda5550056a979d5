//! Experience to level mapping.
//!
//! Every code path that changes experience recomputes the level through
//! [`level_for_experience`]; there is no other level formula.

/// Experience required to reach each tabulated level. `LEVEL_THRESHOLDS[i]` is
/// the minimum experience for level `i + 1`.
pub const LEVEL_THRESHOLDS: &[i64] = &[
    0, 100, 250, 450, 700, 1_000, 1_400, 1_900, 2_500, 3_200, 4_000,
];

/// Past the last tabulated threshold each further level costs this much.
pub const EXPERIENCE_PER_LEVEL_BEYOND_TABLE: i64 = 1_000;

/// Level reached with `experience` total experience. Negative input is treated
/// as zero.
pub fn level_for_experience(experience: i64) -> i32 {
    let last_threshold = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];

    if experience >= last_threshold {
        let extra_levels = (experience - last_threshold) / EXPERIENCE_PER_LEVEL_BEYOND_TABLE;
        let level = LEVEL_THRESHOLDS.len() as i64 + extra_levels;
        return level.min(i32::MAX as i64) as i32;
    }

    // Number of thresholds not exceeding the input == 1-based level
    LEVEL_THRESHOLDS
        .partition_point(|&threshold| threshold <= experience)
        .max(1) as i32
}

/// Minimum experience needed for `level`.
pub fn experience_for_level(level: i32) -> i64 {
    if level <= 1 {
        return 0;
    }

    let level = level as usize;
    if level <= LEVEL_THRESHOLDS.len() {
        return LEVEL_THRESHOLDS[level - 1];
    }

    let last_threshold = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];
    last_threshold + (level - LEVEL_THRESHOLDS.len()) as i64 * EXPERIENCE_PER_LEVEL_BEYOND_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_map_to_their_own_level() {
        for (index, &threshold) in LEVEL_THRESHOLDS.iter().enumerate() {
            assert_eq!(level_for_experience(threshold), index as i32 + 1);
        }
    }

    #[test]
    fn test_one_below_threshold_stays_on_previous_level() {
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(249), 2);
        assert_eq!(level_for_experience(3_999), 10);
    }

    #[test]
    fn test_linear_extrapolation_past_table() {
        let last = *LEVEL_THRESHOLDS.last().unwrap();
        let top_level = LEVEL_THRESHOLDS.len() as i32;

        assert_eq!(level_for_experience(last + 999), top_level);
        assert_eq!(level_for_experience(last + 1_000), top_level + 1);
        assert_eq!(level_for_experience(last + 5_500), top_level + 5);
    }

    #[test]
    fn test_negative_experience_is_level_one() {
        assert_eq!(level_for_experience(-50), 1);
    }

    #[test]
    fn test_level_is_non_decreasing() {
        let mut previous = level_for_experience(0);
        for experience in (0..12_000).step_by(7) {
            let level = level_for_experience(experience);
            assert!(level >= previous, "level dropped at {} experience", experience);
            previous = level;
        }
    }

    #[test]
    fn test_experience_for_level_is_inverse_lower_bound() {
        for level in 1..30 {
            let needed = experience_for_level(level);
            assert_eq!(level_for_experience(needed), level);
            if needed > 0 {
                assert_eq!(level_for_experience(needed - 1), level - 1);
            }
        }
    }
}
