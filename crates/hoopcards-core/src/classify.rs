// Percentile bucket classification.
//
// Both classifiers map a raw statistic onto a 1-4 rating. They deliberately
// disagree on ties: the standard classifier needs a value strictly above a
// boundary to move up, while the inverse classifier moves down as soon as the
// value reaches a boundary.

use crate::model::{Boundaries, Stat, StatThreshold, MIN_RATING};

/// Rate a statistic where higher is better.
///
/// `> high` is 4, `> mid` is 3, `> low` is 2, anything else is 1.
pub fn classify_standard(b: &Boundaries, value: f64) -> u8 {
    if value > b.high {
        4
    } else if value > b.mid {
        3
    } else if value > b.low {
        2
    } else {
        1
    }
}

/// Rate a statistic where lower is better (turnover rate).
///
/// `>= high` is 1, `>= mid` is 2, `>= low` is 3, anything else is 4.
pub fn classify_inverse(b: &Boundaries, value: f64) -> u8 {
    if value >= b.high {
        1
    } else if value >= b.mid {
        2
    } else if value >= b.low {
        3
    } else {
        4
    }
}

/// Rate an optional value for `stat`. A missing value is the worst rating.
pub fn rate(stat: Stat, threshold: &StatThreshold, value: Option<f64>) -> u8 {
    let Some(value) = value else {
        return MIN_RATING;
    };
    if stat.is_inverse() {
        classify_inverse(&threshold.boundaries, value)
    } else {
        classify_standard(&threshold.boundaries, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shooting() -> Boundaries {
        Boundaries::new(0.30, 0.45, 0.60)
    }

    fn turnovers() -> Boundaries {
        Boundaries::new(8.0, 14.0, 20.0)
    }

    #[test]
    fn standard_buckets() {
        let b = shooting();
        assert_eq!(classify_standard(&b, 0.50), 3);
        assert_eq!(classify_standard(&b, 0.61), 4);
        assert_eq!(classify_standard(&b, 0.10), 1);
        assert_eq!(classify_standard(&b, 0.31), 2);
    }

    #[test]
    fn standard_boundary_falls_to_lower_bucket() {
        let b = shooting();
        assert_eq!(classify_standard(&b, 0.60), 3);
        assert_eq!(classify_standard(&b, 0.45), 2);
        assert_eq!(classify_standard(&b, 0.30), 1);
    }

    #[test]
    fn inverse_buckets() {
        let b = turnovers();
        assert_eq!(classify_inverse(&b, 19.9), 2);
        assert_eq!(classify_inverse(&b, 7.9), 4);
        assert_eq!(classify_inverse(&b, 35.0), 1);
        assert_eq!(classify_inverse(&b, 10.0), 3);
    }

    #[test]
    fn inverse_boundary_is_inclusive() {
        let b = turnovers();
        assert_eq!(classify_inverse(&b, 20.0), 1);
        assert_eq!(classify_inverse(&b, 14.0), 2);
        assert_eq!(classify_inverse(&b, 8.0), 3);
    }

    #[test]
    fn standard_is_monotonic_non_decreasing() {
        let b = shooting();
        let mut last = 0;
        for step in 0..=1000 {
            let value = -0.5 + step as f64 * 0.002;
            let rating = classify_standard(&b, value);
            assert!((1..=4).contains(&rating));
            assert!(rating >= last, "rating dropped at {value}");
            last = rating;
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn inverse_is_monotonic_non_increasing() {
        let b = turnovers();
        let mut last = 5;
        for step in 0..=400 {
            let value = step as f64 * 0.1;
            let rating = classify_inverse(&b, value);
            assert!((1..=4).contains(&rating));
            assert!(rating <= last, "rating rose at {value}");
            last = rating;
        }
        assert_eq!(last, 1);
    }

    #[test]
    fn missing_value_rates_worst_for_both_directions() {
        let standard = StatThreshold {
            boundaries: shooting(),
            filter: None,
        };
        let inverse = StatThreshold {
            boundaries: turnovers(),
            filter: None,
        };
        assert_eq!(rate(Stat::Assist, &standard, None), 1);
        assert_eq!(rate(Stat::Turnover, &inverse, None), 1);
    }

    #[test]
    fn rate_dispatches_on_direction() {
        let threshold = StatThreshold {
            boundaries: turnovers(),
            filter: None,
        };
        // Same boundaries, opposite meaning.
        assert_eq!(rate(Stat::Turnover, &threshold, Some(5.0)), 4);
        assert_eq!(rate(Stat::Steal, &threshold, Some(5.0)), 1);
    }
}
