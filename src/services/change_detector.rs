//! Two-point change detection over a trend series.
//!
//! The detector compares the last two observations only. There is no
//! smoothing or outlier rejection; a series too short to compare, or one
//! whose baseline is not positive, yields [`ChangeSignal::NoSignal`] rather
//! than an error.

use crate::models::{ChangeEvent, ChangeSignal, Direction, NoSignalReason, TimeSeries};

/// Changes whose magnitude is below this many percent are float noise and
/// classify as stable.
pub const DIRECTION_EPSILON: f64 = 1e-9;

/// Percentage change from `previous` to `current`, or `None` when
/// `previous <= 0` (no division is attempted).
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous > 0.0 && previous.is_finite() && current.is_finite() {
        Some(((current - previous) / previous) * 100.0)
    } else {
        None
    }
}

/// The single rule mapping a percentage to a direction.
pub fn classify(percent_change: f64) -> Direction {
    if percent_change > DIRECTION_EPSILON {
        Direction::Up
    } else if percent_change < -DIRECTION_EPSILON {
        Direction::Down
    } else {
        Direction::Stable
    }
}

pub fn detect_change(series: &TimeSeries) -> ChangeSignal {
    let Some((previous, current)) = series.last_two() else {
        return ChangeSignal::NoSignal(NoSignalReason::InsufficientData);
    };

    match percent_change(previous.value, current.value) {
        Some(pct) => ChangeSignal::Change(ChangeEvent {
            keyword: series.keyword.clone(),
            previous_value: previous.value,
            current_value: current.value,
            percent_change: pct,
            direction: classify(pct),
            observed_at: current.timestamp,
        }),
        None => ChangeSignal::NoSignal(NoSignalReason::NonPositiveBaseline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendPoint;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        TimeSeries::new(
            "harga cabai",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| TrendPoint::new(start + Duration::days(i as i64 * 7), *v))
                .collect(),
        )
    }

    #[test]
    fn test_eighty_to_ninety_is_twelve_and_a_half_up() {
        let signal = detect_change(&series(&[80.0, 90.0]));
        let event = signal.event().expect("expected a change");
        assert!((event.percent_change - 12.5).abs() < 1e-12);
        assert_eq!(event.direction, Direction::Up);
        assert_eq!(event.previous_value, 80.0);
        assert_eq!(event.current_value, 90.0);
    }

    #[test]
    fn test_zero_baseline_reports_no_percentage() {
        let signal = detect_change(&series(&[0.0, 50.0]));
        assert_eq!(signal, ChangeSignal::NoSignal(NoSignalReason::NonPositiveBaseline));
        assert_eq!(signal.percent_change(), None);
        assert_eq!(signal.direction(), Direction::Stable);
    }

    #[test]
    fn test_negative_baseline_reports_no_percentage() {
        assert_eq!(percent_change(-10.0, 5.0), None);
    }

    #[test]
    fn test_short_series_is_stable_without_signal() {
        for values in [&[][..], &[42.0][..]] {
            let signal = detect_change(&series(values));
            assert_eq!(signal, ChangeSignal::NoSignal(NoSignalReason::InsufficientData));
            assert_eq!(signal.direction(), Direction::Stable);
        }
    }

    #[test]
    fn test_only_last_two_points_matter() {
        let signal = detect_change(&series(&[10.0, 1000.0, 50.0, 40.0]));
        let event = signal.event().unwrap();
        assert!((event.percent_change + 20.0).abs() < 1e-12);
        assert_eq!(event.direction, Direction::Down);
    }

    #[test]
    fn test_equal_points_are_stable() {
        let signal = detect_change(&series(&[75.0, 75.0]));
        let event = signal.event().unwrap();
        assert_eq!(event.percent_change, 0.0);
        assert_eq!(event.direction, Direction::Stable);
    }

    #[test]
    fn test_direction_agrees_with_sign_across_grid() {
        let values = [0.5, 1.0, 3.0, 17.0, 64.0, 99.0, 100.0];
        for &prev in &values {
            for &cur in &values {
                let pct = percent_change(prev, cur).unwrap();
                assert!((pct - (cur - prev) / prev * 100.0).abs() < 1e-9);
                let expected = if cur > prev {
                    Direction::Up
                } else if cur < prev {
                    Direction::Down
                } else {
                    Direction::Stable
                };
                assert_eq!(classify(pct), expected, "prev={} cur={}", prev, cur);
            }
        }
    }

    #[test]
    fn test_observed_at_is_last_timestamp() {
        let s = series(&[1.0, 2.0, 3.0]);
        let event = detect_change(&s).into_event().unwrap();
        assert_eq!(event.observed_at, s.last().unwrap().timestamp);
        assert_eq!(event.keyword, "harga cabai");
    }
}
