use tracing::debug;

use crate::models::{ChangeEvent, UserPreference};

pub const DEFAULT_THRESHOLD_PERCENT: f64 = 5.0;

/// Gate deciding which changes are worth a notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceFilter {
    pub threshold_percent: f64,
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_PERCENT)
    }
}

impl SignificanceFilter {
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            threshold_percent: threshold_percent.abs(),
        }
    }

    /// The user's own threshold applies whenever the user is known, in the
    /// scheduled worker and in on-demand analysis alike.
    pub fn for_preference(preference: &UserPreference) -> Self {
        Self::new(preference.change_threshold_percent)
    }

    /// Resolve the threshold for an optional user, falling back to `self`.
    pub fn resolve(&self, preference: Option<&UserPreference>) -> Self {
        preference.map(Self::for_preference).unwrap_or(*self)
    }

    pub fn is_significant(&self, event: &ChangeEvent) -> bool {
        event.percent_change.abs() >= self.threshold_percent
    }

    /// Keep only significant events
    pub fn filter<'a, I>(&self, events: I) -> Vec<&'a ChangeEvent>
    where
        I: IntoIterator<Item = &'a ChangeEvent>,
    {
        events
            .into_iter()
            .filter(|event| {
                let keep = self.is_significant(event);
                if !keep {
                    debug!(
                        "Dropping '{}' change of {:.2}% (threshold {:.2}%)",
                        event.keyword, event.percent_change, self.threshold_percent
                    );
                }
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(pct: f64) -> ChangeEvent {
        ChangeEvent {
            keyword: "harga beras".to_string(),
            previous_value: 100.0,
            current_value: 100.0 + pct,
            percent_change: pct,
            direction: crate::services::change_detector::classify(pct),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filter = SignificanceFilter::default();
        assert!(filter.is_significant(&event(5.0)));
        assert!(filter.is_significant(&event(-5.0)));
        assert!(!filter.is_significant(&event(4.99)));
        assert!(!filter.is_significant(&event(0.0)));
    }

    #[test]
    fn test_user_threshold_overrides_default() {
        let mut prefs = UserPreference::default_for_user(Uuid::new_v4());
        prefs.change_threshold_percent = 20.0;

        let default = SignificanceFilter::default();
        let resolved = default.resolve(Some(&prefs));
        assert_eq!(resolved.threshold_percent, 20.0);
        assert!(!resolved.is_significant(&event(12.5)));
        assert!(default.is_significant(&event(12.5)));

        assert_eq!(default.resolve(None), default);
    }

    #[test]
    fn test_filter_drops_small_changes() {
        let events = vec![event(1.0), event(-8.0), event(12.5)];
        let kept = SignificanceFilter::new(5.0).filter(&events);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].direction, Direction::Down);
    }
}
