use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a keyword's search interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TrendPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ordered observations for one keyword. Insertion order is chronological
/// order; duplicates are allowed and the series may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub keyword: String,
    pub points: Vec<TrendPoint>,
}

impl TimeSeries {
    pub fn new(keyword: impl Into<String>, points: Vec<TrendPoint>) -> Self {
        Self {
            keyword: keyword.into(),
            points,
        }
    }

    pub fn empty(keyword: impl Into<String>) -> Self {
        Self::new(keyword, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TrendPoint> {
        self.points.last()
    }

    /// The last two points as `(previous, current)`.
    pub fn last_two(&self) -> Option<(&TrendPoint, &TrendPoint)> {
        match self.points.as_slice() {
            [.., prev, last] => Some((prev, last)),
            _ => None,
        }
    }
}

/// Direction of a change. Serialized with the dashboard's Indonesian labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "naik")]
    Up,
    #[serde(rename = "turun")]
    Down,
    #[serde(rename = "stabil")]
    Stable,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "naik",
            Direction::Down => "turun",
            Direction::Stable => "stabil",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naik" | "up" => Ok(Direction::Up),
            "turun" | "down" => Ok(Direction::Down),
            "stabil" | "stable" => Ok(Direction::Stable),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

/// A change between the last two points of a series. Derived on every
/// detector call and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub keyword: String,
    pub previous_value: f64,
    pub current_value: f64,
    pub percent_change: f64,
    pub direction: Direction,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Key used by the analysis cache: same keyword and same latest
    /// observation produce the same analysis.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{:.2}",
            self.keyword,
            self.observed_at.timestamp(),
            self.percent_change
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSignalReason {
    /// Fewer than two points in the series.
    InsufficientData,
    /// The previous point is zero or negative, so no percentage exists.
    NonPositiveBaseline,
}

/// Outcome of running the change detector over a series.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSignal {
    Change(ChangeEvent),
    NoSignal(NoSignalReason),
}

impl ChangeSignal {
    pub fn direction(&self) -> Direction {
        match self {
            ChangeSignal::Change(event) => event.direction,
            ChangeSignal::NoSignal(_) => Direction::Stable,
        }
    }

    pub fn percent_change(&self) -> Option<f64> {
        match self {
            ChangeSignal::Change(event) => Some(event.percent_change),
            ChangeSignal::NoSignal(_) => None,
        }
    }

    pub fn event(&self) -> Option<&ChangeEvent> {
        match self {
            ChangeSignal::Change(event) => Some(event),
            ChangeSignal::NoSignal(_) => None,
        }
    }

    pub fn into_event(self) -> Option<ChangeEvent> {
        match self {
            ChangeSignal::Change(event) => Some(event),
            ChangeSignal::NoSignal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_direction_serializes_with_indonesian_labels() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"naik\"");
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "\"turun\"");
        assert_eq!(serde_json::to_string(&Direction::Stable).unwrap(), "\"stabil\"");
    }

    #[test]
    fn test_direction_from_str_accepts_both_languages() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("turun".parse::<Direction>().unwrap(), Direction::Down);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_last_two() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = TimeSeries::new(
            "cabai",
            vec![
                TrendPoint::new(t, 1.0),
                TrendPoint::new(t, 2.0),
                TrendPoint::new(t, 3.0),
            ],
        );
        let (prev, last) = series.last_two().unwrap();
        assert_eq!(prev.value, 2.0);
        assert_eq!(last.value, 3.0);

        assert!(TimeSeries::new("cabai", vec![TrendPoint::new(t, 1.0)])
            .last_two()
            .is_none());
    }
}
