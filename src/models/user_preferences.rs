use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CHANGE_THRESHOLD_PERCENT: f64 = 5.0;
pub const MAX_KEYWORDS: usize = 20;
pub const MAX_KEYWORD_CHARS: usize = 100;

/// Commodities watched for a user who has not picked any.
pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "harga cabai",
    "harga beras",
    "harga bawang merah",
    "harga telur",
    "harga minyak goreng",
];

/// How often the scheduled worker should notify a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Daily
    }
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Hourly, Frequency::Daily, Frequency::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

/// Notification settings for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: Uuid,
    pub notifications_enabled: bool,
    pub frequency: Frequency,
    pub change_threshold_percent: f64,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreference {
    /// Defaults applied the first time a user's settings are loaded
    pub fn default_for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            notifications_enabled: true,
            frequency: Frequency::default(),
            change_threshold_percent: DEFAULT_CHANGE_THRESHOLD_PERCENT,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateUserPreference) {
        if let Some(enabled) = update.notifications_enabled {
            self.notifications_enabled = enabled;
        }
        if let Some(frequency) = update.frequency {
            self.frequency = frequency;
        }
        if let Some(threshold) = update.change_threshold_percent {
            self.change_threshold_percent = threshold;
        }
        if let Some(keywords) = update.keywords {
            self.keywords = keywords;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update sent by the settings form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserPreference {
    pub notifications_enabled: Option<bool>,
    pub frequency: Option<Frequency>,
    pub change_threshold_percent: Option<f64>,
    pub keywords: Option<Vec<String>>,
}

impl UpdateUserPreference {
    /// Validate ranges and normalize keywords in place
    pub fn validate(&mut self) -> Result<(), String> {
        if let Some(threshold) = self.change_threshold_percent {
            if !threshold.is_finite() || threshold <= 0.0 || threshold > 100.0 {
                return Err(format!(
                    "change_threshold_percent must be in (0, 100], got {}",
                    threshold
                ));
            }
        }

        if let Some(keywords) = self.keywords.take() {
            let normalized = normalize_keywords(keywords);
            if normalized.is_empty() {
                return Err("keywords must contain at least one non-empty keyword".to_string());
            }
            if normalized.len() > MAX_KEYWORDS {
                return Err(format!("at most {} keywords are allowed", MAX_KEYWORDS));
            }
            if let Some(long) = normalized.iter().find(|k| k.chars().count() > MAX_KEYWORD_CHARS) {
                return Err(format!(
                    "keyword '{}' is longer than {} characters",
                    long, MAX_KEYWORD_CHARS
                ));
            }
            self.keywords = Some(normalized);
        }

        Ok(())
    }
}

/// Trim, lowercase and deduplicate keywords, keeping first-seen order
pub fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}
