use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trend::Direction;

// ==============================================================================
// Notification Models
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    PriceChange,
    System,
    Manual,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::PriceChange => "price_change",
            NotificationCategory::System => "system",
            NotificationCategory::Manual => "manual",
        }
    }
}

impl std::str::FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_change" => Ok(NotificationCategory::PriceChange),
            "system" => Ok(NotificationCategory::System),
            "manual" => Ok(NotificationCategory::Manual),
            _ => Err(format!("Invalid notification category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconHint {
    TrendingUp,
    TrendingDown,
    TrendingFlat,
    Info,
}

impl IconHint {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Up => IconHint::TrendingUp,
            Direction::Down => IconHint::TrendingDown,
            Direction::Stable => IconHint::TrendingFlat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IconHint::TrendingUp => "trending_up",
            IconHint::TrendingDown => "trending_down",
            IconHint::TrendingFlat => "trending_flat",
            IconHint::Info => "info",
        }
    }
}

impl std::str::FromStr for IconHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trending_up" => Ok(IconHint::TrendingUp),
            "trending_down" => Ok(IconHint::TrendingDown),
            "trending_flat" => Ok(IconHint::TrendingFlat),
            "info" => Ok(IconHint::Info),
            _ => Err(format!("Invalid icon hint: {}", s)),
        }
    }
}

/// A stored notification. The only mutation after creation is marking it read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub direction: Direction,
    pub read: bool,
    pub category: NotificationCategory,
    pub icon_hint: IconHint,
    pub target_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub direction: Direction,
    pub category: NotificationCategory,
    pub icon_hint: IconHint,
    pub target_link: Option<String>,
}

impl CreateNotification {
    pub fn into_notification(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            title: self.title,
            body: self.body,
            direction: self.direction,
            read: false,
            category: self.category,
            icon_hint: self.icon_hint,
            target_link: self.target_link,
            created_at: Utc::now(),
        }
    }
}

/// Body of the manual test form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualNotificationRequest {
    pub title: String,
    pub body: String,
    pub direction: Option<Direction>,
    pub target_link: Option<String>,
}

impl ManualNotificationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.title.chars().count() > 200 {
            return Err("title must be at most 200 characters".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("body must not be empty".to_string());
        }
        if self.body.chars().count() > 2000 {
            return Err("body must be at most 2000 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}
