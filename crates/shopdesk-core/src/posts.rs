use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Customers with an order inside this window count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 30;
/// Lifetime order total at which a customer counts as VIP.
pub const VIP_SPEND_THRESHOLD: i64 = 500;

/// Who a post or broadcast is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Active,
    Vip,
    Channel,
}

impl Audience {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "vip" => Some(Self::Vip),
            "channel" => Some(Self::Channel),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Vip => "vip",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily send slots. The bot reads these; nothing here fires them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSchedule {
    pub morning: Option<NaiveTime>,
    pub afternoon: Option<NaiveTime>,
    pub evening: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub schedule: PostSchedule,
    pub audience: Audience,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub schedule: PostSchedule,
    pub audience: Audience,
    pub image_url: Option<String>,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), PostError> {
        if self.title.trim().is_empty() {
            return Err(PostError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(PostError::EmptyContent);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("title is required")]
    EmptyTitle,
    #[error("content is required")]
    EmptyContent,
    #[error("unknown audience `{0}`")]
    UnknownAudience(String),
    #[error("invalid send time `{0}`, expected HH:MM")]
    InvalidTime(String),
}

/// Parses an `HH:MM` slot. Blank input means the slot is off.
pub fn parse_send_time(value: &str) -> Result<Option<NaiveTime>, PostError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(Some)
        .map_err(|_| PostError::InvalidTime(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_round_trips_through_its_name() {
        for audience in [Audience::All, Audience::Active, Audience::Vip, Audience::Channel] {
            assert_eq!(Audience::parse(audience.as_str()), Some(audience));
        }
        assert_eq!(Audience::parse("everyone"), None);
    }

    #[test]
    fn send_times_are_hours_and_minutes() {
        assert_eq!(
            parse_send_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(parse_send_time(" ").unwrap(), None);
        assert_eq!(
            parse_send_time("9am"),
            Err(PostError::InvalidTime("9am".to_string()))
        );
    }

    #[test]
    fn draft_needs_title_and_content() {
        let mut draft = PostDraft {
            title: "Weekend sale".to_string(),
            content: String::new(),
            schedule: PostSchedule::default(),
            audience: Audience::All,
            image_url: None,
        };
        assert_eq!(draft.validate(), Err(PostError::EmptyContent));

        draft.content = "20% off all tea".to_string();
        assert_eq!(draft.validate(), Ok(()));

        draft.title = " ".to_string();
        assert_eq!(draft.validate(), Err(PostError::EmptyTitle));
    }
}
