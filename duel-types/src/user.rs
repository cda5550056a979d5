use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SportCategory {
    General,
    Football,
    Basketball,
    Baseball,
    Hockey,
    Soccer,
}

impl SportCategory {
    pub const ALL: [SportCategory; 6] = [
        SportCategory::General,
        SportCategory::Football,
        SportCategory::Basketball,
        SportCategory::Baseball,
        SportCategory::Hockey,
        SportCategory::Soccer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SportCategory::General => "general",
            SportCategory::Football => "football",
            SportCategory::Basketball => "basketball",
            SportCategory::Baseball => "baseball",
            SportCategory::Hockey => "hockey",
            SportCategory::Soccer => "soccer",
        }
    }
}

impl fmt::Display for SportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SportCategory::ALL
            .into_iter()
            .find(|sport| sport.as_str() == s)
            .ok_or_else(|| format!("Unknown sport category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TimeWindow {
    AllTime,
    Weekly,
    Monthly,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [TimeWindow::AllTime, TimeWindow::Weekly, TimeWindow::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::AllTime => "all_time",
            TimeWindow::Weekly => "weekly",
            TimeWindow::Monthly => "monthly",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeWindow::ALL
            .into_iter()
            .find(|window| window.as_str() == s)
            .ok_or_else(|| format!("Unknown time window: {}", s))
    }
}

/// Which aggregate a points row belongs to: the overall total or one sport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointsCategory {
    Overall,
    Sport(SportCategory),
}

impl PointsCategory {
    pub fn as_key(self) -> &'static str {
        match self {
            PointsCategory::Overall => "overall",
            PointsCategory::Sport(sport) => sport.as_str(),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        if key == "overall" {
            return Some(PointsCategory::Overall);
        }
        key.parse().ok().map(PointsCategory::Sport)
    }

    pub fn sport(self) -> Option<SportCategory> {
        match self {
            PointsCategory::Overall => None,
            PointsCategory::Sport(sport) => Some(sport),
        }
    }
}

impl From<Option<SportCategory>> for PointsCategory {
    fn from(sport: Option<SportCategory>) -> Self {
        sport.map_or(PointsCategory::Overall, PointsCategory::Sport)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStats {
    pub user_id: UserId,
    pub experience: i64,
    pub level: i32,
    pub duels_played: i64,
    pub duels_won: i64,
}

impl UserStats {
    /// Counters of a user that has never been rewarded.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            experience: 0,
            level: 1,
            duels_played: 0,
            duels_won: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PointsTally {
    pub window: TimeWindow,
    pub sport: Option<SportCategory>, // None for the overall aggregate
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AchievementDefinition {
    pub id: i32,
    pub name: String,
    pub experience_reward: i64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UnlockedAchievement {
    pub name: String,
    pub experience_reward: i64,
    pub unlocked_at: String, // ISO 8601 string
}
