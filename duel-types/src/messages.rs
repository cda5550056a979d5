use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    Duel, DuelId, DuelOutcome, PlayerRole, PointsTally, SportCategory, SubmittedResult,
    UnlockedAchievement, UserId, UserStats,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmitResultRequest {
    pub result: SubmittedResult,
    pub role: PlayerRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmitResultResponse {
    pub success: bool,
    pub duel_result: DuelOutcome,
    pub winner_id: Option<UserId>,
    pub experience_awarded: i64,
    pub points_awarded: i64,
    pub newly_unlocked_achievements: Vec<String>,
}

impl SubmitResultResponse {
    pub fn pending() -> Self {
        Self {
            success: true,
            duel_result: DuelOutcome::Pending,
            winner_id: None,
            experience_awarded: 0,
            points_awarded: 0,
            newly_unlocked_achievements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateDuelRequest {
    #[serde(default)]
    pub opponent_id: Option<UserId>,
    pub sport: SportCategory,
}

/// A duel as seen by one of its participants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DuelView {
    pub duel: Duel,
    pub your_role: PlayerRole,
    pub your_outcome: DuelOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SweepReport {
    pub processed_count: u32,
    pub total_found: u32,
    pub errors: Vec<SweepError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SweepError {
    pub duel_id: DuelId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStatsResponse {
    pub stats: UserStats,
    pub next_level_experience: i64,
    pub points: Vec<PointsTally>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub points: i64,
    pub rank: u32,
}
