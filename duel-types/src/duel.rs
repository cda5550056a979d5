use crate::{DuelId, SportCategory, UserId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stored lifecycle of a duel. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DuelStatus {
    #[serde(rename = "waiting_for_p2")]
    WaitingForP2,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "expired")]
    Expired,
}

impl DuelStatus {
    pub fn is_final(self) -> bool {
        matches!(self, DuelStatus::Completed | DuelStatus::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PlayerRole {
    Challenger, // player1, created the duel
    Opponent,   // player2
}

impl PlayerRole {
    pub fn other(self) -> Self {
        match self {
            PlayerRole::Challenger => PlayerRole::Opponent,
            PlayerRole::Opponent => PlayerRole::Challenger,
        }
    }
}

/// Result of a duel from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DuelOutcome {
    Pending,
    Win,
    Loss,
    Tie,
}

/// A single answered round inside a submitted result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoundAnswer {
    #[serde(default)]
    pub answer: Option<String>,
    pub elapsed_time: f64, // seconds
    pub correct: bool,
}

/// What a client submits for its side of a duel.
///
/// Older clients send a single correctness flag, newer ones send the per-round
/// list, either as a JSON array or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum SubmittedResult {
    Correct(bool),
    Rounds(Vec<RoundAnswer>),
    Encoded(String),
}

/// One participant's recorded side of a duel.
///
/// A forfeited side has a completion time but neither score nor result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SideResult {
    pub result: Option<SubmittedResult>,
    pub score: Option<i32>,
    pub completed_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Duel {
    pub id: DuelId,
    pub player1_id: UserId,
    pub player2_id: Option<UserId>,
    pub sport: SportCategory,
    pub status: DuelStatus,
    pub player1: Option<SideResult>,
    pub player2: Option<SideResult>,
    pub winner_id: Option<UserId>,
    pub player1_reward_applied: bool,
    pub player2_reward_applied: bool,
    pub expires_at: String,
    pub created_at: String,
}

impl Duel {
    pub fn participant(&self, role: PlayerRole) -> Option<UserId> {
        match role {
            PlayerRole::Challenger => Some(self.player1_id),
            PlayerRole::Opponent => self.player2_id,
        }
    }

    pub fn side(&self, role: PlayerRole) -> Option<&SideResult> {
        match role {
            PlayerRole::Challenger => self.player1.as_ref(),
            PlayerRole::Opponent => self.player2.as_ref(),
        }
    }

    /// Role held by `user_id` in this duel, if any.
    pub fn role_of(&self, user_id: UserId) -> Option<PlayerRole> {
        if self.player1_id == user_id {
            Some(PlayerRole::Challenger)
        } else if self.player2_id == Some(user_id) {
            Some(PlayerRole::Opponent)
        } else {
            None
        }
    }
}
