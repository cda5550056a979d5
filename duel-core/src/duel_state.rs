use duel_types::{Duel, DuelOutcome, DuelStatus, PlayerRole, UserId};

use crate::ScoringEngine;

/// Resolution state of a duel, derived from its stored status and sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    /// Nobody has submitted yet
    WaitingForOpponent,
    /// Exactly one side has submitted
    InProgress { completed: PlayerRole },
    /// Both sides submitted but the winner has not been persisted yet
    ReadyToResolve {
        player1_score: i32,
        player2_score: i32,
    },
    Completed { winner: Option<UserId> },
    Expired { winner: UserId },
}

impl DuelState {
    pub fn of(duel: &Duel) -> Self {
        match duel.status {
            DuelStatus::Completed => DuelState::Completed {
                winner: duel.winner_id,
            },
            DuelStatus::Expired => DuelState::Expired {
                winner: duel.winner_id.unwrap_or(duel.player1_id),
            },
            DuelStatus::WaitingForP2 | DuelStatus::InProgress => {
                let player1_score = duel.player1.as_ref().and_then(|side| side.score);
                let player2_score = duel.player2.as_ref().and_then(|side| side.score);

                match (player1_score, player2_score) {
                    (Some(player1_score), Some(player2_score)) => DuelState::ReadyToResolve {
                        player1_score,
                        player2_score,
                    },
                    (Some(_), None) => DuelState::InProgress {
                        completed: PlayerRole::Challenger,
                    },
                    (None, Some(_)) => DuelState::InProgress {
                        completed: PlayerRole::Opponent,
                    },
                    (None, None) => DuelState::WaitingForOpponent,
                }
            }
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DuelState::Completed { .. } | DuelState::Expired { .. })
    }

    /// The winner a resolution would persist, or the persisted one.
    /// `None` while unresolved or for a tie.
    pub fn winner(&self, duel: &Duel) -> Option<UserId> {
        match *self {
            DuelState::Completed { winner } => winner,
            DuelState::Expired { winner } => Some(winner),
            DuelState::ReadyToResolve {
                player1_score,
                player2_score,
            } => duel.player2_id.and_then(|player2_id| {
                ScoringEngine::determine_winner(
                    (duel.player1_id, player1_score),
                    (player2_id, player2_score),
                )
            }),
            DuelState::WaitingForOpponent | DuelState::InProgress { .. } => None,
        }
    }

    /// Outcome for `user_id`. Anything short of a persisted resolution is pending.
    pub fn outcome_for(&self, user_id: UserId) -> DuelOutcome {
        match *self {
            DuelState::Completed { winner } => outcome_against(winner, user_id),
            DuelState::Expired { winner } => outcome_against(Some(winner), user_id),
            _ => DuelOutcome::Pending,
        }
    }
}

/// Win/loss/tie of `user_id` given a resolved winner (`None` is a tie).
pub fn outcome_against(winner: Option<UserId>, user_id: UserId) -> DuelOutcome {
    match winner {
        Some(winner_id) if winner_id == user_id => DuelOutcome::Win,
        Some(_) => DuelOutcome::Loss,
        None => DuelOutcome::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_types::{SideResult, SportCategory, SubmittedResult};
    use uuid::Uuid;

    fn side(score: i32) -> SideResult {
        SideResult {
            result: Some(SubmittedResult::Correct(score > 0)),
            score: Some(score),
            completed_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn duel() -> Duel {
        Duel {
            id: Uuid::new_v4(),
            player1_id: Uuid::new_v4(),
            player2_id: Some(Uuid::new_v4()),
            sport: SportCategory::Football,
            status: DuelStatus::WaitingForP2,
            player1: None,
            player2: None,
            winner_id: None,
            player1_reward_applied: false,
            player2_reward_applied: false,
            expires_at: "2026-01-02T00:00:00+00:00".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_state_follows_submitted_sides() {
        let mut duel = duel();
        assert_eq!(DuelState::of(&duel), DuelState::WaitingForOpponent);

        duel.player1 = Some(side(3));
        duel.status = DuelStatus::InProgress;
        assert_eq!(
            DuelState::of(&duel),
            DuelState::InProgress {
                completed: PlayerRole::Challenger
            }
        );

        duel.player2 = Some(side(1));
        let state = DuelState::of(&duel);
        assert_eq!(
            state,
            DuelState::ReadyToResolve {
                player1_score: 3,
                player2_score: 1
            }
        );
        assert_eq!(state.winner(&duel), Some(duel.player1_id));
        assert_eq!(state.outcome_for(duel.player1_id), DuelOutcome::Pending);
    }

    #[test]
    fn test_completed_outcomes() {
        let mut duel = duel();
        let player2_id = duel.player2_id.unwrap();
        duel.status = DuelStatus::Completed;
        duel.winner_id = Some(player2_id);

        let state = DuelState::of(&duel);
        assert!(state.is_final());
        assert_eq!(state.outcome_for(player2_id), DuelOutcome::Win);
        assert_eq!(state.outcome_for(duel.player1_id), DuelOutcome::Loss);
    }

    #[test]
    fn test_completed_without_winner_is_tie_for_both() {
        let mut duel = duel();
        duel.status = DuelStatus::Completed;

        let state = DuelState::of(&duel);
        assert_eq!(state.outcome_for(duel.player1_id), DuelOutcome::Tie);
        assert_eq!(state.outcome_for(duel.player2_id.unwrap()), DuelOutcome::Tie);
    }

    #[test]
    fn test_expired_duel_is_challenger_win() {
        let mut duel = duel();
        duel.player2_id = None;
        duel.status = DuelStatus::Expired;
        duel.winner_id = Some(duel.player1_id);

        let state = DuelState::of(&duel);
        assert_eq!(state.outcome_for(duel.player1_id), DuelOutcome::Win);
        assert_eq!(state.outcome_for(Uuid::new_v4()), DuelOutcome::Loss);
    }

    #[test]
    fn test_forfeited_side_without_score_is_not_ready() {
        let mut duel = duel();
        duel.player2 = Some(SideResult {
            result: None,
            score: None,
            completed_at: "2026-01-02T00:00:00+00:00".to_string(),
        });
        assert_eq!(DuelState::of(&duel), DuelState::WaitingForOpponent);
    }
}
