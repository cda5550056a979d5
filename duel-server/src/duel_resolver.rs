use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::error::DuelError;
use crate::rewards::{AppliedReward, RewardDispatcher};
use duel_core::{DuelState, Reward, ScoringEngine};
use duel_persistence::repositories::DuelRepository;
use duel_types::{
    CreateDuelRequest, Duel, DuelId, DuelOutcome, DuelStatus, DuelView, PlayerRole,
    SubmitResultResponse, SubmittedResult, UserId,
};

/// Records submitted results, resolves duels once both sides are in and
/// hands out rewards exactly once per participant.
///
/// Every write goes through a conditional update in [`DuelRepository`]; when
/// one reports that it lost a race the duel is reloaded and the outcome is
/// derived from whatever the winner of the race persisted.
pub struct DuelResolver {
    duels: Arc<DuelRepository>,
    rewards: Arc<RewardDispatcher>,
    response_window: Duration,
}

impl DuelResolver {
    pub fn new(
        duels: Arc<DuelRepository>,
        rewards: Arc<RewardDispatcher>,
        response_window: Duration,
    ) -> Self {
        Self {
            duels,
            rewards,
            response_window,
        }
    }

    pub async fn create_duel(
        &self,
        challenger_id: UserId,
        request: CreateDuelRequest,
    ) -> Result<Duel, DuelError> {
        if request.opponent_id == Some(challenger_id) {
            return Err(DuelError::InvalidRequest(
                "A duel needs two different players".to_string(),
            ));
        }

        let expires_at = Utc::now() + self.response_window;
        let duel = self
            .duels
            .create_duel(challenger_id, request.opponent_id, request.sport, expires_at)
            .await?;

        info!(
            "User {} opened {} duel {} (expires {})",
            challenger_id,
            duel.sport,
            duel.id,
            duel.expires_at
        );
        Ok(duel)
    }

    pub async fn view_duel(&self, duel_id: DuelId, user_id: UserId) -> Result<DuelView, DuelError> {
        let duel = self.load(duel_id).await?;
        let your_role = duel.role_of(user_id).ok_or_else(|| {
            DuelError::Forbidden(format!("User {} is not part of duel {}", user_id, duel_id))
        })?;
        let your_outcome = DuelState::of(&duel).outcome_for(user_id);

        Ok(DuelView {
            duel,
            your_role,
            your_outcome,
        })
    }

    /// Record `user_id`'s result for `duel_id` as `role`.
    ///
    /// Submitting again after the duel is resolved returns the persisted
    /// outcome without touching the stored result or crediting anything twice.
    pub async fn submit_result(
        &self,
        duel_id: DuelId,
        user_id: UserId,
        role: PlayerRole,
        result: SubmittedResult,
    ) -> Result<SubmitResultResponse, DuelError> {
        let duel = self.load(duel_id).await?;
        let duel = self.authorize(duel, user_id, role).await?;

        if duel.status.is_final() {
            debug!("Duel {} already resolved, re-reporting for {:?}", duel.id, role);
            return Ok(self.settle(&duel, role).await);
        }

        let result = ScoringEngine::normalize(&result)?;
        let score = ScoringEngine::score(&result)?;
        let now = Utc::now();

        let other_score = duel.side(role.other()).and_then(|side| side.score);
        let resolved_here = match (duel.side(role), other_score, duel.player2_id) {
            (None, Some(other_score), Some(player2_id)) => {
                let winner = match role {
                    PlayerRole::Challenger => ScoringEngine::determine_winner(
                        (duel.player1_id, score),
                        (player2_id, other_score),
                    ),
                    PlayerRole::Opponent => ScoringEngine::determine_winner(
                        (duel.player1_id, other_score),
                        (player2_id, score),
                    ),
                };
                self.duels
                    .record_final_result(duel.id, role, &result, score, now, winner)
                    .await?
            }
            _ => {
                if self
                    .duels
                    .record_side_result(duel.id, role, &result, score, now)
                    .await?
                {
                    info!("Recorded {:?} result for duel {} (score {})", role, duel.id, score);
                }
                false
            }
        };

        let duel = self.load(duel_id).await?;
        if resolved_here {
            info!(
                "Duel {} completed, winner: {}",
                duel.id,
                Self::describe_winner(duel.winner_id)
            );
            return Ok(self.settle(&duel, role).await);
        }

        match DuelState::of(&duel) {
            state @ DuelState::ReadyToResolve { .. } => {
                let winner = state.winner(&duel);
                if self.duels.complete_duel(duel.id, winner).await? {
                    info!(
                        "Duel {} completed, winner: {}",
                        duel.id,
                        Self::describe_winner(winner)
                    );
                }
                let duel = self.load(duel_id).await?;
                Ok(self.settle(&duel, role).await)
            }
            state if state.is_final() => Ok(self.settle(&duel, role).await),
            _ => Ok(SubmitResultResponse::pending()),
        }
    }

    async fn load(&self, duel_id: DuelId) -> Result<Duel, DuelError> {
        self.duels
            .find_by_id(duel_id)
            .await?
            .ok_or(DuelError::NotFound(duel_id))
    }

    /// Check that `user_id` may act as `role`. An opponent slot left open at
    /// creation is claimed by the first other user submitting as opponent.
    async fn authorize(
        &self,
        duel: Duel,
        user_id: UserId,
        role: PlayerRole,
    ) -> Result<Duel, DuelError> {
        match role {
            PlayerRole::Challenger if duel.player1_id == user_id => Ok(duel),
            PlayerRole::Opponent if duel.player2_id == Some(user_id) => Ok(duel),
            PlayerRole::Opponent if duel.player2_id.is_none() && duel.player1_id != user_id => {
                if self.duels.claim_opponent_slot(duel.id, user_id).await? {
                    info!("User {} joined duel {} as opponent", user_id, duel.id);
                }
                let duel = self.load(duel.id).await?;
                if duel.player2_id == Some(user_id) {
                    Ok(duel)
                } else {
                    Err(Self::role_mismatch(&duel, user_id, role))
                }
            }
            _ => Err(Self::role_mismatch(&duel, user_id, role)),
        }
    }

    fn role_mismatch(duel: &Duel, user_id: UserId, role: PlayerRole) -> DuelError {
        warn!(
            "Rejected submission for duel {}: user {} is not the {:?}",
            duel.id, user_id, role
        );
        DuelError::Forbidden(format!(
            "User {} cannot submit as {:?} in duel {}",
            user_id, role, duel.id
        ))
    }

    /// Response for `caller` on a duel that may be resolved. Both sides are
    /// settled so a participant who never calls back still gets credited.
    async fn settle(&self, duel: &Duel, caller: PlayerRole) -> SubmitResultResponse {
        let state = DuelState::of(duel);
        if !state.is_final() {
            return SubmitResultResponse::pending();
        }

        let Some(caller_id) = duel.participant(caller) else {
            return SubmitResultResponse::pending();
        };

        let mut response = SubmitResultResponse {
            success: true,
            duel_result: state.outcome_for(caller_id),
            winner_id: state.winner(duel),
            ..SubmitResultResponse::pending()
        };

        for role in [caller, caller.other()] {
            let applied = self.settle_participant(duel, role).await;
            if role == caller {
                response.experience_awarded = applied.reward.experience;
                response.points_awarded = applied.reward.points;
                response.newly_unlocked_achievements = applied.unlocked;
            }
        }

        response
    }

    /// Claim `role`'s reward marker and credit the reward if this call won the
    /// claim. A marker claimed earlier reports the duel's reward with no unlocks.
    async fn settle_participant(&self, duel: &Duel, role: PlayerRole) -> AppliedReward {
        let Some(user_id) = duel.participant(role) else {
            return AppliedReward::default();
        };
        let Some((reward, is_win)) = self.terms_for(duel, role, user_id) else {
            return AppliedReward::default();
        };

        match self.duels.claim_reward(duel.id, role).await {
            Ok(true) => match self.rewards.credit(user_id, reward, duel.sport, is_win).await {
                Ok(applied) => applied,
                Err(e) => {
                    error!(
                        "Reward for user {} on duel {} was claimed but not credited: {:#}",
                        user_id, duel.id, e
                    );
                    AppliedReward::default()
                }
            },
            Ok(false) => AppliedReward {
                reward,
                unlocked: Vec::new(),
            },
            Err(e) => {
                error!(
                    "Failed to claim reward for user {} on duel {}: {:#}",
                    user_id, duel.id, e
                );
                AppliedReward::default()
            }
        }
    }

    /// Reward and win flag owed to `role`, or `None` when the duel owes nothing
    /// (unresolved, or the opponent side of a forfeit).
    fn terms_for(&self, duel: &Duel, role: PlayerRole, user_id: UserId) -> Option<(Reward, bool)> {
        let schedule = self.rewards.schedule();
        match (duel.status, role) {
            (DuelStatus::Expired, PlayerRole::Challenger) => Some((schedule.forfeit_win, true)),
            (DuelStatus::Expired, PlayerRole::Opponent) => None,
            (DuelStatus::Completed, _) => {
                let outcome = DuelState::of(duel).outcome_for(user_id);
                Some((schedule.for_outcome(outcome), outcome == DuelOutcome::Win))
            }
            _ => None,
        }
    }

    fn describe_winner(winner: Option<UserId>) -> String {
        winner.map_or_else(|| "tie".to_string(), |id| id.to_string())
    }
}
