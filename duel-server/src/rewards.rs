use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error};

use crate::achievements::AchievementEvaluator;
use duel_core::{Reward, RewardSchedule};
use duel_persistence::repositories::UserStatsRepository;
use duel_types::{SportCategory, UserId};

/// What one participant actually received for a duel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedReward {
    pub reward: Reward,
    pub unlocked: Vec<String>,
}

/// Credits a settled duel to the ledger, then runs the achievement evaluator.
///
/// Callers must have claimed the participant's reward marker first; this type
/// does no deduplication of its own.
pub struct RewardDispatcher {
    ledger: Arc<UserStatsRepository>,
    evaluator: Arc<AchievementEvaluator>,
    schedule: RewardSchedule,
}

impl RewardDispatcher {
    pub fn new(
        ledger: Arc<UserStatsRepository>,
        evaluator: Arc<AchievementEvaluator>,
        schedule: RewardSchedule,
    ) -> Self {
        Self {
            ledger,
            evaluator,
            schedule,
        }
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Ledger failures are returned. Evaluator failures are logged and leave
    /// the credited reward in place with no unlocks reported.
    pub async fn credit(
        &self,
        user_id: UserId,
        reward: Reward,
        sport: SportCategory,
        is_win: bool,
    ) -> Result<AppliedReward> {
        let stats = self
            .ledger
            .apply_duel_reward(user_id, reward.experience, reward.points, sport, is_win)
            .await?;
        debug!(
            "Credited {} xp / {} points to user {} (now level {}, {} xp)",
            reward.experience, reward.points, user_id, stats.level, stats.experience
        );

        let unlocked = match self.evaluator.evaluate(user_id).await {
            Ok(unlocked) => unlocked,
            Err(e) => {
                error!("Achievement evaluation failed for user {}: {:#}", user_id, e);
                Vec::new()
            }
        };

        Ok(AppliedReward { reward, unlocked })
    }
}
