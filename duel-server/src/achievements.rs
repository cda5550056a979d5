use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use duel_core::qualifying_achievements;
use duel_persistence::repositories::{AchievementRepository, UserStatsRepository};
use duel_types::UserId;

/// Unlocks every achievement a user's current stats satisfy and credits the
/// bonus experience of each one.
pub struct AchievementEvaluator {
    achievements: Arc<AchievementRepository>,
    ledger: Arc<UserStatsRepository>,
}

impl AchievementEvaluator {
    pub fn new(achievements: Arc<AchievementRepository>, ledger: Arc<UserStatsRepository>) -> Self {
        Self {
            achievements,
            ledger,
        }
    }

    /// Names of the achievements this call unlocked, in unlock order.
    ///
    /// Bonus experience can raise the level past another threshold, so stats
    /// are reloaded after every pass until a pass unlocks nothing. An unlock
    /// already recorded by a concurrent evaluation is skipped without a bonus.
    pub async fn evaluate(&self, user_id: UserId) -> Result<Vec<String>> {
        let definitions = self.achievements.definitions().await?;
        let mut newly_unlocked = Vec::new();

        loop {
            let stats = self.ledger.stats_or_empty(user_id).await?;
            let unlocked = self.achievements.unlocked_ids(user_id).await?;
            let qualifying = qualifying_achievements(&definitions, &unlocked, &stats);

            let mut unlocked_this_pass = 0;
            for definition in qualifying {
                if !self.achievements.record_unlock(user_id, definition.id).await? {
                    debug!(
                        "Achievement '{}' for user {} was unlocked concurrently",
                        definition.name, user_id
                    );
                    continue;
                }

                info!("User {} unlocked achievement '{}'", user_id, definition.name);
                unlocked_this_pass += 1;
                newly_unlocked.push(definition.name.clone());

                if definition.experience_reward > 0 {
                    self.ledger
                        .apply_experience_bonus(user_id, definition.experience_reward)
                        .await?;
                }
            }

            if unlocked_this_pass == 0 {
                break;
            }
        }

        Ok(newly_unlocked)
    }
}
