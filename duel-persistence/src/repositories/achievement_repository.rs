use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::{achievements, prelude::*, user_achievements};
use duel_types::{AchievementDefinition, UnlockedAchievement};

pub struct AchievementRepository {
    db: DatabaseConnection,
}

impl AchievementRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_definition(model: achievements::Model) -> AchievementDefinition {
        AchievementDefinition {
            id: model.id,
            name: model.name,
            experience_reward: model.experience_reward,
            condition: model.condition,
        }
    }

    pub async fn definitions(&self) -> Result<Vec<AchievementDefinition>> {
        let models = Achievements::find()
            .order_by_asc(achievements::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::model_to_definition).collect())
    }

    pub async fn unlocked_ids(&self, user_id: Uuid) -> Result<HashSet<i32>> {
        let unlocks = UserAchievements::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        Ok(unlocks.into_iter().map(|unlock| unlock.achievement_id).collect())
    }

    /// Insert the unlock of `achievement_id` for `user_id`. Returns `false`
    /// when the pair was already unlocked, including by a concurrent caller.
    pub async fn record_unlock(&self, user_id: Uuid, achievement_id: i32) -> Result<bool> {
        let unlock = user_achievements::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(user_id),
            achievement_id: sea_orm::ActiveValue::Set(achievement_id),
            unlocked_at: sea_orm::ActiveValue::Set(Utc::now().into()),
        };

        let inserted = UserAchievements::insert(unlock)
            .on_conflict(
                OnConflict::columns([
                    user_achievements::Column::UserId,
                    user_achievements::Column::AchievementId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted == 1)
    }

    /// Unlocked achievements of `user_id`, oldest first.
    pub async fn unlocked_for_user(&self, user_id: Uuid) -> Result<Vec<UnlockedAchievement>> {
        let unlocks = UserAchievements::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .order_by_asc(user_achievements::Column::UnlockedAt)
            .all(&self.db)
            .await?;

        let definitions: HashMap<i32, AchievementDefinition> = self
            .definitions()
            .await?
            .into_iter()
            .map(|definition| (definition.id, definition))
            .collect();

        Ok(unlocks
            .into_iter()
            .filter_map(|unlock| {
                let definition = definitions.get(&unlock.achievement_id)?;
                Some(UnlockedAchievement {
                    name: definition.name.clone(),
                    experience_reward: definition.experience_reward,
                    unlocked_at: unlock.unlocked_at.to_rfc3339(),
                })
            })
            .collect())
    }
}
