use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use crate::entities::{duels, prelude::*};
use duel_types::{Duel, PlayerRole, SideResult, SportCategory, SubmittedResult};

/// Columns holding one participant's side of a duel.
struct SideColumns {
    result: duels::Column,
    score: duels::Column,
    completed_at: duels::Column,
    reward_applied: duels::Column,
}

fn side_columns(role: PlayerRole) -> SideColumns {
    match role {
        PlayerRole::Challenger => SideColumns {
            result: duels::Column::Player1Result,
            score: duels::Column::Player1Score,
            completed_at: duels::Column::Player1CompletedAt,
            reward_applied: duels::Column::Player1RewardApplied,
        },
        PlayerRole::Opponent => SideColumns {
            result: duels::Column::Player2Result,
            score: duels::Column::Player2Score,
            completed_at: duels::Column::Player2CompletedAt,
            reward_applied: duels::Column::Player2RewardApplied,
        },
    }
}

/// Store for duel rows.
///
/// Every state-changing method is a single conditional `UPDATE` and reports
/// whether it won (`true`) or found the row already changed (`false`).
/// Callers reload and re-derive state on `false`.
pub struct DuelRepository {
    db: DatabaseConnection,
}

impl DuelRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_duel(model: duels::Model) -> Result<Duel> {
        let sport: SportCategory = model
            .sport
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Duel {}: {}", model.id, e))?;

        let player1 = Self::side_from_columns(
            model.player1_result.as_deref(),
            model.player1_score,
            model.player1_completed_at,
        )?;
        let player2 = Self::side_from_columns(
            model.player2_result.as_deref(),
            model.player2_score,
            model.player2_completed_at,
        )?;

        Ok(Duel {
            id: model.id,
            player1_id: model.player1_id,
            player2_id: model.player2_id,
            sport,
            status: model.status.into(),
            player1,
            player2,
            winner_id: model.winner_id,
            player1_reward_applied: model.player1_reward_applied,
            player2_reward_applied: model.player2_reward_applied,
            expires_at: model.expires_at.to_rfc3339(),
            created_at: model.created_at.to_rfc3339(),
        })
    }

    fn side_from_columns(
        result: Option<&str>,
        score: Option<i32>,
        completed_at: Option<DateTimeWithTimeZone>,
    ) -> Result<Option<SideResult>> {
        let Some(completed_at) = completed_at else {
            return Ok(None);
        };

        let result = result
            .map(serde_json::from_str::<SubmittedResult>)
            .transpose()?;

        Ok(Some(SideResult {
            result,
            score,
            completed_at: completed_at.to_rfc3339(),
        }))
    }

    pub async fn create_duel(
        &self,
        player1_id: Uuid,
        player2_id: Option<Uuid>,
        sport: SportCategory,
        expires_at: DateTime<Utc>,
    ) -> Result<Duel> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let id = Uuid::new_v4();

        let duel_model = duels::ActiveModel {
            id: sea_orm::ActiveValue::Set(id),
            player1_id: sea_orm::ActiveValue::Set(player1_id),
            player2_id: sea_orm::ActiveValue::Set(player2_id),
            sport: sea_orm::ActiveValue::Set(sport.as_str().to_string()),
            status: sea_orm::ActiveValue::Set(duels::Status::WaitingForP2),
            expires_at: sea_orm::ActiveValue::Set(expires_at.into()),
            player1_result: sea_orm::ActiveValue::Set(None),
            player1_score: sea_orm::ActiveValue::Set(None),
            player1_completed_at: sea_orm::ActiveValue::Set(None),
            player1_reward_applied: sea_orm::ActiveValue::Set(false),
            player2_result: sea_orm::ActiveValue::Set(None),
            player2_score: sea_orm::ActiveValue::Set(None),
            player2_completed_at: sea_orm::ActiveValue::Set(None),
            player2_reward_applied: sea_orm::ActiveValue::Set(false),
            winner_id: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
        };

        Duels::insert(duel_model).exec_without_returning(&self.db).await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created duel"))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Duel>> {
        let duel_model = Duels::find_by_id(id).one(&self.db).await?;
        duel_model.map(Self::model_to_duel).transpose()
    }

    /// Open duels past their deadline whose opponent never completed.
    pub async fn find_expired_open(&self, now: DateTime<Utc>) -> Result<Vec<Duel>> {
        let now: DateTimeWithTimeZone = now.into();
        let models = Duels::find()
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .filter(duels::Column::ExpiresAt.lte(now))
            .filter(duels::Column::Player2CompletedAt.is_null())
            .order_by_asc(duels::Column::ExpiresAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Self::model_to_duel).collect()
    }

    /// Take the empty opponent slot of an open duel.
    pub async fn claim_opponent_slot(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = Duels::update_many()
            .col_expr(duels::Column::Player2Id, Expr::value(user_id))
            .col_expr(duels::Column::UpdatedAt, Expr::value(Self::now()))
            .filter(duels::Column::Id.eq(id))
            .filter(duels::Column::Player2Id.is_null())
            .filter(duels::Column::Player1Id.ne(user_id))
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Write-once record of one side's result while the other side is still
    /// outstanding. Moves the duel to `in_progress`.
    pub async fn record_side_result(
        &self,
        id: Uuid,
        role: PlayerRole,
        result: &SubmittedResult,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let side = side_columns(role);
        let completed_at: DateTimeWithTimeZone = completed_at.into();

        let update = Duels::update_many()
            .col_expr(side.result, Expr::value(serde_json::to_string(result)?))
            .col_expr(side.score, Expr::value(score))
            .col_expr(side.completed_at, Expr::value(completed_at))
            .col_expr(duels::Column::Status, Expr::value(duels::Status::InProgress))
            .col_expr(duels::Column::UpdatedAt, Expr::value(Self::now()))
            .filter(duels::Column::Id.eq(id))
            .filter(side.completed_at.is_null())
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .exec(&self.db)
            .await?;

        Ok(update.rows_affected == 1)
    }

    /// Write-once record of the second side together with the resolution, in a
    /// single statement. Only applies while the other side is still recorded
    /// and the duel is open.
    pub async fn record_final_result(
        &self,
        id: Uuid,
        role: PlayerRole,
        result: &SubmittedResult,
        score: i32,
        completed_at: DateTime<Utc>,
        winner_id: Option<Uuid>,
    ) -> Result<bool> {
        let side = side_columns(role);
        let other = side_columns(role.other());
        let completed_at: DateTimeWithTimeZone = completed_at.into();

        let update = Duels::update_many()
            .col_expr(side.result, Expr::value(serde_json::to_string(result)?))
            .col_expr(side.score, Expr::value(score))
            .col_expr(side.completed_at, Expr::value(completed_at))
            .col_expr(duels::Column::WinnerId, Expr::value(winner_id))
            .col_expr(duels::Column::Status, Expr::value(duels::Status::Completed))
            .col_expr(duels::Column::UpdatedAt, Expr::value(Self::now()))
            .filter(duels::Column::Id.eq(id))
            .filter(side.completed_at.is_null())
            .filter(other.score.is_not_null())
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .exec(&self.db)
            .await?;

        Ok(update.rows_affected == 1)
    }

    /// Resolve an open duel whose two sides were recorded by separate requests.
    pub async fn complete_duel(&self, id: Uuid, winner_id: Option<Uuid>) -> Result<bool> {
        let update = Duels::update_many()
            .col_expr(duels::Column::WinnerId, Expr::value(winner_id))
            .col_expr(duels::Column::Status, Expr::value(duels::Status::Completed))
            .col_expr(duels::Column::UpdatedAt, Expr::value(Self::now()))
            .filter(duels::Column::Id.eq(id))
            .filter(duels::Column::Player1Score.is_not_null())
            .filter(duels::Column::Player2Score.is_not_null())
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .exec(&self.db)
            .await?;

        Ok(update.rows_affected == 1)
    }

    /// Forfeit an overdue duel to the challenger. Also claims the challenger's
    /// reward marker so the forfeit bonus is credited by whoever wins this
    /// update and nobody else.
    pub async fn expire_duel(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let now: DateTimeWithTimeZone = now.into();

        let update = Duels::update_many()
            .col_expr(duels::Column::Status, Expr::value(duels::Status::Expired))
            .col_expr(
                duels::Column::WinnerId,
                Expr::col(duels::Column::Player1Id).into(),
            )
            .col_expr(duels::Column::Player2CompletedAt, Expr::value(now))
            .col_expr(duels::Column::Player1RewardApplied, Expr::value(true))
            .col_expr(duels::Column::UpdatedAt, Expr::value(now))
            .filter(duels::Column::Id.eq(id))
            .filter(duels::Column::Status.is_in(duels::Status::OPEN))
            .filter(duels::Column::Player2CompletedAt.is_null())
            .filter(duels::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await?;

        Ok(update.rows_affected == 1)
    }

    /// Mark a participant's reward as applied. Returns `true` for exactly one
    /// caller per (duel, side); rewards are only credited after winning this.
    pub async fn claim_reward(&self, id: Uuid, role: PlayerRole) -> Result<bool> {
        let side = side_columns(role);

        let update = Duels::update_many()
            .col_expr(side.reward_applied, Expr::value(true))
            .col_expr(duels::Column::UpdatedAt, Expr::value(Self::now()))
            .filter(duels::Column::Id.eq(id))
            .filter(side.reward_applied.eq(false))
            .filter(duels::Column::Status.is_in([duels::Status::Completed, duels::Status::Expired]))
            .exec(&self.db)
            .await?;

        Ok(update.rows_affected == 1)
    }

    fn now() -> DateTimeWithTimeZone {
        Utc::now().into()
    }
}
