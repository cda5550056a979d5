use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use crate::entities::{prelude::*, user_points, user_stats};
use duel_core::level_for_experience;
use duel_types::{
    LeaderboardEntry, PointsCategory, PointsTally, SportCategory, TimeWindow, UserId,
    UserStats as UserStatsRecord,
};

/// Attempts at the revision compare-and-swap before giving up.
pub const MAX_LEDGER_ATTEMPTS: usize = 5;

/// One change to a user's ledger.
#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    experience: i64,
    points: i64,
    sport: Option<SportCategory>,
    /// `Some(won)` when the entry settles a played duel
    duel_won: Option<bool>,
}

/// The reward ledger: per-user experience, level, duel counters and point
/// aggregates.
///
/// Callers are responsible for invoking it at most once per (duel, participant).
pub struct UserStatsRepository {
    db: DatabaseConnection,
}

impl UserStatsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_stats(model: user_stats::Model) -> UserStatsRecord {
        UserStatsRecord {
            user_id: model.user_id,
            experience: model.experience,
            level: model.level,
            duels_played: model.duels_played,
            duels_won: model.duels_won,
        }
    }

    pub async fn find_stats(&self, user_id: UserId) -> Result<Option<UserStatsRecord>> {
        let model = UserStats::find_by_id(user_id).one(&self.db).await?;
        Ok(model.map(Self::model_to_stats))
    }

    /// Stats of `user_id`, all zero for a user that was never rewarded.
    pub async fn stats_or_empty(&self, user_id: UserId) -> Result<UserStatsRecord> {
        Ok(self
            .find_stats(user_id)
            .await?
            .unwrap_or_else(|| UserStatsRecord::empty(user_id)))
    }

    /// Credit the result of one played duel.
    pub async fn apply_duel_reward(
        &self,
        user_id: UserId,
        experience: i64,
        points: i64,
        sport: SportCategory,
        is_win: bool,
    ) -> Result<UserStatsRecord> {
        self.apply(
            user_id,
            LedgerEntry {
                experience,
                points,
                sport: Some(sport),
                duel_won: Some(is_win),
            },
        )
        .await
    }

    /// Credit bonus experience only; duel counters and points are untouched.
    pub async fn apply_experience_bonus(
        &self,
        user_id: UserId,
        experience: i64,
    ) -> Result<UserStatsRecord> {
        self.apply(
            user_id,
            LedgerEntry {
                experience,
                points: 0,
                sport: None,
                duel_won: None,
            },
        )
        .await
    }

    async fn apply(&self, user_id: UserId, entry: LedgerEntry) -> Result<UserStatsRecord> {
        if entry.experience < 0 || entry.points < 0 {
            anyhow::bail!("Reward deltas must not be negative: {:?}", entry);
        }

        let txn = self.db.begin().await?;
        Self::ensure_stats_row(&txn, user_id).await?;

        let mut updated = None;
        for attempt in 1..=MAX_LEDGER_ATTEMPTS {
            let current = UserStats::find_by_id(user_id)
                .one(&txn)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Stats row for {} vanished", user_id))?;

            let experience = current.experience + entry.experience;
            let level = level_for_experience(experience);
            let duels_played = current.duels_played + i64::from(entry.duel_won.is_some());
            let duels_won = current.duels_won + i64::from(entry.duel_won == Some(true));

            let result = UserStats::update_many()
                .col_expr(user_stats::Column::Experience, Expr::value(experience))
                .col_expr(user_stats::Column::Level, Expr::value(level))
                .col_expr(user_stats::Column::DuelsPlayed, Expr::value(duels_played))
                .col_expr(user_stats::Column::DuelsWon, Expr::value(duels_won))
                .col_expr(user_stats::Column::Revision, Expr::value(current.revision + 1))
                .col_expr(user_stats::Column::UpdatedAt, Expr::value(Self::now()))
                .filter(user_stats::Column::UserId.eq(user_id))
                .filter(user_stats::Column::Revision.eq(current.revision))
                .exec(&txn)
                .await?;

            if result.rows_affected == 1 {
                updated = Some(UserStatsRecord {
                    user_id,
                    experience,
                    level,
                    duels_played,
                    duels_won,
                });
                break;
            }

            tracing::debug!(
                "Stats revision {} for {} changed underneath, retrying (attempt {})",
                current.revision,
                user_id,
                attempt
            );
        }

        let stats = updated.ok_or_else(|| {
            anyhow::anyhow!(
                "Gave up updating stats for {} after {} attempts",
                user_id,
                MAX_LEDGER_ATTEMPTS
            )
        })?;

        if entry.points > 0 {
            let mut categories = vec![PointsCategory::Overall];
            categories.extend(entry.sport.map(PointsCategory::Sport));

            for window in TimeWindow::ALL {
                for &category in &categories {
                    Self::add_points(&txn, user_id, window, category, entry.points).await?;
                }
            }
        }

        txn.commit().await?;
        Ok(stats)
    }

    async fn ensure_stats_row<C: ConnectionTrait>(db: &C, user_id: UserId) -> Result<()> {
        let now = Self::now();
        let stats_model = user_stats::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(user_id),
            experience: sea_orm::ActiveValue::Set(0),
            level: sea_orm::ActiveValue::Set(level_for_experience(0)),
            duels_played: sea_orm::ActiveValue::Set(0),
            duels_won: sea_orm::ActiveValue::Set(0),
            revision: sea_orm::ActiveValue::Set(0),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
        };

        UserStats::insert(stats_model)
            .on_conflict(
                OnConflict::column(user_stats::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    /// `points += delta` on one (user, window, category) aggregate, creating it
    /// at `delta` when absent.
    async fn add_points<C: ConnectionTrait>(
        db: &C,
        user_id: UserId,
        window: TimeWindow,
        category: PointsCategory,
        delta: i64,
    ) -> Result<()> {
        let now = Self::now();
        let points_model = user_points::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(user_id),
            time_window: sea_orm::ActiveValue::Set(window.as_str().to_string()),
            category: sea_orm::ActiveValue::Set(category.as_key().to_string()),
            points: sea_orm::ActiveValue::Set(delta),
            updated_at: sea_orm::ActiveValue::Set(now),
        };

        UserPoints::insert(points_model)
            .on_conflict(
                OnConflict::columns([
                    user_points::Column::UserId,
                    user_points::Column::TimeWindow,
                    user_points::Column::Category,
                ])
                .value(
                    user_points::Column::Points,
                    Expr::col((UserPoints, user_points::Column::Points)).add(delta),
                )
                .value(user_points::Column::UpdatedAt, Expr::value(now))
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    pub async fn points_for_user(&self, user_id: UserId) -> Result<Vec<PointsTally>> {
        let rows = UserPoints::find()
            .filter(user_points::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        let mut tallies: Vec<PointsTally> = rows
            .into_iter()
            .filter_map(|row| {
                let window = row.time_window.parse::<TimeWindow>().ok()?;
                let category = PointsCategory::from_key(&row.category)?;
                Some(PointsTally {
                    window,
                    sport: category.sport(),
                    points: row.points,
                })
            })
            .collect();
        tallies.sort_by_key(|tally| (tally.window, tally.sport));

        Ok(tallies)
    }

    /// Top users for one (window, category) aggregate.
    pub async fn leaderboard(
        &self,
        window: TimeWindow,
        category: PointsCategory,
        limit: u64,
    ) -> Result<Vec<LeaderboardEntry>> {
        let rows = UserPoints::find()
            .filter(user_points::Column::TimeWindow.eq(window.as_str()))
            .filter(user_points::Column::Category.eq(category.as_key()))
            .order_by_desc(user_points::Column::Points)
            .limit(limit)
            .all(&self.db)
            .await?;

        let leaderboard = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| LeaderboardEntry {
                user_id: row.user_id,
                points: row.points,
                rank: (index + 1) as u32,
            })
            .collect();

        Ok(leaderboard)
    }

    fn now() -> DateTimeWithTimeZone {
        Utc::now().into()
    }
}
