use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (name, experience reward, condition identifier)
const DEFAULT_ACHIEVEMENTS: &[(&str, i64, &str)] = &[
    ("First Victory", 50, "duel_wins:1"),
    ("Duelist", 25, "duels_played:1"),
    ("Seasoned Duelist", 100, "duels_played:25"),
    ("Champion", 250, "duel_wins:10"),
    ("Rising Star", 75, "level:3"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Achievements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Achievements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Achievements::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Achievements::ExperienceReward)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Achievements::Condition).string().not_null())
                    .to_owned(),
            )
            .await?;

        // The composite key is what rejects a second unlock of the same pair
        manager
            .create_table(
                Table::create()
                    .table(UserAchievements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserAchievements::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserAchievements::AchievementId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserAchievements::UnlockedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserAchievements::UserId)
                            .col(UserAchievements::AchievementId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_achievements_achievement_id")
                            .from(UserAchievements::Table, UserAchievements::AchievementId)
                            .to(Achievements::Table, Achievements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Achievements::Table).columns([
            Achievements::Name,
            Achievements::ExperienceReward,
            Achievements::Condition,
        ]);
        for &(name, experience_reward, condition) in DEFAULT_ACHIEVEMENTS {
            seed.values([name.into(), experience_reward.into(), condition.into()])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAchievements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Achievements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Achievements {
    Table,
    Id,
    Name,
    ExperienceReward,
    Condition,
}

#[derive(DeriveIden)]
enum UserAchievements {
    Table,
    UserId,
    AchievementId,
    UnlockedAt,
}
