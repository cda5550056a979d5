use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Duels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Duels::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Duels::Player1Id).uuid().not_null())
                    .col(ColumnDef::new(Duels::Player2Id).uuid().null())
                    .col(ColumnDef::new(Duels::Sport).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Duels::Status)
                            .string_len(20)
                            .not_null()
                            .default("waiting_for_p2"),
                    )
                    .col(
                        ColumnDef::new(Duels::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Duels::Player1Result).text().null())
                    .col(ColumnDef::new(Duels::Player1Score).integer().null())
                    .col(
                        ColumnDef::new(Duels::Player1CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Duels::Player1RewardApplied)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Duels::Player2Result).text().null())
                    .col(ColumnDef::new(Duels::Player2Score).integer().null())
                    .col(
                        ColumnDef::new(Duels::Player2CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Duels::Player2RewardApplied)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Duels::WinnerId).uuid().null())
                    .col(
                        ColumnDef::new(Duels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Duels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Expiration sweep scans open duels by deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_duels_status_expires_at")
                    .table(Duels::Table)
                    .col(Duels::Status)
                    .col(Duels::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_duels_player1_id")
                    .table(Duels::Table)
                    .col(Duels::Player1Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_duels_player2_id")
                    .table(Duels::Table)
                    .col(Duels::Player2Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Duels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Duels {
    Table,
    Id,
    #[sea_orm(iden = "player1_id")]
    Player1Id,
    #[sea_orm(iden = "player2_id")]
    Player2Id,
    Sport,
    Status,
    ExpiresAt,
    #[sea_orm(iden = "player1_result")]
    Player1Result,
    #[sea_orm(iden = "player1_score")]
    Player1Score,
    #[sea_orm(iden = "player1_completed_at")]
    Player1CompletedAt,
    #[sea_orm(iden = "player1_reward_applied")]
    Player1RewardApplied,
    #[sea_orm(iden = "player2_result")]
    Player2Result,
    #[sea_orm(iden = "player2_score")]
    Player2Score,
    #[sea_orm(iden = "player2_completed_at")]
    Player2CompletedAt,
    #[sea_orm(iden = "player2_reward_applied")]
    Player2RewardApplied,
    WinnerId,
    CreatedAt,
    UpdatedAt,
}
