use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "duels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Option<Uuid>,
    pub sport: String,
    pub status: Status,
    pub expires_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text", nullable)]
    pub player1_result: Option<String>,
    pub player1_score: Option<i32>,
    pub player1_completed_at: Option<DateTimeWithTimeZone>,
    pub player1_reward_applied: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub player2_result: Option<String>,
    pub player2_score: Option<i32>,
    pub player2_completed_at: Option<DateTimeWithTimeZone>,
    pub player2_reward_applied: bool,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Status {
    #[sea_orm(string_value = "waiting_for_p2")]
    WaitingForP2,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl Status {
    pub const OPEN: [Status; 2] = [Status::WaitingForP2, Status::InProgress];
}

impl From<Status> for duel_types::DuelStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::WaitingForP2 => duel_types::DuelStatus::WaitingForP2,
            Status::InProgress => duel_types::DuelStatus::InProgress,
            Status::Completed => duel_types::DuelStatus::Completed,
            Status::Expired => duel_types::DuelStatus::Expired,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
