pub mod prelude;

pub mod achievements;
pub mod duels;
pub mod user_achievements;
pub mod user_points;
pub mod user_stats;
