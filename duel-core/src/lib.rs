pub mod achievements;
pub mod duel_state;
pub mod leveling;
pub mod rewards;
pub mod scoring;

// Re-export main components
pub use achievements::*;
pub use duel_state::*;
pub use leveling::*;
pub use rewards::*;
pub use scoring::*;

pub use duel_types::{DuelId, UserId};
