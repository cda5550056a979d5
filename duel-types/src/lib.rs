pub mod duel;
pub mod errors;
pub mod messages;
pub mod user;

// Re-export all types
pub use duel::*;
pub use errors::*;
pub use messages::*;
pub use user::*;

pub type DuelId = uuid::Uuid;
pub type UserId = uuid::Uuid;
