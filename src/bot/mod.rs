//! Conversation turn handling

pub mod handler;

pub use handler::Answer;
pub use handler::TurnHandler;
pub use handler::TurnOutcome;
pub use handler::TurnState;
pub use handler::ERROR_REPLY_PREFIX;
