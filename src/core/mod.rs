//! Core policy, configuration, and common functionality

pub mod admin;
pub mod config;
pub mod error;
pub mod logging;
pub mod moderation;
pub mod rate_limiter;
pub mod state;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use moderation::{ModerationEngine, Rejection};
pub use state::{BotState, SharedState};
