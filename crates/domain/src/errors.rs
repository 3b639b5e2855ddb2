//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for WashSlot
///
/// Cloneable so a single failed fetch can be handed to every caller that
/// joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum WashSlotError {
    /// Portal login failed or timed out.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Reading slot state from the portal failed.
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// A book/unbook action was rejected or timed out.
    #[error("Action error: {0}")]
    Action(String),

    #[error("Calendar fetch error: {0}")]
    CalendarFetch(String),

    #[error("Calendar write error: {0}")]
    CalendarWrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WashSlotError {
    /// Short stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Scrape(_) => "scrape",
            Self::Action(_) => "action",
            Self::CalendarFetch(_) => "calendar_fetch",
            Self::CalendarWrite(_) => "calendar_write",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for WashSlot operations
pub type Result<T> = std::result::Result<T, WashSlotError>;
