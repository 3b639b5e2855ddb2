//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use serde_json::Error as JsonError;
use tokio_cron_scheduler::JobSchedulerError;
use toml::de::Error as TomlError;
use washslot_common::error::{ErrorClassification, ErrorSeverity};
use washslot_domain::WashSlotError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub WashSlotError);

impl From<InfraError> for WashSlotError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<WashSlotError> for InfraError {
    fn from(value: WashSlotError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.0,
            WashSlotError::Auth(_)
                | WashSlotError::Scrape(_)
                | WashSlotError::Action(_)
                | WashSlotError::CalendarFetch(_)
                | WashSlotError::CalendarWrite(_)
        )
    }

    fn severity(&self) -> ErrorSeverity {
        match self.0 {
            WashSlotError::NotFound(_) => ErrorSeverity::Info,
            WashSlotError::Auth(_)
            | WashSlotError::Scrape(_)
            | WashSlotError::Action(_)
            | WashSlotError::CalendarFetch(_)
            | WashSlotError::CalendarWrite(_) => ErrorSeverity::Warning,
            WashSlotError::Config(_) | WashSlotError::InvalidInput(_) => ErrorSeverity::Error,
            WashSlotError::Internal(_) => ErrorSeverity::Critical,
        }
    }
}

trait IntoWashSlotError {
    fn into_washslot(self) -> WashSlotError;
}

impl IntoWashSlotError for IoError {
    fn into_washslot(self) -> WashSlotError {
        match self.kind() {
            ErrorKind::NotFound => WashSlotError::NotFound(self.to_string()),
            ErrorKind::PermissionDenied => {
                WashSlotError::Config(format!("permission denied: {self}"))
            }
            _ => WashSlotError::Internal(format!("I/O error: {self}")),
        }
    }
}

impl IntoWashSlotError for TomlError {
    fn into_washslot(self) -> WashSlotError {
        WashSlotError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl IntoWashSlotError for JsonError {
    fn into_washslot(self) -> WashSlotError {
        WashSlotError::Config(format!(
            "Invalid JSON format at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl IntoWashSlotError for JobSchedulerError {
    fn into_washslot(self) -> WashSlotError {
        WashSlotError::Internal(format!("job scheduler error: {self}"))
    }
}

macro_rules! impl_infra_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for InfraError {
                fn from(value: $source) -> Self {
                    InfraError(value.into_washslot())
                }
            }
        )+
    };
}

impl_infra_from!(IoError, TomlError, JsonError, JobSchedulerError);
