//! Store-independent error taxonomy.
//!
//! Every store call in the service is reclassified through this taxonomy so
//! callers see a stable set of kinds regardless of which backing store
//! failed. No retries happen inside the service.

use showgrid_core::{CalendarError, StoreError};
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the consistency core.
///
/// "Not found" is never represented here; lookups on missing keys return
/// empty results instead.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// Bad input shape or constraint violation. The caller's fault, not
    /// retryable by the system.
    #[error("validation error: {0}")]
    Validation(String),

    /// The relational show store failed. An infrastructure issue.
    #[error("show store error: {0}")]
    ShowStore(String),

    /// The calendar store failed. An infrastructure issue.
    #[error("calendar store error: {0}")]
    CalendarStore(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Data(reason) => Self::Validation(reason),
            StoreError::Service(reason) => Self::ShowStore(reason),
        }
    }
}

impl From<CalendarError> for ServiceError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Data(reason) => Self::Validation(reason),
            CalendarError::Service(reason) => Self::CalendarStore(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_data_errors_become_validation() {
        let err = ServiceError::from(StoreError::Data("duplicate id".to_string()));
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn store_service_errors_stay_infrastructure() {
        let err = ServiceError::from(StoreError::Service("connection reset".to_string()));
        assert!(matches!(err, ServiceError::ShowStore(_)));

        let err = ServiceError::from(CalendarError::Service("503".to_string()));
        assert!(matches!(err, ServiceError::CalendarStore(_)));
    }

    #[test]
    fn calendar_data_errors_become_validation() {
        let err = ServiceError::from(CalendarError::Data("no entry".to_string()));
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
