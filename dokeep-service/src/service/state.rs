//! Per-call context passed into service operations.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{ServiceError, ServiceResult};

/// Authenticated owner identity, supplied by the session layer and trusted
/// as-is
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> ServiceResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::MissingOwner);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used when no document date could be determined
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_is_trimmed_and_required() {
        assert_eq!(OwnerId::new(" alice ").unwrap().as_str(), "alice");
        assert!(matches!(OwnerId::new("  "), Err(ServiceError::MissingOwner)));
    }
}
