//! Shared row-mapping helpers.

use chrono::{DateTime, Utc};

use crate::domain::errors::{GovernanceError, GovernanceResult};

/// Parse an RFC 3339 timestamp stored as TEXT.
pub fn parse_datetime(s: &str) -> GovernanceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GovernanceError::SerializationError(format!("bad timestamp {s:?}: {e}")))
}

/// Parse a stored maturity level.
pub fn parse_maturity(s: &str) -> GovernanceResult<crate::domain::models::MaturityLevel> {
    s.parse()
        .map_err(|_| GovernanceError::SerializationError(format!("bad maturity level {s:?}")))
}
