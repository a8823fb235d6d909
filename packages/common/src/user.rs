//! Users and provenance stamps.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommonError, CommonResult};

/// Wire format for dates: UTC, second precision.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A repository user as recorded in provenance and lock entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Login
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            realm: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Full name if known, login otherwise
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// Who touched a resource, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub user: User,
    pub date: DateTime<Utc>,
}

impl Stamp {
    pub fn new(user: User, date: DateTime<Utc>) -> Self {
        Self { user, date }
    }

    /// Stamp `user` with the current time, truncated to whole seconds so
    /// that it survives a trip through the wire format unchanged.
    pub fn now(user: User) -> Self {
        Self::new(user, truncate_to_seconds(Utc::now()))
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a wire date. Accepts the repository format as well as RFC 3339.
pub fn parse_date(value: &str) -> CommonResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDateTime::parse_from_str(value, DATE_FORMAT) {
        return Ok(date.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CommonError::InvalidDate(format!("{value}: {e}")))
}

fn truncate_to_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(date.timestamp(), 0).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_display_name_falls_back_to_login() {
        let user = User::new("amelie");
        assert_eq!(user.display_name(), "amelie");

        let user = user.with_name("Amélie Poulain");
        assert_eq!(user.display_name(), "Amélie Poulain");

        let user = User::new("bob").with_name("");
        assert_eq!(user.display_name(), "bob");
    }

    #[test]
    fn test_date_formats() {
        let date = Utc.with_ymd_and_hms(2011, 5, 17, 8, 30, 0).unwrap();
        assert_eq!(format_date(&date), "2011-05-17T08:30:00Z");
        assert_eq!(parse_date("2011-05-17T08:30:00Z").unwrap(), date);
        assert_eq!(parse_date("2011-05-17T10:30:00+02:00").unwrap(), date);
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_now_has_no_subsecond_part() {
        let stamp = Stamp::now(User::new("a"));
        assert_eq!(stamp.date.timestamp_subsec_nanos(), 0);
    }
}
