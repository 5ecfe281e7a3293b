// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Add;

use chrono::DateTime;
use chrono::Duration;
use chrono::SecondsFormat;
use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;

/// An absolute point in time, always in UTC.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self(ts)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse an RFC 3339 string.
    pub fn parse(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| Self(ts.with_timezone(&Utc)))
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// The signed duration from `earlier` to `self`.
    pub fn since(self, earlier: Timestamp) -> Duration {
        self.0 - earlier.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at the ends of the representable range.
    fn add(self, rhs: Duration) -> Self::Output {
        match self.0.checked_add_signed(rhs) {
            Some(ts) => Timestamp(ts),
            None if rhs < Duration::zero() => Timestamp(DateTime::<Utc>::MIN_UTC),
            None => Timestamp(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let str = self.0.to_rfc3339_opts(SecondsFormat::Micros, true);
        Ok(ToSqlOutput::from(str))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        let ts =
            DateTime::parse_from_rfc3339(&string).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        let ts = ts.with_timezone(&Utc);
        Ok(Timestamp(ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_since() {
        let a = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        let b = a + Duration::minutes(10);
        assert_eq!(b.since(a), Duration::minutes(10));
        assert!(a < b);
    }

    #[test]
    fn test_add_saturates() {
        let a = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(a + Duration::MAX, Timestamp(DateTime::<Utc>::MAX_UTC));
        assert_eq!(a + Duration::MIN, Timestamp(DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn test_parse_offset() {
        let a = Timestamp::parse("2025-01-01T07:00:00+07:00").unwrap();
        let b = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2025-01-01T00:00:00Z");
    }
}
