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

use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;

/// The scheduling phase of a card.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrsState {
    /// Never graded.
    New,
    /// Working through the short learning steps.
    Learning,
    /// Graduated to day-scale intervals.
    Review,
    /// Failed a review. Scheduled exactly like `Learning`.
    Lapsed,
}

impl SrsState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SrsState::New => "new",
            SrsState::Learning => "learning",
            SrsState::Review => "review",
            SrsState::Lapsed => "lapsed",
        }
    }

    /// Whether the card is in the short-step phase.
    pub fn is_learning(&self) -> bool {
        matches!(self, SrsState::Learning | SrsState::Lapsed)
    }
}

impl Display for SrsState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for SrsState {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "new" => Ok(SrsState::New),
            "learning" => Ok(SrsState::Learning),
            "review" => Ok(SrsState::Review),
            "lapsed" => Ok(SrsState::Lapsed),
            _ => fail(format!("Invalid card state: {}", value)),
        }
    }
}

impl ToSql for SrsState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SrsState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        SrsState::try_from(string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from() {
        assert_eq!(SrsState::try_from("lapsed".to_string()), Ok(SrsState::Lapsed));
        let err = SrsState::try_from("mastered".to_string()).err().unwrap();
        assert_eq!(err.to_string(), "error: Invalid card state: mastered");
    }

    #[test]
    fn test_is_learning() {
        assert!(!SrsState::New.is_learning());
        assert!(SrsState::Learning.is_learning());
        assert!(SrsState::Lapsed.is_learning());
        assert!(!SrsState::Review.is_learning());
    }
}
