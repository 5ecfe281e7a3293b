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

use crate::error::SrsError;

/// How well the user recalled a card, from worst to best.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// Map a raw score from the client's button set onto a grade.
    ///
    /// Scores run from 0 to 5: 0 and 1 are `Again`, 2 is `Hard`, 3 is `Good`,
    /// 4 and 5 are `Easy`.
    pub fn from_score(score: i64) -> Result<Self, SrsError> {
        match score {
            0 | 1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 | 5 => Ok(Grade::Easy),
            _ => Err(SrsError::InvalidGrade(score)),
        }
    }

    /// The canonical score for this grade.
    pub fn score(self) -> u8 {
        match self {
            Grade::Again => 0,
            Grade::Hard => 2,
            Grade::Good => 3,
            Grade::Easy => 4,
        }
    }

    /// Whether the grade counts as a successful recall.
    pub fn is_pass(self) -> bool {
        matches!(self, Grade::Good | Grade::Easy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Grade {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.score() as i64))
    }
}

impl FromSql for Grade {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let score: i64 = FromSql::column_result(value)?;
        Grade::from_score(score).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score() {
        assert_eq!(Grade::from_score(0), Ok(Grade::Again));
        assert_eq!(Grade::from_score(1), Ok(Grade::Again));
        assert_eq!(Grade::from_score(2), Ok(Grade::Hard));
        assert_eq!(Grade::from_score(3), Ok(Grade::Good));
        assert_eq!(Grade::from_score(4), Ok(Grade::Easy));
        assert_eq!(Grade::from_score(5), Ok(Grade::Easy));
    }

    #[test]
    fn test_out_of_range_scores_are_rejected() {
        assert_eq!(Grade::from_score(6), Err(SrsError::InvalidGrade(6)));
        assert_eq!(Grade::from_score(-1), Err(SrsError::InvalidGrade(-1)));
    }

    #[test]
    fn test_canonical_scores_round_trip() {
        for grade in Grade::ALL {
            assert_eq!(Grade::from_score(grade.score() as i64), Ok(grade));
        }
    }

    #[test]
    fn test_pass_threshold() {
        assert!(!Grade::Again.is_pass());
        assert!(!Grade::Hard.is_pass());
        assert!(Grade::Good.is_pass());
        assert!(Grade::Easy.is_pass());
    }
}
