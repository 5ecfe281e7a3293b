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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::types::ids::ProgressId;

/// Errors raised by the scheduling engine and its repository boundary.
///
/// Every variant is raised before any state is mutated, or after the
/// repository has rolled back, so the caller can always retry or re-prompt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SrsError {
    /// The grade is outside the recognized ordinal scale.
    #[error("invalid grade: {0}")]
    InvalidGrade(i64),
    /// The card being graded is not the head of the session queue.
    #[error("card {card_id} is not the current card")]
    StaleCard { card_id: ProgressId },
    /// The repository failed transiently. Safe to retry.
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),
    /// No progress record exists with this id.
    #[error("no progress record with id {0}")]
    RecordNotFound(ProgressId),
    /// A record for this id or card already exists.
    #[error("progress record {0} already exists")]
    DuplicateRecord(ProgressId),
    /// A stored record could not be decoded. Retrying will not help.
    #[error("corrupt progress record: {0}")]
    CorruptRecord(String),
    /// Another grading call is in flight for the same session.
    #[error("a grading call is already in flight for this session")]
    SessionBusy,
}

impl SrsError {
    /// The variant name, used as a machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SrsError::InvalidGrade(_) => "InvalidGrade",
            SrsError::StaleCard { .. } => "StaleCard",
            SrsError::RepositoryUnavailable(_) => "RepositoryUnavailable",
            SrsError::RecordNotFound(_) => "RecordNotFound",
            SrsError::DuplicateRecord(_) => "DuplicateRecord",
            SrsError::CorruptRecord(_) => "CorruptRecord",
            SrsError::SessionBusy => "SessionBusy",
        }
    }
}

impl From<rusqlite::Error> for SrsError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::Utf8Error(..) => SrsError::CorruptRecord(value.to_string()),
            _ => SrsError::RepositoryUnavailable(value.to_string()),
        }
    }
}

/// An application-level error carrying a human-readable message.
#[derive(Debug, PartialEq)]
pub struct ErrorReport {
    message: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

pub fn fail<T>(message: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport::new(message))
}

impl From<SrsError> for ErrorReport {
    fn from(value: SrsError) -> Self {
        ErrorReport::new(value.to_string())
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport::new(format!("I/O error: {value}"))
    }
}

impl From<rusqlite::Error> for ErrorReport {
    fn from(value: rusqlite::Error) -> Self {
        ErrorReport::new(format!("database error: {value}"))
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport::new(format!("JSON error: {value}"))
    }
}

impl From<toml::de::Error> for ErrorReport {
    fn from(value: toml::de::Error) -> Self {
        ErrorReport::new(format!("invalid configuration: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_display() {
        let result: Fallible<()> = fail("directory does not exist.");
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "error: directory does not exist.");
    }

    #[test]
    fn test_srs_error_into_report() {
        let err: ErrorReport = SrsError::InvalidGrade(9).into();
        assert_eq!(err.to_string(), "error: invalid grade: 9");
    }

    #[test]
    fn test_rusqlite_error_mapping() {
        let err: SrsError = rusqlite::Error::IntegralValueOutOfRange(9, -1).into();
        assert_eq!(err.kind(), "CorruptRecord");
        let err: SrsError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), "RepositoryUnavailable");
    }

    #[test]
    fn test_kind() {
        let err = SrsError::RecordNotFound(ProgressId::new("abc"));
        assert_eq!(err.kind(), "RecordNotFound");
        assert_eq!(err.to_string(), "no progress record with id abc");
    }
}
