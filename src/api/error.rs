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

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

use crate::error::SrsError;

/// An error response: `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    pub fn unknown_session(session_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "UnknownSession",
            message: format!("no session with id {session_id}"),
        }
    }

    pub fn poisoned() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "Internal",
            message: "session state is unavailable".to_string(),
        }
    }
}

impl From<SrsError> for ApiError {
    fn from(value: SrsError) -> Self {
        let status = match &value {
            SrsError::InvalidGrade(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SrsError::StaleCard { .. } => StatusCode::CONFLICT,
            SrsError::SessionBusy => StatusCode::CONFLICT,
            SrsError::DuplicateRecord(_) => StatusCode::CONFLICT,
            SrsError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            SrsError::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SrsError::CorruptRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("error: {} ({})", self.message, self.kind);
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}
