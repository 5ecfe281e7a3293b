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
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use serde::Deserialize;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::state::ServerState;
use crate::preview::PreviewView;
use crate::queue::StateCounts;
use crate::session::SessionController;
use crate::session::SessionStatus;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: SessionStatus,
    pub current: Option<CardProgress>,
    pub counts: StateCounts,
    pub graded: usize,
}

impl From<&SessionController> for SessionView {
    fn from(session: &SessionController) -> Self {
        Self {
            status: session.status(),
            current: session.current().cloned(),
            counts: session.counts(),
            graded: session.graded(),
        }
    }
}

pub async fn get_session(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(&session_id)?;
    let session = session.lock().map_err(|_| ApiError::poisoned())?;
    Ok(Json(SessionView::from(&*session)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    card_id: ProgressId,
    grade: i64,
}

pub async fn get_preview(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewView>, ApiError> {
    let session = state.session(&session_id)?;
    let session = session.lock().map_err(|_| ApiError::poisoned())?;
    let preview = session.preview(&query.card_id, query.grade)?;
    Ok(Json(PreviewView::from(&preview)))
}

pub async fn get_previews(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<PreviewView>>, ApiError> {
    let session = state.session(&session_id)?;
    let session = session.lock().map_err(|_| ApiError::poisoned())?;
    let previews = session.previews().unwrap_or_default();
    Ok(Json(previews.iter().map(PreviewView::from).collect()))
}

pub async fn get_counts(
    State(state): State<ServerState>,
    Path((user_id, deck_id)): Path<(UserId, DeckId)>,
) -> Result<Json<StateCounts>, ApiError> {
    let now = state.clock.now();
    let records = state.repo.fetch_deck_progress(&user_id, &deck_id, now)?;
    Ok(Json(StateCounts::from_records(&records, now)))
}
