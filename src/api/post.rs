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

use std::sync::MutexGuard;
use std::sync::TryLockError;

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use serde::Deserialize;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::get::SessionView;
use crate::api::state::ServerState;
use crate::api::state::SharedSession;
use crate::error::SrsError;
use crate::session::SessionController;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    user_id: UserId,
    deck_id: DeckId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    session_id: String,
    #[serde(flatten)]
    session: SessionView,
}

pub async fn start_session(
    State(state): State<ServerState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let context = state.context(request.user_id);
    let session = SessionController::start(context, request.deck_id, rand::random())?;
    let session_id = uuid::Uuid::new_v4().to_string();
    log::debug!(
        "Session {session_id} started for user {} on deck {}",
        session.user(),
        session.deck()
    );
    let view = SessionView::from(&session);
    state.register(session_id.clone(), session)?;
    Ok(Json(StartResponse {
        session_id,
        session: view,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    card_id: ProgressId,
    grade: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    updated: CardProgress,
    #[serde(flatten)]
    session: SessionView,
}

pub async fn grade_card(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<GradeResponse>, ApiError> {
    let session = state.session(&session_id)?;
    let mut session = lock_for_update(&session)?;
    let effect = session.grade(&request.card_id, request.grade)?;
    Ok(Json(GradeResponse {
        updated: effect.updated,
        session: SessionView::from(&*session),
    }))
}

pub async fn refresh_session(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(&session_id)?;
    let mut session = lock_for_update(&session)?;
    session.refresh()?;
    Ok(Json(SessionView::from(&*session)))
}

/// Lock a session for a mutating call. A second call on the same session is
/// rejected rather than queued.
fn lock_for_update(session: &SharedSession) -> Result<MutexGuard<'_, SessionController>, ApiError> {
    match session.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => Err(SrsError::SessionBusy.into()),
        Err(TryLockError::Poisoned(_)) => Err(ApiError::poisoned()),
    }
}
