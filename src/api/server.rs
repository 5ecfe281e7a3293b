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

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::signal;

use crate::api::error::ApiError;
use crate::api::get::get_counts;
use crate::api::get::get_preview;
use crate::api::get::get_previews;
use crate::api::get::get_session;
use crate::api::post::grade_card;
use crate::api::post::refresh_session;
use crate::api::post::start_session;
use crate::api::state::ServerState;
use crate::error::Fallible;

pub fn router(state: ServerState) -> Router {
    let app = Router::new();
    let app = app.route("/api/sessions", post(start_session));
    let app = app.route("/api/sessions/{session_id}", get(get_session));
    let app = app.route("/api/sessions/{session_id}/grade", post(grade_card));
    let app = app.route("/api/sessions/{session_id}/refresh", post(refresh_session));
    let app = app.route("/api/sessions/{session_id}/preview", get(get_preview));
    let app = app.route("/api/sessions/{session_id}/previews", get(get_previews));
    let app = app.route(
        "/api/users/{user_id}/decks/{deck_id}/counts",
        get(get_counts),
    );
    let app = app.fallback(not_found_handler);
    app.with_state(state)
}

pub async fn start_server(state: ServerState, port: u16) -> Fallible<()> {
    let app = router(state);
    let bind = format!("127.0.0.1:{port}");
    log::info!("Starting server on {bind}");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn not_found_handler() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        kind: "NotFound",
        message: "not found".to_string(),
    }
}
