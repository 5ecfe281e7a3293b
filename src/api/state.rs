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

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::Duration;

use crate::api::error::ApiError;
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::repo::ProgressRepository;
use crate::session::SessionContext;
use crate::session::SessionController;
use crate::session::SessionStatus;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

pub type SharedSession = Arc<Mutex<SessionController>>;

/// Sessions untouched for this long are dropped.
const IDLE_TIMEOUT_MINUTES: i64 = 60;

/// Finished sessions are kept this long so clients can read the final state.
const FINISHED_TIMEOUT_MINUTES: i64 = 5;

struct SessionEntry {
    session: SharedSession,
    last_used: Timestamp,
}

#[derive(Clone)]
pub struct ServerState {
    pub repo: Arc<dyn ProgressRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<SchedulerConfig>,
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
}

impl ServerState {
    pub fn new(
        repo: Arc<dyn ProgressRepository>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn context(&self, user: UserId) -> SessionContext {
        SessionContext {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
            user,
        }
    }

    /// Store a new session, dropping expired ones first.
    pub fn register(&self, session_id: String, session: SessionController) -> Result<(), ApiError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().map_err(|_| ApiError::poisoned())?;
        let before = sessions.len();
        sessions.retain(|_, entry| !is_expired(entry, now));
        if sessions.len() < before {
            log::debug!("Dropped {} expired sessions", before - sessions.len());
        }
        sessions.insert(
            session_id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_used: now,
            },
        );
        log::debug!("{} sessions open", sessions.len());
        Ok(())
    }

    /// Look up a session and mark it as used.
    pub fn session(&self, session_id: &str) -> Result<SharedSession, ApiError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().map_err(|_| ApiError::poisoned())?;
        let expired = match sessions.get(session_id) {
            Some(entry) => is_expired(entry, now),
            None => return Err(ApiError::unknown_session(session_id)),
        };
        if expired {
            sessions.remove(session_id);
            return Err(ApiError::unknown_session(session_id));
        }
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::unknown_session(session_id))?;
        entry.last_used = now;
        Ok(entry.session.clone())
    }
}

fn is_expired(entry: &SessionEntry, now: Timestamp) -> bool {
    let idle = now.since(entry.last_used);
    if idle > Duration::minutes(IDLE_TIMEOUT_MINUTES) {
        return true;
    }
    // A session locked by a request in flight is in use.
    let Ok(session) = entry.session.try_lock() else {
        return false;
    };
    session.status() != SessionStatus::Studying
        && idle > Duration::minutes(FINISHED_TIMEOUT_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::repo::MemoryRepository;
    use crate::types::ids::CardRef;
    use crate::types::ids::DeckId;
    use crate::types::ids::ProgressId;
    use crate::types::progress::CardProgress;

    fn fixture() -> (ServerState, ManualClock) {
        let now = Timestamp::parse("2025-06-01T09:00:00Z").unwrap();
        let clock = ManualClock::new(now);
        let repo = MemoryRepository::new();
        repo.insert(&CardProgress::new(
            ProgressId::new("a"),
            UserId::new("u"),
            DeckId::new("d"),
            CardRef::new("a"),
            now,
        ))
        .unwrap();
        let state = ServerState::new(
            Arc::new(repo),
            Arc::new(clock.clone()),
            SchedulerConfig::default(),
        );
        (state, clock)
    }

    fn start(state: &ServerState, id: &str, deck: &str) {
        let context = state.context(UserId::new("u"));
        let session = SessionController::start(context, DeckId::new(deck), 1).unwrap();
        state.register(id.to_string(), session).unwrap();
    }

    #[test]
    fn test_idle_sessions_expire() {
        let (state, clock) = fixture();
        start(&state, "studying", "d");
        start(&state, "empty", "none");
        clock.advance(Duration::minutes(30));
        assert!(state.session("studying").is_ok());
        // Finished sessions go after a short grace period.
        assert!(state.session("empty").is_err());

        clock.advance(Duration::minutes(61));
        assert!(state.session("studying").is_err());
    }

    #[test]
    fn test_register_sweeps_expired_sessions() {
        let (state, clock) = fixture();
        for i in 0..10 {
            start(&state, &format!("s{i}"), "none");
        }
        clock.advance(Duration::minutes(FINISHED_TIMEOUT_MINUTES + 1));
        start(&state, "fresh", "d");
        assert_eq!(state.sessions.lock().unwrap().len(), 1);
        assert!(state.session("fresh").is_ok());
    }
}
