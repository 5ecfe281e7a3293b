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

use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::error::SrsError;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;
use crate::types::state::SrsState;
use crate::types::timestamp::Timestamp;

/// Durable storage for progress records.
///
/// Implementations report transient failures as
/// [`SrsError::RepositoryUnavailable`] and must never leave a record
/// partially written.
pub trait ProgressRepository: Send + Sync {
    /// All of a user's records in a deck, in insertion order.
    fn fetch_deck_progress(
        &self,
        user: &UserId,
        deck: &DeckId,
        now: Timestamp,
    ) -> Result<Vec<CardProgress>, SrsError>;

    /// The records a session can study right now: new cards, every card in
    /// the learning phase, and reviews that are due.
    fn fetch_due(
        &self,
        user: &UserId,
        deck: &DeckId,
        now: Timestamp,
    ) -> Result<Vec<CardProgress>, SrsError> {
        let records = self.fetch_deck_progress(user, deck, now)?;
        Ok(records
            .into_iter()
            .filter(|record| is_session_candidate(record, now))
            .collect())
    }

    /// Look up a single record.
    fn get(&self, id: &ProgressId) -> Result<Option<CardProgress>, SrsError>;

    /// Store a record for the first time.
    fn insert(&self, progress: &CardProgress) -> Result<(), SrsError>;

    /// Atomically persist a record's scheduling state and append any review
    /// history entries not yet stored. Saving the same record twice is
    /// harmless.
    fn save(&self, progress: &CardProgress) -> Result<(), SrsError>;
}

/// The state-specific due test used by [`ProgressRepository::fetch_due`].
pub fn is_session_candidate(record: &CardProgress, now: Timestamp) -> bool {
    match record.state() {
        SrsState::Review => record.is_due(now),
        _ => true,
    }
}

/// An in-memory repository.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<CardProgress>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Vec<CardProgress>>, SrsError> {
        self.records
            .lock()
            .map_err(|_| SrsError::RepositoryUnavailable("lock poisoned".to_string()))
    }
}

impl ProgressRepository for MemoryRepository {
    fn fetch_deck_progress(
        &self,
        user: &UserId,
        deck: &DeckId,
        _now: Timestamp,
    ) -> Result<Vec<CardProgress>, SrsError> {
        let records = self.acquire()?;
        Ok(records
            .iter()
            .filter(|r| &r.user_id == user && &r.deck_id == deck)
            .cloned()
            .collect())
    }

    fn get(&self, id: &ProgressId) -> Result<Option<CardProgress>, SrsError> {
        let records = self.acquire()?;
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    fn insert(&self, progress: &CardProgress) -> Result<(), SrsError> {
        let mut records = self.acquire()?;
        let duplicate = records.iter().any(|r| {
            r.id == progress.id
                || (r.user_id == progress.user_id
                    && r.deck_id == progress.deck_id
                    && r.card_ref == progress.card_ref)
        });
        if duplicate {
            return Err(SrsError::DuplicateRecord(progress.id.clone()));
        }
        records.push(progress.clone());
        Ok(())
    }

    fn save(&self, progress: &CardProgress) -> Result<(), SrsError> {
        let mut records = self.acquire()?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == progress.id)
            .ok_or_else(|| SrsError::RecordNotFound(progress.id.clone()))?;
        // History is append-only: keep what is stored, add what is new.
        let stored = slot.review_history.len();
        let mut history = std::mem::take(&mut slot.review_history);
        history.extend(progress.review_history.iter().skip(stored).cloned());
        *slot = CardProgress {
            review_history: history,
            ..progress.clone()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::SchedulerConfig;
    use crate::policy::apply_grade;
    use crate::types::grade::Grade;
    use crate::types::ids::CardRef;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-06-01T09:00:00Z").unwrap()
    }

    fn record(id: &str, deck: &str) -> CardProgress {
        CardProgress::new(
            ProgressId::new(id),
            UserId::new("u"),
            DeckId::new(deck),
            CardRef::new(id),
            t0(),
        )
    }

    #[test]
    fn test_fetch_filters_by_deck() -> Result<(), SrsError> {
        let repo = MemoryRepository::new();
        repo.insert(&record("a", "d1"))?;
        repo.insert(&record("b", "d2"))?;
        repo.insert(&record("c", "d1"))?;
        let got = repo.fetch_deck_progress(&UserId::new("u"), &DeckId::new("d1"), t0())?;
        let ids: Vec<&str> = got.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        Ok(())
    }

    #[test]
    fn test_fetch_due_drops_future_reviews() -> Result<(), SrsError> {
        let repo = MemoryRepository::new();
        let mut future = record("r", "d");
        future.srs.state = SrsState::Review;
        future.srs.due_at = t0() + Duration::days(2);
        let mut learning = record("l", "d");
        learning.srs.state = SrsState::Learning;
        learning.srs.due_at = t0() + Duration::minutes(10);
        repo.insert(&future)?;
        repo.insert(&learning)?;
        repo.insert(&record("n", "d"))?;
        let due = repo.fetch_due(&UserId::new("u"), &DeckId::new("d"), t0())?;
        let ids: Vec<&str> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["l", "n"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_rejected() -> Result<(), SrsError> {
        let repo = MemoryRepository::new();
        repo.insert(&record("a", "d"))?;
        let result = repo.insert(&record("a", "d"));
        assert_eq!(result, Err(SrsError::DuplicateRecord(ProgressId::new("a"))));
        Ok(())
    }

    #[test]
    fn test_save_missing_record() {
        let repo = MemoryRepository::new();
        let result = repo.save(&record("ghost", "d"));
        assert_eq!(result, Err(SrsError::RecordNotFound(ProgressId::new("ghost"))));
    }

    #[test]
    fn test_save_is_idempotent() -> Result<(), SrsError> {
        let repo = MemoryRepository::new();
        let original = record("a", "d");
        repo.insert(&original)?;
        let graded = apply_grade(&original, Grade::Good, t0(), &SchedulerConfig::default());
        repo.save(&graded)?;
        repo.save(&graded)?;
        let stored = repo.get(&original.id)?.unwrap();
        assert_eq!(stored, graded);
        assert_eq!(stored.review_history.len(), 1);
        Ok(())
    }
}
