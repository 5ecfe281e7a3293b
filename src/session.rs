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

use std::sync::Arc;

use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::SrsError;
use crate::policy::apply_grade;
use crate::preview::IntervalPreview;
use crate::preview::preview_all;
use crate::preview::preview_interval;
use crate::queue::StateCounts;
use crate::queue::build_queue;
use crate::repo::ProgressRepository;
use crate::repo::is_session_candidate;
use crate::types::grade::Grade;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;
use crate::types::timestamp::Timestamp;

/// Everything a session needs from its surroundings.
#[derive(Clone)]
pub struct SessionContext {
    pub repo: Arc<dyn ProgressRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<SchedulerConfig>,
    pub user: UserId,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// There is a card to study.
    Studying,
    /// Every card has been studied for now.
    Completed,
    /// The deck has no progress records at all.
    NothingToStudy,
}

/// The result of grading the current card.
#[derive(Debug)]
pub struct GradeEffect {
    /// The graded record, as persisted.
    pub updated: CardProgress,
    /// The new head of the queue.
    pub next: Option<CardProgress>,
    pub status: SessionStatus,
}

/// Drives one user's study session over one deck.
///
/// Grading takes `&mut self`, so calls on a session are strictly
/// sequential. The queue is rebuilt from the repository after every grade,
/// with a fresh shuffle seed.
pub struct SessionController {
    context: SessionContext,
    deck: DeckId,
    seeds: ChaCha8Rng,
    queue: Vec<CardProgress>,
    status: SessionStatus,
    started_at: Timestamp,
    graded: usize,
}

impl SessionController {
    /// Start a session. `seed` seeds the sequence of queue shuffle seeds.
    pub fn start(context: SessionContext, deck: DeckId, seed: u64) -> Result<Self, SrsError> {
        let now = context.clock.now();
        let records = context.repo.fetch_deck_progress(&context.user, &deck, now)?;
        let mut session = Self {
            context,
            deck,
            seeds: ChaCha8Rng::seed_from_u64(seed),
            queue: Vec::new(),
            status: SessionStatus::NothingToStudy,
            started_at: now,
            graded: 0,
        };
        if records.is_empty() {
            log::debug!(
                "Deck {} has no progress records for user {}",
                session.deck,
                session.context.user
            );
            return Ok(session);
        }
        let total = records.len();
        let seed = session.seeds.next_u64();
        session.set_queue(build_queue(records, now, seed));
        log::debug!(
            "Session started on deck {}: {} of {} cards queued",
            session.deck,
            session.queue.len(),
            total
        );
        Ok(session)
    }

    pub fn deck(&self) -> &DeckId {
        &self.deck
    }

    pub fn user(&self) -> &UserId {
        &self.context.user
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// The number of grades applied in this session.
    pub fn graded(&self) -> usize {
        self.graded
    }

    /// The card to study next, if any.
    pub fn current(&self) -> Option<&CardProgress> {
        self.queue.first()
    }

    pub fn queue(&self) -> &[CardProgress] {
        &self.queue
    }

    /// Counts by state over the cards still queued.
    pub fn counts(&self) -> StateCounts {
        StateCounts::from_records(&self.queue, self.context.clock.now())
    }

    /// Grade the current card with a raw score, persist it, and rebuild the
    /// queue.
    ///
    /// Any error leaves the repository and the queue as they were, so the
    /// card stays at the head and the call can be retried. The exception is
    /// a card that was graded elsewhere since the queue was built: that is
    /// `StaleCard`, and the queue is rebuilt.
    pub fn grade(&mut self, card_id: &ProgressId, score: i64) -> Result<GradeEffect, SrsError> {
        let grade = Grade::from_score(score)?;
        let stale = || SrsError::StaleCard {
            card_id: card_id.clone(),
        };
        let seen = match self.current() {
            Some(head) if &head.id == card_id => head.review_history.len(),
            _ => return Err(stale()),
        };
        let now = self.context.clock.now();
        let record = self
            .context
            .repo
            .get(card_id)?
            .ok_or_else(|| SrsError::RecordNotFound(card_id.clone()))?;
        // Another session may have graded the card since this queue was built.
        if record.review_history.len() != seen || !is_session_candidate(&record, now) {
            log::debug!("Card {card_id} changed since the queue was built");
            if let Err(e) = self.refresh() {
                log::warn!("Queue rebuild failed after a stale grade on {card_id}: {e}");
            }
            return Err(stale());
        }
        let updated = apply_grade(&record, grade, now, &self.context.config);
        self.context.repo.save(&updated)?;
        self.graded += 1;

        if let Err(e) = self.refresh() {
            // The grade is durable; never serve the same card again.
            log::warn!("Queue rebuild failed after grading {card_id}: {e}");
            self.queue.retain(|r| &r.id != card_id);
            self.status = if self.queue.is_empty() {
                SessionStatus::Completed
            } else {
                SessionStatus::Studying
            };
        }
        if self.status == SessionStatus::Completed {
            log::debug!("Session completed after {} grades", self.graded);
        }
        Ok(GradeEffect {
            updated,
            next: self.current().cloned(),
            status: self.status,
        })
    }

    /// Re-fetch the session's cards and rebuild the queue with a new seed.
    pub fn refresh(&mut self) -> Result<(), SrsError> {
        let now = self.context.clock.now();
        let records = self
            .context
            .repo
            .fetch_due(&self.context.user, &self.deck, now)?;
        let seed = self.seeds.next_u64();
        self.set_queue(build_queue(records, now, seed));
        Ok(())
    }

    /// What grading a card with `score` would do. Does not change anything.
    pub fn preview(&self, card_id: &ProgressId, score: i64) -> Result<IntervalPreview, SrsError> {
        let grade = Grade::from_score(score)?;
        let now = self.context.clock.now();
        let record = self.lookup(card_id)?;
        Ok(preview_interval(&record, grade, now, &self.context.config))
    }

    /// Previews of every grade for the current card.
    pub fn previews(&self) -> Option<Vec<IntervalPreview>> {
        let now = self.context.clock.now();
        self.current()
            .map(|head| preview_all(head, now, &self.context.config))
    }

    fn lookup(&self, card_id: &ProgressId) -> Result<CardProgress, SrsError> {
        if let Some(record) = self.queue.iter().find(|r| &r.id == card_id) {
            return Ok(record.clone());
        }
        self.context
            .repo
            .get(card_id)?
            .ok_or_else(|| SrsError::RecordNotFound(card_id.clone()))
    }

    fn set_queue(&mut self, queue: Vec<CardProgress>) {
        self.status = if queue.is_empty() {
            SessionStatus::Completed
        } else {
            SessionStatus::Studying
        };
        self.queue = queue;
    }
}
