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

use serde::Deserialize;
use serde::Serialize;

use crate::types::grade::Grade;
use crate::types::ids::CardRef;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::state::SrsState;
use crate::types::timestamp::Timestamp;

/// The ease factor every card starts with.
pub const DEFAULT_EASE: f64 = 2.5;

/// The lowest ease factor a card may ever have.
pub const MIN_EASE: f64 = 1.3;

/// A user's scheduling progress on one card.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub card_ref: CardRef,
    pub srs: SrsData,
    /// Append-only. One entry per grading event.
    pub review_history: Vec<ReviewEntry>,
}

/// The scheduling state of a card.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsData {
    pub state: SrsState,
    /// Only meaningful in `Review` and `Lapsed`.
    pub interval_days: u32,
    /// Consecutive successful review-state grades.
    pub repetitions: u32,
    pub ease_factor: f64,
    pub due_at: Timestamp,
    /// Index into the learning-step table. Only meaningful while learning.
    pub learning_step_index: usize,
}

/// One grading event, recorded with the values in effect before it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub at: Timestamp,
    pub grade: Grade,
    pub interval_days: u32,
    pub ease_factor: f64,
}

impl CardProgress {
    /// Create the progress record for a card the user has just started
    /// studying. It is due immediately.
    pub fn new(
        id: ProgressId,
        user_id: UserId,
        deck_id: DeckId,
        card_ref: CardRef,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            deck_id,
            card_ref,
            srs: SrsData::new(now, DEFAULT_EASE),
            review_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SrsState {
        self.srs.state
    }

    /// Whether the card's due time has been reached.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.srs.due_at <= now
    }
}

impl SrsData {
    pub fn new(now: Timestamp, ease_factor: f64) -> Self {
        Self {
            state: SrsState::New,
            interval_days: 0,
            repetitions: 0,
            ease_factor,
            due_at: now,
            learning_step_index: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_due_immediately() {
        let now = Timestamp::now();
        let progress = CardProgress::new(
            ProgressId::new("p1"),
            UserId::new("u1"),
            DeckId::new("d1"),
            CardRef::new("hello"),
            now,
        );
        assert_eq!(progress.state(), SrsState::New);
        assert_eq!(progress.srs.interval_days, 0);
        assert_eq!(progress.srs.repetitions, 0);
        assert_eq!(progress.srs.ease_factor, DEFAULT_EASE);
        assert_eq!(progress.srs.learning_step_index, 0);
        assert!(progress.is_due(now));
        assert!(progress.review_history.is_empty());
    }

    #[test]
    fn test_json_is_camel_case() {
        let now = Timestamp::parse("2025-03-01T12:00:00Z").unwrap();
        let progress = CardProgress::new(
            ProgressId::new("p1"),
            UserId::new("u1"),
            DeckId::new("d1"),
            CardRef::new("hello"),
            now,
        );
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["cardRef"], "hello");
        assert_eq!(json["srs"]["state"], "new");
        assert_eq!(json["srs"]["learningStepIndex"], 0);
        assert_eq!(json["srs"]["easeFactor"], 2.5);
    }
}
