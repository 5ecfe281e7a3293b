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

//! Ordering a deck's progress records into a study queue.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::types::progress::CardProgress;
use crate::types::state::SrsState;
use crate::types::timestamp::Timestamp;

/// A deck's records, split by what the queue does with them.
#[derive(Default)]
struct Partition {
    learning_due: Vec<CardProgress>,
    learning_not_due: Vec<CardProgress>,
    new_cards: Vec<CardProgress>,
    review_due: Vec<CardProgress>,
}

/// Split records by state and due-ness, preserving input order. Reviews
/// that are not yet due are dropped.
fn partition(records: Vec<CardProgress>, now: Timestamp) -> Partition {
    let mut out = Partition::default();
    for record in records {
        let state = record.state();
        if state.is_learning() {
            if record.is_due(now) {
                out.learning_due.push(record);
            } else {
                out.learning_not_due.push(record);
            }
        } else if state == SrsState::New {
            out.new_cards.push(record);
        } else if record.is_due(now) {
            out.review_due.push(record);
        }
    }
    out
}

/// Shuffle a slice with a Fisher-Yates shuffle driven by a PRNG seeded
/// with `seed`. The same seed always yields the same order.
pub fn seeded_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// Build the study queue. Index 0 is served first.
///
/// Due learning cards come first, in an order that depends only on `seed`.
/// New cards and due reviews follow in input order. When there are neither,
/// learning cards that are not due yet are appended instead, so a session
/// never looks finished while short-term cards are outstanding.
pub fn build_queue(records: Vec<CardProgress>, now: Timestamp, seed: u64) -> Vec<CardProgress> {
    let Partition {
        mut learning_due,
        learning_not_due,
        new_cards,
        review_due,
    } = partition(records, now);
    seeded_shuffle(&mut learning_due, seed);
    let mut queue = learning_due;
    if !new_cards.is_empty() || !review_due.is_empty() {
        queue.extend(new_cards);
        queue.extend(review_due);
    } else {
        queue.extend(learning_not_due);
    }
    queue
}

/// Number of records in each state, for display.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCounts {
    pub new: usize,
    /// Cards in `Learning` or `Lapsed`, due or not.
    pub learning: usize,
    /// Reviews that are due.
    pub review: usize,
}

impl StateCounts {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a CardProgress>,
        now: Timestamp,
    ) -> Self {
        let mut counts = StateCounts::default();
        for record in records {
            match record.state() {
                SrsState::New => counts.new += 1,
                SrsState::Learning | SrsState::Lapsed => counts.learning += 1,
                SrsState::Review => {
                    if record.is_due(now) {
                        counts.review += 1;
                    }
                }
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.review
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::ids::CardRef;
    use crate::types::ids::DeckId;
    use crate::types::ids::ProgressId;
    use crate::types::ids::UserId;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-06-01T09:00:00Z").unwrap()
    }

    fn record(id: &str, state: SrsState, due_in_minutes: i64) -> CardProgress {
        let mut p = CardProgress::new(
            ProgressId::new(id),
            UserId::new("u"),
            DeckId::new("d"),
            CardRef::new(id),
            t0(),
        );
        p.srs.state = state;
        p.srs.due_at = t0() + Duration::minutes(due_in_minutes);
        p
    }

    fn ids(queue: &[CardProgress]) -> Vec<&str> {
        queue.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_empty_records_give_empty_queue() {
        assert!(build_queue(Vec::new(), t0(), 42).is_empty());
        assert!(build_queue(Vec::new(), t0(), 0).is_empty());
    }

    #[test]
    fn test_same_arguments_same_order() {
        let records: Vec<CardProgress> = (0..10)
            .map(|i| record(&format!("l{i}"), SrsState::Learning, -1))
            .collect();
        let a = build_queue(records.clone(), t0(), 7);
        let b = build_queue(records, t0(), 7);
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_seed_changes_learning_order_only() {
        let mut records: Vec<CardProgress> = (0..8)
            .map(|i| record(&format!("l{i}"), SrsState::Learning, -1))
            .collect();
        records.push(record("n1", SrsState::New, 0));
        records.push(record("r1", SrsState::Review, -60));
        records.push(record("n2", SrsState::New, 0));
        records.push(record("r2", SrsState::Review, -5));
        let base = build_queue(records.clone(), t0(), 1);
        assert_eq!(ids(&base[8..]), vec!["n1", "n2", "r1", "r2"]);
        let differs = (2..20).any(|seed| {
            let other = build_queue(records.clone(), t0(), seed);
            assert_eq!(ids(&other[8..]), vec!["n1", "n2", "r1", "r2"]);
            ids(&other[..8]) != ids(&base[..8])
        });
        assert!(differs);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..100).collect();
        seeded_shuffle(&mut items, 99);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<u32>>());
    }

    #[test]
    fn test_two_learning_due_and_one_new() {
        let records = vec![
            record("l1", SrsState::Learning, -2),
            record("n1", SrsState::New, 0),
            record("l2", SrsState::Lapsed, 0),
        ];
        let queue = build_queue(records, t0(), 12345);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue[2].id.as_str(), "n1");
        let mut head = ids(&queue[..2]);
        head.sort();
        assert_eq!(head, vec!["l1", "l2"]);
    }

    #[test]
    fn test_catch_up_branch_keeps_input_order() {
        let records = vec![
            record("l3", SrsState::Learning, 9),
            record("l1", SrsState::Learning, 1),
            record("l2", SrsState::Lapsed, 5),
        ];
        let queue = build_queue(records, t0(), 3);
        assert_eq!(ids(&queue), vec!["l3", "l1", "l2"]);
    }

    #[test]
    fn test_not_due_learning_hidden_when_other_work_exists() {
        let records = vec![
            record("l1", SrsState::Learning, 9),
            record("r1", SrsState::Review, -1),
        ];
        let queue = build_queue(records, t0(), 3);
        assert_eq!(ids(&queue), vec!["r1"]);
    }

    #[test]
    fn test_future_reviews_are_dropped() {
        let records = vec![record("r1", SrsState::Review, 60 * 24)];
        assert!(build_queue(records, t0(), 3).is_empty());
    }

    #[test]
    fn test_counts() {
        let records = vec![
            record("n1", SrsState::New, 0),
            record("n2", SrsState::New, 0),
            record("l1", SrsState::Learning, 5),
            record("x1", SrsState::Lapsed, -5),
            record("r1", SrsState::Review, -5),
            record("r2", SrsState::Review, 500),
        ];
        let counts = StateCounts::from_records(&records, t0());
        assert_eq!(
            counts,
            StateCounts {
                new: 2,
                learning: 2,
                review: 1
            }
        );
        assert_eq!(counts.total(), 5);
    }
}
