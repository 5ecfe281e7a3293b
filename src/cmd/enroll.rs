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

use std::path::Path;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::cmd::open_repository;
use crate::config::SchedulerConfig;
use crate::error::Fallible;
use crate::error::SrsError;
use crate::repo::ProgressRepository;
use crate::types::ids::CardRef;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;
use crate::types::timestamp::Timestamp;

pub fn enroll(
    db_path: &Path,
    user: &UserId,
    deck: &DeckId,
    cards: Vec<CardRef>,
    config_path: Option<&Path>,
) -> Fallible<()> {
    let config = SchedulerConfig::load(config_path)?;
    let repo = open_repository(db_path)?;
    let total = cards.len();
    let added = enroll_cards(&repo, user, deck, cards, &config, SystemClock.now())?;
    println!("Enrolled {added} of {total} cards in deck {deck}.");
    Ok(())
}

/// Create a new progress record for each card, starting at the configured
/// ease. Cards the user already has a record for in this deck are skipped.
/// Returns the number created.
pub fn enroll_cards(
    repo: &dyn ProgressRepository,
    user: &UserId,
    deck: &DeckId,
    cards: Vec<CardRef>,
    config: &SchedulerConfig,
    now: Timestamp,
) -> Result<usize, SrsError> {
    let mut added = 0;
    for card_ref in cards {
        let mut progress = CardProgress::new(
            ProgressId::generate(),
            user.clone(),
            deck.clone(),
            card_ref,
            now,
        );
        progress.srs.ease_factor = config.initial_ease;
        match repo.insert(&progress) {
            Ok(()) => added += 1,
            Err(SrsError::DuplicateRecord(_)) => {
                log::info!("Card {} is already enrolled, skipping.", progress.card_ref);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteRepository;
    use crate::repo::MemoryRepository;
    use crate::types::state::SrsState;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-06-01T09:00:00Z").unwrap()
    }

    #[test]
    fn test_enroll_skips_existing_cards() -> Fallible<()> {
        let repo = SqliteRepository::open_in_memory()?;
        let user = UserId::new("u");
        let deck = DeckId::new("d");
        let first = enroll_cards(
            &repo,
            &user,
            &deck,
            vec![CardRef::new("hola"), CardRef::new("adios")],
            &SchedulerConfig::default(),
            t0(),
        )?;
        assert_eq!(first, 2);
        let second = enroll_cards(
            &repo,
            &user,
            &deck,
            vec![CardRef::new("adios"), CardRef::new("gracias")],
            &SchedulerConfig::default(),
            t0(),
        )?;
        assert_eq!(second, 1);

        let records = repo.fetch_deck_progress(&user, &deck, t0())?;
        let refs: Vec<&str> = records.iter().map(|r| r.card_ref.as_str()).collect();
        assert_eq!(refs, vec!["hola", "adios", "gracias"]);
        assert!(records.iter().all(|r| r.state() == SrsState::New));
        Ok(())
    }

    #[test]
    fn test_same_card_in_other_deck() -> Fallible<()> {
        let repo = MemoryRepository::new();
        let user = UserId::new("u");
        let cards = vec![CardRef::new("hola")];
        let config = SchedulerConfig::default();
        assert_eq!(
            enroll_cards(&repo, &user, &DeckId::new("a"), cards.clone(), &config, t0())?,
            1
        );
        assert_eq!(
            enroll_cards(&repo, &user, &DeckId::new("b"), cards, &config, t0())?,
            1
        );
        Ok(())
    }

    #[test]
    fn test_enroll_uses_configured_ease() -> Fallible<()> {
        let repo = MemoryRepository::new();
        let user = UserId::new("u");
        let deck = DeckId::new("d");
        let config = SchedulerConfig::parse("initial_ease = 2.0\n")?;
        enroll_cards(&repo, &user, &deck, vec![CardRef::new("hola")], &config, t0())?;
        let records = repo.fetch_deck_progress(&user, &deck, t0())?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].srs.ease_factor, 2.0);
        Ok(())
    }
}
