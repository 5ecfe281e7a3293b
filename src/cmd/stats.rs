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

use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::cmd::open_repository;
use crate::error::Fallible;
use crate::error::SrsError;
use crate::queue::StateCounts;
use crate::repo::ProgressRepository;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::state::SrsState;
use crate::types::timestamp::Timestamp;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Plain text output.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

pub fn print_deck_stats(
    db_path: &Path,
    user: &UserId,
    deck: &DeckId,
    format: StatsFormat,
) -> Fallible<()> {
    let repo = open_repository(db_path)?;
    let stats = deck_stats(&repo, user, deck, SystemClock.now())?;
    match format {
        StatsFormat::Text => {
            println!("Cards:     {}", stats.card_count);
            println!("New:       {}", stats.counts.new);
            println!("Learning:  {}", stats.counts.learning);
            println!("Due:       {}", stats.counts.review);
            println!("To study:  {}", stats.counts.total());
            println!("Reviews:   {}", stats.review_count);
            if let Some(next) = stats.next_review_at {
                println!("Next due:  {next}");
            }
        }
        StatsFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}

#[derive(Serialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    card_count: usize,
    counts: StateCounts,
    /// Review history entries over all cards.
    review_count: usize,
    /// The earliest due date of a review that is not due yet.
    next_review_at: Option<Timestamp>,
}

pub fn deck_stats(
    repo: &dyn ProgressRepository,
    user: &UserId,
    deck: &DeckId,
    now: Timestamp,
) -> Result<Stats, SrsError> {
    let records = repo.fetch_deck_progress(user, deck, now)?;
    let next_review_at = records
        .iter()
        .filter(|r| r.state() == SrsState::Review && !r.is_due(now))
        .map(|r| r.srs.due_at)
        .min();
    Ok(Stats {
        card_count: records.len(),
        counts: StateCounts::from_records(&records, now),
        review_count: records.iter().map(|r| r.review_history.len()).sum(),
        next_review_at,
    })
}
