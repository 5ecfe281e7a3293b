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

//! The interval policy: a pure function from a card's current progress and
//! a grade to its next scheduling state.
//!
//! Cards in `New`, `Learning` or `Lapsed` walk through the short learning
//! steps. Once graduated to `Review`, intervals grow by the card's ease
//! factor, SM-2 style. Failing a review sends the card back to the first
//! learning step.

use chrono::Duration;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SchedulerConfig;
use crate::error::SrsError;
use crate::types::grade::Grade;
use crate::types::progress::CardProgress;
use crate::types::progress::ReviewEntry;
use crate::types::progress::SrsData;
use crate::types::state::SrsState;
use crate::types::timestamp::Timestamp;

/// Compute the scheduling state that grading `progress` with `grade` at
/// `now` would produce. Both grading and previewing go through this
/// function, so a preview never diverges from the committed outcome.
pub fn schedule(
    progress: &CardProgress,
    grade: Grade,
    now: Timestamp,
    config: &SchedulerConfig,
) -> SrsData {
    let current = &progress.srs;
    let mut next = match current.state {
        SrsState::New | SrsState::Learning | SrsState::Lapsed => {
            schedule_learning(progress, grade, now, config)
        }
        SrsState::Review => schedule_review(current, grade, now, config),
    };
    // A passing grade never pulls the due date earlier.
    if grade.is_pass() && next.due_at < current.due_at {
        next.due_at = current.due_at;
    }
    next.ease_factor = next.ease_factor.max(config.min_ease);
    next
}

fn schedule_learning(
    progress: &CardProgress,
    grade: Grade,
    now: Timestamp,
    config: &SchedulerConfig,
) -> SrsData {
    let current = &progress.srs;
    let last = config.last_learning_step();
    let index = current.learning_step_index.min(last);
    match grade {
        Grade::Again => SrsData {
            state: SrsState::Learning,
            learning_step_index: 0,
            due_at: now + config.learning_step(0),
            ..current.clone()
        },
        Grade::Hard => SrsData {
            state: SrsState::Learning,
            learning_step_index: index,
            due_at: now + config.hard_delay(),
            ..current.clone()
        },
        Grade::Good if index < last => SrsData {
            state: SrsState::Learning,
            learning_step_index: index + 1,
            due_at: now + config.learning_step(index + 1),
            ..current.clone()
        },
        Grade::Good => graduate(
            current,
            config.graduating_interval_days.min(config.max_interval_days),
            now,
        ),
        Grade::Easy => graduate(
            current,
            easy_interval(progress, config).min(config.max_interval_days),
            now,
        ),
    }
}

fn graduate(current: &SrsData, interval_days: u32, now: Timestamp) -> SrsData {
    SrsData {
        state: SrsState::Review,
        interval_days,
        repetitions: 1,
        due_at: now + Duration::days(interval_days as i64),
        learning_step_index: 0,
        ..current.clone()
    }
}

fn schedule_review(
    current: &SrsData,
    grade: Grade,
    now: Timestamp,
    config: &SchedulerConfig,
) -> SrsData {
    if !grade.is_pass() {
        // Lapse. The interval is kept for display only.
        return SrsData {
            state: SrsState::Learning,
            repetitions: 0,
            learning_step_index: 0,
            due_at: now + config.learning_step(0),
            ..current.clone()
        };
    }
    let mut interval = match current.repetitions {
        0 => config.graduating_interval_days,
        1 => config.second_interval_days,
        _ => {
            let grown = (current.interval_days as f64 * current.ease_factor).round();
            (grown as u32).max(1)
        }
    };
    let mut ease_factor = current.ease_factor;
    if grade == Grade::Easy {
        interval = interval.saturating_add(1).max(config.easy_min_interval_days);
        ease_factor = (ease_factor + config.easy_bonus).min(config.max_ease);
    }
    let interval = interval.min(config.max_interval_days);
    SrsData {
        state: SrsState::Review,
        interval_days: interval,
        repetitions: current.repetitions + 1,
        ease_factor,
        due_at: now + Duration::days(interval as i64),
        learning_step_index: 0,
    }
}

/// Pick the graduation interval for an `Easy` grade while learning.
///
/// The draw is seeded from the record id and the number of past reviews, so
/// different cards spread across the range while any one grading event
/// always yields the same value.
fn easy_interval(progress: &CardProgress, config: &SchedulerConfig) -> u32 {
    let [lo, hi] = config.easy_interval_days;
    let mut hasher = blake3::Hasher::new();
    hasher.update(progress.id.as_str().as_bytes());
    hasher.update(&(progress.review_history.len() as u64).to_le_bytes());
    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash.as_bytes()[..8]);
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed));
    rng.gen_range(lo..=hi)
}

/// Grade a card, returning the updated record with one history entry
/// appended.
pub fn apply_grade(
    progress: &CardProgress,
    grade: Grade,
    now: Timestamp,
    config: &SchedulerConfig,
) -> CardProgress {
    let srs = schedule(progress, grade, now, config);
    log::debug!(
        "{} {} {}->{} interval={}d ease={:.2} due={}",
        progress.id,
        grade,
        progress.srs.state,
        srs.state,
        srs.interval_days,
        srs.ease_factor,
        srs.due_at.into_inner()
    );
    let mut review_history = progress.review_history.clone();
    review_history.push(ReviewEntry {
        at: now,
        grade,
        interval_days: progress.srs.interval_days,
        ease_factor: progress.srs.ease_factor,
    });
    CardProgress {
        srs,
        review_history,
        ..progress.clone()
    }
}

/// Like [`apply_grade`], but takes a raw score from the client.
pub fn apply_score(
    progress: &CardProgress,
    score: i64,
    now: Timestamp,
    config: &SchedulerConfig,
) -> Result<CardProgress, SrsError> {
    let grade = Grade::from_score(score)?;
    Ok(apply_grade(progress, grade, now, config))
}
