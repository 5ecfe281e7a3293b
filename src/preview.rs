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

use chrono::Duration;
use serde::Serialize;

use crate::config::SchedulerConfig;
use crate::policy::schedule;
use crate::types::grade::Grade;
use crate::types::progress::CardProgress;
use crate::types::timestamp::Timestamp;

/// What grading a card with a given grade would do.
#[derive(Clone, PartialEq, Debug)]
pub struct IntervalPreview {
    pub grade: Grade,
    pub due_at: Timestamp,
    /// The time from now until the card would be due again.
    pub delay: Duration,
}

impl IntervalPreview {
    /// A short human-readable rendering of the delay, e.g. "10 minutes" or
    /// "3 weeks".
    pub fn label(&self) -> String {
        humanize(self.delay)
    }
}

impl Display for IntervalPreview {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewView {
    pub grade: Grade,
    pub score: u8,
    pub due_at: Timestamp,
    pub delay_seconds: i64,
    pub label: String,
}

impl From<&IntervalPreview> for PreviewView {
    fn from(value: &IntervalPreview) -> Self {
        Self {
            grade: value.grade,
            score: value.grade.score(),
            due_at: value.due_at,
            delay_seconds: value.delay.num_seconds(),
            label: value.label(),
        }
    }
}

/// Show what grading `progress` with `grade` at `now` would schedule,
/// without changing anything.
pub fn preview_interval(
    progress: &CardProgress,
    grade: Grade,
    now: Timestamp,
    config: &SchedulerConfig,
) -> IntervalPreview {
    let srs = schedule(progress, grade, now, config);
    IntervalPreview {
        grade,
        due_at: srs.due_at,
        delay: srs.due_at.since(now),
    }
}

/// Previews for every grade tier, worst first.
pub fn preview_all(
    progress: &CardProgress,
    now: Timestamp,
    config: &SchedulerConfig,
) -> Vec<IntervalPreview> {
    Grade::ALL
        .iter()
        .map(|grade| preview_interval(progress, *grade, now, config))
        .collect()
}

fn humanize(delay: Duration) -> String {
    let minutes = delay.num_minutes().max(0);
    if minutes < 60 {
        return plural(minutes.max(1), "minute");
    }
    if delay < Duration::days(1) {
        return plural((minutes as f64 / 60.0).round() as i64, "hour");
    }
    let days = (delay.num_seconds() as f64 / 86_400.0).round() as i64;
    if days < 7 {
        plural(days, "day")
    } else if days < 30 {
        plural((days as f64 / 7.0).round() as i64, "week")
    } else {
        plural((days as f64 / 30.0).round() as i64, "month")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::apply_grade;
    use crate::types::ids::CardRef;
    use crate::types::ids::DeckId;
    use crate::types::ids::ProgressId;
    use crate::types::ids::UserId;
    use crate::types::progress::SrsData;
    use crate::types::state::SrsState;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-06-01T09:00:00Z").unwrap()
    }

    fn samples() -> Vec<CardProgress> {
        let base = CardProgress::new(
            ProgressId::new("p"),
            UserId::new("u"),
            DeckId::new("d"),
            CardRef::new("c"),
            t0(),
        );
        let mut out = vec![base.clone()];
        for (state, step, reps, interval, ease) in [
            (SrsState::Learning, 0, 0, 0, 2.5),
            (SrsState::Learning, 1, 0, 0, 2.5),
            (SrsState::Lapsed, 0, 0, 12, 1.8),
            (SrsState::Review, 0, 0, 0, 2.5),
            (SrsState::Review, 0, 1, 1, 2.5),
            (SrsState::Review, 0, 2, 10, 2.0),
            (SrsState::Review, 0, 7, 200, 2.9),
        ] {
            let mut p = base.clone();
            p.id = ProgressId::new(format!("p-{state}-{reps}-{interval}"));
            p.srs = SrsData {
                state,
                interval_days: interval,
                repetitions: reps,
                ease_factor: ease,
                due_at: t0(),
                learning_step_index: step,
            };
            out.push(p);
        }
        out
    }

    #[test]
    fn test_preview_agrees_with_commit() {
        let config = SchedulerConfig::default();
        for progress in samples() {
            for grade in Grade::ALL {
                let preview = preview_interval(&progress, grade, t0(), &config);
                let committed = apply_grade(&progress, grade, t0(), &config);
                assert_eq!(preview.due_at, committed.srs.due_at);
                assert_eq!(preview.delay, committed.srs.due_at.since(t0()));
            }
        }
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let config = SchedulerConfig::default();
        let progress = samples().remove(0);
        let before = progress.clone();
        let _ = preview_all(&progress, t0(), &config);
        assert_eq!(progress, before);
    }

    #[test]
    fn test_labels_for_new_card() {
        let config = SchedulerConfig::default();
        let progress = samples().remove(0);
        let labels: Vec<String> = preview_all(&progress, t0(), &config)
            .iter()
            .map(|p| p.label())
            .collect();
        assert_eq!(labels[0], "1 minute");
        assert_eq!(labels[1], "2 minutes");
        assert_eq!(labels[2], "10 minutes");
        assert!(["3 days", "4 days", "5 days"].contains(&labels[3].as_str()));
    }

    #[test]
    fn test_humanize_thresholds() {
        assert_eq!(humanize(Duration::seconds(20)), "1 minute");
        assert_eq!(humanize(Duration::minutes(90)), "2 hours");
        assert_eq!(humanize(Duration::days(1)), "1 day");
        assert_eq!(humanize(Duration::days(6)), "6 days");
        assert_eq!(humanize(Duration::days(20)), "3 weeks");
        assert_eq!(humanize(Duration::days(200)), "7 months");
    }

    #[test]
    fn test_preview_view_serializes() {
        let config = SchedulerConfig::default();
        let progress = samples().remove(0);
        let preview = preview_interval(&progress, Grade::Good, t0(), &config);
        let json = serde_json::to_value(PreviewView::from(&preview)).unwrap();
        assert_eq!(json["grade"], "good");
        assert_eq!(json["score"], 3);
        assert_eq!(json["delaySeconds"], 600);
        assert_eq!(json["label"], "10 minutes");
    }
}
