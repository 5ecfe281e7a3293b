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

use std::fs::read_to_string;
use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::progress::DEFAULT_EASE;
use crate::types::progress::MIN_EASE;

/// Tunable numeric policy for the scheduler.
///
/// Every field has a default, so a configuration file only needs to list
/// the values it overrides:
///
/// ```toml
/// learning_steps_minutes = [1, 10]
/// hard_delay_minutes = 2
/// easy_interval_days = [3, 5]
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// The short delays a card walks through before graduating.
    pub learning_steps_minutes: Vec<u32>,
    /// Delay after a `Hard` grade while learning.
    pub hard_delay_minutes: u32,
    /// Inclusive range of days picked from when a learning card is graded
    /// `Easy`.
    pub easy_interval_days: [u32; 2],
    /// Interval after graduating with `Good`.
    pub graduating_interval_days: u32,
    /// Interval for the second successful review.
    pub second_interval_days: u32,
    /// Lower bound on the interval after an `Easy` review.
    pub easy_min_interval_days: u32,
    /// Upper bound on any review interval.
    pub max_interval_days: u32,
    pub initial_ease: f64,
    pub min_ease: f64,
    pub max_ease: f64,
    /// Added to the ease factor on an `Easy` review.
    pub easy_bonus: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps_minutes: vec![1, 10],
            hard_delay_minutes: 2,
            easy_interval_days: [3, 5],
            graduating_interval_days: 1,
            second_interval_days: 6,
            easy_min_interval_days: 4,
            max_interval_days: 36_500,
            initial_ease: DEFAULT_EASE,
            min_ease: MIN_EASE,
            max_ease: 3.0,
            easy_bonus: 0.15,
        }
    }
}

impl SchedulerConfig {
    /// Load a configuration file, or the defaults if no path is given.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return fail(format!("config file {} does not exist.", path.display()));
                }
                log::debug!("Loading configuration from {}", path.display());
                let content = read_to_string(path)?;
                Self::parse(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Fallible<()> {
        if self.learning_steps_minutes.is_empty() {
            return fail("learning_steps_minutes must not be empty.");
        }
        if self.learning_steps_minutes.contains(&0) {
            return fail("learning steps must be at least one minute.");
        }
        let [lo, hi] = self.easy_interval_days;
        if lo == 0 || lo > hi {
            return fail("easy_interval_days must be an ordered range of positive days.");
        }
        if self.graduating_interval_days == 0 {
            return fail("graduating_interval_days must be positive.");
        }
        if self.max_interval_days < hi.max(self.second_interval_days) {
            return fail("max_interval_days must cover the fixed intervals.");
        }
        if self.min_ease < MIN_EASE {
            return fail(format!("min_ease must be at least {MIN_EASE}."));
        }
        if !(self.min_ease <= self.initial_ease && self.initial_ease <= self.max_ease) {
            return fail("ease factors must satisfy min_ease <= initial_ease <= max_ease.");
        }
        if self.easy_bonus < 0.0 {
            return fail("easy_bonus must not be negative.");
        }
        Ok(())
    }

    /// The duration of the learning step at `index`, clamped to the table.
    pub fn learning_step(&self, index: usize) -> Duration {
        let last = self.learning_steps_minutes.len().saturating_sub(1);
        let minutes = self
            .learning_steps_minutes
            .get(index.min(last))
            .copied()
            .unwrap_or(1);
        Duration::minutes(minutes as i64)
    }

    pub fn last_learning_step(&self) -> usize {
        self.learning_steps_minutes.len().saturating_sub(1)
    }

    pub fn hard_delay(&self) -> Duration {
        Duration::minutes(self.hard_delay_minutes as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Fallible<()> {
        SchedulerConfig::default().validate()
    }

    #[test]
    fn test_parse_partial_file() -> Fallible<()> {
        let config = SchedulerConfig::parse("learning_steps_minutes = [1, 5, 15]\n")?;
        assert_eq!(config.learning_steps_minutes, vec![1, 5, 15]);
        assert_eq!(config.hard_delay_minutes, 2);
        assert_eq!(config.last_learning_step(), 2);
        assert_eq!(config.learning_step(1), Duration::minutes(5));
        Ok(())
    }

    #[test]
    fn test_empty_steps_rejected() {
        let result = SchedulerConfig::parse("learning_steps_minutes = []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SchedulerConfig::parse("maximum_interval = 30\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_low_ease_floor_rejected() {
        let result = SchedulerConfig::parse("min_ease = 1.0\ninitial_ease = 1.2\n");
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "error: min_ease must be at least 1.3.");
    }

    #[test]
    fn test_small_max_interval_rejected() {
        let result = SchedulerConfig::parse("max_interval_days = 2\n");
        assert!(result.is_err());
        let config = SchedulerConfig::parse("max_interval_days = 365\n").unwrap();
        assert_eq!(config.max_interval_days, 365);
    }

    #[test]
    fn test_reversed_easy_range_rejected() {
        let result = SchedulerConfig::parse("easy_interval_days = [5, 3]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = SchedulerConfig::load(Some(Path::new("./does-not-exist.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_none_gives_defaults() -> Fallible<()> {
        assert_eq!(SchedulerConfig::load(None)?, SchedulerConfig::default());
        Ok(())
    }
}
