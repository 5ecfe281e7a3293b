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

use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::cmd::open_repository;
use crate::config::SchedulerConfig;
use crate::error::Fallible;
use crate::error::SrsError;
use crate::session::SessionContext;
use crate::session::SessionController;
use crate::session::SessionStatus;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;

pub fn drill(
    db_path: &Path,
    user: UserId,
    deck: DeckId,
    config_path: Option<&Path>,
) -> Fallible<()> {
    let config = SchedulerConfig::load(config_path)?;
    let repo = open_repository(db_path)?;
    let context = SessionContext {
        repo: Arc::new(repo),
        clock: Arc::new(SystemClock),
        config: Arc::new(config),
        user,
    };
    let mut session = SessionController::start(context, deck, rand::random())?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_drill(&mut session, stdin.lock(), stdout.lock())
}

/// Study the session's cards, reading grades from `input` until the queue
/// is empty, the input ends, or the user quits with `q`.
pub fn run_drill(
    session: &mut SessionController,
    mut input: impl BufRead,
    mut output: impl Write,
) -> Fallible<()> {
    if session.status() == SessionStatus::NothingToStudy {
        writeln!(output, "Nothing to study in deck {}.", session.deck())?;
        return Ok(());
    }
    loop {
        let Some(card) = session.current().cloned() else {
            writeln!(
                output,
                "Session complete: {} cards graded.",
                session.graded()
            )?;
            return Ok(());
        };
        let counts = session.counts();
        writeln!(
            output,
            "[{} left: new {} / learning {} / due {}]",
            counts.total(),
            counts.new,
            counts.learning,
            counts.review
        )?;
        writeln!(output, "Card: {} ({})", card.card_ref, card.state())?;
        for preview in session.previews().unwrap_or_default() {
            writeln!(
                output,
                "  {} = {} ({})",
                preview.grade.score(),
                preview.grade,
                preview
            )?;
        }
        loop {
            write!(output, "Grade (0-5, q to quit): ")?;
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            let line = line.trim();
            if line == "q" {
                writeln!(output, "Stopped after {} cards.", session.graded())?;
                return Ok(());
            }
            let Ok(score) = line.parse::<i64>() else {
                writeln!(output, "Invalid input. Please enter a number between 0 and 5.")?;
                continue;
            };
            match session.grade(&card.id, score) {
                Ok(_) => break,
                Err(SrsError::InvalidGrade(_)) => {
                    writeln!(output, "Invalid input. Please enter a number between 0 and 5.")?;
                }
                Err(e @ SrsError::RepositoryUnavailable(_)) => {
                    log::warn!("Failed to save grade: {e}");
                    writeln!(output, "Could not save the grade, please try again.")?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
