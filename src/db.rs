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

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;
use rusqlite::types::Type;

use crate::error::Fallible;
use crate::error::SrsError;
use crate::repo::ProgressRepository;
use crate::types::grade::Grade;
use crate::types::ids::DeckId;
use crate::types::ids::ProgressId;
use crate::types::ids::UserId;
use crate::types::progress::CardProgress;
use crate::types::progress::ReviewEntry;
use crate::types::progress::SrsData;
use crate::types::timestamp::Timestamp;

/// A progress repository backed by SQLite.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    pub fn open(database_path: &str) -> Fallible<Self> {
        let conn = Connection::open(database_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Fallible<Self> {
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating database schema.");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Connection>, SrsError> {
        self.conn
            .lock()
            .map_err(|_| SrsError::RepositoryUnavailable("connection lock poisoned".to_string()))
    }
}

const SELECT_PROGRESS: &str = "select progress_id, user_id, deck_id, card_ref, state, interval_days, repetitions, ease_factor, due_at, learning_step_index from progress";

impl ProgressRepository for SqliteRepository {
    fn fetch_deck_progress(
        &self,
        user: &UserId,
        deck: &DeckId,
        _now: Timestamp,
    ) -> Result<Vec<CardProgress>, SrsError> {
        let conn = self.acquire()?;
        let sql = format!("{SELECT_PROGRESS} where user_id = ? and deck_id = ? order by rowid;");
        let mut stmt = conn.prepare(&sql)?;
        let mut records = Vec::new();
        let mut rows = stmt.query((user, deck))?;
        while let Some(row) = rows.next()? {
            records.push(read_progress(row)?);
        }

        let sql = "select h.progress_id, h.reviewed_at, h.grade, h.interval_days, h.ease_factor from review_history h join progress p on p.progress_id = h.progress_id where p.user_id = ? and p.deck_id = ? order by h.progress_id, h.seq;";
        let mut stmt = conn.prepare(sql)?;
        let mut history: HashMap<ProgressId, Vec<ReviewEntry>> = HashMap::new();
        let mut rows = stmt.query((user, deck))?;
        while let Some(row) = rows.next()? {
            let id: ProgressId = row.get(0)?;
            history.entry(id).or_default().push(read_entry(row, 1)?);
        }
        for record in records.iter_mut() {
            if let Some(entries) = history.remove(&record.id) {
                record.review_history = entries;
            }
        }
        Ok(records)
    }

    fn get(&self, id: &ProgressId) -> Result<Option<CardProgress>, SrsError> {
        let conn = self.acquire()?;
        let sql = format!("{SELECT_PROGRESS} where progress_id = ?;");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        let mut record = match rows.next()? {
            Some(row) => read_progress(row)?,
            None => return Ok(None),
        };
        let sql = "select reviewed_at, grade, interval_days, ease_factor from review_history where progress_id = ? order by seq;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([id])?;
        while let Some(row) = rows.next()? {
            record.review_history.push(read_entry(row, 0)?);
        }
        Ok(Some(record))
    }

    fn insert(&self, progress: &CardProgress) -> Result<(), SrsError> {
        log::debug!("Inserting progress record {} ({})", progress.id, progress.card_ref);
        let mut conn = self.acquire()?;
        let tx = conn.transaction()?;
        let sql = "insert into progress (progress_id, user_id, deck_id, card_ref, state, interval_days, repetitions, ease_factor, due_at, learning_step_index) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?);";
        let srs = &progress.srs;
        let result = tx.execute(
            sql,
            (
                &progress.id,
                &progress.user_id,
                &progress.deck_id,
                &progress.card_ref,
                srs.state,
                srs.interval_days,
                srs.repetitions,
                srs.ease_factor,
                srs.due_at,
                srs.learning_step_index as i64,
            ),
        );
        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(SrsError::DuplicateRecord(progress.id.clone()));
            }
            Err(e) => return Err(e.into()),
        }
        append_history(&tx, &progress.id, &progress.review_history, 0)?;
        tx.commit()?;
        Ok(())
    }

    fn save(&self, progress: &CardProgress) -> Result<(), SrsError> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction()?;
        let sql = "update progress set state = ?, interval_days = ?, repetitions = ?, ease_factor = ?, due_at = ?, learning_step_index = ? where progress_id = ?;";
        let srs = &progress.srs;
        let updated = tx.execute(
            sql,
            (
                srs.state,
                srs.interval_days,
                srs.repetitions,
                srs.ease_factor,
                srs.due_at,
                srs.learning_step_index as i64,
                &progress.id,
            ),
        )?;
        if updated == 0 {
            // Dropping the transaction rolls it back.
            return Err(SrsError::RecordNotFound(progress.id.clone()));
        }
        let stored: i64 = tx.query_row(
            "select count(*) from review_history where progress_id = ?;",
            [&progress.id],
            |row| row.get(0),
        )?;
        append_history(&tx, &progress.id, &progress.review_history, stored as usize)?;
        tx.commit()?;
        Ok(())
    }
}

fn read_progress(row: &Row<'_>) -> rusqlite::Result<CardProgress> {
    Ok(CardProgress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        deck_id: row.get(2)?,
        card_ref: row.get(3)?,
        srs: SrsData {
            state: row.get(4)?,
            interval_days: row.get(5)?,
            repetitions: row.get(6)?,
            ease_factor: row.get(7)?,
            due_at: row.get(8)?,
            learning_step_index: read_index(row, 9)?,
        },
        review_history: Vec::new(),
    })
}

fn read_index(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let value: i64 = row.get(idx)?;
    usize::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn read_entry(row: &Row<'_>, offset: usize) -> rusqlite::Result<ReviewEntry> {
    let grade: Grade = row.get(offset + 1)?;
    Ok(ReviewEntry {
        at: row.get(offset)?,
        grade,
        interval_days: row.get(offset + 2)?,
        ease_factor: row.get(offset + 3)?,
    })
}

/// Insert the history entries at positions `from..`. Entries already present
/// are skipped, so replaying a save does not duplicate them.
fn append_history(
    tx: &Transaction,
    id: &ProgressId,
    entries: &[ReviewEntry],
    from: usize,
) -> Result<(), SrsError> {
    let sql = "insert or ignore into review_history (progress_id, seq, reviewed_at, grade, interval_days, ease_factor) values (?, ?, ?, ?, ?, ?);";
    let mut stmt = tx.prepare(sql)?;
    for (seq, entry) in entries.iter().enumerate().skip(from) {
        stmt.execute((
            id,
            seq as i64,
            entry.at,
            entry.grade,
            entry.interval_days,
            entry.ease_factor,
        ))?;
    }
    Ok(())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e.sqlite_error_code(), Some(ErrorCode::ConstraintViolation))
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["progress"], |row| row.get(0))?;
    Ok(count > 0)
}
