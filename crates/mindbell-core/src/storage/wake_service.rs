//! SQLite-backed wake service.
//!
//! Wakeups are rows in a `wakeups` table with a target time in epoch
//! milliseconds. A row stays live until it is delivered, either as the cause
//! of a launch or through [`WakeService::take_fired`], and delivered rows are
//! deleted so `query` stops recognising them. Ids come from `AUTOINCREMENT`,
//! so they are positive and never reused.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::data_dir;
use crate::error::{DatabaseError, Result, SchedulingError};
use crate::wakeup::{
    wakeup_target, Clock, ReasonCode, SystemClock, TimerId, WakeService, WakeupEvent,
};

/// Default limit on simultaneously scheduled wakeups.
pub const DEFAULT_MAX_PENDING: usize = 8;

pub struct SqliteWakeService<C = SystemClock> {
    conn: Connection,
    clock: C,
    max_pending: usize,
}

impl SqliteWakeService<SystemClock> {
    /// Open the service at `<data dir>/wakeups.db`.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("wakeups.db");
        Self::open_at(&path, SystemClock)
    }
}

impl<C: Clock> SqliteWakeService<C> {
    pub fn open_at(path: &Path, clock: C) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, clock)
    }

    /// In-memory service (for tests).
    pub fn open_memory(clock: C) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, clock)
    }

    fn from_connection(conn: Connection, clock: C) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS wakeups (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                target_ms   INTEGER NOT NULL,
                reason      INTEGER NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_wakeups_target_ms ON wakeups(target_ms);",
        )
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            clock,
            max_pending: DEFAULT_MAX_PENDING,
        })
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Number of wakeups not yet delivered.
    pub fn pending_count(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM wakeups", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Drop a wakeup without delivering it.
    pub fn forget(&self, id: TimerId) -> Result<bool, DatabaseError> {
        let removed = self
            .conn
            .execute("DELETE FROM wakeups WHERE id = ?1", params![id.get()])?;
        Ok(removed > 0)
    }

    fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<WakeupEvent>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reason FROM wakeups
             WHERE target_ms <= ?1
             ORDER BY target_ms, id
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now.timestamp_millis(), limit], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i32>(1)?))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (raw, reason) = row?;
            if let Some(id) = TimerId::from_raw(raw) {
                events.push(WakeupEvent::new(id, reason));
            }
        }
        Ok(events)
    }

    fn consume(&self, events: &[WakeupEvent]) -> Result<(), DatabaseError> {
        for event in events {
            self.conn
                .execute("DELETE FROM wakeups WHERE id = ?1", params![event.id.get()])?;
        }
        Ok(())
    }

    fn insert(&self, delay_secs: i64, reason: ReasonCode) -> Result<TimerId, SchedulingError> {
        let pending = self
            .pending_count()
            .map_err(|e| SchedulingError::Backend(e.to_string()))?;
        if pending >= self.max_pending {
            return Err(SchedulingError::Exhausted {
                limit: self.max_pending,
            });
        }

        let now = self.clock.now();
        let target = wakeup_target(now, delay_secs)?;
        self.conn
            .execute(
                "INSERT INTO wakeups (target_ms, reason, created_at) VALUES (?1, ?2, ?3)",
                params![target.timestamp_millis(), reason, now.to_rfc3339()],
            )
            .map_err(|e| SchedulingError::Backend(e.to_string()))?;

        TimerId::from_raw(self.conn.last_insert_rowid())
            .ok_or_else(|| SchedulingError::Backend("non-positive rowid".to_string()))
    }
}

impl<C: Clock> WakeService for SqliteWakeService<C> {
    fn schedule(&mut self, delay_secs: i64, reason: ReasonCode) -> Result<TimerId, SchedulingError> {
        self.insert(delay_secs, reason)
    }

    fn query(&self, id: TimerId) -> Option<DateTime<Utc>> {
        let found = self
            .conn
            .query_row(
                "SELECT target_ms FROM wakeups WHERE id = ?1",
                params![id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional();
        match found {
            Ok(target_ms) => target_ms.and_then(DateTime::from_timestamp_millis),
            Err(e) => {
                warn!(%id, error = %e, "wakeup query failed");
                None
            }
        }
    }

    /// A wakeup that came due while no process was delivering is what
    /// launched us: hand out the oldest one.
    fn launch_event(&mut self) -> Option<WakeupEvent> {
        let now = self.clock.now();
        let event = match self.due(now, 1) {
            Ok(events) => events.into_iter().next()?,
            Err(e) => {
                warn!(error = %e, "launch inspection failed");
                return None;
            }
        };
        if let Err(e) = self.consume(&[event]) {
            warn!(id = %event.id, error = %e, "failed to consume launch wakeup");
        }
        debug!(id = %event.id, "launch caused by wakeup");
        Some(event)
    }

    fn take_fired(&mut self, now: DateTime<Utc>) -> Vec<WakeupEvent> {
        let events = match self.due(now, i64::MAX) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "failed to read due wakeups");
                return Vec::new();
            }
        };
        if let Err(e) = self.consume(&events) {
            warn!(error = %e, "failed to consume fired wakeups");
        }
        events
    }
}
