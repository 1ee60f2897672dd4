//! Storage layer for the baby tracker.
//!
//! Implements the `bt-core` store traits on top of `rusqlite`.
//!
//! # Thread Safety
//!
//! A `rusqlite::Connection` is `Send` but not `Sync`. [`Database`] keeps its
//! connection behind a `Mutex`, which makes it `Sync` so the weekly report can
//! query it from several threads; the queries themselves run one at a time.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Instants are stored as TEXT in RFC 3339 form with millisecond precision and
//! a `Z` suffix (e.g. `2024-01-15T10:30:00.000Z`). Every value has the same
//! width, so lexicographic order matches chronological order and range
//! predicates can compare strings directly.
//!
//! ## Events
//!
//! Each event kind has its own table (`sleeps`, `diapers`, `nursings`) with a
//! `baby_id` foreign key. Deleting a baby cascades to its events and to its
//! rows in `user_babies`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bt_core::{
    AccessStore, Baby, BabyId, DiaperEvent, Event, EventId, EventKind, EventStore,
    NursingEvent, RangeField, ShareToken, SleepEvent, StoreError, TimeRange, User, UserId,
    ValidationError,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A previous holder of the connection lock panicked.
    #[error("database connection lock poisoned")]
    Poisoned,
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for record {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier or token failed validation.
    #[error("invalid stored value: {0}")]
    InvalidValue(#[from] ValidationError),
    /// The range field does not exist on this event kind.
    #[error("{kind} events cannot be ranged by {field:?}")]
    UnsupportedRangeField { kind: EventKind, field: RangeField },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::with_source("database operation failed", err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                credential_hash TEXT NOT NULL
            );

            -- share_token: NULL when the baby is not shared
            CREATE TABLE IF NOT EXISTS babies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                share_token TEXT UNIQUE
            );

            CREATE TABLE IF NOT EXISTS user_babies (
                user_id TEXT NOT NULL,
                baby_id TEXT NOT NULL,
                PRIMARY KEY (user_id, baby_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (baby_id) REFERENCES babies(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_user_babies_baby ON user_babies(baby_id);

            CREATE TABLE IF NOT EXISTS sleeps (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                start TEXT NOT NULL,
                "end" TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY (baby_id) REFERENCES babies(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sleeps_baby_start ON sleeps(baby_id, start);
            CREATE INDEX IF NOT EXISTS idx_sleeps_baby_end ON sleeps(baby_id, "end");

            CREATE TABLE IF NOT EXISTS diapers (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                type TEXT NOT NULL,
                time TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY (baby_id) REFERENCES babies(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_diapers_baby_time ON diapers(baby_id, time);

            -- amount: free-form, e.g. '120ml' or '15min'
            CREATE TABLE IF NOT EXISTS nursings (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                type TEXT NOT NULL,
                amount TEXT NOT NULL DEFAULT '',
                time TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY (baby_id) REFERENCES babies(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_nursings_baby_time ON nursings(baby_id, time);
            "#,
        )?;
        Ok(())
    }

    fn insert_baby_with_parent(
        conn: &mut Connection,
        baby: &Baby,
        parent: &UserId,
    ) -> Result<(), DbError> {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO babies (id, name, share_token) VALUES (?1, ?2, ?3)",
            params![
                baby.id.as_str(),
                baby.name,
                baby.share_token.as_ref().map(ShareToken::as_str)
            ],
        )?;
        tx.execute(
            "INSERT INTO user_babies (user_id, baby_id) VALUES (?1, ?2)",
            params![parent.as_str(), baby.id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn parent_ids(conn: &Connection, baby: &BabyId) -> Result<Vec<UserId>, DbError> {
        let mut stmt = conn
            .prepare("SELECT user_id FROM user_babies WHERE baby_id = ?1 ORDER BY user_id ASC")?;
        let rows = stmt.query_map([baby.as_str()], |row| row.get::<_, String>(0))?;
        let mut parents = Vec::new();
        for row in rows {
            parents.push(UserId::new(row?)?);
        }
        Ok(parents)
    }

    fn query_babies(
        conn: &Connection,
        sql: &str,
        param: &str,
    ) -> Result<Vec<Baby>, DbError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([param], |row| {
            Ok(BabyRow {
                id: row.get(0)?,
                name: row.get(1)?,
                share_token: row.get(2)?,
            })
        })?;
        let mut babies = Vec::new();
        for row in rows {
            babies.push(row?.into_baby()?);
        }
        Ok(babies)
    }

    fn query_events(
        conn: &Connection,
        kind: EventKind,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Event>, DbError> {
        let sql = format!("{} WHERE {filter} {}", select_clause(kind), order_clause(kind));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| EventRow::read(kind, row))?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }
}

impl AccessStore for Database {
    fn insert_user(&self, user: &User) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT INTO users (id, username, credential_hash) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![user.id.as_str(), user.username, user.credential_hash],
            )
            .map_err(DbError::from)?;
        Ok(inserted == 1)
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, username, credential_hash FROM users WHERE id = ?1",
                [id.as_str()],
                UserRow::read,
            )
            .optional()
            .map_err(DbError::from)?;
        Ok(row.map(UserRow::into_user).transpose()?)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, username, credential_hash FROM users WHERE username = ?1",
                [username],
                UserRow::read,
            )
            .optional()
            .map_err(DbError::from)?;
        Ok(row.map(UserRow::into_user).transpose()?)
    }

    fn insert_baby(&self, baby: &Baby, parent: &UserId) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        Ok(Self::insert_baby_with_parent(&mut conn, baby, parent)?)
    }

    fn get_baby(&self, id: &BabyId) -> Result<Option<Baby>, StoreError> {
        let conn = self.lock()?;
        let babies = Self::query_babies(
            &conn,
            "SELECT id, name, share_token FROM babies WHERE id = ?1",
            id.as_str(),
        )?;
        Ok(babies.into_iter().next())
    }

    fn rename_baby(&self, id: &BabyId, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE babies SET name = ?1 WHERE id = ?2",
                params![name, id.as_str()],
            )
            .map_err(DbError::from)?;
        Ok(changed == 1)
    }

    fn delete_baby(&self, id: &BabyId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM babies WHERE id = ?1", [id.as_str()])
            .map_err(DbError::from)?;
        Ok(deleted == 1)
    }

    fn babies_for_user(&self, user: &UserId) -> Result<Vec<Baby>, StoreError> {
        let conn = self.lock()?;
        Ok(Self::query_babies(
            &conn,
            "
            SELECT b.id, b.name, b.share_token
            FROM babies b
            JOIN user_babies ub ON ub.baby_id = b.id
            WHERE ub.user_id = ?1
            ORDER BY b.name ASC, b.id ASC
            ",
            user.as_str(),
        )?)
    }

    fn parents_of(&self, baby: &BabyId) -> Result<Vec<UserId>, StoreError> {
        let conn = self.lock()?;
        Ok(Self::parent_ids(&conn, baby)?)
    }

    fn is_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM user_babies WHERE baby_id = ?1 AND user_id = ?2",
                params![baby.as_str(), user.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(DbError::from)?;
        Ok(found.is_some())
    }

    fn insert_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO user_babies (user_id, baby_id) VALUES (?1, ?2)",
                params![user.as_str(), baby.as_str()],
            )
            .map_err(DbError::from)?;
        Ok(inserted == 1)
    }

    fn set_share_token_if_absent(
        &self,
        baby: &BabyId,
        token: &ShareToken,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE babies SET share_token = ?1 WHERE id = ?2 AND share_token IS NULL",
                params![token.as_str(), baby.as_str()],
            )
            .map_err(DbError::from)?;
        Ok(changed == 1)
    }

    fn clear_share_token(&self, baby: &BabyId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE babies SET share_token = NULL WHERE id = ?1",
                [baby.as_str()],
            )
            .map_err(DbError::from)?;
        Ok(changed == 1)
    }

    fn find_baby_by_share_token(&self, token: &ShareToken) -> Result<Option<Baby>, StoreError> {
        let conn = self.lock()?;
        let babies = Self::query_babies(
            &conn,
            "SELECT id, name, share_token FROM babies WHERE share_token = ?1",
            token.as_str(),
        )?;
        Ok(babies.into_iter().next())
    }
}

impl EventStore for Database {
    fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let result = match event {
            Event::Sleep(e) => conn.execute(
                r#"INSERT INTO sleeps (id, baby_id, start, "end", note) VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![
                    e.id.as_str(),
                    e.baby_id.as_str(),
                    format_timestamp(e.start),
                    format_timestamp(e.end),
                    e.note
                ],
            ),
            Event::Diaper(e) => conn.execute(
                "INSERT INTO diapers (id, baby_id, type, time, note) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    e.id.as_str(),
                    e.baby_id.as_str(),
                    e.type_tag,
                    format_timestamp(e.time),
                    e.note
                ],
            ),
            Event::Nursing(e) => conn.execute(
                "INSERT INTO nursings (id, baby_id, type, amount, time, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    e.id.as_str(),
                    e.baby_id.as_str(),
                    e.type_tag,
                    e.amount,
                    format_timestamp(e.time),
                    e.note
                ],
            ),
        };
        result.map_err(DbError::from)?;
        Ok(())
    }

    fn get_event(&self, kind: EventKind, id: &EventId) -> Result<Option<Event>, StoreError> {
        let conn = self.lock()?;
        let events = Self::query_events(&conn, kind, "id = ?1", &[&id.as_str()])?;
        Ok(events.into_iter().next())
    }

    fn list_events(&self, kind: EventKind, baby: &BabyId) -> Result<Vec<Event>, StoreError> {
        let conn = self.lock()?;
        Ok(Self::query_events(
            &conn,
            kind,
            "baby_id = ?1",
            &[&baby.as_str()],
        )?)
    }

    fn list_events_in_range(
        &self,
        kind: EventKind,
        baby: &BabyId,
        range: &TimeRange,
        field: RangeField,
    ) -> Result<Vec<Event>, StoreError> {
        let predicate = range_predicate(kind, field)?;
        let start = format_timestamp(range.start);
        let end = format_timestamp(range.end);
        let conn = self.lock()?;
        let filter = format!("baby_id = ?1 AND ({predicate})");
        Ok(Self::query_events(
            &conn,
            kind,
            &filter,
            &[&baby.as_str(), &start, &end],
        )?)
    }

    fn update_event(&self, event: &Event) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = match event {
            Event::Sleep(e) => conn.execute(
                r#"UPDATE sleeps SET start = ?1, "end" = ?2, note = ?3 WHERE id = ?4"#,
                params![
                    format_timestamp(e.start),
                    format_timestamp(e.end),
                    e.note,
                    e.id.as_str()
                ],
            ),
            Event::Diaper(e) => conn.execute(
                "UPDATE diapers SET type = ?1, time = ?2, note = ?3 WHERE id = ?4",
                params![e.type_tag, format_timestamp(e.time), e.note, e.id.as_str()],
            ),
            Event::Nursing(e) => conn.execute(
                "UPDATE nursings SET type = ?1, amount = ?2, time = ?3, note = ?4 WHERE id = ?5",
                params![
                    e.type_tag,
                    e.amount,
                    format_timestamp(e.time),
                    e.note,
                    e.id.as_str()
                ],
            ),
        }
        .map_err(DbError::from)?;
        Ok(changed == 1)
    }

    fn delete_event(&self, kind: EventKind, id: &EventId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", table_name(kind));
        let deleted = conn.execute(&sql, [id.as_str()]).map_err(DbError::from)?;
        Ok(deleted == 1)
    }
}

const fn table_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Sleep => "sleeps",
        EventKind::Diaper => "diapers",
        EventKind::Nursing => "nursings",
    }
}

const fn select_clause(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Sleep => r#"SELECT id, baby_id, start, "end", note FROM sleeps"#,
        EventKind::Diaper => "SELECT id, baby_id, type, time, note FROM diapers",
        EventKind::Nursing => "SELECT id, baby_id, type, amount, time, note FROM nursings",
    }
}

const fn order_clause(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Sleep => "ORDER BY start ASC, id ASC",
        EventKind::Diaper | EventKind::Nursing => "ORDER BY time ASC, id ASC",
    }
}

/// SQL predicate over `?2` (range start) and `?3` (range end), half-open.
fn range_predicate(kind: EventKind, field: RangeField) -> Result<&'static str, DbError> {
    match (kind, field) {
        (EventKind::Diaper | EventKind::Nursing, RangeField::Time) => {
            Ok("time >= ?2 AND time < ?3")
        }
        (EventKind::Sleep, RangeField::Start) => Ok("start >= ?2 AND start < ?3"),
        (EventKind::Sleep, RangeField::End) => Ok(r#""end" >= ?2 AND "end" < ?3"#),
        (EventKind::Sleep, RangeField::Overlap) => Ok(r#"(start < ?3 AND "end" > ?2)
               OR (start >= ?2 AND start < ?3)
               OR ("end" >= ?2 AND "end" < ?3)"#),
        _ => Err(DbError::UnsupportedRangeField { kind, field }),
    }
}

struct UserRow {
    id: String,
    username: String,
    credential_hash: String,
}

impl UserRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            credential_hash: row.get(2)?,
        })
    }

    fn into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: UserId::new(self.id)?,
            username: self.username,
            credential_hash: self.credential_hash,
        })
    }
}

struct BabyRow {
    id: String,
    name: String,
    share_token: Option<String>,
}

impl BabyRow {
    fn into_baby(self) -> Result<Baby, DbError> {
        Ok(Baby {
            id: BabyId::new(self.id)?,
            name: self.name,
            share_token: self.share_token.map(ShareToken::new).transpose()?,
        })
    }
}

/// Raw columns of one event row, before timestamps are parsed.
enum EventRow {
    Sleep {
        id: String,
        baby_id: String,
        start: String,
        end: String,
        note: Option<String>,
    },
    Diaper {
        id: String,
        baby_id: String,
        type_tag: String,
        time: String,
        note: Option<String>,
    },
    Nursing {
        id: String,
        baby_id: String,
        type_tag: String,
        amount: String,
        time: String,
        note: Option<String>,
    },
}

impl EventRow {
    fn read(kind: EventKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(match kind {
            EventKind::Sleep => Self::Sleep {
                id: row.get(0)?,
                baby_id: row.get(1)?,
                start: row.get(2)?,
                end: row.get(3)?,
                note: row.get(4)?,
            },
            EventKind::Diaper => Self::Diaper {
                id: row.get(0)?,
                baby_id: row.get(1)?,
                type_tag: row.get(2)?,
                time: row.get(3)?,
                note: row.get(4)?,
            },
            EventKind::Nursing => Self::Nursing {
                id: row.get(0)?,
                baby_id: row.get(1)?,
                type_tag: row.get(2)?,
                amount: row.get(3)?,
                time: row.get(4)?,
                note: row.get(5)?,
            },
        })
    }

    fn into_event(self) -> Result<Event, DbError> {
        Ok(match self {
            Self::Sleep {
                id,
                baby_id,
                start,
                end,
                note,
            } => Event::Sleep(SleepEvent {
                start: parse_timestamp(&start, &id)?,
                end: parse_timestamp(&end, &id)?,
                id: EventId::new(id)?,
                baby_id: BabyId::new(baby_id)?,
                note,
            }),
            Self::Diaper {
                id,
                baby_id,
                type_tag,
                time,
                note,
            } => Event::Diaper(DiaperEvent {
                time: parse_timestamp(&time, &id)?,
                id: EventId::new(id)?,
                baby_id: BabyId::new(baby_id)?,
                type_tag,
                note,
            }),
            Self::Nursing {
                id,
                baby_id,
                type_tag,
                amount,
                time,
                note,
            } => Event::Nursing(NursingEvent {
                time: parse_timestamp(&time, &id)?,
                id: EventId::new(id)?,
                baby_id: BabyId::new(baby_id)?,
                type_tag,
                amount,
                note,
            }),
        })
    }
}

fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
