//! SQLite-backed record sink
//!
//! Records are append-only. `seq` preserves insertion order independently of
//! the clock; the public id is a `SUB-<ulid>` string.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{RecordSink, SinkError, Submission};
use crate::core::identity::SubmissionId;
use crate::schema::FormData;

/// Current store layout version
const SCHEMA_VERSION: i32 = 1;

/// Submission store in a single SQLite file
pub struct SqliteSink {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteSink {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SinkError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| SinkError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        // WAL lets `submissions list` read while a server is writing
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let sink = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        sink.init_schema()?;

        tracing::debug!(path = %path.display(), "submission store opened");
        Ok(sink)
    }

    /// Store that lives only as long as this value
    pub fn in_memory() -> Result<Self, SinkError> {
        let sink = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        };
        sink.init_schema()?;
        Ok(sink)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> Result<(), SinkError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS submissions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                step INTEGER NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_submissions_step ON submissions(step);
            "#,
        )?;

        let found: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .optional()?
            .flatten();

        match found {
            Some(v) if v > SCHEMA_VERSION => Err(SinkError::IncompatibleVersion {
                found: v,
                supported: SCHEMA_VERSION,
            }),
            Some(v) if v == SCHEMA_VERSION => Ok(()),
            _ => {
                conn.execute(
                    "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
                Ok(())
            }
        }
    }
}

impl RecordSink for SqliteSink {
    fn create(&self, step: u32, data: &FormData) -> Result<Submission, SinkError> {
        let submission = Submission {
            id: SubmissionId::new(),
            step,
            data: data.clone(),
            created_at: Utc::now(),
        };

        let encoded = serde_json::to_string(&submission.data)
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        self.conn.lock().execute(
            "INSERT INTO submissions (id, step, data, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                submission.id.to_string(),
                step,
                encoded,
                submission.created_at.to_rfc3339()
            ],
        )?;

        tracing::debug!(id = %submission.id, step, "submission stored");
        Ok(submission)
    }

    fn list(&self) -> Result<Vec<Submission>, SinkError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, step, data, created_at FROM submissions ORDER BY seq DESC")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, step, data, created_at)| decode_row(id, step, &data, &created_at))
            .collect()
    }
}

fn decode_row(id: String, step: u32, data: &str, created_at: &str) -> Result<Submission, SinkError> {
    let corrupt = |message: String| SinkError::Corrupt {
        id: id.clone(),
        message,
    };

    let parsed_id = SubmissionId::parse(&id).map_err(|e| corrupt(e.to_string()))?;
    let data: FormData = serde_json::from_str(data).map_err(|e| corrupt(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(Submission {
        id: parsed_id,
        step,
        data,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn data(value: serde_json::Value) -> FormData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_and_list() {
        let sink = SqliteSink::in_memory().unwrap();
        let stored = sink
            .create(1, &data(json!({"aadhaarNumber": "123412341234", "consent": true})))
            .unwrap();

        let listed = sink.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, stored.id);
        assert_eq!(listed[0].step, 1);
        assert_eq!(listed[0].data["consent"], json!(true));
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let sink = SqliteSink::in_memory().unwrap();
        let ids: Vec<_> = (1..=3)
            .map(|step| sink.create(step, &FormData::new()).unwrap().id)
            .collect();

        let listed: Vec<_> = sink.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, ids.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_identical_payloads_get_distinct_records() {
        let sink = SqliteSink::in_memory().unwrap();
        let payload = data(json!({"panNumber": "ABCDE1234F"}));
        let a = sink.create(2, &payload).unwrap();
        let b = sink.create(2, &payload).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(sink.list().unwrap().len(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("submissions.db");

        let id = {
            let sink = SqliteSink::open(&path).unwrap();
            assert_eq!(sink.path(), Some(path.as_path()));
            sink.create(2, &data(json!({"city": "Pune"}))).unwrap().id
        };

        let sink = SqliteSink::open(&path).unwrap();
        let listed = sink.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].data["city"], json!("Pune"));
    }

    #[test]
    fn test_newer_store_is_refused() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("submissions.db");
        SqliteSink::open(&path).unwrap();

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
                .unwrap();
        }

        let err = SqliteSink::open(&path).err().unwrap();
        assert!(matches!(
            err,
            SinkError::IncompatibleVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let sink = SqliteSink::in_memory().unwrap();
        sink.conn
            .lock()
            .execute(
                "INSERT INTO submissions (id, step, data, created_at) VALUES ('SUB-bad', 1, '{}', 'now')",
                [],
            )
            .unwrap();
        assert!(matches!(sink.list(), Err(SinkError::Corrupt { .. })));
    }
}
