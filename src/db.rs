use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::store::{Bin, KeyValueStore};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bins (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// When a bin was last written, if it exists.
    pub fn updated_at(&self, bin: Bin) -> Result<Option<String>> {
        let ts = self
            .conn
            .query_row(
                "SELECT updated_at FROM bins WHERE name = ?1",
                params![bin.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }
}

impl KeyValueStore for Database {
    fn get(&self, bin: Bin) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM bins WHERE name = ?1",
                params![bin.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, bin: Bin, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO bins (name, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![bin.key(), value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, bin: Bin) -> Result<()> {
        self.conn
            .execute("DELETE FROM bins WHERE name = ?1", params![bin.key()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_history, load_settings, save_settings};
    use crate::models::LearnerSettings;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_bins_table() {
            let db = setup_db();
            let count: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM bins", [], |row| row.get(0))
                .expect("bins table should exist");
            assert_eq!(count, 0);
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.set(Bin::Settings, "{}").unwrap();

            db.init().expect("Re-init should succeed");

            assert_eq!(db.get(Bin::Settings).unwrap(), Some("{}".to_string()));
        }
    }

    mod bin_tests {
        use super::*;

        #[test]
        fn get_missing_bin_is_none() {
            let db = setup_db();
            assert!(db.get(Bin::History).unwrap().is_none());
            assert!(db.updated_at(Bin::History).unwrap().is_none());
        }

        #[test]
        fn set_overwrites_previous_value() {
            let db = setup_db();
            db.set(Bin::Wrongbook, "{\"a\":1}").unwrap();
            db.set(Bin::Wrongbook, "{\"b\":2}").unwrap();

            assert_eq!(db.get(Bin::Wrongbook).unwrap(), Some("{\"b\":2}".to_string()));
            assert!(db.updated_at(Bin::Wrongbook).unwrap().is_some());
        }

        #[test]
        fn bins_are_independent() {
            let db = setup_db();
            db.set(Bin::Settings, "1").unwrap();
            db.set(Bin::History, "2").unwrap();

            db.remove(Bin::Settings).unwrap();

            assert!(db.get(Bin::Settings).unwrap().is_none());
            assert_eq!(db.get(Bin::History).unwrap(), Some("2".to_string()));
        }

        #[test]
        fn remove_missing_bin_is_ok() {
            let db = setup_db();
            assert!(db.remove(Bin::MediaOverrides).is_ok());
        }
    }

    mod typed_tests {
        use super::*;

        #[test]
        fn settings_persist_across_reads() {
            let db = setup_db();
            let s = LearnerSettings {
                learner: "阿噗".to_string(),
                count: 3,
                ..Default::default()
            };
            save_settings(&db, s.clone()).unwrap();
            assert_eq!(load_settings(&db).unwrap(), s);
        }

        #[test]
        fn corrupt_history_reads_as_empty() {
            let db = setup_db();
            db.set(Bin::History, "not json at all").unwrap();
            assert_eq!(load_history(&db).unwrap(), Default::default());
        }
    }
}
