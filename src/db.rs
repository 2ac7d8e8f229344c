use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DEVICE_DB_FILE: &str = "device.sqlite3";

/// On-device string key/value storage. A missing key is the empty state.
pub struct DeviceStorage {
    conn: Connection,
}

impl DeviceStorage {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!(
                "failed to create workspace {}",
                workspace.to_string_lossy()
            )
        })?;
        let conn = Connection::open(workspace.join(DEVICE_DB_FILE))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory device db");
        init_schema(&conn).expect("init device schema");
        Self { conn }
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let v = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(v)
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }

    /// Reads and decodes a JSON value. Missing, unreadable, or malformed
    /// entries all come back as `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("device storage read failed for {}: {:#}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("ignoring malformed device entry {}: {}", key, e);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize {}", key))?;
        self.set(key, &text)
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(v)) if v == "true")
    }

    pub fn set_flag(&self, key: &str) -> anyhow::Result<()> {
        self.set(key, "true")
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_reads_as_none() {
        let device = DeviceStorage::in_memory();
        device.set("k", "{not json").unwrap();
        assert_eq!(device.get_json::<Vec<String>>("k"), None);
        assert_eq!(device.get_json::<Vec<String>>("missing"), None);

        device.set_json("k", &vec!["a".to_string()]).unwrap();
        assert_eq!(device.get_json::<Vec<String>>("k"), Some(vec!["a".to_string()]));
    }

    #[test]
    fn flags_are_only_true_for_literal_true() {
        let device = DeviceStorage::in_memory();
        assert!(!device.flag("f"));
        device.set("f", "yes").unwrap();
        assert!(!device.flag("f"));
        device.set_flag("f").unwrap();
        assert!(device.flag("f"));
        device.remove("f").unwrap();
        assert!(!device.flag("f"));
    }
}
