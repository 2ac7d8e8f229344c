use rusqlite::{Connection, ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Sentinel child written into an otherwise empty collection so the
/// collection node exists.
pub const PLACEHOLDER_KEY: &str = "__placeholder";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached. Mutations are queued, reads fall back to cache.
    Offline(String),
    /// The store refused the operation.
    PermissionDenied(String),
    Other(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Offline(_) => "offline",
            StoreError::PermissionDenied(_) => "permission_denied",
            StoreError::Other(_) => "store_failed",
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, StoreError::Offline(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Offline(msg) => write!(f, "remote store unreachable: {}", msg),
            StoreError::PermissionDenied(msg) => write!(f, "permission denied: {}", msg),
            StoreError::Other(msg) => write!(f, "remote store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::CannotOpen)
            | Some(ErrorCode::DatabaseBusy)
            | Some(ErrorCode::DatabaseLocked)
            | Some(ErrorCode::SystemIoFailure) => StoreError::Offline(e.to_string()),
            Some(ErrorCode::ReadOnly)
            | Some(ErrorCode::PermissionDenied)
            | Some(ErrorCode::AuthorizationForStatementDenied) => {
                StoreError::PermissionDenied(e.to_string())
            }
            _ => StoreError::Other(e.to_string()),
        }
    }
}

/// A mutation against the store, in the shape it is persisted in the write queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PendingOp {
    Set { path: String, value: Value },
    Update { path: String, values: Map<String, Value> },
    Remove { path: String },
}

impl PendingOp {
    pub fn path(&self) -> &str {
        match self {
            PendingOp::Set { path, .. } => path,
            PendingOp::Update { path, .. } => path,
            PendingOp::Remove { path } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PendingOp::Set { .. } => "set",
            PendingOp::Update { .. } => "update",
            PendingOp::Remove { .. } => "remove",
        }
    }
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn join_path(base: &str, rel: &str) -> String {
    let mut segs = split_path(base);
    segs.extend(split_path(rel));
    segs.join("/")
}

/// Hierarchical key-value store addressed by slash-separated paths.
///
/// Writing `null` deletes. Objects with no children do not exist.
pub trait RemoteStore {
    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError>;
    /// Writes every `(relative path, value)` pair under `path` as one unit.
    fn update(&mut self, path: &str, values: &Map<String, Value>) -> Result<(), StoreError>;
    fn remove(&mut self, path: &str) -> Result<(), StoreError>;

    fn apply(&mut self, op: &PendingOp) -> Result<(), StoreError> {
        match op {
            PendingOp::Set { path, value } => self.set(path, value),
            PendingOp::Update { path, values } => self.update(path, values),
            PendingOp::Remove { path } => self.remove(path),
        }
    }
}

enum Location {
    File(PathBuf),
    #[cfg(test)]
    Memory,
}

/// SQLite-backed stand-in for the hosted realtime database.
///
/// Every scalar leaf is one row keyed by its full path, so a subtree is a
/// contiguous key range. Access follows owner-only rules: `users/<uid>/..`
/// is visible only to `<uid>`, everything else to any authenticated account.
pub struct SqliteRemote {
    location: Location,
    conn: Option<Connection>,
    reachable: bool,
    auth_uid: Option<String>,
}

impl SqliteRemote {
    pub fn open(path: PathBuf) -> Self {
        Self {
            location: Location::File(path),
            conn: None,
            reachable: true,
            auth_uid: None,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory remote");
        init_schema(&conn).expect("init remote schema");
        Self {
            location: Location::Memory,
            conn: Some(conn),
            reachable: true,
            auth_uid: None,
        }
    }

    pub fn location_label(&self) -> String {
        match &self.location {
            Location::File(p) => p.to_string_lossy().to_string(),
            #[cfg(test)]
            Location::Memory => ":memory:".to_string(),
        }
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn set_auth(&mut self, uid: Option<String>) {
        self.auth_uid = uid;
    }

    fn connection(&mut self) -> Result<&Connection, StoreError> {
        if !self.reachable {
            return Err(StoreError::Offline("network is offline".to_string()));
        }
        if self.conn.is_none() {
            let conn = match &self.location {
                Location::File(path) => Connection::open(path)?,
                #[cfg(test)]
                Location::Memory => {
                    return Err(StoreError::Offline("connection lost".to_string()))
                }
            };
            init_schema(&conn)?;
            self.conn = Some(conn);
        }
        self.conn
            .as_ref()
            .ok_or_else(|| StoreError::Offline("connection lost".to_string()))
    }

    fn authorize(&self, path: &str) -> Result<(), StoreError> {
        let Some(uid) = self.auth_uid.as_deref() else {
            return Err(StoreError::PermissionDenied(format!(
                "{}: not authenticated",
                path
            )));
        };
        let segs = split_path(path);
        match segs.as_slice() {
            [] => Err(StoreError::PermissionDenied("root is not addressable".to_string())),
            ["users"] => Err(StoreError::PermissionDenied(path.to_string())),
            ["users", owner, ..] if *owner != uid => {
                Err(StoreError::PermissionDenied(path.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_result<T>(&mut self, res: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(StoreError::Offline(_)) = &res {
            // Reopen on the next call.
            if self.reachable && matches!(self.location, Location::File(_)) {
                self.conn = None;
            }
        }
        res
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS nodes(
            path TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) -> Result<(), StoreError> {
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => {
            for (k, v) in map {
                if k.is_empty() || k.contains('/') {
                    return Err(StoreError::Other(format!("invalid key {:?} under {}", k, prefix)));
                }
                flatten(&join_path(prefix, k), v, out)?;
            }
            Ok(())
        }
        leaf => {
            out.push((prefix.to_string(), leaf.to_string()));
            Ok(())
        }
    }
}

fn write_in_tx(conn: &Connection, path: &str, value: &Value) -> Result<(), StoreError> {
    let mut leaves = Vec::new();
    flatten(path, value, &mut leaves)?;

    conn.execute(
        "DELETE FROM nodes WHERE path = ?1 OR (path > ?2 AND path < ?3)",
        (path, format!("{}/", path), format!("{}0", path)),
    )?;
    // A scalar stored at an ancestor would shadow the new subtree.
    let segs = split_path(path);
    for i in 1..segs.len() {
        conn.execute("DELETE FROM nodes WHERE path = ?", [segs[..i].join("/")])?;
    }
    let mut stmt = conn.prepare_cached("INSERT INTO nodes(path, value) VALUES(?, ?)")?;
    for (p, v) in leaves {
        stmt.execute((p, v))?;
    }
    Ok(())
}

fn read_subtree(conn: &Connection, path: &str) -> Result<Option<Value>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT path, value FROM nodes WHERE path = ?1 OR (path > ?2 AND path < ?3) ORDER BY path",
    )?;
    let rows = stmt
        .query_map(
            (path, format!("{}/", path), format!("{}0", path)),
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(None);
    }

    let depth = split_path(path).len();
    let mut root = Value::Object(Map::new());
    for (full, raw) in rows {
        let leaf: Value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Other(format!("corrupt node {}: {}", full, e)))?;
        let segs = split_path(&full);
        if segs.len() == depth {
            return Ok(Some(leaf));
        }
        let mut cursor = &mut root;
        for seg in &segs[depth..segs.len() - 1] {
            let Value::Object(map) = cursor else { break };
            cursor = map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if let Value::Object(map) = cursor {
            map.insert(segs[segs.len() - 1].to_string(), leaf);
        }
    }
    Ok(Some(root))
}

impl RemoteStore for SqliteRemote {
    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        self.authorize(path)?;
        let path = split_path(path).join("/");
        let res = self
            .connection()
            .and_then(|conn| read_subtree(conn, &path));
        self.check_result(res)
    }

    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError> {
        self.authorize(path)?;
        let path = split_path(path).join("/");
        let res = self.connection().and_then(|conn| {
            let tx = conn.unchecked_transaction()?;
            write_in_tx(&tx, &path, value)?;
            tx.commit()?;
            Ok(())
        });
        self.check_result(res)
    }

    fn update(&mut self, path: &str, values: &Map<String, Value>) -> Result<(), StoreError> {
        let targets: Vec<(String, &Value)> = values
            .iter()
            .map(|(k, v)| (join_path(path, k), v))
            .collect();
        for (target, _) in &targets {
            self.authorize(target)?;
        }
        if targets.is_empty() {
            return Ok(());
        }
        let res = self.connection().and_then(|conn| {
            let tx = conn.unchecked_transaction()?;
            for (target, value) in &targets {
                write_in_tx(&tx, target, value)?;
            }
            tx.commit()?;
            Ok(())
        });
        self.check_result(res)
    }

    fn remove(&mut self, path: &str) -> Result<(), StoreError> {
        self.set(path, &Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signed_in(uid: &str) -> SqliteRemote {
        let mut remote = SqliteRemote::in_memory();
        remote.set_auth(Some(uid.to_string()));
        remote
    }

    #[test]
    fn set_then_get_rebuilds_nested_objects() {
        let mut remote = signed_in("u1");
        remote
            .set(
                "users/u1/students/s1",
                &json!({ "name": "Asha", "meta": { "year": 2, "tags": ["a"] } }),
            )
            .unwrap();

        let got = remote.get("users/u1/students").unwrap().unwrap();
        assert_eq!(
            got,
            json!({ "s1": { "name": "Asha", "meta": { "year": 2, "tags": ["a"] } } })
        );
        assert_eq!(
            remote.get("users/u1/students/s1/name").unwrap(),
            Some(json!("Asha"))
        );
        assert_eq!(remote.get("users/u1/fees").unwrap(), None);
    }

    #[test]
    fn set_replaces_whole_subtree_and_sibling_prefixes_survive() {
        let mut remote = signed_in("u1");
        remote.set("users/u1/a", &json!({ "x": 1, "y": 2 })).unwrap();
        remote.set("users/u1/ab", &json!(7)).unwrap();
        remote.set("users/u1/a", &json!({ "z": 3 })).unwrap();

        assert_eq!(remote.get("users/u1/a").unwrap(), Some(json!({ "z": 3 })));
        assert_eq!(remote.get("users/u1/ab").unwrap(), Some(json!(7)));
    }

    #[test]
    fn update_writes_all_paths_and_null_deletes() {
        let mut remote = signed_in("u1");
        remote.set("users/u1/fees/f1", &json!({ "paidAmount": 0 })).unwrap();

        let mut values = Map::new();
        values.insert("fees/f1".to_string(), Value::Null);
        values.insert("attendance/a1".to_string(), json!({ "status": "Present" }));
        remote.update("users/u1", &values).unwrap();

        assert_eq!(remote.get("users/u1/fees").unwrap(), None);
        assert_eq!(
            remote.get("users/u1/attendance/a1/status").unwrap(),
            Some(json!("Present"))
        );
    }

    #[test]
    fn writing_below_a_scalar_replaces_it() {
        let mut remote = signed_in("u1");
        remote.set("users/u1/x", &json!("flat")).unwrap();
        remote.set("users/u1/x/y", &json!(1)).unwrap();
        assert_eq!(remote.get("users/u1/x").unwrap(), Some(json!({ "y": 1 })));
    }

    #[test]
    fn unreachable_store_reports_offline() {
        let mut remote = signed_in("u1");
        remote.set_reachable(false);
        let e = remote.set("users/u1/students/s1", &json!({ "name": "A" })).unwrap_err();
        assert!(e.is_offline());
        remote.set_reachable(true);
        remote.set("users/u1/students/s1", &json!({ "name": "A" })).unwrap();
    }

    #[test]
    fn other_accounts_and_anonymous_access_are_denied() {
        let mut remote = signed_in("u1");
        let e = remote.get("users/u2/students").unwrap_err();
        assert_eq!(e.code(), "permission_denied");

        let mut values = Map::new();
        values.insert("users/u1/students/s1".to_string(), json!({ "name": "A" }));
        values.insert("users/u2/students/s1".to_string(), json!({ "name": "B" }));
        assert!(remote.update("", &values).is_err());
        // Nothing from the rejected batch landed.
        assert_eq!(remote.get("users/u1/students").unwrap(), None);

        remote.set_auth(None);
        assert_eq!(
            remote.get("attention").unwrap_err().code(),
            "permission_denied"
        );
    }

    #[test]
    fn pending_op_serializes_with_tag() {
        let op = PendingOp::Remove {
            path: "users/u1/fees/f1".to_string(),
        };
        let text = serde_json::to_string(&op).unwrap();
        assert_eq!(text, r#"{"op":"remove","path":"users/u1/fees/f1"}"#);
    }
}
