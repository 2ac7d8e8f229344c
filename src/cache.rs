use crate::db::DeviceStorage;
use crate::model::Collection;
use crate::store::{join_path, split_path, PendingOp, PLACEHOLDER_KEY};
use serde_json::{Map, Value};

/// Turns a collection node read from the store into records, with each key
/// attached under the collection's id field and the placeholder dropped.
pub fn records_from_snapshot(kind: Collection, snapshot: Option<Value>) -> Vec<Value> {
    let Some(Value::Object(map)) = snapshot else {
        return Vec::new();
    };
    map.into_iter()
        .filter(|(key, _)| key != PLACEHOLDER_KEY)
        .filter_map(|(key, value)| with_key(kind, &key, value))
        .collect()
}

fn with_key(kind: Collection, key: &str, value: Value) -> Option<Value> {
    let Value::Object(mut obj) = value else {
        return None;
    };
    obj.insert(kind.id_field().to_string(), Value::String(key.to_string()));
    Some(Value::Object(obj))
}

fn record_key(kind: Collection, record: &Value) -> Option<&str> {
    record.get(kind.id_field()).and_then(|v| v.as_str())
}

/// Best-effort per-collection snapshots kept on the device for the signed-in
/// account. Nothing here is versioned; the remote store always wins once it
/// is reachable again.
pub struct LocalCache<'a> {
    device: &'a DeviceStorage,
    uid: &'a str,
}

impl<'a> LocalCache<'a> {
    pub fn new(device: &'a DeviceStorage, uid: &'a str) -> Self {
        Self { device, uid }
    }

    fn key(&self, kind: Collection) -> String {
        if kind.is_global() {
            format!("ctms_cache_{}", kind.name())
        } else {
            format!("ctms_cache_{}_{}", self.uid, kind.name())
        }
    }

    pub fn read(&self, kind: Collection) -> Vec<Value> {
        self.device
            .get_json::<Vec<Value>>(&self.key(kind))
            .unwrap_or_default()
            .into_iter()
            .filter(|v| v.is_object())
            .collect()
    }

    pub fn write(&self, kind: Collection, records: &[Value]) -> anyhow::Result<()> {
        self.device.set_json(&self.key(kind), &records)
    }

    pub fn evict<F>(&self, kind: Collection, pred: F) -> anyhow::Result<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let records = self.read(kind);
        let before = records.len();
        let kept: Vec<Value> = records.into_iter().filter(|r| !pred(r)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write(kind, &kept)?;
        }
        Ok(removed)
    }

    pub fn find(&self, kind: Collection, key: &str) -> Option<Value> {
        self.read(kind)
            .into_iter()
            .find(|r| record_key(kind, r) == Some(key))
    }

    /// Projects a store mutation onto the cached snapshots so reads made
    /// while offline reflect it.
    pub fn apply(&self, op: &PendingOp) -> anyhow::Result<()> {
        match op {
            PendingOp::Set { path, value } => self.apply_write(path, value),
            PendingOp::Remove { path } => self.apply_write(path, &Value::Null),
            PendingOp::Update { path, values } => {
                for (rel, value) in values {
                    self.apply_write(&join_path(path, rel), value)?;
                }
                Ok(())
            }
        }
    }

    fn locate<'p>(&self, segs: &'p [&'p str]) -> Option<(Collection, &'p [&'p str])> {
        match segs {
            ["users", owner, coll, rest @ ..] if *owner == self.uid => {
                let kind = Collection::parse(coll)?;
                (!kind.is_global()).then_some((kind, rest))
            }
            [coll, rest @ ..] => {
                let kind = Collection::parse(coll)?;
                kind.is_global().then_some((kind, rest))
            }
            _ => None,
        }
    }

    fn apply_write(&self, path: &str, value: &Value) -> anyhow::Result<()> {
        let segs = split_path(path);
        let Some((kind, rest)) = self.locate(&segs) else {
            return Ok(());
        };
        match rest {
            [] => {
                let records = records_from_snapshot(kind, Some(value.clone()));
                self.write(kind, &records)
            }
            [key, ..] if *key == PLACEHOLDER_KEY => Ok(()),
            [key] => {
                self.evict(kind, |r| record_key(kind, r) == Some(*key))?;
                if let Some(record) = with_key(kind, key, value.clone()) {
                    let mut records = self.read(kind);
                    records.push(record);
                    self.write(kind, &records)?;
                }
                Ok(())
            }
            [key, fields @ ..] => {
                let mut records = self.read(kind);
                let idx = records
                    .iter()
                    .position(|r| record_key(kind, r) == Some(*key));
                let idx = match idx {
                    Some(i) => i,
                    None if value.is_null() => return Ok(()),
                    None => {
                        let mut obj = Map::new();
                        obj.insert(kind.id_field().to_string(), Value::String(key.to_string()));
                        records.push(Value::Object(obj));
                        records.len() - 1
                    }
                };
                set_nested(&mut records[idx], fields, value);
                self.write(kind, &records)
            }
        }
    }
}

fn set_nested(target: &mut Value, fields: &[&str], value: &Value) {
    let Some((last, parents)) = fields.split_last() else {
        return;
    };
    let mut cursor = target;
    for seg in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else { return };
        cursor = map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        if value.is_null() {
            map.remove(*last);
        } else {
            map.insert(last.to_string(), value.clone());
        }
    }
}
