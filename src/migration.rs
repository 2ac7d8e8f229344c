use crate::db::DeviceStorage;
use crate::model::Collection;
use crate::store::{RemoteStore, StoreError, PLACEHOLDER_KEY};
use serde::Serialize;
use serde_json::{Map, Value};

pub fn root_flag_key(uid: &str) -> String {
    format!("ctms_firestore_migrated_root_{}", uid)
}

pub fn local_flag_key(uid: &str) -> String {
    format!("ctms_firestore_migrated_{}", uid)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Root collections copied into the account namespace.
    pub root_copied: Vec<String>,
    /// Legacy device collections copied, with record counts.
    pub local_copied: Vec<(String, usize)>,
    pub local_skipped: Vec<String>,
    pub root_done: bool,
    pub local_done: bool,
}

fn has_real_entries(snapshot: &Option<Value>) -> bool {
    match snapshot {
        Some(Value::Object(map)) => map.keys().any(|k| k != PLACEHOLDER_KEY),
        Some(_) => true,
        None => false,
    }
}

fn destination_path(uid: &str, kind: Collection) -> String {
    if kind.is_global() {
        kind.name().to_string()
    } else {
        format!("users/{}/{}", uid, kind.name())
    }
}

/// Copies data written before per-account namespacing into the signed-in
/// account. Runs at most once per account per device; nothing here ever
/// fails sign-in.
pub fn run(remote: &mut dyn RemoteStore, device: &DeviceStorage, uid: &str) -> MigrationReport {
    let mut report = MigrationReport::default();
    if uid.is_empty() {
        return report;
    }
    migrate_root(remote, device, uid, &mut report);
    migrate_local(remote, device, uid, &mut report);
    report
}

fn user_has_any_data(remote: &mut dyn RemoteStore, uid: &str) -> Result<bool, StoreError> {
    for kind in Collection::SCOPED {
        if has_real_entries(&remote.get(&destination_path(uid, kind))?) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn migrate_root(
    remote: &mut dyn RemoteStore,
    device: &DeviceStorage,
    uid: &str,
    report: &mut MigrationReport,
) {
    let flag = root_flag_key(uid);
    if device.flag(&flag) {
        report.root_done = true;
        return;
    }

    match user_has_any_data(remote, uid) {
        Ok(true) => log::info!("account {} already has data, skipping root copy", uid),
        Ok(false) => match copy_root(remote, uid) {
            Ok(copied) => {
                if !copied.is_empty() {
                    log::info!("copied root collections {:?} into account {}", copied, uid);
                }
                report.root_copied = copied;
            }
            Err(e) => log::warn!("root data copy for {} failed: {}", uid, e),
        },
        Err(e) => {
            log::warn!("could not inspect account {} before root copy: {}", uid, e);
            return;
        }
    }

    match device.set_flag(&flag) {
        Ok(()) => report.root_done = true,
        Err(e) => log::warn!("failed to record root migration for {}: {:#}", uid, e),
    }
}

fn copy_root(remote: &mut dyn RemoteStore, uid: &str) -> Result<Vec<String>, StoreError> {
    let mut values = Map::new();
    let mut copied = Vec::new();
    for kind in Collection::SCOPED {
        let Some(Value::Object(records)) = remote.get(kind.name())? else {
            continue;
        };
        let mut any = false;
        for (key, record) in records {
            if key == PLACEHOLDER_KEY {
                continue;
            }
            values.insert(format!("{}/{}", kind.name(), key), record);
            any = true;
        }
        if any {
            copied.push(kind.name().to_string());
        }
    }
    if !values.is_empty() {
        remote.update(&format!("users/{}", uid), &values)?;
    }
    Ok(copied)
}

fn read_legacy(device: &DeviceStorage, kind: Collection) -> Vec<Map<String, Value>> {
    match device.get_json::<Value>(kind.legacy_storage_key()) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn migrate_local(
    remote: &mut dyn RemoteStore,
    device: &DeviceStorage,
    uid: &str,
    report: &mut MigrationReport,
) {
    let flag = local_flag_key(uid);
    if device.flag(&flag) {
        report.local_done = true;
        return;
    }

    let mut all_ok = true;
    for kind in Collection::ALL {
        let records = read_legacy(device, kind);
        if records.is_empty() {
            continue;
        }
        match copy_local(remote, uid, kind, records) {
            Ok(Some(count)) => {
                log::info!("migrated {} local {} records", count, kind.name());
                report.local_copied.push((kind.name().to_string(), count));
            }
            Ok(None) => {
                log::info!("{} already present remotely, local copy skipped", kind.name());
                report.local_skipped.push(kind.name().to_string());
            }
            Err(e) => {
                log::warn!("local {} migration failed: {}", kind.name(), e);
                all_ok = false;
            }
        }
    }

    if !all_ok {
        return;
    }
    match device.set_flag(&flag) {
        Ok(()) => report.local_done = true,
        Err(e) => log::warn!("failed to record local migration for {}: {:#}", uid, e),
    }
}

/// `Ok(None)` when the destination already has entries.
fn copy_local(
    remote: &mut dyn RemoteStore,
    uid: &str,
    kind: Collection,
    records: Vec<Map<String, Value>>,
) -> Result<Option<usize>, StoreError> {
    let path = destination_path(uid, kind);
    if has_real_entries(&remote.get(&path)?) {
        return Ok(None);
    }
    let mut values = Map::new();
    for mut record in records {
        let key = match record.remove(kind.id_field()) {
            Some(Value::String(k)) if !k.is_empty() && !k.contains('/') => k,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                log::warn!("skipping local {} record without a usable id", kind.name());
                continue;
            }
        };
        values.insert(key, Value::Object(record));
    }
    if values.is_empty() {
        return Ok(Some(0));
    }
    let count = values.len();
    remote.update(&path, &values)?;
    Ok(Some(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteRemote;
    use serde_json::json;

    fn remote_for(uid: &str) -> SqliteRemote {
        let mut remote = SqliteRemote::in_memory();
        remote.set_auth(Some(uid.to_string()));
        remote
    }

    #[test]
    fn root_data_moves_into_an_empty_account_once() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set("students/s1", &json!({ "name": "A" })).unwrap();
        remote.set("fees/f1", &json!({ "studentId": "s1" })).unwrap();
        remote.set("attention/m1", &json!({ "title": "global" })).unwrap();

        let report = run(&mut remote, &device, "u1");
        assert_eq!(report.root_copied, vec!["students", "fees"]);
        assert!(report.root_done);
        assert_eq!(
            remote.get("users/u1/students/s1/name").unwrap(),
            Some(json!("A"))
        );
        // Sources stay, attention stays global.
        assert!(remote.get("students/s1").unwrap().is_some());
        assert_eq!(remote.get("users/u1/attention").unwrap(), None);
        assert!(device.flag(&root_flag_key("u1")));
    }

    #[test]
    fn root_copy_skipped_when_account_has_data() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set("students/s1", &json!({ "name": "Root" })).unwrap();
        remote.set("users/u1/vehicles/v1", &json!({ "busNumber": "B" })).unwrap();

        let report = run(&mut remote, &device, "u1");
        assert!(report.root_copied.is_empty());
        assert!(report.root_done);
        assert_eq!(remote.get("users/u1/students").unwrap(), None);
    }

    #[test]
    fn placeholders_do_not_count_as_data() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set("users/u1/students/__placeholder", &json!(true)).unwrap();
        remote.set("students/s1", &json!({ "name": "A" })).unwrap();
        let report = run(&mut remote, &device, "u1");
        assert_eq!(report.root_copied, vec!["students"]);
    }

    #[test]
    fn offline_emptiness_check_leaves_root_flag_unset() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set_reachable(false);
        let report = run(&mut remote, &device, "u1");
        assert!(!report.root_done);
        assert!(!device.flag(&root_flag_key("u1")));
    }

    #[test]
    fn local_records_are_copied_without_their_ids() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        device
            .set_json(
                "ctms_students",
                &json!([{ "id": "s1", "name": "A" }, { "name": "no id" }]),
            )
            .unwrap();
        device
            .set_json(
                "ctms_destinations",
                &json!([{ "studentId": "s1", "distance": 20 }]),
            )
            .unwrap();
        device.set("ctms_fees", "{corrupt").unwrap();
        device.set_json("ctms_vehicles", &json!({ "not": "array" })).unwrap();

        let report = run(&mut remote, &device, "u1");
        assert!(report.local_done);
        assert_eq!(
            remote.get("users/u1/students").unwrap(),
            Some(json!({ "s1": { "name": "A" } }))
        );
        assert_eq!(
            remote.get("users/u1/destinations").unwrap(),
            Some(json!({ "s1": { "distance": 20 } }))
        );
        assert_eq!(remote.get("users/u1/fees").unwrap(), None);
        // Sources are kept.
        assert!(device.get("ctms_students").unwrap().is_some());
    }

    #[test]
    fn local_copy_never_overwrites_existing_entries() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set("users/u1/students/s9", &json!({ "name": "Remote" })).unwrap();
        device
            .set_json("ctms_students", &json!([{ "id": "s1", "name": "Local" }]))
            .unwrap();
        device
            .set_json("ctms_attention", &json!([{ "id": "m1", "title": "Hi" }]))
            .unwrap();

        let report = run(&mut remote, &device, "u1");
        assert_eq!(report.local_skipped, vec!["students"]);
        assert_eq!(report.local_copied, vec![("attention".to_string(), 1)]);
        assert_eq!(remote.get("users/u1/students/s1").unwrap(), None);
        assert_eq!(remote.get("attention/m1/title").unwrap(), Some(json!("Hi")));
    }

    #[test]
    fn migration_is_idempotent() {
        let mut remote = remote_for("u1");
        let device = DeviceStorage::in_memory();
        remote.set("students/s1", &json!({ "name": "A" })).unwrap();
        device
            .set_json("ctms_vehicles", &json!([{ "id": "v1", "busNumber": "B" }]))
            .unwrap();

        run(&mut remote, &device, "u1");
        let first = remote.get("users/u1").unwrap();

        let again = run(&mut remote, &device, "u1");
        assert!(again.root_copied.is_empty() && again.local_copied.is_empty());
        assert_eq!(remote.get("users/u1").unwrap(), first);

        // Even with the flags cleared nothing is duplicated or overwritten.
        device.remove(&root_flag_key("u1")).unwrap();
        device.remove(&local_flag_key("u1")).unwrap();
        let cleared = run(&mut remote, &device, "u1");
        assert!(cleared.root_copied.is_empty());
        assert_eq!(cleared.local_skipped, vec!["vehicles"]);
        assert_eq!(remote.get("users/u1").unwrap(), first);
    }
}
