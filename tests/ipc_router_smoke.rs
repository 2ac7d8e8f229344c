mod test_support;

use serde_json::json;
use test_support::{request, spawn_sidecar_with_env, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("transportd-router-smoke");
    let out_dir = workspace.join("exports");
    let (mut child, mut stdin, mut reader) =
        spawn_sidecar_with_env(&[("TRANSPORTD_ADMIN_EMAILS", "admin@college.edu")]);

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("health", json!({})),
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("session.signIn", json!({ "uid": "u1", "email": "admin@college.edu" })),
        ("session.get", json!({})),
        ("session.canAccess", json!({ "view": "MAINTENANCE" })),
        ("sync.status", json!({})),
        ("sync.flush", json!({})),
        ("students.list", json!({})),
        ("students.create", json!({ "name": "A", "registrationNumber": "R1", "seriesNumber": "S1" })),
        ("students.update", json!({ "id": "missing", "patch": { "name": "B" } })),
        ("students.delete", json!({ "id": "missing" })),
        ("destinations.list", json!({ "filter": "All" })),
        ("destinations.assign", json!({ "studentId": "s1", "distance": 4 })),
        ("destinations.suggestedFee", json!({ "studentId": "s1" })),
        ("destinations.unassign", json!({ "studentId": "s1", "confirm": true })),
        ("attendance.list", json!({})),
        ("attendance.mark", json!({ "studentId": "s1", "date": "2024-06-01", "status": "Present" })),
        ("attendance.saveBatch", json!({ "date": "2024-06-01", "statuses": {} })),
        ("attendance.delete", json!({ "id": "missing", "confirm": true })),
        ("feesGate.status", json!({})),
        ("feesGate.setup", json!({})),
        ("feesGate.login", json!({})),
        ("feesGate.reset", json!({})),
        ("feesGate.logout", json!({})),
        ("fees.list", json!({})),
        ("fees.create", json!({})),
        ("fees.update", json!({})),
        ("fees.delete", json!({})),
        ("vehicles.list", json!({})),
        ("vehicles.create", json!({ "busNumber": "TN-1" })),
        ("vehicles.update", json!({ "id": "missing", "patch": {} })),
        ("vehicles.setDocument", json!({ "id": "missing", "document": "fc" })),
        ("vehicles.logOil", json!({ "id": "missing", "oil": "engineOil", "km": 10 })),
        ("vehicles.alerts", json!({})),
        ("vehicles.delete", json!({ "id": "missing" })),
        ("attention.list", json!({})),
        ("attention.create", json!({ "title": "Hello" })),
        ("attention.update", json!({ "id": "missing", "patch": {} })),
        ("attention.delete", json!({ "id": "missing" })),
        ("reports.dashboard", json!({})),
        ("reports.dailyLog", json!({ "date": "2024-06-01" })),
        ("reports.exportDailyLog", json!({ "date": "2024-06-01", "outDir": out_dir.to_string_lossy() })),
        ("network.setOnline", json!({ "online": false })),
        ("network.setOnline", json!({ "online": true })),
        ("session.signOut", json!({})),
    ];

    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = (i + 1).to_string();
        let value = request(&mut stdin, &mut reader, &id, method, params);
        if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let code = value
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
        }
    }

    let unknown = request(&mut stdin, &mut reader, "x", "students.explode", json!({}));
    assert_eq!(
        unknown
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
