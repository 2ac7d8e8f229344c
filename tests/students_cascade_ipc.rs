mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_and_sign_in, spawn_sidecar, temp_dir};

#[test]
fn deleting_a_student_removes_their_destination_fees_and_attendance() {
    let workspace = temp_dir("transportd-students-cascade");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_and_sign_in(&mut stdin, &mut reader, &workspace, "u1", "");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "g1",
        "feesGate.setup",
        json!({ "username": "clerk", "password": "pw", "confirmPassword": "pw", "recoveryCode": "1234" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "g2",
        "feesGate.login",
        json!({ "username": "clerk", "password": "pw" }),
    );

    let mut ids = Vec::new();
    for (i, name) in ["Asha", "Bala"].iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "name": name, "registrationNumber": format!("R{}", i), "seriesNumber": format!("S{}", i) }),
        );
        let id = created["student"]["id"].as_str().expect("id").to_string();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("d{}", i),
            "destinations.assign",
            json!({ "studentId": id, "pickupPoint": "Pollachi", "dropPoint": "Campus", "routeName": "R-1", "distance": 20 }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("f{}", i),
            "fees.create",
            json!({ "fee": { "studentId": id, "totalAmount": 3000, "paidAmount": 0, "feeType": "Transport", "feeDate": "2024-06-01", "dueDate": "2024-06-30" } }),
        );
        ids.push(id);
    }
    let mut statuses = serde_json::Map::new();
    for id in &ids {
        statuses.insert(id.clone(), json!("Present"));
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "a1",
        "attendance.saveBatch",
        json!({ "date": "2024-06-01", "statuses": statuses }),
    );

    let suggested = request_ok(
        &mut stdin,
        &mut reader,
        "sf",
        "destinations.suggestedFee",
        json!({ "studentId": ids[0] }),
    );
    assert_eq!(suggested["suggestedFee"], json!(3000.0));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "del0",
        "students.delete",
        json!({ "id": ids[0] }),
    );
    assert_eq!(code, "confirmation_required");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "del1",
        "students.delete",
        json!({ "id": ids[0], "confirm": true }),
    );
    assert_eq!(deleted["pending"], json!(false));
    assert_eq!(deleted["removed"]["fees"], json!(1));
    assert_eq!(deleted["removed"]["attendance"], json!(1));
    assert_eq!(deleted["removed"]["destination"], json!(true));

    let students = request_ok(&mut stdin, &mut reader, "l1", "students.list", json!({}));
    assert_eq!(students["students"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(students["students"][0]["id"], json!(ids[1]));

    let fees = request_ok(&mut stdin, &mut reader, "l2", "fees.list", json!({}));
    let fees = fees["fees"].as_array().expect("fees");
    assert_eq!(fees.len(), 1);
    assert_eq!(fees[0]["studentId"], json!(ids[1]));

    let attendance = request_ok(
        &mut stdin,
        &mut reader,
        "l3",
        "attendance.list",
        json!({ "date": "2024-06-01" }),
    );
    let rows = attendance["attendance"].as_array().expect("attendance");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["studentId"], json!(ids[1]));

    let overview = request_ok(
        &mut stdin,
        &mut reader,
        "l4",
        "destinations.list",
        json!({ "filter": "Assigned" }),
    );
    assert_eq!(overview["assignedCount"], json!(1));
    assert_eq!(overview["rows"][0]["student"]["id"], json!(ids[1]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn batch_attendance_replaces_the_day() {
    let workspace = temp_dir("transportd-attendance-batch");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_and_sign_in(&mut stdin, &mut reader, &workspace, "u1", "");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.saveBatch",
        json!({ "date": "2024-06-03", "statuses": { "s1": "Present", "s2": "Present", "s3": "Absent" } }),
    );
    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.saveBatch",
        json!({ "date": "2024-06-03", "statuses": { "s2": "Absent" } }),
    );
    assert_eq!(replaced["summary"]["replaced"], json!(3));
    assert_eq!(replaced["summary"]["written"], json!(1));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.list",
        json!({ "date": "2024-06-03" }),
    );
    let rows = listed["attendance"].as_array().expect("attendance");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["studentId"], json!("s2"));
    assert_eq!(rows[0]["status"], json!("Absent"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.saveBatch",
        json!({ "date": "03/06/2024", "statuses": {} }),
    );
    assert_eq!(code, "validation_failed");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
