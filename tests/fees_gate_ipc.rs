mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_and_sign_in, spawn_sidecar, temp_dir};

#[test]
fn fees_methods_require_an_unlocked_gate() {
    let workspace = temp_dir("transportd-fees-gate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_and_sign_in(&mut stdin, &mut reader, &workspace, "u1", "");

    let status = request_ok(&mut stdin, &mut reader, "1", "feesGate.status", json!({}));
    assert_eq!(status["configured"], json!(false));
    assert_eq!(status["unlocked"], json!(false));

    assert_eq!(
        request_err(&mut stdin, &mut reader, "2", "fees.list", json!({})),
        "fees_locked"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "feesGate.setup",
            json!({ "username": "clerk", "password": "a", "confirmPassword": "b", "recoveryCode": "r" })
        ),
        "fees_gate_rejected"
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "feesGate.setup",
        json!({ "username": "clerk", "password": "pw", "confirmPassword": "pw", "recoveryCode": "r" }),
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "5",
            "feesGate.login",
            json!({ "username": "clerk", "password": "bad" })
        ),
        "fees_gate_rejected"
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "feesGate.login",
        json!({ "username": "clerk", "password": "pw" }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "fees.create",
        json!({ "fee": { "studentId": "s1", "totalAmount": 3000, "paidAmount": 1000, "feeDate": "2024-06-01", "status": "Paid" } }),
    );
    assert_eq!(created["fee"]["status"], json!("Partially Paid"));
    let fee_id = created["fee"]["id"].as_str().expect("fee id").to_string();

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "8",
            "fees.create",
            json!({ "fee": { "studentId": "s1", "totalAmount": 10, "feeDate": "2024-06-01" } })
        ),
        "validation_failed"
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "fees.update",
        json!({ "id": fee_id, "patch": { "paidAmount": 3000 } }),
    );
    assert_eq!(updated["fee"]["status"], json!("Paid"));

    let _ = request_ok(&mut stdin, &mut reader, "10", "feesGate.logout", json!({}));
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "11",
            "fees.delete",
            json!({ "id": fee_id, "confirm": true })
        ),
        "fees_locked"
    );

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "12",
            "feesGate.reset",
            json!({ "recoveryCode": "wrong", "username": "new", "password": "p2", "confirmPassword": "p2" })
        ),
        "fees_gate_rejected"
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "feesGate.reset",
        json!({ "recoveryCode": "r", "username": "new", "password": "p2", "confirmPassword": "p2" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "feesGate.login",
        json!({ "username": "new", "password": "p2" }),
    );
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "fees.delete",
        json!({ "id": fee_id, "confirm": true }),
    );
    assert_eq!(deleted["pending"], json!(false));
    let listed = request_ok(&mut stdin, &mut reader, "16", "fees.list", json!({}));
    assert_eq!(listed["fees"], json!([]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
