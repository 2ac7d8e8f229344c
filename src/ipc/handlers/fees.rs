use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_patch, get_required_str, parse_record, require_confirm, with_view,
    written, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::FeesRecord;
use crate::repo::Repository;
use crate::session::{FeesGate, GateFailure, View};
use serde_json::json;

fn gate_failure(id: &str, failure: GateFailure) -> serde_json::Value {
    match failure {
        GateFailure::Rejected(e) => err(id, "fees_gate_rejected", e.to_string(), None),
        GateFailure::Storage(e) => HandlerErr::from(e).response(id),
    }
}

fn str_param(req: &Request, key: &str) -> String {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn handle_gate_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(device) = state.device.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({
            "configured": FeesGate::new(device).is_configured(),
            "unlocked": state.fees_unlocked,
        }),
    )
}

fn handle_gate_setup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(device) = state.device.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let res = FeesGate::new(device).setup(
        &str_param(req, "username"),
        &str_param(req, "password"),
        &str_param(req, "confirmPassword"),
        &str_param(req, "recoveryCode"),
    );
    match res {
        Ok(()) => {
            state.fees_unlocked = false;
            ok(&req.id, json!({ "message": "Account created. Please login." }))
        }
        Err(e) => gate_failure(&req.id, e),
    }
}

fn handle_gate_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(device) = state.device.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match FeesGate::new(device).login(&str_param(req, "username"), &str_param(req, "password")) {
        Ok(()) => {
            state.fees_unlocked = true;
            ok(&req.id, json!({ "unlocked": true }))
        }
        Err(e) => gate_failure(&req.id, e),
    }
}

fn handle_gate_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(device) = state.device.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let res = FeesGate::new(device).reset(
        &str_param(req, "recoveryCode"),
        &str_param(req, "username"),
        &str_param(req, "password"),
        &str_param(req, "confirmPassword"),
    );
    match res {
        Ok(()) => {
            state.fees_unlocked = false;
            ok(&req.id, json!({ "message": "Credentials reset. Please login." }))
        }
        Err(e) => gate_failure(&req.id, e),
    }
}

fn handle_gate_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.fees_unlocked = false;
    ok(&req.id, json!({ "unlocked": false }))
}

fn fees_list(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_optional_str(params, "date");
    let student_id = get_optional_str(params, "studentId");
    let mut fees: Vec<FeesRecord> = repo
        .list_fees()?
        .into_iter()
        .filter(|f| date.as_deref().map_or(true, |d| f.fee_date == d))
        .filter(|f| student_id.as_deref().map_or(true, |s| f.student_id == s))
        .collect();
    fees.sort_by(|a, b| b.fee_date.cmp(&a.fee_date).then_with(|| a.id.cmp(&b.id)));
    let collected: f64 = fees.iter().map(|f| f.paid_amount).sum();
    let billed: f64 = fees.iter().map(|f| f.total_amount).sum();
    Ok(json!({
        "fees": fees,
        "totalBilled": billed,
        "totalCollected": collected,
    }))
}

fn fees_create(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fee: FeesRecord = parse_record(params, "fee")?;
    let (fee, w) = repo.add_fee(fee)?;
    Ok(written(json!({ "fee": fee }), w))
}

fn fees_update(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let patch = get_patch(params)?;
    let (fee, w) = repo.update_fee(&id, patch)?;
    Ok(written(json!({ "fee": fee }), w))
}

fn fees_delete(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    require_confirm(params)?;
    let w = repo.delete_fee(&id)?;
    Ok(written(json!({ "id": id }), w))
}

fn gated<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&mut Repository<'_>, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    if state.session.is_some() && !state.fees_unlocked {
        return err(&req.id, "fees_locked", "unlock the fees gate first", None);
    }
    with_view(state, req, View::Fees, f)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "feesGate.status" => Some(handle_gate_status(state, req)),
        "feesGate.setup" => Some(handle_gate_setup(state, req)),
        "feesGate.login" => Some(handle_gate_login(state, req)),
        "feesGate.reset" => Some(handle_gate_reset(state, req)),
        "feesGate.logout" => Some(handle_gate_logout(state, req)),
        "fees.list" => Some(gated(state, req, fees_list)),
        "fees.create" => Some(gated(state, req, fees_create)),
        "fees.update" => Some(gated(state, req, fees_update)),
        "fees.delete" => Some(gated(state, req, fees_delete)),
        _ => None,
    }
}
