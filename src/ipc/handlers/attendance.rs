use crate::ipc::helpers::{
    get_optional_str, get_required_str, parse_enum, require_confirm, with_repo, written,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::repo::Repository;
use serde_json::json;
use std::collections::BTreeMap;

fn attendance_list(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_optional_str(params, "date");
    let mut rows = repo.list_attendance(date.as_deref())?;
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.student_id.cmp(&b.student_id)));
    Ok(json!({ "attendance": rows }))
}

fn attendance_mark(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_str(params, "date")?;
    let status: AttendanceStatus = parse_enum(params, "status")?;
    let (record, w) = repo.mark_attendance(&student_id, &date, status)?;
    Ok(written(json!({ "record": record }), w))
}

/// `statuses` maps student id to `Present`/`Absent` for one date.
fn attendance_save_batch(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_str(params, "date")?;
    let Some(raw) = params.get("statuses").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing statuses"));
    };
    let mut statuses = BTreeMap::new();
    for (student_id, value) in raw {
        let status: AttendanceStatus =
            serde_json::from_value(value.clone()).map_err(|_| HandlerErr {
                code: "bad_params",
                message: format!("invalid status for {}", student_id),
                details: Some(json!({ "value": value })),
            })?;
        statuses.insert(student_id.clone(), status);
    }
    let (summary, w) = repo.save_attendance_batch(&date, &statuses)?;
    Ok(written(json!({ "date": date, "summary": summary }), w))
}

fn attendance_delete(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    require_confirm(params)?;
    let w = repo.delete_attendance(&id)?;
    Ok(written(json!({ "id": id }), w))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(with_repo(state, req, attendance_list)),
        "attendance.mark" => Some(with_repo(state, req, attendance_mark)),
        "attendance.saveBatch" => Some(with_repo(state, req, attendance_save_batch)),
        "attendance.delete" => Some(with_repo(state, req, attendance_delete)),
        _ => None,
    }
}
