use crate::ipc::helpers::{
    get_optional_str, get_required_str, parse_record, require_confirm, with_repo, written,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::DestinationRecord;
use crate::report::{destination_overview, DestinationFilter};
use crate::repo::Repository;
use serde_json::json;

fn destinations_list(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_optional_str(params, "filter").unwrap_or_default();
    let Some(filter) = DestinationFilter::parse(&raw) else {
        return Err(HandlerErr::bad_params(format!(
            "filter must be All, Assigned or Pending, got {}",
            raw
        )));
    };
    let search = get_optional_str(params, "search").unwrap_or_default();
    let students = repo.list_students()?;
    let destinations = repo.list_destinations()?;
    let rows = destination_overview(&students, &destinations, filter, &search);
    let assigned = rows.iter().filter(|r| r.assigned).count();
    Ok(json!({
        "rows": rows,
        "assignedCount": assigned,
        "pendingCount": rows.len() - assigned,
    }))
}

fn destinations_assign(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let record: DestinationRecord = parse_record(params, "destination")?;
    let w = repo.assign_destination(record.clone())?;
    Ok(written(json!({ "destination": record }), w))
}

fn destinations_unassign(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    require_confirm(params)?;
    let w = repo.unassign_destination(&student_id)?;
    Ok(written(json!({ "studentId": student_id }), w))
}

fn destinations_suggested_fee(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let fee = repo.suggested_transport_fee(&student_id)?;
    Ok(json!({ "studentId": student_id, "suggestedFee": fee }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "destinations.list" => Some(with_repo(state, req, destinations_list)),
        "destinations.assign" => Some(with_repo(state, req, destinations_assign)),
        "destinations.unassign" => Some(with_repo(state, req, destinations_unassign)),
        "destinations.suggestedFee" => Some(with_repo(state, req, destinations_suggested_fee)),
        _ => None,
    }
}
