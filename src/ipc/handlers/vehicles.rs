use crate::ipc::helpers::{
    get_optional_str, get_patch, get_required_f64, get_required_str, parse_record,
    require_confirm, with_repo, with_view, written, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{parse_date, today_string, OilLog, VehicleDocument, VehicleRecord};
use crate::report::{document_alerts, expired_documents};
use crate::repo::Repository;
use serde_json::json;

fn today_param(params: &serde_json::Value) -> Result<chrono::NaiveDate, HandlerErr> {
    let raw = get_optional_str(params, "today").unwrap_or_else(today_string);
    parse_date(&raw).ok_or_else(|| HandlerErr::bad_params("today must be YYYY-MM-DD"))
}

fn vehicles_list(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = today_param(params)?;
    let mut vehicles = repo.list_vehicles()?;
    vehicles.sort_by(|a, b| a.bus_number.cmp(&b.bus_number));
    let rows: Vec<serde_json::Value> = vehicles
        .iter()
        .map(|v| json!({ "vehicle": v, "expired": expired_documents(v, today) }))
        .collect();
    Ok(json!({ "vehicles": rows }))
}

fn vehicles_create(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let vehicle: VehicleRecord = parse_record(params, "vehicle")?;
    let (vehicle, w) = repo.add_vehicle(vehicle)?;
    Ok(written(json!({ "vehicle": vehicle }), w))
}

fn vehicles_update(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let patch = get_patch(params)?;
    let (vehicle, w) = repo.update_vehicle(&id, patch)?;
    Ok(written(json!({ "vehicle": vehicle }), w))
}

fn vehicles_delete(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    require_confirm(params)?;
    let w = repo.delete_vehicle(&id)?;
    Ok(written(json!({ "id": id }), w))
}

fn vehicles_set_document(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let raw = get_required_str(params, "document")?;
    let Some(document) = VehicleDocument::parse(&raw) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown document: {}", raw),
            details: Some(json!({
                "allowed": VehicleDocument::ALL.iter().map(|d| d.slug()).collect::<Vec<_>>()
            })),
        });
    };
    let issue = get_optional_str(params, "issueDate").unwrap_or_default();
    let due = get_optional_str(params, "dueDate").unwrap_or_default();
    let (vehicle, w) = repo.set_vehicle_document(&id, document, &issue, &due)?;
    Ok(written(json!({ "vehicle": vehicle }), w))
}

fn vehicles_log_oil(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let raw = get_required_str(params, "oil")?;
    let Some(oil) = OilLog::parse(&raw) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown oil log: {}", raw),
            details: Some(json!({
                "allowed": OilLog::ALL.iter().map(|o| o.slug()).collect::<Vec<_>>()
            })),
        });
    };
    let km = get_required_f64(params, "km")?;
    let date = get_optional_str(params, "date").unwrap_or_else(today_string);
    let (vehicle, w) = repo.log_oil(&id, oil, km, &date)?;
    Ok(written(json!({ "vehicle": vehicle }), w))
}

fn handle_vehicles_alerts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let window = state.config.alert_window_days;
    with_repo(state, req, |repo, params| {
        let today = today_param(params)?;
        let vehicles = repo.list_vehicles()?;
        Ok(json!({
            "windowDays": window,
            "alerts": document_alerts(&vehicles, today, window),
        }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    use crate::session::View::Maintenance;
    match req.method.as_str() {
        "vehicles.list" => Some(with_repo(state, req, vehicles_list)),
        "vehicles.alerts" => Some(handle_vehicles_alerts(state, req)),
        "vehicles.create" => Some(with_view(state, req, Maintenance, vehicles_create)),
        "vehicles.update" => Some(with_view(state, req, Maintenance, vehicles_update)),
        "vehicles.delete" => Some(with_view(state, req, Maintenance, vehicles_delete)),
        "vehicles.setDocument" => Some(with_view(state, req, Maintenance, vehicles_set_document)),
        "vehicles.logOil" => Some(with_view(state, req, Maintenance, vehicles_log_oil)),
        _ => None,
    }
}
