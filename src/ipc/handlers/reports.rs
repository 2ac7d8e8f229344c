use crate::export;
use crate::ipc::helpers::{get_optional_str, get_required_str, with_repo, with_view, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{parse_date, today_string};
use crate::report;
use crate::session::View;
use serde_json::json;
use std::path::PathBuf;

fn handle_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let window = state.config.alert_window_days;
    with_repo(state, req, |repo, params| {
        let raw = get_optional_str(params, "today").unwrap_or_else(today_string);
        let today =
            parse_date(&raw).ok_or_else(|| HandlerErr::bad_params("today must be YYYY-MM-DD"))?;
        let students = repo.list_students()?;
        let fees = repo.list_fees()?;
        let vehicles = repo.list_vehicles()?;
        let dashboard = report::dashboard(&students, &fees, &vehicles, today, window);
        Ok(json!({ "dashboard": dashboard }))
    })
}

fn handle_daily_log(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_view(state, req, View::DailyLog, |repo, params| {
        let date = get_required_str(params, "date")?;
        let log = repo.daily_log(&date)?;
        let collected: f64 = log.fees.iter().map(|f| f.paid_amount).sum();
        Ok(json!({ "log": log, "collected": collected }))
    })
}

fn handle_export_daily_log(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_view(state, req, View::DailyLog, |repo, params| {
        let date = get_required_str(params, "date")?;
        let out_dir = PathBuf::from(get_required_str(params, "outDir")?);
        let log = repo.daily_log(&date)?;
        let students = repo.list_students()?;
        let files = export::export_daily_log(&log, &students, &out_dir).map_err(|e| HandlerErr {
            code: "export_failed",
            message: format!("{:#}", e),
            details: Some(json!({ "outDir": out_dir.to_string_lossy() })),
        })?;
        Ok(json!({
            "files": files.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>(),
            "rows": {
                "fees": log.fees.len(),
                "attendance": log.attendance.len(),
                "vehicles": log.vehicles.len(),
            }
        }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.dashboard" => Some(handle_dashboard(state, req)),
        "reports.dailyLog" => Some(handle_daily_log(state, req)),
        "reports.exportDailyLog" => Some(handle_export_daily_log(state, req)),
        _ => None,
    }
}
