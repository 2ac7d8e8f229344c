use crate::ipc::helpers::{
    get_patch, get_required_str, parse_record, require_confirm, with_repo, written, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::repo::Repository;
use serde_json::json;

fn students_list(repo: &mut Repository<'_>) -> Result<serde_json::Value, HandlerErr> {
    let mut students = repo.list_students()?;
    students.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(json!({ "students": students }))
}

fn students_create(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student: Student = parse_record(params, "student")?;
    let (student, w) = repo.add_student(student)?;
    Ok(written(json!({ "student": student }), w))
}

fn students_update(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let patch = get_patch(params)?;
    let (student, w) = repo.update_student(&id, patch)?;
    Ok(written(json!({ "student": student }), w))
}

fn students_delete(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    require_confirm(params)?;
    let (removed, w) = repo.delete_student(&id)?;
    Ok(written(json!({ "id": id, "removed": removed }), w))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_repo(state, req, |repo, _| students_list(repo))),
        "students.create" => Some(with_repo(state, req, students_create)),
        "students.update" => Some(with_repo(state, req, students_update)),
        "students.delete" => Some(with_repo(state, req, students_delete)),
        _ => None,
    }
}
