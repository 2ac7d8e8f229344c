use crate::ipc::helpers::{
    get_patch, get_required_str, parse_record, require_confirm, with_repo, written, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttentionMessage, Priority};
use crate::repo::Repository;
use serde_json::json;

fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

/// Newest first, high priority first within a day.
fn attention_list(repo: &mut Repository<'_>) -> Result<serde_json::Value, HandlerErr> {
    let mut messages = repo.list_attention()?;
    messages.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| priority_rank(a.priority).cmp(&priority_rank(b.priority)))
    });
    Ok(json!({ "messages": messages }))
}

fn attention_create(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let message: AttentionMessage = parse_record(params, "attention")?;
    let (message, w) = repo.add_attention(message)?;
    Ok(written(json!({ "message": message }), w))
}

fn attention_update(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let patch = get_patch(params)?;
    let (message, w) = repo.update_attention(&id, patch)?;
    Ok(written(json!({ "message": message }), w))
}

fn attention_delete(
    repo: &mut Repository<'_>,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    require_confirm(params)?;
    let w = repo.delete_attention(&id)?;
    Ok(written(json!({ "id": id }), w))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attention.list" => Some(with_repo(state, req, |repo, _| attention_list(repo))),
        "attention.create" => Some(with_repo(state, req, attention_create)),
        "attention.update" => Some(with_repo(state, req, attention_update)),
        "attention.delete" => Some(with_repo(state, req, attention_delete)),
        _ => None,
    }
}
