use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::{RepoError, Repository, Written};
use crate::session::View;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RepoError> for HandlerErr {
    fn from(e: RepoError) -> Self {
        HandlerErr::new(e.code(), e.to_string())
    }
}

impl From<anyhow::Error> for HandlerErr {
    fn from(e: anyhow::Error) -> Self {
        HandlerErr::new("device_storage_failed", format!("{:#}", e))
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_patch(params: &Value) -> Result<Map<String, Value>, HandlerErr> {
    params
        .get("patch")
        .and_then(|v| v.as_object())
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))
}

/// Decodes a record from `params[key]`, or from the params object itself.
pub fn parse_record<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let raw = params.get(key).unwrap_or(params);
    if !raw.is_object() {
        return Err(HandlerErr::bad_params(format!("{} must be an object", key)));
    }
    serde_json::from_value(raw.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid {}: {}", key, e),
        details: None,
    })
}

pub fn parse_enum<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let raw = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    serde_json::from_value(raw.clone()).map_err(|_| HandlerErr {
        code: "bad_params",
        message: format!("invalid {}", key),
        details: Some(json!({ "value": raw })),
    })
}

/// Deletes are destructive; callers must pass `confirm: true`.
pub fn require_confirm(params: &Value) -> Result<(), HandlerErr> {
    if params.get("confirm").and_then(|v| v.as_bool()) == Some(true) {
        Ok(())
    } else {
        Err(HandlerErr::new(
            "confirmation_required",
            "pass confirm: true to delete",
        ))
    }
}

pub fn written(result: Value, written: Written) -> Value {
    let mut out = match result {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    out.insert("pending".to_string(), json!(written.is_pending()));
    Value::Object(out)
}

pub fn require_view(state: &AppState, view: View) -> Result<(), HandlerErr> {
    let Some(session) = state.session.as_ref() else {
        return Err(HandlerErr::new("no_session", "sign in first"));
    };
    if session.can_access(view) {
        Ok(())
    } else {
        Err(HandlerErr {
            code: "forbidden",
            message: "this account cannot access that view".to_string(),
            details: Some(json!({ "role": session.role })),
        })
    }
}

/// Runs `f` against a repository for the signed-in account.
pub fn with_repo<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&mut Repository<'_>, &Value) -> Result<Value, HandlerErr>,
{
    let (Some(device), Some(remote)) = (state.device.as_ref(), state.remote.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let uid = state.session.as_ref().map(|s| s.uid.as_str());
    let mut repo = match Repository::new(remote, device, uid) {
        Ok(repo) => repo,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    match f(&mut repo, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

/// [`with_repo`] behind a view access check.
pub fn with_view<F>(state: &mut AppState, req: &Request, view: View, f: F) -> Value
where
    F: FnOnce(&mut Repository<'_>, &Value) -> Result<Value, HandlerErr>,
{
    if state.device.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    if let Err(e) = require_view(state, view) {
        return e.response(&req.id);
    }
    with_repo(state, req, f)
}
