use crate::db::DeviceStorage;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, get_optional_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::migration;
use crate::queue::WriteQueue;
use crate::repo::Repository;
use crate::session::{Session, View};
use crate::store::SqliteRemote;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "signedIn": state.session.is_some(),
        }),
    )
}

/// Authenticates the store, migrates, seeds empty collections and replays
/// queued writes. Only the flush can fail the call.
fn start_session(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (Some(device), Some(remote), Some(session)) = (
        state.device.as_ref(),
        state.remote.as_mut(),
        state.session.as_ref(),
    ) else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    remote.set_auth(Some(session.uid.clone()));
    log::info!("session started for {} as {:?}", session.uid, session.role);

    let migration = migration::run(&mut *remote, device, &session.uid);

    match Repository::new(&mut *remote, device, Some(session.uid.as_str())) {
        Ok(mut repo) => match repo.ensure_collections() {
            Ok(created) if created > 0 => log::info!("created {} empty collections", created),
            Ok(_) => {}
            Err(e) => log::warn!("could not seed collections: {}", e),
        },
        Err(e) => log::warn!("could not seed collections: {}", e),
    }

    let flush = WriteQueue::new(device, &session.uid).flush(remote)?;
    Ok(json!({
        "session": session,
        "migration": migration,
        "flush": flush,
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let device = match DeviceStorage::open(&path) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "db_open_failed", format!("{:#}", e), None),
    };
    let remote_path = state
        .config
        .remote_path(&path, get_optional_str(&req.params, "remotePath").as_deref());
    log::info!(
        "workspace {} with remote store {}",
        path.to_string_lossy(),
        remote_path.to_string_lossy()
    );

    let session = Session::restore(&device, &state.config);
    state.workspace = Some(path.clone());
    state.device = Some(device);
    state.remote = Some(SqliteRemote::open(remote_path.clone()));
    state.session = session;
    state.fees_unlocked = false;

    let started = if state.session.is_some() {
        match start_session(state) {
            Ok(v) => v,
            Err(e) => return e.response(&req.id),
        }
    } else {
        serde_json::Value::Null
    };

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "remotePath": remote_path.to_string_lossy(),
            "session": state.session,
            "started": started,
        }),
    )
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.device.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let uid = match get_required_str(&req.params, "uid") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if uid.trim().is_empty() || uid.contains('/') {
        return err(&req.id, "bad_params", "uid must be a non-empty path segment", None);
    }
    let email = get_optional_str(&req.params, "email").unwrap_or_default();
    let session = Session::new(&uid, &email, &state.config);

    if let Some(device) = state.device.as_ref() {
        if let Err(e) = session.persist(device) {
            log::warn!("failed to persist session: {:#}", e);
        }
    }
    state.session = Some(session);
    state.fees_unlocked = false;

    match start_session(state) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(device) = state.device.as_ref() {
        if let Err(e) = Session::forget(device) {
            return HandlerErr::from(e).response(&req.id);
        }
    }
    if let Some(remote) = state.remote.as_mut() {
        remote.set_auth(None);
    }
    if let Some(session) = state.session.take() {
        log::info!("signed out {}", session.uid);
    }
    state.fees_unlocked = false;
    ok(&req.id, json!({ "signedOut": true }))
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session }))
}

fn handle_can_access(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = match get_required_str(&req.params, "view") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(view) = View::parse(&raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown view: {}", raw),
            None,
        );
    };
    let allowed = state
        .session
        .as_ref()
        .map(|s| s.can_access(view))
        .unwrap_or(false);
    ok(&req.id, json!({ "view": raw, "allowed": allowed }))
}

fn flush_queue(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (Some(device), Some(remote)) = (state.device.as_ref(), state.remote.as_mut()) else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let Some(session) = state.session.as_ref() else {
        return Err(HandlerErr::new("no_session", "sign in first"));
    };
    let report = WriteQueue::new(device, &session.uid).flush(remote)?;
    Ok(serde_json::to_value(report).unwrap_or(serde_json::Value::Null))
}

fn handle_set_online(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(online) = req.params.get("online").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing online", None);
    };
    let Some(remote) = state.remote.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    remote.set_reachable(online);
    log::info!("network {}", if online { "online" } else { "offline" });

    let flush = if online && state.session.is_some() {
        match flush_queue(state) {
            Ok(v) => v,
            Err(e) => return e.response(&req.id),
        }
    } else {
        serde_json::Value::Null
    };
    ok(&req.id, json!({ "online": online, "flush": flush }))
}

fn handle_sync_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(device), Some(remote)) = (state.device.as_ref(), state.remote.as_ref()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    // Queues are per account; nothing is pending without a session.
    let pending = state
        .session
        .as_ref()
        .map(|s| WriteQueue::new(device, &s.uid).pending())
        .unwrap_or_default();
    ok(
        &req.id,
        json!({
            "online": remote.is_reachable(),
            "pendingWrites": pending.len(),
            "nextWrite": pending.first().map(|op| json!({ "op": op.kind(), "path": op.path() })),
            "remotePath": remote.location_label(),
            "signedIn": state.session.is_some(),
        }),
    )
}

fn handle_sync_flush(state: &mut AppState, req: &Request) -> serde_json::Value {
    match flush_queue(state) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "session.signIn" => Some(handle_sign_in(state, req)),
        "session.signOut" => Some(handle_sign_out(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "session.canAccess" => Some(handle_can_access(state, req)),
        "network.setOnline" => Some(handle_set_online(state, req)),
        "sync.status" => Some(handle_sync_status(state, req)),
        "sync.flush" => Some(handle_sync_flush(state, req)),
        _ => None,
    }
}
