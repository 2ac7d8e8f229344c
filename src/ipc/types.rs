use std::path::PathBuf;

use serde::Deserialize;

use crate::config::Config;
use crate::db::DeviceStorage;
use crate::session::Session;
use crate::store::SqliteRemote;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub device: Option<DeviceStorage>,
    pub remote: Option<SqliteRemote>,
    pub session: Option<Session>,
    /// Fees gate state; never persisted.
    pub fees_unlocked: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            device: None,
            remote: None,
            session: None,
            fees_unlocked: false,
        }
    }
}
