use std::env;
use std::path::{Path, PathBuf};

pub const REMOTE_DB_FILE: &str = "remote.sqlite3";
pub const DEFAULT_ALERT_WINDOW_DAYS: i64 = 30;

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_email_list(name: &str) -> Vec<String> {
    parse_email_list(&env::var(name).unwrap_or_default())
}

pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_emails: Vec<String>,
    pub remote_db: Option<PathBuf>,
    pub alert_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            remote_db: None,
            alert_window_days: DEFAULT_ALERT_WINDOW_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let window = env_u64(
            "TRANSPORTD_ALERT_WINDOW_DAYS",
            DEFAULT_ALERT_WINDOW_DAYS as u64,
        );
        Self {
            admin_emails: env_email_list("TRANSPORTD_ADMIN_EMAILS"),
            remote_db: env_path("TRANSPORTD_REMOTE_DB"),
            alert_window_days: i64::try_from(window).unwrap_or(DEFAULT_ALERT_WINDOW_DAYS),
        }
    }

    /// Request override, then `TRANSPORTD_REMOTE_DB`, then the workspace default.
    pub fn remote_path(&self, workspace: &Path, requested: Option<&str>) -> PathBuf {
        if let Some(p) = requested.map(str::trim).filter(|p| !p.is_empty()) {
            return PathBuf::from(p);
        }
        self.remote_db
            .clone()
            .unwrap_or_else(|| workspace.join(REMOTE_DB_FILE))
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.admin_emails.iter().any(|a| *a == email)
    }
}
