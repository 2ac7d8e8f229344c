use crate::config::Config;
use crate::db::DeviceStorage;
use serde::{Deserialize, Serialize};

pub const SESSION_KEY: &str = "ctms_session";
pub const FEES_AUTH_KEY: &str = "ctms_fees_auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Students,
    Attendance,
    Fees,
    Maintenance,
    DailyLog,
    Destinations,
    Attention,
}

impl View {
    pub fn parse(raw: &str) -> Option<View> {
        Some(match raw.trim().to_ascii_uppercase().as_str() {
            "DASHBOARD" => View::Dashboard,
            "STUDENTS" => View::Students,
            "ATTENDANCE" => View::Attendance,
            "FEES" => View::Fees,
            "MAINTENANCE" => View::Maintenance,
            "DAILY_LOG" | "DAILYLOG" => View::DailyLog,
            "DESTINATIONS" => View::Destinations,
            "ATTENTION" => View::Attention,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn new(uid: &str, email: &str, config: &Config) -> Self {
        let role = if config.is_admin(email) {
            Role::Admin
        } else {
            Role::Staff
        };
        Self {
            uid: uid.trim().to_string(),
            email: email.trim().to_string(),
            role,
        }
    }

    /// Staff get every view except vehicle maintenance and the daily log.
    pub fn can_access(&self, view: View) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Staff => !matches!(view, View::Maintenance | View::DailyLog),
        }
    }

    /// Stored session with the role re-derived against the current allow-list.
    pub fn restore(device: &DeviceStorage, config: &Config) -> Option<Session> {
        let saved = device.get_json::<Session>(SESSION_KEY)?;
        if saved.uid.is_empty() {
            return None;
        }
        Some(Session::new(&saved.uid, &saved.email, config))
    }

    pub fn persist(&self, device: &DeviceStorage) -> anyhow::Result<()> {
        device.set_json(SESSION_KEY, self)
    }

    pub fn forget(device: &DeviceStorage) -> anyhow::Result<()> {
        device.remove(SESSION_KEY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GateCredentials {
    username: String,
    password: String,
    recovery_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateError(pub &'static str);

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for GateError {}

pub enum GateFailure {
    Rejected(GateError),
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for GateFailure {
    fn from(e: anyhow::Error) -> Self {
        GateFailure::Storage(e)
    }
}

fn rejected(msg: &'static str) -> GateFailure {
    GateFailure::Rejected(GateError(msg))
}

/// Local username/password gate in front of the fees screens. Credentials
/// live on the device; whether the gate is open is session state.
pub struct FeesGate<'a> {
    device: &'a DeviceStorage,
}

impl<'a> FeesGate<'a> {
    pub fn new(device: &'a DeviceStorage) -> Self {
        Self { device }
    }

    fn saved(&self) -> Option<GateCredentials> {
        self.device.get_json(FEES_AUTH_KEY)
    }

    pub fn is_configured(&self) -> bool {
        self.saved().is_some()
    }

    pub fn setup(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
        recovery_code: &str,
    ) -> Result<(), GateFailure> {
        if username.trim().is_empty() || password.is_empty() || recovery_code.trim().is_empty() {
            return Err(rejected("All fields are required."));
        }
        if password != confirm {
            return Err(rejected("Password and confirm password do not match."));
        }
        let creds = GateCredentials {
            username: username.trim().to_string(),
            password: password.to_string(),
            recovery_code: recovery_code.trim().to_string(),
        };
        self.device.set_json(FEES_AUTH_KEY, &creds)?;
        log::info!("fees gate credentials created");
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(), GateFailure> {
        let saved = self
            .saved()
            .ok_or_else(|| rejected("No account found. Please create one first."))?;
        if saved.username == username && saved.password == password {
            Ok(())
        } else {
            Err(rejected("Invalid username or password."))
        }
    }

    /// Replaces username and password; the recovery code is kept.
    pub fn reset(
        &self,
        recovery_code: &str,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<(), GateFailure> {
        let saved = self
            .saved()
            .ok_or_else(|| rejected("No account found. Please create one first."))?;
        if saved.recovery_code != recovery_code.trim() {
            return Err(rejected("Invalid recovery code."));
        }
        if username.trim().is_empty() || password.is_empty() {
            return Err(rejected("New username and password are required."));
        }
        if password != confirm {
            return Err(rejected("Password and confirm password do not match."));
        }
        let updated = GateCredentials {
            username: username.trim().to_string(),
            password: password.to_string(),
            recovery_code: saved.recovery_code,
        };
        self.device.set_json(FEES_AUTH_KEY, &updated)?;
        log::info!("fees gate credentials reset");
        Ok(())
    }
}
