use crate::cache::{records_from_snapshot, LocalCache};
use crate::db::DeviceStorage;
use crate::model::{
    self, AttendanceRecord, AttendanceStatus, AttentionMessage, Collection, DestinationRecord,
    FeesRecord, OilLog, PaymentStatus, Student, VehicleDocument, VehicleRecord,
};
use crate::queue::WriteQueue;
use crate::store::{PendingOp, RemoteStore, StoreError, PLACEHOLDER_KEY};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
pub enum RepoError {
    NotSignedIn,
    Validation(String),
    NotFound(String),
    Store(StoreError),
    Device(anyhow::Error),
}

impl RepoError {
    pub fn code(&self) -> &'static str {
        match self {
            RepoError::NotSignedIn => "no_session",
            RepoError::Validation(_) => "validation_failed",
            RepoError::NotFound(_) => "not_found",
            RepoError::Store(e) => e.code(),
            RepoError::Device(_) => "device_storage_failed",
        }
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::NotSignedIn => write!(f, "sign in first"),
            RepoError::Validation(msg) => write!(f, "{}", msg),
            RepoError::NotFound(msg) => write!(f, "{}", msg),
            RepoError::Store(e) => write!(f, "{}", e),
            RepoError::Device(e) => write!(f, "device storage: {:#}", e),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<StoreError> for RepoError {
    fn from(e: StoreError) -> Self {
        RepoError::Store(e)
    }
}

impl From<anyhow::Error> for RepoError {
    fn from(e: anyhow::Error) -> Self {
        RepoError::Device(e)
    }
}

/// Whether a mutation reached the store or is waiting in the write queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    Applied,
    Queued,
}

impl Written {
    pub fn is_pending(self) -> bool {
        self == Written::Queued
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub fees: usize,
    pub attendance: usize,
    pub destination: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub replaced: usize,
    pub written: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: String,
    pub fees: Vec<FeesRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub attendance: Vec<AttendanceRecord>,
}

pub fn new_key() -> String {
    Uuid::new_v4().to_string()
}

fn has_created_at(kind: Collection) -> bool {
    matches!(
        kind,
        Collection::Students | Collection::Fees | Collection::Vehicles
    )
}

/// Shallow merge: patch keys replace, `null` removes.
fn merge_patch(existing: Value, patch: &Map<String, Value>) -> Value {
    let mut obj = match existing {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    for (k, v) in patch {
        if v.is_null() {
            obj.remove(k);
        } else {
            obj.insert(k.clone(), v.clone());
        }
    }
    Value::Object(obj)
}

fn non_empty(s: &str) -> bool {
    !s.trim().is_empty()
}

fn require_date(field: &str, value: &str) -> Result<(), RepoError> {
    if model::is_date(value) {
        Ok(())
    } else {
        Err(RepoError::Validation(format!(
            "{} must be a YYYY-MM-DD date",
            field
        )))
    }
}

fn optional_date(field: &str, value: &str) -> Result<(), RepoError> {
    if value.trim().is_empty() {
        Ok(())
    } else {
        require_date(field, value)
    }
}

/// Typed CRUD over the signed-in account's namespace.
///
/// Reads prefer the remote store and refresh the local cache; when the store
/// is offline they are served from the cache. Writes that cannot reach the
/// store go to the write queue and are reported as [`Written::Queued`].
pub struct Repository<'a> {
    remote: &'a mut dyn RemoteStore,
    device: &'a DeviceStorage,
    uid: &'a str,
}

impl<'a> Repository<'a> {
    pub fn new(
        remote: &'a mut dyn RemoteStore,
        device: &'a DeviceStorage,
        uid: Option<&'a str>,
    ) -> Result<Self, RepoError> {
        let uid = uid.filter(|u| !u.is_empty()).ok_or(RepoError::NotSignedIn)?;
        Ok(Self {
            remote,
            device,
            uid,
        })
    }

    fn cache(&self) -> LocalCache<'a> {
        LocalCache::new(self.device, self.uid)
    }

    pub fn user_root(&self) -> String {
        format!("users/{}", self.uid)
    }

    pub fn collection_path(&self, kind: Collection) -> String {
        if kind.is_global() {
            kind.name().to_string()
        } else {
            format!("{}/{}", self.user_root(), kind.name())
        }
    }

    pub fn record_path(&self, kind: Collection, key: &str) -> String {
        format!("{}/{}", self.collection_path(kind), key)
    }

    fn commit(&mut self, op: PendingOp) -> Result<Written, RepoError> {
        let written = match self.remote.apply(&op) {
            Ok(()) => Written::Applied,
            Err(e) if e.is_offline() => {
                WriteQueue::new(self.device, self.uid).enqueue(op.clone())?;
                Written::Queued
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = self.cache().apply(&op) {
            log::warn!("cache update after {} {} failed: {:#}", op.kind(), op.path(), e);
        }
        Ok(written)
    }

    pub fn list_raw(&mut self, kind: Collection) -> Result<Vec<Value>, RepoError> {
        let path = self.collection_path(kind);
        match self.remote.get(&path) {
            Ok(snapshot) => {
                let records = records_from_snapshot(kind, snapshot);
                if let Err(e) = self.cache().write(kind, &records) {
                    log::warn!("failed to refresh {} cache: {:#}", kind.name(), e);
                }
                Ok(records)
            }
            Err(e) if e.is_offline() => {
                log::info!("{} offline, serving cached snapshot", kind.name());
                Ok(self.cache().read(kind))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn list<T: DeserializeOwned>(&mut self, kind: Collection) -> Result<Vec<T>, RepoError> {
        Ok(self
            .list_raw(kind)?
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<T>(raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("skipping malformed {} record: {}", kind.name(), e);
                    None
                }
            })
            .collect())
    }

    /// Keys of the records whose `field` equals `value`, matched on the raw
    /// JSON so rows outside the typed schema are included.
    fn keys_where(
        &mut self,
        kind: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, RepoError> {
        Ok(self
            .list_raw(kind)?
            .iter()
            .filter(|r| r.get(field).and_then(|v| v.as_str()) == Some(value))
            .filter_map(|r| r.get(kind.id_field()).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect())
    }

    fn fetch_raw(&mut self, kind: Collection, key: &str) -> Result<Option<Value>, RepoError> {
        let path = self.record_path(kind, key);
        match self.remote.get(&path) {
            Ok(Some(Value::Object(mut obj))) => {
                obj.insert(kind.id_field().to_string(), Value::String(key.to_string()));
                Ok(Some(Value::Object(obj)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.is_offline() => Ok(self.cache().find(kind, key)),
            Err(e) => Err(e.into()),
        }
    }

    fn require(&mut self, kind: Collection, key: &str) -> Result<Value, RepoError> {
        if key.trim().is_empty() || key == PLACEHOLDER_KEY {
            return Err(RepoError::Validation(format!("missing {} key", kind.name())));
        }
        self.fetch_raw(kind, key)?
            .ok_or_else(|| RepoError::NotFound(format!("{} {} not found", kind.name(), key)))
    }

    fn write_record<T: Serialize>(
        &mut self,
        kind: Collection,
        key: &str,
        record: &T,
    ) -> Result<Written, RepoError> {
        let mut value = serde_json::to_value(record)
            .map_err(|e| RepoError::Validation(format!("invalid {} record: {}", kind.name(), e)))?;
        if let Value::Object(obj) = &mut value {
            obj.remove(kind.id_field());
        }
        let path = self.record_path(kind, key);
        self.commit(PendingOp::Set { path, value })
    }

    /// Validates a partial update against the stored record. Returns the
    /// merged record and the patch with identifier fields stripped.
    fn prepare_patch<T: DeserializeOwned>(
        &mut self,
        kind: Collection,
        key: &str,
        mut patch: Map<String, Value>,
    ) -> Result<(T, Map<String, Value>), RepoError> {
        patch.remove("id");
        patch.remove(kind.id_field());
        if let Some(bad) = patch.keys().find(|k| k.is_empty() || k.contains('/')) {
            return Err(RepoError::Validation(format!("invalid field name {:?}", bad)));
        }
        let existing = self.require(kind, key)?;
        let merged = merge_patch(existing, &patch);
        let typed = serde_json::from_value::<T>(merged)
            .map_err(|e| RepoError::Validation(format!("invalid {} fields: {}", kind.name(), e)))?;
        Ok((typed, patch))
    }

    fn write_patch(
        &mut self,
        kind: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> Result<Written, RepoError> {
        if patch.is_empty() {
            return Ok(Written::Applied);
        }
        let path = self.record_path(kind, key);
        self.commit(PendingOp::Update {
            path,
            values: patch,
        })
    }

    fn remove_record(&mut self, kind: Collection, key: &str) -> Result<Written, RepoError> {
        if key.trim().is_empty() || key == PLACEHOLDER_KEY {
            return Err(RepoError::Validation(format!("missing {} key", kind.name())));
        }
        let path = self.record_path(kind, key);
        self.commit(PendingOp::Remove { path })
    }

    /// Writes the placeholder into every account collection that does not
    /// exist yet. Returns how many were created.
    pub fn ensure_collections(&mut self) -> Result<usize, RepoError> {
        let mut created = 0;
        for kind in Collection::SCOPED {
            let path = self.collection_path(kind);
            if self.remote.get(&path)?.is_none() {
                self.remote
                    .set(&format!("{}/{}", path, PLACEHOLDER_KEY), &Value::Bool(true))?;
                created += 1;
            }
        }
        Ok(created)
    }

    // Students

    pub fn list_students(&mut self) -> Result<Vec<Student>, RepoError> {
        self.list(Collection::Students)
    }

    pub fn add_student(&mut self, mut student: Student) -> Result<(Student, Written), RepoError> {
        if !non_empty(&student.name)
            || !non_empty(&student.registration_number)
            || !non_empty(&student.series_number)
        {
            return Err(RepoError::Validation(
                "name, registrationNumber and seriesNumber are required".to_string(),
            ));
        }
        student.id = new_key();
        if student.created_at.is_empty() {
            student.created_at = model::today_string();
        }
        let written = self.write_record(Collection::Students, &student.id.clone(), &student)?;
        Ok((student, written))
    }

    pub fn update_student(
        &mut self,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(Student, Written), RepoError> {
        let (student, patch) = self.prepare_patch::<Student>(Collection::Students, id, patch)?;
        if !non_empty(&student.name) {
            return Err(RepoError::Validation("student name cannot be empty".to_string()));
        }
        let written = self.write_patch(Collection::Students, id, patch)?;
        Ok((student, written))
    }

    /// Deletes a student with its destination, fees and attendance in one
    /// multi-path write.
    pub fn delete_student(&mut self, id: &str) -> Result<(CascadeSummary, Written), RepoError> {
        if id.trim().is_empty() || id == PLACEHOLDER_KEY {
            return Err(RepoError::Validation("missing student id".to_string()));
        }
        let fees = self.keys_where(Collection::Fees, "studentId", id)?;
        let attendance = self.keys_where(Collection::Attendance, "studentId", id)?;
        let destination = !self
            .keys_where(Collection::Destinations, "studentId", id)?
            .is_empty();

        let mut values = Map::new();
        values.insert(format!("students/{}", id), Value::Null);
        values.insert(format!("destinations/{}", id), Value::Null);
        for key in &fees {
            values.insert(format!("fees/{}", key), Value::Null);
        }
        for key in &attendance {
            values.insert(format!("attendance/{}", key), Value::Null);
        }
        let summary = CascadeSummary {
            fees: fees.len(),
            attendance: attendance.len(),
            destination,
        };

        let path = self.user_root();
        let written = self.commit(PendingOp::Update { path, values })?;

        let cache = self.cache();
        let by_student = |r: &Value| r.get("studentId").and_then(|v| v.as_str()) == Some(id);
        for kind in [Collection::Fees, Collection::Attendance, Collection::Destinations] {
            if let Err(e) = cache.evict(kind, by_student) {
                log::warn!("failed to purge cached {}: {:#}", kind.name(), e);
            }
        }
        log::info!(
            "deleted student {} with {} fees and {} attendance rows",
            id,
            summary.fees,
            summary.attendance
        );
        Ok((summary, written))
    }

    // Destinations

    pub fn list_destinations(&mut self) -> Result<Vec<DestinationRecord>, RepoError> {
        self.list(Collection::Destinations)
    }

    pub fn assign_destination(&mut self, record: DestinationRecord) -> Result<Written, RepoError> {
        if !non_empty(&record.student_id) {
            return Err(RepoError::Validation("studentId is required".to_string()));
        }
        if !record.distance.is_finite() || record.distance < 0.0 {
            return Err(RepoError::Validation(
                "distance must be a non-negative number".to_string(),
            ));
        }
        let key = record.student_id.clone();
        self.write_record(Collection::Destinations, &key, &record)
    }

    pub fn unassign_destination(&mut self, student_id: &str) -> Result<Written, RepoError> {
        self.remove_record(Collection::Destinations, student_id)
    }

    /// Transport fee implied by the student's route distance, if assigned.
    pub fn suggested_transport_fee(&mut self, student_id: &str) -> Result<Option<f64>, RepoError> {
        let Some(raw) = self.fetch_raw(Collection::Destinations, student_id)? else {
            return Ok(None);
        };
        match serde_json::from_value::<DestinationRecord>(raw) {
            Ok(dest) => Ok(model::suggested_transport_fee(dest.distance)),
            Err(e) => {
                log::warn!("skipping malformed destination {}: {}", student_id, e);
                Ok(None)
            }
        }
    }

    // Attendance

    pub fn list_attendance(&mut self, date: Option<&str>) -> Result<Vec<AttendanceRecord>, RepoError> {
        let rows = self.list::<AttendanceRecord>(Collection::Attendance)?;
        Ok(match date {
            Some(d) => rows.into_iter().filter(|r| r.date == d).collect(),
            None => rows,
        })
    }

    /// Updates the student's row for `date` or inserts one.
    pub fn mark_attendance(
        &mut self,
        student_id: &str,
        date: &str,
        status: AttendanceStatus,
    ) -> Result<(AttendanceRecord, Written), RepoError> {
        if !non_empty(student_id) {
            return Err(RepoError::Validation("studentId is required".to_string()));
        }
        require_date("date", date)?;
        let existing = self
            .list_attendance(Some(date))?
            .into_iter()
            .find(|r| r.student_id == student_id);
        match existing {
            Some(mut row) => {
                let mut patch = Map::new();
                patch.insert("status".to_string(), json!(status));
                let written = self.write_patch(Collection::Attendance, &row.id, patch)?;
                row.status = status;
                Ok((row, written))
            }
            None => {
                let row = AttendanceRecord {
                    id: new_key(),
                    student_id: student_id.to_string(),
                    date: date.to_string(),
                    status,
                };
                let written = self.write_record(Collection::Attendance, &row.id.clone(), &row)?;
                Ok((row, written))
            }
        }
    }

    /// Replaces every attendance row for `date` with one row per entry.
    pub fn save_attendance_batch(
        &mut self,
        date: &str,
        statuses: &BTreeMap<String, AttendanceStatus>,
    ) -> Result<(BatchSummary, Written), RepoError> {
        require_date("date", date)?;
        if statuses.keys().any(|k| !non_empty(k) || k.contains('/')) {
            return Err(RepoError::Validation("invalid student id in batch".to_string()));
        }
        let existing = self.keys_where(Collection::Attendance, "date", date)?;

        let mut values = Map::new();
        for key in &existing {
            values.insert(format!("attendance/{}", key), Value::Null);
        }
        for (student_id, status) in statuses {
            values.insert(
                format!("attendance/{}", new_key()),
                json!({ "studentId": student_id, "date": date, "status": status }),
            );
        }
        let summary = BatchSummary {
            replaced: existing.len(),
            written: statuses.len(),
        };
        if values.is_empty() {
            return Ok((summary, Written::Applied));
        }
        let path = self.user_root();
        let written = self.commit(PendingOp::Update { path, values })?;
        Ok((summary, written))
    }

    pub fn delete_attendance(&mut self, id: &str) -> Result<Written, RepoError> {
        self.remove_record(Collection::Attendance, id)
    }

    // Fees

    pub fn list_fees(&mut self) -> Result<Vec<FeesRecord>, RepoError> {
        self.list(Collection::Fees)
    }

    fn check_fee_duplicate(&mut self, fee: &FeesRecord) -> Result<(), RepoError> {
        let clash = self.list_fees()?.into_iter().any(|f| {
            f.id != fee.id
                && f.student_id == fee.student_id
                && f.fee_type == fee.fee_type
                && f.fee_date == fee.fee_date
        });
        if clash {
            return Err(RepoError::Validation(format!(
                "a {} fee record already exists for this student on {}",
                fee.fee_type.label(),
                fee.fee_date
            )));
        }
        Ok(())
    }

    fn check_fee_amounts(fee: &FeesRecord) -> Result<(), RepoError> {
        for (name, v) in [("totalAmount", fee.total_amount), ("paidAmount", fee.paid_amount)] {
            if !v.is_finite() || v < 0.0 {
                return Err(RepoError::Validation(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn add_fee(&mut self, mut fee: FeesRecord) -> Result<(FeesRecord, Written), RepoError> {
        if !non_empty(&fee.student_id) || !(fee.total_amount > 0.0) {
            return Err(RepoError::Validation(
                "student and total fee are required".to_string(),
            ));
        }
        Self::check_fee_amounts(&fee)?;
        if fee.fee_date.is_empty() {
            fee.fee_date = model::today_string();
        }
        require_date("feeDate", &fee.fee_date)?;
        optional_date("dueDate", &fee.due_date)?;
        optional_date("paymentDate", &fee.payment_date)?;

        fee.id = new_key();
        self.check_fee_duplicate(&fee)?;
        fee.status = PaymentStatus::from_amounts(fee.total_amount, fee.paid_amount);
        if fee.created_at.is_empty() {
            fee.created_at = model::today_string();
        }
        let written = self.write_record(Collection::Fees, &fee.id.clone(), &fee)?;
        Ok((fee, written))
    }

    /// Partial fee update; status is always re-derived from the merged amounts.
    pub fn update_fee(
        &mut self,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(FeesRecord, Written), RepoError> {
        let (mut fee, mut patch) = self.prepare_patch::<FeesRecord>(Collection::Fees, id, patch)?;
        Self::check_fee_amounts(&fee)?;
        if patch.contains_key("feeDate") {
            require_date("feeDate", &fee.fee_date)?;
        }
        if ["studentId", "feeType", "feeDate"]
            .iter()
            .any(|k| patch.contains_key(*k))
        {
            self.check_fee_duplicate(&fee)?;
        }
        fee.status = PaymentStatus::from_amounts(fee.total_amount, fee.paid_amount);
        patch.insert("status".to_string(), json!(fee.status));
        let written = self.write_patch(Collection::Fees, id, patch)?;
        Ok((fee, written))
    }

    pub fn delete_fee(&mut self, id: &str) -> Result<Written, RepoError> {
        self.remove_record(Collection::Fees, id)
    }

    // Vehicles

    pub fn list_vehicles(&mut self) -> Result<Vec<VehicleRecord>, RepoError> {
        self.list(Collection::Vehicles)
    }

    pub fn add_vehicle(
        &mut self,
        mut vehicle: VehicleRecord,
    ) -> Result<(VehicleRecord, Written), RepoError> {
        if !non_empty(&vehicle.bus_number) {
            return Err(RepoError::Validation("busNumber is required".to_string()));
        }
        vehicle.id = new_key();
        vehicle.km_calculation = model::km_used(vehicle.diesel_km_reading, vehicle.previous_diesel_km);
        if vehicle.created_at.is_empty() {
            vehicle.created_at = model::today_string();
        }
        let written = self.write_record(Collection::Vehicles, &vehicle.id.clone(), &vehicle)?;
        Ok((vehicle, written))
    }

    /// Partial vehicle update; KM used is re-derived when a reading changes.
    pub fn update_vehicle(
        &mut self,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Result<(VehicleRecord, Written), RepoError> {
        patch.remove(model::KM_USED_KEY);
        let (mut vehicle, mut patch) =
            self.prepare_patch::<VehicleRecord>(Collection::Vehicles, id, patch)?;
        if !non_empty(&vehicle.bus_number) {
            return Err(RepoError::Validation("busNumber cannot be empty".to_string()));
        }
        if patch.contains_key(model::CURRENT_KM_KEY) || patch.contains_key(model::PREVIOUS_KM_KEY) {
            vehicle.km_calculation =
                model::km_used(vehicle.diesel_km_reading, vehicle.previous_diesel_km);
            patch.insert(model::KM_USED_KEY.to_string(), json!(vehicle.km_calculation));
        }
        let written = self.write_patch(Collection::Vehicles, id, patch)?;
        Ok((vehicle, written))
    }

    pub fn set_vehicle_document(
        &mut self,
        id: &str,
        document: VehicleDocument,
        issue_date: &str,
        due_date: &str,
    ) -> Result<(VehicleRecord, Written), RepoError> {
        optional_date(document.issue_key(), issue_date)?;
        optional_date(document.due_key(), due_date)?;
        let mut patch = Map::new();
        patch.insert(document.issue_key().to_string(), json!(issue_date.trim()));
        patch.insert(document.due_key().to_string(), json!(due_date.trim()));
        self.update_vehicle(id, patch)
    }

    pub fn log_oil(
        &mut self,
        id: &str,
        oil: OilLog,
        km: f64,
        date: &str,
    ) -> Result<(VehicleRecord, Written), RepoError> {
        if !km.is_finite() || km < 0.0 {
            return Err(RepoError::Validation(format!(
                "{} must be a non-negative number",
                oil.km_key()
            )));
        }
        optional_date(oil.date_key(), date)?;
        let mut patch = Map::new();
        patch.insert(oil.km_key().to_string(), json!(km));
        patch.insert(oil.date_key().to_string(), json!(date.trim()));
        self.update_vehicle(id, patch)
    }

    pub fn delete_vehicle(&mut self, id: &str) -> Result<Written, RepoError> {
        self.remove_record(Collection::Vehicles, id)
    }

    // Attention messages

    pub fn list_attention(&mut self) -> Result<Vec<AttentionMessage>, RepoError> {
        self.list(Collection::Attention)
    }

    pub fn add_attention(
        &mut self,
        mut message: AttentionMessage,
    ) -> Result<(AttentionMessage, Written), RepoError> {
        if !non_empty(&message.title) {
            return Err(RepoError::Validation("title is required".to_string()));
        }
        message.id = new_key();
        if message.date.is_empty() {
            message.date = model::today_string();
        }
        let written = self.write_record(Collection::Attention, &message.id.clone(), &message)?;
        Ok((message, written))
    }

    pub fn update_attention(
        &mut self,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(AttentionMessage, Written), RepoError> {
        let (message, patch) =
            self.prepare_patch::<AttentionMessage>(Collection::Attention, id, patch)?;
        if !non_empty(&message.title) {
            return Err(RepoError::Validation("title cannot be empty".to_string()));
        }
        let written = self.write_patch(Collection::Attention, id, patch)?;
        Ok((message, written))
    }

    pub fn delete_attention(&mut self, id: &str) -> Result<Written, RepoError> {
        self.remove_record(Collection::Attention, id)
    }

    /// Everything entered for a given day: fees by ledger date, vehicles by
    /// creation date and attendance by date.
    pub fn daily_log(&mut self, date: &str) -> Result<DailyLog, RepoError> {
        require_date("date", date)?;
        let fees = self
            .list_fees()?
            .into_iter()
            .filter(|f| f.fee_date == date)
            .collect();
        let vehicles = self
            .list_vehicles()?
            .into_iter()
            .filter(|v| v.created_at == date)
            .collect();
        let attendance = self.list_attendance(Some(date))?;
        Ok(DailyLog {
            date: date.to_string(),
            fees,
            vehicles,
            attendance,
        })
    }
}
