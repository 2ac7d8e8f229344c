use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-kilometre rate used to pre-fill a transport fee from a student's route distance.
pub const TRANSPORT_RATE_PER_KM: f64 = 150.0;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Attendance,
    Fees,
    Vehicles,
    Attention,
    Destinations,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Students,
        Collection::Attendance,
        Collection::Fees,
        Collection::Vehicles,
        Collection::Attention,
        Collection::Destinations,
    ];

    /// Collections stored under the signed-in account.
    pub const SCOPED: [Collection; 5] = [
        Collection::Students,
        Collection::Attendance,
        Collection::Fees,
        Collection::Vehicles,
        Collection::Destinations,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Attendance => "attendance",
            Collection::Fees => "fees",
            Collection::Vehicles => "vehicles",
            Collection::Attention => "attention",
            Collection::Destinations => "destinations",
        }
    }

    pub fn parse(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Field that carries the record key once a record is read back.
    pub fn id_field(self) -> &'static str {
        match self {
            Collection::Destinations => "studentId",
            _ => "id",
        }
    }

    pub fn is_global(self) -> bool {
        matches!(self, Collection::Attention)
    }

    /// Key the pre-sync versions kept this collection under on the device.
    pub fn legacy_storage_key(self) -> &'static str {
        match self {
            Collection::Students => "ctms_students",
            Collection::Attendance => "ctms_attendance",
            Collection::Fees => "ctms_fees",
            Collection::Vehicles => "ctms_vehicles",
            Collection::Attention => "ctms_attention",
            Collection::Destinations => "ctms_destinations",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub registration_number: String,
    pub series_number: String,
    pub department: String,
    pub academic_year: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DestinationRecord {
    pub student_id: String,
    pub pickup_point: String,
    pub drop_point: String,
    pub route_name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeType {
    Tuition,
    #[default]
    Transport,
    Other,
}

impl FeeType {
    pub fn label(self) -> &'static str {
        match self {
            FeeType::Tuition => "Tuition",
            FeeType::Transport => "Transport",
            FeeType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    #[default]
    Pending,
}

impl PaymentStatus {
    /// Nothing paid is Pending even when the total is zero.
    pub fn from_amounts(total: f64, paid: f64) -> PaymentStatus {
        if paid <= 0.0 {
            PaymentStatus::Pending
        } else if paid >= total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeesRecord {
    pub id: String,
    pub student_id: String,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub fee_type: FeeType,
    pub payment_date: String,
    pub due_date: String,
    /// Ledger date the fee belongs to.
    pub fee_date: String,
    pub status: PaymentStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleRecord {
    pub id: String,
    pub bus_number: String,
    pub driver_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    pub driver_contact: String,

    pub insurance_date: String,
    pub insurance_due_date: String,
    pub fc_date: String,
    pub fc_due_date: String,
    pub pollution_date: String,
    pub pollution_due_date: String,
    pub sticker_date: String,
    pub sticker_due_date: String,
    pub fire_extinguisher_date: String,
    pub fire_extinguisher_due_date: String,
    pub first_aid_box_date: String,
    pub first_aid_box_due_date: String,

    #[serde(rename = "vehicleOilKM")]
    pub vehicle_oil_km: f64,
    pub vehicle_oil_date: String,
    #[serde(rename = "engineOilKM")]
    pub engine_oil_km: f64,
    pub engine_oil_date: String,
    #[serde(rename = "brakeOilKM")]
    pub brake_oil_km: f64,
    pub brake_oil_date: String,
    #[serde(rename = "steeringOilKM")]
    pub steering_oil_km: f64,
    pub steering_oil_date: String,
    pub air_check_date: String,
    pub grease_check_date: String,

    pub tyre1_number: String,
    pub tyre2_number: String,

    pub diesel_filling_date: String,
    #[serde(rename = "dieselKMReading")]
    pub diesel_km_reading: f64,
    #[serde(rename = "previousDieselKM")]
    pub previous_diesel_km: f64,
    /// KM used since the previous filling.
    pub km_calculation: f64,
    pub stack: String,
    pub usage: String,

    pub created_at: String,
}

pub const CURRENT_KM_KEY: &str = "dieselKMReading";
pub const PREVIOUS_KM_KEY: &str = "previousDieselKM";
pub const KM_USED_KEY: &str = "kmCalculation";

/// Distance covered between two odometer readings. A reading that went
/// backwards yields zero.
pub fn km_used(current: f64, previous: f64) -> f64 {
    (current - previous).max(0.0)
}

pub fn suggested_transport_fee(distance: f64) -> Option<f64> {
    if distance > 0.0 {
        Some(distance * TRANSPORT_RATE_PER_KM)
    } else {
        None
    }
}

/// Dated vehicle documents, each an issue/due pair on [`VehicleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleDocument {
    Insurance,
    Fitness,
    Pollution,
    Sticker,
    FireExtinguisher,
    FirstAidBox,
}

impl VehicleDocument {
    pub const ALL: [VehicleDocument; 6] = [
        VehicleDocument::Insurance,
        VehicleDocument::Fitness,
        VehicleDocument::Pollution,
        VehicleDocument::Sticker,
        VehicleDocument::FireExtinguisher,
        VehicleDocument::FirstAidBox,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            VehicleDocument::Insurance => "insurance",
            VehicleDocument::Fitness => "fc",
            VehicleDocument::Pollution => "pollution",
            VehicleDocument::Sticker => "sticker",
            VehicleDocument::FireExtinguisher => "fireExtinguisher",
            VehicleDocument::FirstAidBox => "firstAidBox",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VehicleDocument::Insurance => "Insurance",
            VehicleDocument::Fitness => "FC",
            VehicleDocument::Pollution => "Pollution",
            VehicleDocument::Sticker => "Sticker",
            VehicleDocument::FireExtinguisher => "Fire Ext.",
            VehicleDocument::FirstAidBox => "First Aid",
        }
    }

    pub fn parse(slug: &str) -> Option<VehicleDocument> {
        VehicleDocument::ALL.into_iter().find(|d| d.slug() == slug)
    }

    pub fn issue_key(self) -> &'static str {
        match self {
            VehicleDocument::Insurance => "insuranceDate",
            VehicleDocument::Fitness => "fcDate",
            VehicleDocument::Pollution => "pollutionDate",
            VehicleDocument::Sticker => "stickerDate",
            VehicleDocument::FireExtinguisher => "fireExtinguisherDate",
            VehicleDocument::FirstAidBox => "firstAidBoxDate",
        }
    }

    pub fn due_key(self) -> &'static str {
        match self {
            VehicleDocument::Insurance => "insuranceDueDate",
            VehicleDocument::Fitness => "fcDueDate",
            VehicleDocument::Pollution => "pollutionDueDate",
            VehicleDocument::Sticker => "stickerDueDate",
            VehicleDocument::FireExtinguisher => "fireExtinguisherDueDate",
            VehicleDocument::FirstAidBox => "firstAidBoxDueDate",
        }
    }

    /// `(issue date, due date)` as stored on the record.
    pub fn dates(self, v: &VehicleRecord) -> (&str, &str) {
        match self {
            VehicleDocument::Insurance => (v.insurance_date.as_str(), v.insurance_due_date.as_str()),
            VehicleDocument::Fitness => (v.fc_date.as_str(), v.fc_due_date.as_str()),
            VehicleDocument::Pollution => (v.pollution_date.as_str(), v.pollution_due_date.as_str()),
            VehicleDocument::Sticker => (v.sticker_date.as_str(), v.sticker_due_date.as_str()),
            VehicleDocument::FireExtinguisher => {
                (v.fire_extinguisher_date.as_str(), v.fire_extinguisher_due_date.as_str())
            }
            VehicleDocument::FirstAidBox => (v.first_aid_box_date.as_str(), v.first_aid_box_due_date.as_str()),
        }
    }

    pub fn due_date(self, v: &VehicleRecord) -> Option<NaiveDate> {
        parse_date(self.dates(v).1)
    }
}

/// Oil service logs, each a KM/date pair on [`VehicleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OilLog {
    Vehicle,
    Engine,
    Brake,
    Steering,
}

impl OilLog {
    pub const ALL: [OilLog; 4] = [OilLog::Vehicle, OilLog::Engine, OilLog::Brake, OilLog::Steering];

    pub fn slug(self) -> &'static str {
        match self {
            OilLog::Vehicle => "vehicleOil",
            OilLog::Engine => "engineOil",
            OilLog::Brake => "brakeOil",
            OilLog::Steering => "steeringOil",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OilLog::Vehicle => "Vehicle Oil",
            OilLog::Engine => "Engine Oil",
            OilLog::Brake => "Brake Oil",
            OilLog::Steering => "Steering Oil",
        }
    }

    pub fn parse(slug: &str) -> Option<OilLog> {
        OilLog::ALL.into_iter().find(|o| o.slug() == slug)
    }

    pub fn km_key(self) -> &'static str {
        match self {
            OilLog::Vehicle => "vehicleOilKM",
            OilLog::Engine => "engineOilKM",
            OilLog::Brake => "brakeOilKM",
            OilLog::Steering => "steeringOilKM",
        }
    }

    pub fn date_key(self) -> &'static str {
        match self {
            OilLog::Vehicle => "vehicleOilDate",
            OilLog::Engine => "engineOilDate",
            OilLog::Brake => "brakeOilDate",
            OilLog::Steering => "steeringOilDate",
        }
    }

    pub fn reading(self, v: &VehicleRecord) -> (f64, &str) {
        match self {
            OilLog::Vehicle => (v.vehicle_oil_km, v.vehicle_oil_date.as_str()),
            OilLog::Engine => (v.engine_oil_km, v.engine_oil_date.as_str()),
            OilLog::Brake => (v.brake_oil_km, v.brake_oil_date.as_str()),
            OilLog::Steering => (v.steering_oil_km, v.steering_oil_date.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttentionMessage {
    pub id: String,
    pub title: String,
    pub message: String,
    pub date: String,
    pub priority: Priority,
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn today_string() -> String {
    chrono::Local::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn is_date(s: &str) -> bool {
    parse_date(s).is_some()
}
