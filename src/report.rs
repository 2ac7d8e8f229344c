use crate::model::{
    parse_date, DestinationRecord, FeesRecord, PaymentStatus, Student, VehicleDocument,
    VehicleRecord, DATE_FORMAT,
};
use chrono::NaiveDate;
use serde::Serialize;

pub const UNASSIGNED_ROUTE: &str = "Unassigned";
pub const UNSET_POINT: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAlert {
    pub id: String,
    pub vehicle_id: String,
    pub bus_number: String,
    pub document: &'static str,
    pub doc_name: &'static str,
    pub due_date: String,
    /// Negative once the document has expired.
    pub days_left: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: String,
    pub student_count: usize,
    pub fee_count: usize,
    pub vehicle_count: usize,
    pub overdue_fees: Vec<FeesRecord>,
    pub alerts: Vec<DocumentAlert>,
}

pub fn overdue_fees(fees: &[FeesRecord], today: NaiveDate) -> Vec<FeesRecord> {
    fees.iter()
        .filter(|f| f.status == PaymentStatus::Pending)
        .filter(|f| parse_date(&f.due_date).is_some_and(|due| due < today))
        .cloned()
        .collect()
}

/// Every document due within `window_days` of `today`, expired ones
/// included, soonest first.
pub fn document_alerts(
    vehicles: &[VehicleRecord],
    today: NaiveDate,
    window_days: i64,
) -> Vec<DocumentAlert> {
    let mut alerts = Vec::new();
    for v in vehicles {
        for doc in VehicleDocument::ALL {
            let Some(due) = doc.due_date(v) else { continue };
            let days_left = (due - today).num_days();
            if days_left > window_days {
                continue;
            }
            alerts.push(DocumentAlert {
                id: format!("{}-{}", v.id, doc.slug()),
                vehicle_id: v.id.clone(),
                bus_number: v.bus_number.clone(),
                document: doc.slug(),
                doc_name: doc.label(),
                due_date: due.format(DATE_FORMAT).to_string(),
                days_left,
            });
        }
    }
    alerts.sort_by_key(|a| a.days_left);
    alerts
}

/// Labels of the vehicle's documents whose due date has passed.
pub fn expired_documents(vehicle: &VehicleRecord, today: NaiveDate) -> Vec<&'static str> {
    VehicleDocument::ALL
        .into_iter()
        .filter(|doc| doc.due_date(vehicle).is_some_and(|due| due < today))
        .map(|doc| doc.label())
        .collect()
}

pub fn dashboard(
    students: &[Student],
    fees: &[FeesRecord],
    vehicles: &[VehicleRecord],
    today: NaiveDate,
    window_days: i64,
) -> Dashboard {
    Dashboard {
        today: today.format(DATE_FORMAT).to_string(),
        student_count: students.len(),
        fee_count: fees.len(),
        vehicle_count: vehicles.len(),
        overdue_fees: overdue_fees(fees, today),
        alerts: document_alerts(vehicles, today, window_days),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationFilter {
    All,
    Assigned,
    Pending,
}

impl DestinationFilter {
    pub fn parse(raw: &str) -> Option<DestinationFilter> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(DestinationFilter::All),
            "assigned" => Some(DestinationFilter::Assigned),
            "pending" => Some(DestinationFilter::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRow {
    pub student: Student,
    pub destination: Option<DestinationRecord>,
    pub assigned: bool,
}

pub fn is_assigned(dest: Option<&DestinationRecord>) -> bool {
    dest.is_some_and(|d| d.route_name != UNASSIGNED_ROUTE && d.pickup_point != UNSET_POINT)
}

/// One row per student, narrowed by assignment state and an optional
/// case-insensitive name or registration search.
pub fn destination_overview(
    students: &[Student],
    destinations: &[DestinationRecord],
    filter: DestinationFilter,
    search: &str,
) -> Vec<DestinationRow> {
    let needle = search.trim().to_lowercase();
    students
        .iter()
        .filter(|s| {
            needle.is_empty()
                || s.name.to_lowercase().contains(&needle)
                || s.registration_number.to_lowercase().contains(&needle)
        })
        .map(|s| {
            let destination = destinations.iter().find(|d| d.student_id == s.id).cloned();
            let assigned = is_assigned(destination.as_ref());
            DestinationRow {
                student: s.clone(),
                destination,
                assigned,
            }
        })
        .filter(|row| match filter {
            DestinationFilter::All => true,
            DestinationFilter::Assigned => row.assigned,
            DestinationFilter::Pending => !row.assigned,
        })
        .collect()
}
