use crate::model::{OilLog, Student, VehicleDocument};
use crate::repo::DailyLog;
use anyhow::Context;
use csv::{QuoteStyle, WriterBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn amount(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Writes `fees_<date>.csv`, `attendance_<date>.csv` and
/// `vehicles_<date>.csv` into `out_dir`, returning the written paths.
pub fn export_daily_log(
    log: &DailyLog,
    students: &[Student],
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.to_string_lossy()))?;
    let names: HashMap<&str, &str> = students
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).copied().unwrap_or("").to_string();

    let fees_path = out_dir.join(format!("fees_{}.csv", log.date));
    let fee_rows: Vec<Vec<String>> = log
        .fees
        .iter()
        .map(|f| {
            vec![
                f.student_id.clone(),
                name_of(&f.student_id),
                f.fee_type.label().to_string(),
                amount(f.total_amount),
                amount(f.paid_amount),
                f.status.label().to_string(),
                f.fee_date.clone(),
                f.due_date.clone(),
                f.payment_date.clone(),
            ]
        })
        .collect();
    write_csv(
        &fees_path,
        &strings(&[
            "Student ID",
            "Student Name",
            "Fee Type",
            "Total Amount",
            "Paid Amount",
            "Status",
            "Fee Date",
            "Due Date",
            "Payment Date",
        ]),
        &fee_rows,
    )?;

    let attendance_path = out_dir.join(format!("attendance_{}.csv", log.date));
    let attendance_rows: Vec<Vec<String>> = log
        .attendance
        .iter()
        .map(|a| {
            vec![
                a.student_id.clone(),
                name_of(&a.student_id),
                a.date.clone(),
                format!("{:?}", a.status),
            ]
        })
        .collect();
    write_csv(
        &attendance_path,
        &strings(&["Student ID", "Student Name", "Date", "Status"]),
        &attendance_rows,
    )?;

    let vehicles_path = out_dir.join(format!("vehicles_{}.csv", log.date));
    let mut header = strings(&["Bus Number", "Driver", "Contact"]);
    header.extend(
        VehicleDocument::ALL
            .iter()
            .map(|d| format!("{} Due", d.label())),
    );
    header.extend(OilLog::ALL.iter().map(|o| format!("{} KM", o.label())));
    header.extend(strings(&["Current KM", "Previous KM", "KM Used"]));
    let vehicle_rows: Vec<Vec<String>> = log
        .vehicles
        .iter()
        .map(|v| {
            let mut row = vec![
                v.bus_number.clone(),
                v.driver_name.clone(),
                v.driver_contact.clone(),
            ];
            row.extend(VehicleDocument::ALL.iter().map(|d| d.dates(v).1.to_string()));
            row.extend(OilLog::ALL.iter().map(|o| amount(o.reading(v).0)));
            row.push(amount(v.diesel_km_reading));
            row.push(amount(v.previous_diesel_km));
            row.push(amount(v.km_calculation));
            row
        })
        .collect();
    write_csv(&vehicles_path, &header, &vehicle_rows)?;

    log::info!(
        "exported daily log {} to {}",
        log.date,
        out_dir.to_string_lossy()
    );
    Ok(vec![fees_path, attendance_path, vehicles_path])
}
