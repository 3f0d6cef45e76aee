// src/io/reporting.rs

use crate::error::Result;
use crate::simulation::engine::CycleReport;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes one CSV row per shop × product handled by the cycle.
pub fn write_report<W: Write>(writer: W, report: &CycleReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &report.rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the cycle report to a CSV file.
///
/// # Arguments
/// * `file_path` - The path to save the file (e.g., "reports/2024-03-01.csv").
/// * `report` - The report returned by `ShopManager::manage_shops`.
pub fn write_cycle_report(file_path: &Path, report: &CycleReport) -> Result<()> {
    let file = std::fs::File::create(file_path)?;
    write_report(file, report)?;

    info!(
        rows = report.rows.len(),
        path = %file_path.display(),
        "exported cycle report"
    );
    Ok(())
}
