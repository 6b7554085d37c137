use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::model::{DashboardStats, MonthlyEntry, Project, ProjectStatus};

/// Pure projection over the current collection. Income and capacity count
/// completed projects only; the project count covers everything. The monthly
/// series is the trailing six calendar months ending at `now`, oldest first,
/// and always has exactly six entries.
pub fn dashboard_stats(projects: &[Project], now: DateTime<Utc>) -> DashboardStats {
    let completed: Vec<&Project> = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Completed)
        .collect();

    let total_income: f64 = completed
        .iter()
        .map(|p| p.calculations.total_payable_amount)
        .sum();
    let total_kw_installed: f64 = completed.iter().map(|p| p.calculations.system_size).sum();

    let monthly_data = (0..6)
        .rev()
        .map(|back| {
            let (year, month) = shift_month(now.year(), now.month(), back);
            let in_month: Vec<&&Project> = completed
                .iter()
                .filter(|p| p.created_at.year() == year && p.created_at.month() == month)
                .collect();
            MonthlyEntry {
                month: month_label(year, month),
                income: in_month
                    .iter()
                    .map(|p| p.calculations.total_payable_amount)
                    .sum(),
                projects: in_month.len(),
            }
        })
        .collect();

    DashboardStats {
        total_income,
        total_kw_installed,
        total_projects: projects.len(),
        monthly_data,
    }
}

// Month arithmetic in month-index space so year boundaries wrap cleanly.
fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let idx = year * 12 + month as i32 - 1 - back as i32;
    (idx.div_euclid(12), (idx.rem_euclid(12) + 1) as u32)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %y").to_string())
        .unwrap_or_default()
}
