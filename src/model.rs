use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersonalDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SystemConfiguration {
    pub make: String,   // panel manufacturer
    pub watt_peak: f64, // watts per panel
    pub number_of_panels: u32,
    pub base_price_per_kw: f64,
    pub gst_percentage: f64,
    pub cleaning_charges: f64,
    pub subsidy: f64,
}

/// Derived figures. Always produced by the calculator, never hand-edited.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Calculations {
    pub system_size: f64, // kW
    pub total_base_price: f64,
    pub gst_amount: f64,
    pub total_payable_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Completed,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Draft => write!(f, "draft"),
            ProjectStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub personal_details: PersonalDetails,
    pub system_configuration: SystemConfiguration,
    pub calculations: Calculations,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    pub default_gst_percentage: f64,
    pub default_base_price_per_kw: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            default_gst_percentage: 13.8,
            default_base_price_per_kw: 50000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyEntry {
    pub month: String, // e.g. "Aug 25"
    pub income: f64,
    pub projects: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_income: f64,
    pub total_kw_installed: f64,
    pub total_projects: usize,
    pub monthly_data: Vec<MonthlyEntry>,
}
