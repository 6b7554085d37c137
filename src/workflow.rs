use regex::Regex;
use thiserror::Error;

use crate::calc::calculate_system_metrics;
use crate::model::{Calculations, PersonalDetails, ProjectStatus, SystemConfiguration};
use crate::repo::{RepoError, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PersonalDetails,
    SystemConfig,
    Review,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        FieldError {
            field,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("quotation is not ready to commit")]
    NotReady,

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub fn validate_personal_details(details: &PersonalDetails) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if details.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if details.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "Phone is required"));
    }
    if details.email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else {
        let email_re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
        if !email_re.is_match(details.email.trim()) {
            errors.push(FieldError::new("email", "Invalid email"));
        }
    }
    if details.address.trim().is_empty() {
        errors.push(FieldError::new("address", "Address is required"));
    }
    errors
}

pub fn validate_system_config(config: &SystemConfiguration) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if config.make.trim().is_empty() {
        errors.push(FieldError::new("make", "Make is required"));
    }
    if !config.watt_peak.is_finite() || config.watt_peak <= 0.0 {
        errors.push(FieldError::new("watt_peak", "Watt Peak must be positive"));
    }
    if config.number_of_panels == 0 {
        errors.push(FieldError::new(
            "number_of_panels",
            "Number of panels must be positive",
        ));
    }
    if !config.base_price_per_kw.is_finite() || config.base_price_per_kw <= 0.0 {
        errors.push(FieldError::new(
            "base_price_per_kw",
            "Base price must be positive",
        ));
    }
    if !config.gst_percentage.is_finite()
        || config.gst_percentage < 0.0
        || config.gst_percentage > 100.0
    {
        errors.push(FieldError::new(
            "gst_percentage",
            "GST percentage must be between 0 and 100",
        ));
    }
    if !config.cleaning_charges.is_finite() || config.cleaning_charges < 0.0 {
        errors.push(FieldError::new(
            "cleaning_charges",
            "Cleaning charges cannot be negative",
        ));
    }
    if !config.subsidy.is_finite() || config.subsidy < 0.0 {
        errors.push(FieldError::new("subsidy", "Subsidy cannot be negative"));
    }
    errors
}

/// The three-step quotation flow. Forward transitions happen only on valid
/// submissions; going back never drops what was already entered. Nothing is
/// persisted until `commit`, and a discarded draft leaves no trace.
#[derive(Debug)]
pub struct QuotationDraft {
    step: Step,
    personal_details: Option<PersonalDetails>,
    system_configuration: Option<SystemConfiguration>,
}

impl Default for QuotationDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotationDraft {
    pub fn new() -> Self {
        QuotationDraft {
            step: Step::PersonalDetails,
            personal_details: None,
            system_configuration: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn personal_details(&self) -> Option<&PersonalDetails> {
        self.personal_details.as_ref()
    }

    pub fn system_configuration(&self) -> Option<&SystemConfiguration> {
        self.system_configuration.as_ref()
    }

    /// Valid submission advances to the system-configuration step; a failed
    /// one reports field errors and leaves the state alone.
    pub fn submit_personal_details(
        &mut self,
        details: PersonalDetails,
    ) -> Result<(), Vec<FieldError>> {
        let errors = validate_personal_details(&details);
        if !errors.is_empty() {
            return Err(errors);
        }
        self.personal_details = Some(details);
        if self.step() == Step::PersonalDetails {
            self.step = Step::SystemConfig;
        }
        Ok(())
    }

    pub fn submit_system_configuration(
        &mut self,
        config: SystemConfiguration,
    ) -> Result<(), Vec<FieldError>> {
        let errors = validate_system_config(&config);
        if !errors.is_empty() {
            return Err(errors);
        }
        self.system_configuration = Some(config);
        if self.step() == Step::SystemConfig {
            self.step = Step::Review;
        }
        Ok(())
    }

    /// Backward transition. Entered data stays put.
    pub fn back(&mut self) {
        self.step = match self.step {
            Step::Review => Step::SystemConfig,
            Step::SystemConfig | Step::PersonalDetails => Step::PersonalDetails,
        };
    }

    /// Non-authoritative preview of the in-progress configuration. Never
    /// persisted.
    pub fn preview(&self) -> Option<Calculations> {
        self.system_configuration
            .as_ref()
            .map(calculate_system_metrics)
    }

    /// Terminal transition: materializes a draft project and consumes the
    /// workflow instance.
    pub fn commit(self, repo: &mut Repository) -> Result<String, CommitError> {
        if self.step() != Step::Review {
            return Err(CommitError::NotReady);
        }
        let (Some(details), Some(config)) = (self.personal_details, self.system_configuration)
        else {
            return Err(CommitError::NotReady);
        };
        Ok(repo.add_project(details, config, Vec::new(), ProjectStatus::Draft)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use pretty_assertions::assert_eq;

    fn details() -> PersonalDetails {
        PersonalDetails {
            name: "Asha Patel".to_string(),
            phone: "+91 98765 43210".to_string(),
            email: "asha@example.com".to_string(),
            address: "14 MG Road, Pune".to_string(),
        }
    }

    fn config() -> SystemConfiguration {
        SystemConfiguration {
            make: "Adani".to_string(),
            watt_peak: 540.0,
            number_of_panels: 20,
            base_price_per_kw: 50000.0,
            gst_percentage: 13.8,
            cleaning_charges: 5000.0,
            subsidy: 10000.0,
        }
    }

    #[test]
    fn happy_path_walks_all_three_steps() {
        let mut draft = QuotationDraft::new();
        assert_eq!(draft.step(), Step::PersonalDetails);

        draft.submit_personal_details(details()).unwrap();
        assert_eq!(draft.step(), Step::SystemConfig);

        draft.submit_system_configuration(config()).unwrap();
        assert_eq!(draft.step(), Step::Review);
    }

    #[test]
    fn invalid_email_keeps_state_unchanged() {
        let mut draft = QuotationDraft::new();
        let mut bad = details();
        bad.email = "not-an-email".to_string();

        let errors = draft.submit_personal_details(bad).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
        assert_eq!(draft.step(), Step::PersonalDetails);
        assert!(draft.personal_details().is_none());
    }

    #[test]
    fn invalid_configuration_reports_each_field() {
        let mut draft = QuotationDraft::new();
        draft.submit_personal_details(details()).unwrap();

        let bad = SystemConfiguration {
            make: "".to_string(),
            watt_peak: 0.0,
            number_of_panels: 0,
            base_price_per_kw: -1.0,
            gst_percentage: 120.0,
            cleaning_charges: -5.0,
            subsidy: f64::NAN,
        };
        let errors = draft.submit_system_configuration(bad).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "make",
                "watt_peak",
                "number_of_panels",
                "base_price_per_kw",
                "gst_percentage",
                "cleaning_charges",
                "subsidy"
            ]
        );
        assert_eq!(draft.step(), Step::SystemConfig);
    }

    #[test]
    fn back_preserves_entered_data() {
        let mut draft = QuotationDraft::new();
        draft.submit_personal_details(details()).unwrap();
        draft.submit_system_configuration(config()).unwrap();

        draft.back();
        assert_eq!(draft.step(), Step::SystemConfig);
        draft.back();
        assert_eq!(draft.step(), Step::PersonalDetails);
        draft.back(); // already at the first step
        assert_eq!(draft.step(), Step::PersonalDetails);

        assert_eq!(draft.personal_details(), Some(&details()));
        assert_eq!(draft.system_configuration(), Some(&config()));
    }

    #[test]
    fn preview_matches_the_calculator() {
        let mut draft = QuotationDraft::new();
        assert!(draft.preview().is_none());
        draft.submit_personal_details(details()).unwrap();
        draft.submit_system_configuration(config()).unwrap();
        assert_eq!(draft.preview(), Some(calculate_system_metrics(&config())));
    }

    #[test]
    fn commit_creates_a_draft_project() {
        let mut repo = Repository::load(Box::new(MemoryStore::new())).unwrap();
        let mut draft = QuotationDraft::new();
        draft.submit_personal_details(details()).unwrap();
        draft.submit_system_configuration(config()).unwrap();

        let id = draft.commit(&mut repo).unwrap();
        let project = repo.get_project(&id).unwrap();
        assert_eq!(project.status, ProjectStatus::Draft);
        assert_eq!(project.personal_details, details());
        assert!(project.images.is_empty());
    }

    #[test]
    fn commit_before_review_is_rejected() {
        let mut repo = Repository::load(Box::new(MemoryStore::new())).unwrap();
        let mut draft = QuotationDraft::new();
        draft.submit_personal_details(details()).unwrap();
        let err = draft.commit(&mut repo).unwrap_err();
        assert!(matches!(err, CommitError::NotReady));
        assert!(repo.projects().is_empty());
    }
}
