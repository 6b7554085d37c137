use chrono::Utc;
use thiserror::Error;

use crate::calc::calculate_system_metrics;
use crate::model::{
    AppSettings, DashboardStats, PersonalDetails, Project, ProjectStatus, SystemConfiguration,
};
use crate::stats;
use crate::store::{KvStore, PROJECTS_KEY, SETTINGS_KEY, StoreError};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("project '{id}' not found")]
    NotFound { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored data is corrupt: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Fields of a project that callers may change. Anything left `None` keeps
/// its current value. A new configuration always brings recomputed
/// calculations with it.
#[derive(Debug, Default, Clone)]
pub struct ProjectPatch {
    pub personal_details: Option<PersonalDetails>,
    pub system_configuration: Option<SystemConfiguration>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
}

/// Sole owner of the project collection and settings. Every mutation writes
/// the full snapshot through to the store before reporting success; a failed
/// write leaves the in-memory state as it was.
pub struct Repository {
    store: Box<dyn KvStore>,
    projects: Vec<Project>,
    settings: AppSettings,
    // High-water mark for issued ids; deletion never lowers it.
    last_id_millis: i64,
}

impl Repository {
    pub fn load(store: Box<dyn KvStore>) -> Result<Self, RepoError> {
        let projects: Vec<Project> = match store.get(PROJECTS_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        let settings = match store.get(SETTINGS_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => AppSettings::default(),
        };
        let last_id_millis = projects
            .iter()
            .filter_map(|p| p.id.strip_prefix("SQ")?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(Repository {
            store,
            projects,
            settings,
            last_id_millis,
        })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn add_project(
        &mut self,
        personal_details: PersonalDetails,
        system_configuration: SystemConfiguration,
        images: Vec<String>,
        status: ProjectStatus,
    ) -> Result<String, RepoError> {
        let now = Utc::now();
        let id = self.next_id(now.timestamp_millis());
        let calculations = calculate_system_metrics(&system_configuration);
        self.projects.push(Project {
            id: id.clone(),
            personal_details,
            system_configuration,
            calculations,
            images,
            status,
            created_at: now,
            updated_at: now,
        });
        if let Err(e) = self.persist_projects() {
            self.projects.pop();
            return Err(e);
        }
        Ok(id)
    }

    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) -> Result<(), RepoError> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RepoError::NotFound { id: id.to_string() })?;

        let previous = self.projects[idx].clone();
        let project = &mut self.projects[idx];
        if let Some(details) = patch.personal_details {
            project.personal_details = details;
        }
        if let Some(config) = patch.system_configuration {
            project.calculations = calculate_system_metrics(&config);
            project.system_configuration = config;
        }
        if let Some(images) = patch.images {
            project.images = images;
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        project.updated_at = Utc::now();

        if let Err(e) = self.persist_projects() {
            self.projects[idx] = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn append_images(&mut self, id: &str, refs: Vec<String>) -> Result<(), RepoError> {
        let project = self
            .get_project(id)
            .ok_or_else(|| RepoError::NotFound { id: id.to_string() })?;
        let mut images = project.images.clone();
        images.extend(refs);
        self.update_project(
            id,
            ProjectPatch {
                images: Some(images),
                ..ProjectPatch::default()
            },
        )
    }

    /// No-op when the id does not exist.
    pub fn delete_project(&mut self, id: &str) -> Result<(), RepoError> {
        let Some(idx) = self.projects.iter().position(|p| p.id == id) else {
            return Ok(());
        };
        let removed = self.projects.remove(idx);
        if let Err(e) = self.persist_projects() {
            self.projects.insert(idx, removed);
            return Err(e);
        }
        Ok(())
    }

    pub fn update_settings(
        &mut self,
        default_gst_percentage: Option<f64>,
        default_base_price_per_kw: Option<f64>,
    ) -> Result<(), RepoError> {
        let previous = self.settings.clone();
        if let Some(gst) = default_gst_percentage {
            self.settings.default_gst_percentage = gst;
        }
        if let Some(price) = default_base_price_per_kw {
            self.settings.default_base_price_per_kw = price;
        }
        let json = match serde_json::to_string(&self.settings) {
            Ok(json) => json,
            Err(e) => {
                self.settings = previous;
                return Err(e.into());
            }
        };
        if let Err(e) = self.store.set(SETTINGS_KEY, &json) {
            self.settings = previous;
            return Err(e.into());
        }
        Ok(())
    }

    /// Pretty-printed JSON of the whole collection, for user download.
    pub fn export_json(&self) -> Result<Vec<u8>, RepoError> {
        Ok(serde_json::to_vec_pretty(&self.projects)?)
    }

    pub fn dashboard_stats(&self) -> DashboardStats {
        stats::dashboard_stats(&self.projects, Utc::now())
    }

    /// Destructive reset: wipes both store keys and the in-memory state.
    pub fn reset(&mut self) -> Result<(), RepoError> {
        self.store.clear()?;
        self.projects.clear();
        self.settings = AppSettings::default();
        Ok(())
    }

    fn persist_projects(&mut self) -> Result<(), RepoError> {
        let json = serde_json::to_string(&self.projects)?;
        self.store.set(PROJECTS_KEY, &json)?;
        Ok(())
    }

    // Millisecond timestamps, never at or below the high-water mark, so an
    // id freed by deletion is not handed out again.
    fn next_id(&mut self, millis: i64) -> String {
        let mut candidate = millis.max(self.last_id_millis + 1);
        loop {
            let id = format!("SQ{}", candidate);
            if self.get_project(&id).is_none() {
                self.last_id_millis = candidate;
                return id;
            }
            candidate += 1;
        }
    }

    #[cfg(test)]
    fn into_store(self) -> Box<dyn KvStore> {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use pretty_assertions::assert_eq;

    fn sample_details() -> PersonalDetails {
        PersonalDetails {
            name: "Asha Patel".to_string(),
            phone: "+91 98765 43210".to_string(),
            email: "asha@example.com".to_string(),
            address: "14 MG Road, Pune".to_string(),
        }
    }

    fn sample_config() -> SystemConfiguration {
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

    fn empty_repo() -> Repository {
        Repository::load(Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn add_then_get_returns_equal_record() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        assert!(!id.is_empty());

        let project = repo.get_project(&id).unwrap();
        assert_eq!(project.personal_details, sample_details());
        assert_eq!(project.system_configuration, sample_config());
        assert_eq!(project.status, ProjectStatus::Draft);
        assert_eq!(project.created_at, project.updated_at);
        assert_eq!(project.calculations.total_payable_amount, 609520.0);
    }

    #[test]
    fn ids_are_unique() {
        let mut repo = empty_repo();
        let a = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        let b = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let mut repo = empty_repo();
        // Tight add/delete/add cycles land in the same millisecond; the
        // freed id must still not come back.
        for _ in 0..50 {
            let first = repo
                .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
                .unwrap();
            repo.delete_project(&first).unwrap();
            let second = repo
                .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
                .unwrap();
            assert_ne!(first, second);
            repo.delete_project(&second).unwrap();
        }
    }

    #[test]
    fn id_high_water_mark_survives_reload() {
        let mut repo = empty_repo();
        let first = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();

        let mut reloaded = Repository::load(repo.into_store()).unwrap();
        let second = reloaded
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();

        assert_ne!(first, second);
        let first_millis: i64 = first.strip_prefix("SQ").unwrap().parse().unwrap();
        let second_millis: i64 = second.strip_prefix("SQ").unwrap().parse().unwrap();
        assert!(second_millis > first_millis);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        repo.delete_project(&id).unwrap();
        assert!(repo.get_project(&id).is_none());
    }

    #[test]
    fn delete_missing_id_is_a_noop() {
        let mut repo = empty_repo();
        assert!(repo.delete_project("SQ0").is_ok());
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut repo = empty_repo();
        let err = repo
            .update_project("SQ0", ProjectPatch::default())
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }

    #[test]
    fn status_patch_refreshes_updated_at() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        repo.update_project(
            &id,
            ProjectPatch {
                status: Some(ProjectStatus::Completed),
                ..ProjectPatch::default()
            },
        )
        .unwrap();
        let project = repo.get_project(&id).unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert!(project.updated_at >= project.created_at);
    }

    #[test]
    fn configuration_patch_recomputes_calculations() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();

        let mut config = sample_config();
        config.number_of_panels = 10;
        repo.update_project(
            &id,
            ProjectPatch {
                system_configuration: Some(config.clone()),
                ..ProjectPatch::default()
            },
        )
        .unwrap();

        let project = repo.get_project(&id).unwrap();
        assert_eq!(project.calculations, calculate_system_metrics(&config));
        assert_eq!(project.calculations.system_size, 5.4);
    }

    #[test]
    fn append_images_keeps_order() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(
                sample_details(),
                sample_config(),
                vec!["roof.jpg".to_string()],
                ProjectStatus::Draft,
            )
            .unwrap();
        repo.append_images(&id, vec!["meter.jpg".to_string()]).unwrap();
        assert_eq!(
            repo.get_project(&id).unwrap().images,
            vec!["roof.jpg".to_string(), "meter.jpg".to_string()]
        );
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let mut repo = Repository::load(Box::new(store)).unwrap();
        let err = repo.add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft);
        assert!(err.is_err());
        assert!(repo.projects().is_empty());
    }

    #[test]
    fn reload_restores_the_snapshot() {
        let mut repo = empty_repo();
        let id = repo
            .add_project(sample_details(), sample_config(), vec![], ProjectStatus::Completed)
            .unwrap();
        repo.update_settings(Some(18.0), None).unwrap();
        let expected = repo.projects().to_vec();

        let reloaded = Repository::load(repo.into_store()).unwrap();
        assert_eq!(reloaded.projects(), expected.as_slice());
        assert_eq!(reloaded.settings().default_gst_percentage, 18.0);
        assert_eq!(reloaded.settings().default_base_price_per_kw, 50000.0);
        assert!(reloaded.get_project(&id).is_some());
    }

    #[test]
    fn export_round_trips() {
        let mut repo = empty_repo();
        repo.add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        repo.add_project(sample_details(), sample_config(), vec![], ProjectStatus::Completed)
            .unwrap();

        let bytes = repo.export_json().unwrap();
        let parsed: Vec<Project> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.as_slice(), repo.projects());
    }

    #[test]
    fn reset_wipes_everything() {
        let mut repo = empty_repo();
        repo.add_project(sample_details(), sample_config(), vec![], ProjectStatus::Draft)
            .unwrap();
        repo.update_settings(Some(5.0), Some(42000.0)).unwrap();
        repo.reset().unwrap();
        assert!(repo.projects().is_empty());
        assert_eq!(repo.settings(), &AppSettings::default());

        let reloaded = Repository::load(repo.into_store()).unwrap();
        assert!(reloaded.projects().is_empty());
        assert_eq!(reloaded.settings(), &AppSettings::default());
    }
}
