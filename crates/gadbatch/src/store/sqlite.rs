//! SQLite-backed store. Updates run read-apply-write inside one transaction.

use std::path::Path;

use super::{
    batch_job_file_record, batch_job_record, bridge_project_record, design_project_record,
    user_record, Mutator, Store,
};
use crate::db::{batch_repo, project_repo, user_repo, Database};
use crate::error::StoreError;
use crate::model::{
    BatchJob, BatchJobFile, BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject,
    DesignProjectPatch, NewBatchJob, NewBatchJobFile, NewBridgeProject, NewDesignProject, NewUser,
    ProcessingStatus, User,
};

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database file, creating it and running migrations as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl Store for SqliteStore {
    fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let user = user_record(new);
        self.db.with_transaction(|tx| {
            if user_repo::find_by_id(tx, &user.id)?.is_some()
                || user_repo::find_by_username(tx, &user.username)?.is_some()
            {
                return Err(StoreError::Conflict {
                    entity: "user",
                    key: user.username.clone(),
                });
            }
            user_repo::insert(tx, &user)?;
            Ok(user)
        })
    }

    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.db.with_conn(|conn| user_repo::find_by_id(conn, id))?)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| user_repo::find_by_username(conn, username))?)
    }

    fn create_bridge_project(&self, new: NewBridgeProject) -> Result<BridgeProject, StoreError> {
        let project = bridge_project_record(new);
        self.db
            .with_conn(|conn| project_repo::insert_project(conn, &project))?;
        Ok(project)
    }

    fn get_bridge_project(&self, id: &str) -> Result<Option<BridgeProject>, StoreError> {
        Ok(self.db.with_conn(|conn| project_repo::find_project(conn, id))?)
    }

    fn list_bridge_projects(&self, user_id: &str) -> Result<Vec<BridgeProject>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| project_repo::list_projects_by_user(conn, user_id))?)
    }

    fn update_bridge_project(
        &self,
        id: &str,
        f: Mutator<'_, BridgeProject>,
    ) -> Result<Option<BridgeProject>, StoreError> {
        self.db.with_transaction(|tx| {
            let Some(mut project) = project_repo::find_project(tx, id)? else {
                return Ok(None);
            };
            f(&mut project);
            project_repo::update_project(tx, &project)?;
            Ok(Some(project))
        })
    }

    fn create_bridge_parameters(
        &self,
        parameters: BridgeParameters,
    ) -> Result<BridgeParameters, StoreError> {
        self.db.with_transaction(|tx| {
            if project_repo::find_parameters(tx, &parameters.project_id)?.is_some() {
                return Err(StoreError::Conflict {
                    entity: "bridge parameters",
                    key: parameters.project_id.clone(),
                });
            }
            project_repo::insert_parameters(tx, &parameters)?;
            Ok(parameters)
        })
    }

    fn get_bridge_parameters(
        &self,
        project_id: &str,
    ) -> Result<Option<BridgeParameters>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| project_repo::find_parameters(conn, project_id))?)
    }

    fn create_cross_sections(&self, sections: Vec<BridgeCrossSection>) -> Result<(), StoreError> {
        self.db.with_transaction(|tx| {
            for section in &sections {
                project_repo::insert_cross_section(tx, section)?;
            }
            Ok(())
        })
    }

    fn list_cross_sections(
        &self,
        project_id: &str,
    ) -> Result<Vec<BridgeCrossSection>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| project_repo::list_cross_sections(conn, project_id))?)
    }

    fn delete_bridge_project(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .db
            .with_transaction(|tx| project_repo::delete_project(tx, id))?)
    }

    fn create_batch_job(&self, new: NewBatchJob) -> Result<BatchJob, StoreError> {
        let job = batch_job_record(new);
        self.db.with_conn(|conn| batch_repo::insert_job(conn, &job))?;
        log::debug!("Created batch job {} ({} files)", job.id, job.total_files);
        Ok(job)
    }

    fn get_batch_job(&self, id: &str) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.db.with_conn(|conn| batch_repo::find_job(conn, id))?)
    }

    fn list_batch_jobs(&self, user_id: &str) -> Result<Vec<BatchJob>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| batch_repo::list_jobs_by_user(conn, user_id))?)
    }

    fn list_batch_jobs_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<BatchJob>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| batch_repo::list_jobs_by_status(conn, status))?)
    }

    fn update_batch_job(
        &self,
        id: &str,
        f: Mutator<'_, BatchJob>,
    ) -> Result<Option<BatchJob>, StoreError> {
        self.db.with_transaction(|tx| {
            let Some(mut job) = batch_repo::find_job(tx, id)? else {
                return Ok(None);
            };
            f(&mut job);
            batch_repo::update_job(tx, &job)?;
            Ok(Some(job))
        })
    }

    fn delete_batch_job(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .db
            .with_transaction(|tx| batch_repo::delete_job(tx, id))?)
    }

    fn create_batch_job_file(&self, new: NewBatchJobFile) -> Result<BatchJobFile, StoreError> {
        let file = batch_job_file_record(new);
        self.db.with_conn(|conn| batch_repo::insert_file(conn, &file))?;
        Ok(file)
    }

    fn get_batch_job_file(&self, id: &str) -> Result<Option<BatchJobFile>, StoreError> {
        Ok(self.db.with_conn(|conn| batch_repo::find_file(conn, id))?)
    }

    fn list_batch_job_files(&self, job_id: &str) -> Result<Vec<BatchJobFile>, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| batch_repo::list_files_by_job(conn, job_id))?)
    }

    fn update_batch_job_file(
        &self,
        id: &str,
        f: Mutator<'_, BatchJobFile>,
    ) -> Result<Option<BatchJobFile>, StoreError> {
        self.db.with_transaction(|tx| {
            let Some(mut file) = batch_repo::find_file(tx, id)? else {
                return Ok(None);
            };
            f(&mut file);
            batch_repo::update_file(tx, &file)?;
            Ok(Some(file))
        })
    }

    fn create_design_project(&self, new: NewDesignProject) -> Result<DesignProject, StoreError> {
        let project = design_project_record(new);
        self.db
            .with_conn(|conn| project_repo::insert_design(conn, &project))?;
        Ok(project)
    }

    fn get_design_project(&self, id: &str) -> Result<Option<DesignProject>, StoreError> {
        Ok(self.db.with_conn(|conn| project_repo::find_design(conn, id))?)
    }

    fn list_design_projects(&self) -> Result<Vec<DesignProject>, StoreError> {
        Ok(self.db.with_conn(project_repo::list_designs)?)
    }

    fn update_design_project(
        &self,
        id: &str,
        patch: &DesignProjectPatch,
    ) -> Result<Option<DesignProject>, StoreError> {
        self.db.with_transaction(|tx| {
            let Some(mut project) = project_repo::find_design(tx, id)? else {
                return Ok(None);
            };
            patch.apply(&mut project);
            project_repo::update_design(tx, &project)?;
            Ok(Some(project))
        })
    }

    fn delete_design_project(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .db
            .with_conn(|conn| project_repo::delete_design(conn, id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_users() {
        contract::users(&store());
    }

    #[test]
    fn test_batch_jobs() {
        contract::batch_jobs(&store());
    }

    #[test]
    fn test_batch_job_files() {
        contract::batch_job_files(&store());
    }

    #[test]
    fn test_bridge_projects() {
        contract::bridge_projects(&store());
    }

    #[test]
    fn test_design_projects() {
        contract::design_projects(&store());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gadbatch.db");

        let job_id = {
            let store = SqliteStore::open(&path).unwrap();
            let user = contract::seed_user(&store);
            store
                .create_batch_job(NewBatchJob {
                    user_id: user.id,
                    name: "Batch".to_string(),
                    total_files: 1,
                })
                .unwrap()
                .id
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let job = reopened.get_batch_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, ProcessingStatus::Pending);
        assert_eq!(job.total_files, 1);
    }
}
