//! Store wrapper that fails selected batch-file writes.

use super::{MemoryStore, Mutator, Store};
use crate::error::StoreError;
use crate::model::{
    BatchJob, BatchJobFile, BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject,
    DesignProjectPatch, NewBatchJob, NewBatchJobFile, NewBridgeProject, NewDesignProject, NewUser,
    ProcessingStatus, User,
};

type FilePredicate = Box<dyn Fn(&BatchJobFile) -> bool + Send + Sync>;

/// Delegates to a [`MemoryStore`] unless a configured rule rejects the write.
pub struct FaultyStore {
    inner: MemoryStore,
    /// Name of the upload whose file record cannot be created.
    reject_create: Option<String>,
    /// Rejects an update whose result matches.
    reject_update: Option<FilePredicate>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reject_create: None,
            reject_update: None,
        }
    }

    pub fn fail_file_create(mut self, file_name: &str) -> Self {
        self.reject_create = Some(file_name.to_string());
        self
    }

    pub fn fail_file_update(
        mut self,
        pred: impl Fn(&BatchJobFile) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.reject_update = Some(Box::new(pred));
        self
    }

    fn injected(key: &str) -> StoreError {
        StoreError::Conflict {
            entity: "injected write failure",
            key: key.to_string(),
        }
    }
}

impl Store for FaultyStore {
    fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(new)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.inner.get_user(id)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.get_user_by_username(username)
    }

    fn create_bridge_project(&self, new: NewBridgeProject) -> Result<BridgeProject, StoreError> {
        self.inner.create_bridge_project(new)
    }

    fn get_bridge_project(&self, id: &str) -> Result<Option<BridgeProject>, StoreError> {
        self.inner.get_bridge_project(id)
    }

    fn list_bridge_projects(&self, user_id: &str) -> Result<Vec<BridgeProject>, StoreError> {
        self.inner.list_bridge_projects(user_id)
    }

    fn update_bridge_project(
        &self,
        id: &str,
        f: Mutator<'_, BridgeProject>,
    ) -> Result<Option<BridgeProject>, StoreError> {
        self.inner.update_bridge_project(id, f)
    }

    fn create_bridge_parameters(
        &self,
        parameters: BridgeParameters,
    ) -> Result<BridgeParameters, StoreError> {
        self.inner.create_bridge_parameters(parameters)
    }

    fn get_bridge_parameters(
        &self,
        project_id: &str,
    ) -> Result<Option<BridgeParameters>, StoreError> {
        self.inner.get_bridge_parameters(project_id)
    }

    fn create_cross_sections(&self, sections: Vec<BridgeCrossSection>) -> Result<(), StoreError> {
        self.inner.create_cross_sections(sections)
    }

    fn list_cross_sections(
        &self,
        project_id: &str,
    ) -> Result<Vec<BridgeCrossSection>, StoreError> {
        self.inner.list_cross_sections(project_id)
    }

    fn delete_bridge_project(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_bridge_project(id)
    }

    fn create_batch_job(&self, new: NewBatchJob) -> Result<BatchJob, StoreError> {
        self.inner.create_batch_job(new)
    }

    fn get_batch_job(&self, id: &str) -> Result<Option<BatchJob>, StoreError> {
        self.inner.get_batch_job(id)
    }

    fn list_batch_jobs(&self, user_id: &str) -> Result<Vec<BatchJob>, StoreError> {
        self.inner.list_batch_jobs(user_id)
    }

    fn list_batch_jobs_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<BatchJob>, StoreError> {
        self.inner.list_batch_jobs_by_status(status)
    }

    fn update_batch_job(
        &self,
        id: &str,
        f: Mutator<'_, BatchJob>,
    ) -> Result<Option<BatchJob>, StoreError> {
        self.inner.update_batch_job(id, f)
    }

    fn delete_batch_job(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_batch_job(id)
    }

    fn create_batch_job_file(&self, new: NewBatchJobFile) -> Result<BatchJobFile, StoreError> {
        if self.reject_create.as_deref() == Some(new.file_name.as_str()) {
            return Err(Self::injected(&new.file_name));
        }
        self.inner.create_batch_job_file(new)
    }

    fn get_batch_job_file(&self, id: &str) -> Result<Option<BatchJobFile>, StoreError> {
        self.inner.get_batch_job_file(id)
    }

    fn list_batch_job_files(&self, job_id: &str) -> Result<Vec<BatchJobFile>, StoreError> {
        self.inner.list_batch_job_files(job_id)
    }

    fn update_batch_job_file(
        &self,
        id: &str,
        f: Mutator<'_, BatchJobFile>,
    ) -> Result<Option<BatchJobFile>, StoreError> {
        // Mutators only assign fields, so running one on a copy first is safe.
        if let Some(reject) = &self.reject_update {
            if let Some(mut preview) = self.inner.get_batch_job_file(id)? {
                f(&mut preview);
                if reject(&preview) {
                    return Err(Self::injected(id));
                }
            }
        }
        self.inner.update_batch_job_file(id, f)
    }

    fn create_design_project(&self, new: NewDesignProject) -> Result<DesignProject, StoreError> {
        self.inner.create_design_project(new)
    }

    fn get_design_project(&self, id: &str) -> Result<Option<DesignProject>, StoreError> {
        self.inner.get_design_project(id)
    }

    fn list_design_projects(&self) -> Result<Vec<DesignProject>, StoreError> {
        self.inner.list_design_projects()
    }

    fn update_design_project(
        &self,
        id: &str,
        patch: &DesignProjectPatch,
    ) -> Result<Option<DesignProject>, StoreError> {
        self.inner.update_design_project(id, patch)
    }

    fn delete_design_project(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_design_project(id)
    }
}
