//! Entity store shared by the coordinator, the processor and the HTTP layer.
//!
//! Every call is atomic with respect to other calls. Read-modify-write on a
//! single record goes through the `update_*` methods, which apply a closure
//! while the backend holds its lock (or transaction for SQLite).

use std::sync::Arc;

use chrono::Utc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{ConfigError, StoreError};
use crate::model::{
    new_id, BatchJob, BatchJobFile, BridgeCrossSection, BridgeParameters, BridgeProject,
    DesignProject, DesignProjectPatch, NewBatchJob, NewBatchJobFile, NewBridgeProject,
    NewDesignProject, NewUser, ProcessingStatus, User,
};

#[cfg(test)]
pub(crate) mod faulty;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Opens the backend selected by the storage settings.
pub fn open_store(storage: &StorageConfig) -> crate::Result<Arc<dyn Store>> {
    match storage.backend {
        StorageBackend::Memory => {
            log::info!("Using in-memory store; state is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let path = storage.database_path().ok_or_else(|| ConfigError::Validation {
                message: "no database path configured and no home directory found".to_string(),
            })?;
            log::info!("Opening database at {}", path.display());
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
    }
}

/// Closure applied to a record under the store's lock.
pub type Mutator<'a, T> = &'a mut dyn FnMut(&mut T);

pub trait Store: Send + Sync {
    // Users

    /// Fails with [`StoreError::Conflict`] if the username or id is taken.
    fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    // Bridge projects

    fn create_bridge_project(&self, new: NewBridgeProject) -> Result<BridgeProject, StoreError>;
    fn get_bridge_project(&self, id: &str) -> Result<Option<BridgeProject>, StoreError>;
    fn list_bridge_projects(&self, user_id: &str) -> Result<Vec<BridgeProject>, StoreError>;
    fn update_bridge_project(
        &self,
        id: &str,
        f: Mutator<'_, BridgeProject>,
    ) -> Result<Option<BridgeProject>, StoreError>;

    /// One parameter record per project; a second one is a conflict.
    fn create_bridge_parameters(
        &self,
        parameters: BridgeParameters,
    ) -> Result<BridgeParameters, StoreError>;
    fn get_bridge_parameters(
        &self,
        project_id: &str,
    ) -> Result<Option<BridgeParameters>, StoreError>;
    fn create_cross_sections(&self, sections: Vec<BridgeCrossSection>) -> Result<(), StoreError>;
    /// Ordered by `sequence`.
    fn list_cross_sections(&self, project_id: &str)
        -> Result<Vec<BridgeCrossSection>, StoreError>;
    /// Removes a project with its parameters and cross-sections.
    fn delete_bridge_project(&self, id: &str) -> Result<bool, StoreError>;

    // Batch jobs

    fn create_batch_job(&self, new: NewBatchJob) -> Result<BatchJob, StoreError>;
    fn get_batch_job(&self, id: &str) -> Result<Option<BatchJob>, StoreError>;
    /// Jobs of one user in creation order.
    fn list_batch_jobs(&self, user_id: &str) -> Result<Vec<BatchJob>, StoreError>;
    fn list_batch_jobs_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<BatchJob>, StoreError>;
    /// Returns `Ok(None)` if the job does not exist.
    fn update_batch_job(
        &self,
        id: &str,
        f: Mutator<'_, BatchJob>,
    ) -> Result<Option<BatchJob>, StoreError>;
    /// Removes a job and all of its file records.
    fn delete_batch_job(&self, id: &str) -> Result<bool, StoreError>;

    // Batch job files

    fn create_batch_job_file(&self, new: NewBatchJobFile) -> Result<BatchJobFile, StoreError>;
    fn get_batch_job_file(&self, id: &str) -> Result<Option<BatchJobFile>, StoreError>;
    /// Files of one job in upload order.
    fn list_batch_job_files(&self, job_id: &str) -> Result<Vec<BatchJobFile>, StoreError>;
    fn update_batch_job_file(
        &self,
        id: &str,
        f: Mutator<'_, BatchJobFile>,
    ) -> Result<Option<BatchJobFile>, StoreError>;

    // Design projects

    fn create_design_project(&self, new: NewDesignProject) -> Result<DesignProject, StoreError>;
    fn get_design_project(&self, id: &str) -> Result<Option<DesignProject>, StoreError>;
    fn list_design_projects(&self) -> Result<Vec<DesignProject>, StoreError>;
    fn update_design_project(
        &self,
        id: &str,
        patch: &DesignProjectPatch,
    ) -> Result<Option<DesignProject>, StoreError>;
    /// Returns whether the project existed.
    fn delete_design_project(&self, id: &str) -> Result<bool, StoreError>;

    /// Returns the user with `id`, creating it with `username` if missing.
    fn ensure_user(&self, id: &str, username: &str) -> Result<User, StoreError> {
        if let Some(user) = self.get_user(id)? {
            return Ok(user);
        }
        let user = self.create_user(NewUser {
            id: Some(id.to_string()),
            username: username.to_string(),
            password: String::new(),
        })?;
        log::info!("Created user '{}' ({})", user.username, user.id);
        Ok(user)
    }
}

// Record construction shared by the backends.

fn user_record(new: NewUser) -> User {
    User {
        id: new.id.unwrap_or_else(new_id),
        username: new.username,
        password: new.password,
    }
}

fn bridge_project_record(new: NewBridgeProject) -> BridgeProject {
    BridgeProject {
        id: new_id(),
        name: new.name,
        user_id: new.user_id,
        input_data: new.input_data,
        parameters: new.parameters,
        generated_drawing: None,
        created_at: Utc::now(),
    }
}

fn batch_job_record(new: NewBatchJob) -> BatchJob {
    BatchJob {
        id: new_id(),
        user_id: new.user_id,
        name: new.name,
        status: ProcessingStatus::Pending,
        total_files: new.total_files,
        processed_files: 0,
        failed_files: 0,
        created_at: Utc::now(),
        completed_at: None,
    }
}

fn batch_job_file_record(new: NewBatchJobFile) -> BatchJobFile {
    BatchJobFile {
        id: new_id(),
        batch_job_id: new.batch_job_id,
        project_id: new.project_id,
        file_name: new.file_name,
        file_size: new.file_size,
        status: new.status,
        progress: new.progress,
        error_message: new.error_message,
        current_step: new.current_step,
        estimated_time: new.estimated_time,
        started_at: None,
        completed_at: None,
    }
}

fn design_project_record(new: NewDesignProject) -> DesignProject {
    let now = Utc::now();
    DesignProject {
        id: new_id(),
        name: new.name,
        description: new.description,
        parameters: new.parameters,
        cross_section_data: new.cross_section_data,
        created_at: now,
        updated_at: now,
    }
}
