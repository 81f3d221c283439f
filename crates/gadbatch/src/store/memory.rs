//! In-memory store. State is lost when the process exits.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    batch_job_file_record, batch_job_record, bridge_project_record, design_project_record,
    user_record, Mutator, Store,
};
use crate::error::StoreError;
use crate::model::{
    BatchJob, BatchJobFile, BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject,
    DesignProjectPatch, NewBatchJob, NewBatchJobFile, NewBridgeProject, NewDesignProject, NewUser,
    ProcessingStatus, User,
};

/// Records keyed by id, iterated in insertion order.
struct Table<T> {
    rows: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, id: String, row: T) {
        if self.rows.insert(id.clone(), row).is_none() {
            self.order.push(id);
        }
    }

    fn get(&self, id: &str) -> Option<T> {
        self.rows.get(id).cloned()
    }

    fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    fn update(&mut self, id: &str, f: &mut dyn FnMut(&mut T)) -> Option<T> {
        let row = self.rows.get_mut(id)?;
        f(row);
        Some(row.clone())
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.rows.remove(id).is_none() {
            return false;
        }
        self.order.retain(|k| k != id);
        true
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.iter().filter(|row| pred(row)).cloned().collect()
    }
}

struct Tables {
    users: Table<User>,
    bridge_projects: Table<BridgeProject>,
    /// Keyed by project id.
    bridge_parameters: Table<BridgeParameters>,
    cross_sections: Table<BridgeCrossSection>,
    batch_jobs: Table<BatchJob>,
    batch_job_files: Table<BatchJobFile>,
    design_projects: Table<DesignProject>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                users: Table::new(),
                bridge_projects: Table::new(),
                bridge_parameters: Table::new(),
                cross_sections: Table::new(),
                batch_jobs: Table::new(),
                batch_job_files: Table::new(),
                design_projects: Table::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let user = user_record(new);
        let mut t = self.lock()?;
        if t.users.contains(&user.id) || t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict {
                entity: "user",
                key: user.username,
            });
        }
        t.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_bridge_project(&self, new: NewBridgeProject) -> Result<BridgeProject, StoreError> {
        let project = bridge_project_record(new);
        self.lock()?
            .bridge_projects
            .insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn get_bridge_project(&self, id: &str) -> Result<Option<BridgeProject>, StoreError> {
        Ok(self.lock()?.bridge_projects.get(id))
    }

    fn list_bridge_projects(&self, user_id: &str) -> Result<Vec<BridgeProject>, StoreError> {
        Ok(self
            .lock()?
            .bridge_projects
            .filter(|p| p.user_id.as_deref() == Some(user_id)))
    }

    fn update_bridge_project(
        &self,
        id: &str,
        f: Mutator<'_, BridgeProject>,
    ) -> Result<Option<BridgeProject>, StoreError> {
        Ok(self.lock()?.bridge_projects.update(id, f))
    }

    fn create_bridge_parameters(
        &self,
        parameters: BridgeParameters,
    ) -> Result<BridgeParameters, StoreError> {
        let mut t = self.lock()?;
        if t.bridge_parameters.contains(&parameters.project_id) {
            return Err(StoreError::Conflict {
                entity: "bridge parameters",
                key: parameters.project_id,
            });
        }
        t.bridge_parameters
            .insert(parameters.project_id.clone(), parameters.clone());
        Ok(parameters)
    }

    fn get_bridge_parameters(
        &self,
        project_id: &str,
    ) -> Result<Option<BridgeParameters>, StoreError> {
        Ok(self.lock()?.bridge_parameters.get(project_id))
    }

    fn create_cross_sections(&self, sections: Vec<BridgeCrossSection>) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        for section in sections {
            t.cross_sections.insert(section.id.clone(), section);
        }
        Ok(())
    }

    fn list_cross_sections(
        &self,
        project_id: &str,
    ) -> Result<Vec<BridgeCrossSection>, StoreError> {
        let mut sections = self
            .lock()?
            .cross_sections
            .filter(|s| s.project_id == project_id);
        sections.sort_by_key(|s| s.sequence);
        Ok(sections)
    }

    fn delete_bridge_project(&self, id: &str) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let sections: Vec<String> = t
            .cross_sections
            .filter(|s| s.project_id == id)
            .into_iter()
            .map(|s| s.id)
            .collect();
        for section in &sections {
            t.cross_sections.remove(section);
        }
        t.bridge_parameters.remove(id);
        Ok(t.bridge_projects.remove(id))
    }

    fn create_batch_job(&self, new: NewBatchJob) -> Result<BatchJob, StoreError> {
        let job = batch_job_record(new);
        self.lock()?.batch_jobs.insert(job.id.clone(), job.clone());
        log::debug!("Created batch job {} ({} files)", job.id, job.total_files);
        Ok(job)
    }

    fn get_batch_job(&self, id: &str) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.lock()?.batch_jobs.get(id))
    }

    fn list_batch_jobs(&self, user_id: &str) -> Result<Vec<BatchJob>, StoreError> {
        Ok(self.lock()?.batch_jobs.filter(|j| j.user_id == user_id))
    }

    fn list_batch_jobs_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<BatchJob>, StoreError> {
        Ok(self.lock()?.batch_jobs.filter(|j| j.status == status))
    }

    fn update_batch_job(
        &self,
        id: &str,
        f: Mutator<'_, BatchJob>,
    ) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.lock()?.batch_jobs.update(id, f))
    }

    fn delete_batch_job(&self, id: &str) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let files: Vec<String> = t
            .batch_job_files
            .filter(|f| f.batch_job_id == id)
            .into_iter()
            .map(|f| f.id)
            .collect();
        for file in &files {
            t.batch_job_files.remove(file);
        }
        Ok(t.batch_jobs.remove(id))
    }

    fn create_batch_job_file(&self, new: NewBatchJobFile) -> Result<BatchJobFile, StoreError> {
        let file = batch_job_file_record(new);
        self.lock()?
            .batch_job_files
            .insert(file.id.clone(), file.clone());
        Ok(file)
    }

    fn get_batch_job_file(&self, id: &str) -> Result<Option<BatchJobFile>, StoreError> {
        Ok(self.lock()?.batch_job_files.get(id))
    }

    fn list_batch_job_files(&self, job_id: &str) -> Result<Vec<BatchJobFile>, StoreError> {
        Ok(self
            .lock()?
            .batch_job_files
            .filter(|f| f.batch_job_id == job_id))
    }

    fn update_batch_job_file(
        &self,
        id: &str,
        f: Mutator<'_, BatchJobFile>,
    ) -> Result<Option<BatchJobFile>, StoreError> {
        Ok(self.lock()?.batch_job_files.update(id, f))
    }

    fn create_design_project(&self, new: NewDesignProject) -> Result<DesignProject, StoreError> {
        let project = design_project_record(new);
        self.lock()?
            .design_projects
            .insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn get_design_project(&self, id: &str) -> Result<Option<DesignProject>, StoreError> {
        Ok(self.lock()?.design_projects.get(id))
    }

    fn list_design_projects(&self) -> Result<Vec<DesignProject>, StoreError> {
        Ok(self.lock()?.design_projects.filter(|_| true))
    }

    fn update_design_project(
        &self,
        id: &str,
        patch: &DesignProjectPatch,
    ) -> Result<Option<DesignProject>, StoreError> {
        Ok(self
            .lock()?
            .design_projects
            .update(id, &mut |project| patch.apply(project)))
    }

    fn delete_design_project(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.design_projects.remove(id))
    }
}
