use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{JobRequisition, RequisitionId};
use super::repository::{RepositoryError, RequisitionFilter, RequisitionStore};

type RecordMap = HashMap<RequisitionId, JobRequisition>;

/// Process-local store used by the demo server and the test suites.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRequisitionStore {
    records: Arc<Mutex<RecordMap>>,
}

impl InMemoryRequisitionStore {
    fn lock(&self) -> Result<MutexGuard<'_, RecordMap>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequisitionStore for InMemoryRequisitionStore {
    fn insert(&self, mut record: JobRequisition) -> Result<JobRequisition, RepositoryError> {
        let mut guard = self.lock()?;
        let code_taken = guard
            .values()
            .any(|existing| existing.requisition_code == record.requisition_code);
        if guard.contains_key(&record.id) || code_taken {
            return Err(RepositoryError::Duplicate(record.id));
        }
        record.version = 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RequisitionId) -> Result<Option<JobRequisition>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_code(&self, code: &str) -> Result<Option<JobRequisition>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .find(|record| record.requisition_code == code)
            .cloned())
    }

    fn put(
        &self,
        mut record: JobRequisition,
        expected_version: u64,
    ) -> Result<JobRequisition, RepositoryError> {
        let mut guard = self.lock()?;
        let Some(stored) = guard.get(&record.id) else {
            return Err(RepositoryError::NotFound(record.id));
        };
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict {
                id: record.id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        record.version = expected_version + 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn query(
        &self,
        filter: &RequisitionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<JobRequisition>, RepositoryError> {
        let guard = self.lock()?;
        let mut matching: Vec<&JobRequisition> =
            guard.values().filter(|record| filter.matches(record)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}
