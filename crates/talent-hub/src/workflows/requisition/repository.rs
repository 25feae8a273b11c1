use serde::{Deserialize, Serialize};

use super::domain::{JobRequisition, RequisitionId, RequisitionStatus};

/// Storage abstraction so the service can run against any durable keyed store.
///
/// `put` is a compare-and-swap on the record version: implementations must reject the
/// write with [`RepositoryError::Conflict`] when the stored version differs from
/// `expected_version`, and must bump the version on success.
pub trait RequisitionStore: Send + Sync {
    fn insert(&self, record: JobRequisition) -> Result<JobRequisition, RepositoryError>;
    fn fetch(&self, id: &RequisitionId) -> Result<Option<JobRequisition>, RepositoryError>;
    fn fetch_by_code(&self, code: &str) -> Result<Option<JobRequisition>, RepositoryError>;
    fn put(
        &self,
        record: JobRequisition,
        expected_version: u64,
    ) -> Result<JobRequisition, RepositoryError>;
    /// Active records matching `filter`, newest first.
    fn query(
        &self,
        filter: &RequisitionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<JobRequisition>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("requisition {0} already exists")]
    Duplicate(RequisitionId),
    #[error("requisition {0} not found")]
    NotFound(RequisitionId),
    #[error("version conflict on {id}: expected {expected}, found {found}")]
    Conflict {
        id: RequisitionId,
        expected: u64,
        found: u64,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionFilter {
    #[serde(default)]
    pub status: Option<RequisitionStatus>,
    #[serde(default)]
    pub department: Option<String>,
}

impl RequisitionFilter {
    pub fn matches(&self, record: &JobRequisition) -> bool {
        let status_matches = self.status.map_or(true, |status| record.status == status);
        let department_matches = self
            .department
            .as_deref()
            .map_or(true, |department| record.department_request.department == department);
        record.is_active && status_matches && department_matches
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequisitionPage {
    pub items: Vec<JobRequisition>,
    pub skip: usize,
    pub limit: usize,
}
