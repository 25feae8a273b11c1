use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::WorkflowStepCatalog;
use super::domain::{
    require_text, BudgetApprovalOutcome, DepartmentRequest, FinalApprovalOutcome,
    HrReviewOutcome, JobRequisition, RequisitionId, RequisitionStatus, StageOutcome, StageType,
    ValidationError,
};
use super::forecast::{ForecastError, ForecastProvider, HeadcountForecast};
use super::report::RecruitmentStats;
use super::repository::{RepositoryError, RequisitionFilter, RequisitionPage, RequisitionStore};
use super::transition::{ActionRequest, TransitionEngine, TransitionError};

pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Tunables the service reads from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Upper bound applied to every `list` page.
    pub page_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Creation payload: the department request plus the identity submitting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionSubmission {
    pub department_request: DepartmentRequest,
    pub created_by: String,
}

/// Corrective field patch. Never touches steps, status or current_step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequisitionPatch {
    #[serde(default)]
    pub department_request: Option<DepartmentRequest>,
    #[serde(default)]
    pub hr_review: Option<HrReviewOutcome>,
    #[serde(default)]
    pub budget_approval: Option<BudgetApprovalOutcome>,
    #[serde(default)]
    pub final_approval: Option<FinalApprovalOutcome>,
}

impl RequisitionPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.department_request {
            Some(request) => request.validate(),
            None => Ok(()),
        }
    }

    fn apply_to(&self, record: &mut JobRequisition) {
        if let Some(request) = &self.department_request {
            record.department_request = request.clone();
        }
        if let Some(outcome) = &self.hr_review {
            record.record_outcome(StageOutcome::HrReview(outcome.clone()));
        }
        if let Some(outcome) = &self.budget_approval {
            record.record_outcome(StageOutcome::BudgetApproval(outcome.clone()));
        }
        if let Some(outcome) = &self.final_approval {
            record.record_outcome(StageOutcome::FinalApproval(outcome.clone()));
        }
    }
}

/// Orchestrates requisition creation, workflow actions and reporting over a store.
pub struct RequisitionService<S, F> {
    store: Arc<S>,
    forecasts: Arc<F>,
    catalog: Arc<WorkflowStepCatalog>,
    engine: Arc<TransitionEngine>,
    settings: ServiceSettings,
}

impl<S, F> RequisitionService<S, F>
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    pub fn new(store: Arc<S>, forecasts: Arc<F>) -> Self {
        Self::with_settings(store, forecasts, ServiceSettings::default())
    }

    pub fn with_settings(store: Arc<S>, forecasts: Arc<F>, settings: ServiceSettings) -> Self {
        Self::with_components(
            store,
            forecasts,
            Arc::new(WorkflowStepCatalog::standard()),
            Arc::new(TransitionEngine::new()),
            settings,
        )
    }

    pub fn with_components(
        store: Arc<S>,
        forecasts: Arc<F>,
        catalog: Arc<WorkflowStepCatalog>,
        engine: Arc<TransitionEngine>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            forecasts,
            catalog,
            engine,
            settings,
        }
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Validate and persist a new requisition with the catalog steps installed.
    pub fn create(
        &self,
        request: DepartmentRequest,
        created_by: &str,
    ) -> Result<JobRequisition, RequisitionServiceError> {
        request.validate()?;
        require_text("created_by", created_by)?;

        let now = Utc::now();
        let mut record = JobRequisition {
            id: RequisitionId(Uuid::new_v4().to_string()),
            requisition_code: requisition_code(now),
            department_request: request,
            outcomes: Vec::new(),
            workflow_steps: self.catalog.instantiate(),
            current_step: StageType::DepartmentRequest,
            status: RequisitionStatus::InProgress,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            is_active: true,
            version: 0,
        };

        // Codes carry only six random characters, so a clash gets one fresh draw.
        let stored = match self.store.insert(record.clone()) {
            Err(RepositoryError::Duplicate(taken)) => {
                warn!(
                    requisition_id = %taken,
                    code = %record.requisition_code,
                    "requisition identifier already taken; regenerating"
                );
                record.id = RequisitionId(Uuid::new_v4().to_string());
                record.requisition_code = requisition_code(now);
                self.store.insert(record)?
            }
            inserted => inserted?,
        };
        info!(
            requisition_id = %stored.id,
            code = %stored.requisition_code,
            department = %stored.department_request.department,
            "requisition created"
        );
        Ok(stored)
    }

    /// Fetch by internal id or requisition code. Retired records are still returned.
    pub fn get(&self, id_or_code: &str) -> Result<JobRequisition, RequisitionServiceError> {
        self.find(id_or_code)?
            .ok_or_else(|| RequisitionServiceError::NotFound(id_or_code.to_string()))
    }

    pub fn list(
        &self,
        filter: &RequisitionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<RequisitionPage, RequisitionServiceError> {
        let limit = limit.min(self.settings.page_limit);
        let items = self.store.query(filter, skip, limit)?;
        Ok(RequisitionPage { items, skip, limit })
    }

    /// Apply a workflow action to one step and persist the resulting record.
    pub fn act(
        &self,
        id_or_code: &str,
        step_id: &str,
        request: &ActionRequest,
    ) -> Result<JobRequisition, RequisitionServiceError> {
        require_text("reviewer", &request.reviewer)?;

        let saved = self.save_with_retry(id_or_code, |current, at| {
            Ok(self.engine.apply(current, step_id, request, at)?)
        })?;

        info!(
            requisition_id = %saved.id,
            step_id,
            action = %request.action,
            status = %saved.status,
            current_step = %saved.current_step,
            "workflow action applied"
        );
        Ok(saved)
    }

    pub fn update(
        &self,
        id_or_code: &str,
        patch: RequisitionPatch,
    ) -> Result<JobRequisition, RequisitionServiceError> {
        patch.validate()?;

        let saved = self.save_with_retry(id_or_code, |current, at| {
            let mut next = current.clone();
            patch.apply_to(&mut next);
            next.updated_at = at;
            Ok(next)
        })?;

        info!(requisition_id = %saved.id, "requisition patched");
        Ok(saved)
    }

    /// Retire a requisition. Returns `false` when it is unknown or already retired.
    pub fn soft_delete(&self, id_or_code: &str) -> Result<bool, RequisitionServiceError> {
        let record = match self.find(id_or_code)? {
            Some(record) if record.is_active => record,
            _ => return Ok(false),
        };

        let saved = self.save_with_retry(&record.id.0, |current, at| {
            let mut next = current.clone();
            next.is_active = false;
            next.updated_at = at;
            Ok(next)
        })?;

        info!(requisition_id = %saved.id, "requisition retired");
        Ok(true)
    }

    pub fn stats(&self) -> Result<RecruitmentStats, RequisitionServiceError> {
        let records = self
            .store
            .query(&RequisitionFilter::default(), 0, usize::MAX)?;
        Ok(RecruitmentStats::from_records(&records))
    }

    pub fn forecast(&self) -> Result<Vec<HeadcountForecast>, RequisitionServiceError> {
        Ok(self.forecasts.forecast()?)
    }

    fn find(&self, id_or_code: &str) -> Result<Option<JobRequisition>, RequisitionServiceError> {
        let id = RequisitionId(id_or_code.to_string());
        if let Some(record) = self.store.fetch(&id)? {
            return Ok(Some(record));
        }
        Ok(self.store.fetch_by_code(id_or_code)?)
    }

    fn load_active(&self, id_or_code: &str) -> Result<JobRequisition, RequisitionServiceError> {
        match self.find(id_or_code)? {
            Some(record) if record.is_active => Ok(record),
            _ => Err(RequisitionServiceError::NotFound(id_or_code.to_string())),
        }
    }

    /// Load, mutate and compare-and-swap the record, re-reading once on a lost race.
    ///
    /// When the retry finds that a concurrent writer already moved the workflow so the
    /// change no longer applies, the caller sees `Conflict` rather than the engine's
    /// rejection: the state the request was issued against is gone.
    fn save_with_retry<M>(
        &self,
        id_or_code: &str,
        mutate: M,
    ) -> Result<JobRequisition, RequisitionServiceError>
    where
        M: Fn(&JobRequisition, DateTime<Utc>) -> Result<JobRequisition, RequisitionServiceError>,
    {
        let mut retrying = false;

        loop {
            let current = self.load_active(id_or_code)?;
            let next = match mutate(&current, Utc::now()) {
                Ok(next) => next,
                Err(RequisitionServiceError::Transition(err))
                    if retrying && !matches!(err, TransitionError::StepNotFound { .. }) =>
                {
                    warn!(
                        requisition_id = %current.id,
                        error = %err,
                        "change no longer applies after concurrent write"
                    );
                    return Err(RequisitionServiceError::Conflict(current.id.0));
                }
                Err(err) => return Err(err),
            };

            match self.store.put(next, current.version) {
                Ok(saved) => return Ok(saved),
                Err(RepositoryError::Conflict { expected, found, .. }) if !retrying => {
                    warn!(
                        requisition_id = %current.id,
                        expected,
                        found,
                        "optimistic concurrency conflict; retrying once"
                    );
                    retrying = true;
                }
                Err(RepositoryError::Conflict { expected, found, .. }) => {
                    debug!(requisition_id = %current.id, expected, found, "conflict after retry");
                    return Err(RequisitionServiceError::Conflict(current.id.0));
                }
                Err(RepositoryError::NotFound(_)) => {
                    return Err(RequisitionServiceError::NotFound(id_or_code.to_string()))
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}

fn requisition_code(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("REQ-{}-{}", now.format("%Y%m%d"), suffix.to_ascii_uppercase())
}

/// Error raised by the requisition service.
#[derive(Debug, thiserror::Error)]
pub enum RequisitionServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("requisition {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("requisition {0} was modified concurrently; reload and retry")]
    Conflict(String),
    #[error("requisition {0} already exists")]
    Duplicate(String),
    #[error("requisition store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl From<RepositoryError> for RequisitionServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Duplicate(id) => Self::Duplicate(id.0),
            RepositoryError::NotFound(id) => Self::NotFound(id.0),
            RepositoryError::Conflict { id, .. } => Self::Conflict(id.0),
            RepositoryError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}
