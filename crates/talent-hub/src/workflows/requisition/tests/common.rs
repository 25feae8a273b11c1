use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::requisition::catalog::WorkflowStepCatalog;
use crate::workflows::requisition::domain::{
    DepartmentRequest, ExperienceLevel, JobRequisition, JobType, LocationType, ReasonForHire,
    RequisitionId, RequisitionStatus, StageType,
};
use crate::workflows::requisition::forecast::{
    ForecastError, ForecastProvider, HeadcountForecast, StaticForecastProvider,
};
use crate::workflows::requisition::memory::InMemoryRequisitionStore;
use crate::workflows::requisition::repository::{
    RepositoryError, RequisitionFilter, RequisitionStore,
};
use crate::workflows::requisition::service::{RequisitionService, ServiceSettings};
use crate::workflows::requisition::transition::{ActionRequest, TransitionEngine, WorkflowAction};
use crate::workflows::requisition::requisition_router;

pub(super) fn department_request() -> DepartmentRequest {
    DepartmentRequest {
        job_title: "Engineer".to_string(),
        department: "Eng".to_string(),
        manager: "Jane".to_string(),
        number_of_openings: 2,
        job_type: JobType::FullTime,
        location: LocationType::Hybrid,
        skills: vec!["Rust".to_string(), "SQL".to_string()],
        experience_level: ExperienceLevel::MidLevel,
        education_requirements: None,
        salary_min: 80_000.0,
        salary_max: 120_000.0,
        reason_for_hire: ReasonForHire::TeamExpansion,
        start_date: None,
        notes: None,
    }
}

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// A freshly created record, built without a store so engine tests stay pure.
pub(super) fn fresh_record() -> JobRequisition {
    let created = fixed_time();
    JobRequisition {
        id: RequisitionId("req-1".to_string()),
        requisition_code: "REQ-20250314-ABC123".to_string(),
        department_request: department_request(),
        outcomes: Vec::new(),
        workflow_steps: WorkflowStepCatalog::standard().instantiate(),
        current_step: StageType::DepartmentRequest,
        status: RequisitionStatus::InProgress,
        created_by: "alice".to_string(),
        created_at: created,
        updated_at: created,
        is_active: true,
        version: 1,
    }
}

pub(super) fn action(action: WorkflowAction, reviewer: &str) -> ActionRequest {
    ActionRequest::new(action, reviewer)
}

/// Runs `record` through the given step ids with `approve`, stopping at the first error.
pub(super) fn approve_through(record: &JobRequisition, step_ids: &[&str]) -> JobRequisition {
    let engine = TransitionEngine::new();
    step_ids.iter().fold(record.clone(), |current, step_id| {
        engine
            .apply(
                &current,
                step_id,
                &action(WorkflowAction::Approve, "reviewer"),
                fixed_time(),
            )
            .expect("approval succeeds")
    })
}

pub(super) type MemoryService = RequisitionService<InMemoryRequisitionStore, StaticForecastProvider>;

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryRequisitionStore>) {
    let store = Arc::new(InMemoryRequisitionStore::default());
    let service = RequisitionService::new(store.clone(), Arc::new(StaticForecastProvider::standard()));
    (service, store)
}

pub(super) fn build_service_with_limit(page_limit: usize) -> MemoryService {
    RequisitionService::with_settings(
        Arc::new(InMemoryRequisitionStore::default()),
        Arc::new(StaticForecastProvider::standard()),
        ServiceSettings { page_limit },
    )
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    requisition_router(Arc::new(service))
}

/// Store whose every call fails as if the backing database were offline.
pub(super) struct UnavailableStore;

impl RequisitionStore for UnavailableStore {
    fn insert(&self, _record: JobRequisition) -> Result<JobRequisition, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RequisitionId) -> Result<Option<JobRequisition>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_by_code(&self, _code: &str) -> Result<Option<JobRequisition>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn put(
        &self,
        _record: JobRequisition,
        _expected_version: u64,
    ) -> Result<JobRequisition, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn query(
        &self,
        _filter: &RequisitionFilter,
        _skip: usize,
        _limit: usize,
    ) -> Result<Vec<JobRequisition>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Wraps the in-memory store and lets a scripted "other writer" sneak in right
/// before selected `put` calls, forcing the caller's compare-and-swap to fail.
pub(super) struct RacingStore {
    pub(super) inner: InMemoryRequisitionStore,
    interference: Box<dyn Fn(&InMemoryRequisitionStore, &RequisitionId) + Send + Sync>,
    remaining: std::sync::Mutex<usize>,
    pub(super) raced: AtomicBool,
}

impl RacingStore {
    /// Interferes before the next `races` writes.
    pub(super) fn new<I>(races: usize, interference: I) -> Self
    where
        I: Fn(&InMemoryRequisitionStore, &RequisitionId) + Send + Sync + 'static,
    {
        Self {
            inner: InMemoryRequisitionStore::default(),
            interference: Box::new(interference),
            remaining: std::sync::Mutex::new(races),
            raced: AtomicBool::new(false),
        }
    }
}

impl RequisitionStore for RacingStore {
    fn insert(&self, record: JobRequisition) -> Result<JobRequisition, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &RequisitionId) -> Result<Option<JobRequisition>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_by_code(&self, code: &str) -> Result<Option<JobRequisition>, RepositoryError> {
        self.inner.fetch_by_code(code)
    }

    fn put(
        &self,
        record: JobRequisition,
        expected_version: u64,
    ) -> Result<JobRequisition, RepositoryError> {
        let interfere = {
            let mut remaining = self.remaining.lock().expect("race counter poisoned");
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };
        if interfere {
            (self.interference)(&self.inner, &record.id);
            self.raced.store(true, Ordering::SeqCst);
        }
        self.inner.put(record, expected_version)
    }

    fn query(
        &self,
        filter: &RequisitionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<JobRequisition>, RepositoryError> {
        self.inner.query(filter, skip, limit)
    }
}

/// Re-saves the stored record unchanged, which only bumps its version.
pub(super) fn touch(store: &InMemoryRequisitionStore, id: &RequisitionId) {
    let stored = store
        .fetch(id)
        .expect("fetch succeeds")
        .expect("record present");
    let version = stored.version;
    store.put(stored, version).expect("touch succeeds");
}

/// Applies a competing approval of the current step, as a second reviewer would.
pub(super) fn approve_current(store: &InMemoryRequisitionStore, id: &RequisitionId) {
    let stored = store
        .fetch(id)
        .expect("fetch succeeds")
        .expect("record present");
    let step_id = stored
        .active_step()
        .map(|step| step.id.clone())
        .expect("a current step");
    let next = TransitionEngine::new()
        .apply(
            &stored,
            &step_id,
            &ActionRequest::new(WorkflowAction::Approve, "competing reviewer"),
            Utc::now(),
        )
        .expect("competing approval succeeds");
    store.put(next, stored.version).expect("competing write succeeds");
}

pub(super) struct FailingForecast;

impl ForecastProvider for FailingForecast {
    fn forecast(&self) -> Result<Vec<HeadcountForecast>, ForecastError> {
        Err(ForecastError::Unavailable("planning feed offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Rejects the first `collisions` inserts as duplicates before delegating.
pub(super) struct CollidingStore {
    pub(super) inner: InMemoryRequisitionStore,
    collisions: std::sync::Mutex<usize>,
    pub(super) attempts: std::sync::atomic::AtomicUsize,
}

impl CollidingStore {
    pub(super) fn new(collisions: usize) -> Self {
        Self {
            inner: InMemoryRequisitionStore::default(),
            collisions: std::sync::Mutex::new(collisions),
            attempts: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl RequisitionStore for CollidingStore {
    fn insert(&self, record: JobRequisition) -> Result<JobRequisition, RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut remaining = self.collisions.lock().expect("collision counter poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(RepositoryError::Duplicate(record.id));
        }
        drop(remaining);
        self.inner.insert(record)
    }

    fn fetch(&self, id: &RequisitionId) -> Result<Option<JobRequisition>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_by_code(&self, code: &str) -> Result<Option<JobRequisition>, RepositoryError> {
        self.inner.fetch_by_code(code)
    }

    fn put(
        &self,
        record: JobRequisition,
        expected_version: u64,
    ) -> Result<JobRequisition, RepositoryError> {
        self.inner.put(record, expected_version)
    }

    fn query(
        &self,
        filter: &RequisitionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<JobRequisition>, RepositoryError> {
        self.inner.query(filter, skip, limit)
    }
}
