//! Requisition approval workflow.
//!
//! A requisition moves through four fixed stages (department request, HR review, budget
//! approval, final approval). [`TransitionEngine`] decides every move; the
//! [`RequisitionService`] owns load/transition/save sequencing against a
//! [`RequisitionStore`] with optimistic concurrency.

pub mod catalog;
pub mod domain;
pub mod forecast;
pub mod memory;
pub mod normalize;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod transition;

#[cfg(test)]
mod tests;

pub use catalog::{StepTemplate, WorkflowStepCatalog};
pub use domain::{
    BudgetApprovalOutcome, DepartmentRequest, EducationLevel, ExperienceLevel,
    FinalApprovalOutcome, HrReviewOutcome, JobRequisition, JobType, LocationType,
    ReasonForHire, RequisitionId, RequisitionStatus, ReviewDecision, StageOutcome, StageType,
    StepStatus, ValidationError, WorkflowStep,
};
pub use forecast::{ForecastError, ForecastProvider, HeadcountForecast, StaticForecastProvider};
pub use memory::InMemoryRequisitionStore;
pub use report::RecruitmentStats;
pub use repository::{RepositoryError, RequisitionFilter, RequisitionPage, RequisitionStore};
pub use router::requisition_router;
pub use service::{
    RequisitionPatch, RequisitionService, RequisitionServiceError, RequisitionSubmission,
    ServiceSettings, DEFAULT_PAGE_LIMIT,
};
pub use transition::{ActionRequest, TransitionEngine, TransitionError, WorkflowAction};
