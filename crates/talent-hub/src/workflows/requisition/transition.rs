//! Pure decision logic for the approval pipeline.
//!
//! `TransitionEngine::apply` never mutates its input: it either returns a complete,
//! self-consistent record image or rejects the action, leaving persistence to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::{
    BudgetApprovalOutcome, FinalApprovalOutcome, HrReviewOutcome, JobRequisition,
    RequisitionStatus, ReviewDecision, StageOutcome, StageType, StepStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Decline,
    RequestInfo,
}

impl WorkflowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Decline => "decline",
            Self::RequestInfo => "request_info",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An action against one workflow step, as issued by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: WorkflowAction,
    pub reviewer: String,
    #[serde(default)]
    pub comments: Option<String>,
}

impl ActionRequest {
    pub fn new(action: WorkflowAction, reviewer: impl Into<String>) -> Self {
        Self {
            action,
            reviewer: reviewer.into(),
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("workflow step {step_id} not found")]
    StepNotFound { step_id: String },
    #[error("cannot {action} step {step_id} while it is {status}")]
    InvalidTransition {
        step_id: String,
        action: WorkflowAction,
        status: StepStatus,
    },
    #[error("requisition is already {status}; {action} is not allowed")]
    AlreadyTerminal {
        status: RequisitionStatus,
        action: WorkflowAction,
    },
}

/// Stateless transition rules shared by every service instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionEngine;

impl TransitionEngine {
    pub const fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        record: &JobRequisition,
        step_id: &str,
        request: &ActionRequest,
        at: DateTime<Utc>,
    ) -> Result<JobRequisition, TransitionError> {
        let index = record
            .workflow_steps
            .iter()
            .position(|step| step.id == step_id)
            .ok_or_else(|| TransitionError::StepNotFound {
                step_id: step_id.to_string(),
            })?;

        self.guard(record, index, request.action)?;

        let mut next = record.clone();
        match request.action {
            WorkflowAction::Submit | WorkflowAction::Approve => {
                advance(&mut next, index, request, at)
            }
            WorkflowAction::Decline => decline(&mut next, index, request, at),
            WorkflowAction::RequestInfo => rewind(&mut next, index, request, at),
        }
        next.updated_at = at;

        debug_assert!(next.is_consistent(), "transition produced inconsistent record");
        Ok(next)
    }

    fn guard(
        &self,
        record: &JobRequisition,
        index: usize,
        action: WorkflowAction,
    ) -> Result<(), TransitionError> {
        let step = &record.workflow_steps[index];

        // request_info rewinds from any step, terminal records included.
        if action == WorkflowAction::RequestInfo {
            return Ok(());
        }

        if record.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                status: record.status,
                action,
            });
        }

        let submit_elsewhere =
            action == WorkflowAction::Submit && step.stage != StageType::DepartmentRequest;
        if submit_elsewhere || step.status != StepStatus::Current {
            return Err(TransitionError::InvalidTransition {
                step_id: step.id.clone(),
                action,
                status: step.status,
            });
        }

        Ok(())
    }
}

fn advance(record: &mut JobRequisition, index: usize, request: &ActionRequest, at: DateTime<Utc>) {
    let stage = {
        let step = &mut record.workflow_steps[index];
        step.stamp(
            StepStatus::Approved,
            &request.reviewer,
            request.comments.as_deref(),
            at,
        );
        step.stage
    };

    if let Some(outcome) = outcome_for(stage, record, request, at) {
        record.record_outcome(outcome);
    }

    match record.workflow_steps.get_mut(index + 1) {
        Some(following) => {
            following.status = StepStatus::Current;
            record.current_step = following.stage;
            record.status = RequisitionStatus::InProgress;
        }
        None => {
            record.current_step = stage;
            record.status = RequisitionStatus::Approved;
        }
    }
}

fn outcome_for(
    stage: StageType,
    record: &JobRequisition,
    request: &ActionRequest,
    at: DateTime<Utc>,
) -> Option<StageOutcome> {
    let reviewer = request.reviewer.clone();
    let comments = request.comments.clone();

    match stage {
        StageType::DepartmentRequest => None,
        StageType::HrReview => Some(StageOutcome::HrReview(HrReviewOutcome {
            reviewer,
            decision: ReviewDecision::Approve,
            comments,
            review_date: at,
        })),
        StageType::BudgetApproval => Some(StageOutcome::BudgetApproval(BudgetApprovalOutcome {
            budget_owner: reviewer,
            approved_budget: record.department_request.salary_max,
            currency: "USD".to_string(),
            budget_period_start: None,
            budget_period_end: None,
            comments,
            approval_date: at,
        })),
        StageType::FinalApproval => Some(StageOutcome::FinalApproval(FinalApprovalOutcome {
            approver: reviewer,
            decision: ReviewDecision::Approve,
            effective_date: None,
            comments,
            approval_date: at,
        })),
    }
}

fn decline(record: &mut JobRequisition, index: usize, request: &ActionRequest, at: DateTime<Utc>) {
    let step = &mut record.workflow_steps[index];
    step.stamp(
        StepStatus::Declined,
        &request.reviewer,
        request.comments.as_deref(),
        at,
    );
    record.current_step = step.stage;
    record.status = RequisitionStatus::Declined;
}

/// Rolls the pipeline back to the department request regardless of which step asked.
/// Later stages return to pending and their outcomes are dropped, so a resubmission
/// is reviewed from scratch.
fn rewind(record: &mut JobRequisition, index: usize, request: &ActionRequest, at: DateTime<Utc>) {
    for (position, step) in record.workflow_steps.iter_mut().enumerate() {
        if position == 0 {
            step.reset(StepStatus::Current);
        } else {
            step.reset(StepStatus::Pending);
        }
    }

    let acted_on = &mut record.workflow_steps[index];
    let status = acted_on.status;
    acted_on.stamp(status, &request.reviewer, request.comments.as_deref(), at);

    record.outcomes.clear();
    record.current_step = StageType::DepartmentRequest;
    record.status = RequisitionStatus::InProgress;
}
