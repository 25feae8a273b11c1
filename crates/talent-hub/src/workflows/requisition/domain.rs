use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier wrapper for stored requisitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequisitionId(pub String);

impl fmt::Display for RequisitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four approval stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    DepartmentRequest,
    HrReview,
    BudgetApproval,
    FinalApproval,
}

impl StageType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::DepartmentRequest,
            Self::HrReview,
            Self::BudgetApproval,
            Self::FinalApproval,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DepartmentRequest => "Department Request",
            Self::HrReview => "HR Review",
            Self::BudgetApproval => "Budget Approval",
            Self::FinalApproval => "Final Approval",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Current,
    Approved,
    Declined,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Current => "current",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall requisition status. `Approved` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequisitionStatus {
    InProgress,
    Approved,
    Declined,
}

impl RequisitionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Declined)
    }
}

impl fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    #[default]
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Intern,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    #[default]
    Office,
    Remote,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry Level (0-2 years)")]
    EntryLevel,
    #[default]
    #[serde(rename = "Mid Level (3-5 years)")]
    MidLevel,
    #[serde(rename = "Senior Level (6-10 years)")]
    SeniorLevel,
    #[serde(rename = "Executive Level (10+ years)")]
    ExecutiveLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "High School")]
    HighSchool,
    #[serde(rename = "Associate Degree")]
    AssociateDegree,
    #[serde(rename = "Bachelor's Degree")]
    BachelorsDegree,
    #[serde(rename = "Master's Degree")]
    MastersDegree,
    #[serde(rename = "PhD")]
    Phd,
    #[serde(rename = "Professional Certification")]
    ProfessionalCertification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonForHire {
    #[default]
    #[serde(rename = "New Role")]
    NewRole,
    Replacement,
    #[serde(rename = "Team Expansion")]
    TeamExpansion,
    Seasonal,
    #[serde(rename = "Project-based")]
    ProjectBased,
}

/// Stage one payload: what the hiring department is asking for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRequest {
    pub job_title: String,
    pub department: String,
    pub manager: String,
    pub number_of_openings: u32,
    #[serde(default)]
    pub job_type: JobType,
    #[serde(default)]
    pub location: LocationType,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_requirements: Option<EducationLevel>,
    pub salary_min: f64,
    pub salary_max: f64,
    #[serde(default)]
    pub reason_for_hire: ReasonForHire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DepartmentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("job_title", &self.job_title)?;
        require_text("department", &self.department)?;
        require_text("manager", &self.manager)?;

        if self.number_of_openings < 1 {
            return Err(ValidationError::NoOpenings);
        }
        if self.salary_min.is_nan() || self.salary_min < 0.0 {
            return Err(ValidationError::NegativeSalary {
                salary_min: self.salary_min,
            });
        }
        if self.salary_max.partial_cmp(&self.salary_min) != Some(Ordering::Greater) {
            return Err(ValidationError::SalaryRange {
                salary_min: self.salary_min,
                salary_max: self.salary_max,
            });
        }

        Ok(())
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(())
    }
}

/// Rejections raised before a requisition (or a patch) reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("number_of_openings must be at least 1")]
    NoOpenings,
    #[error("salary_min must not be negative (got {salary_min})")]
    NegativeSalary { salary_min: f64 },
    #[error("salary_max ({salary_max}) must be greater than salary_min ({salary_min})")]
    SalaryRange { salary_min: f64, salary_max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Decline,
    RequestInfo,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrReviewOutcome {
    pub reviewer: String,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "Utc::now")]
    pub review_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetApprovalOutcome {
    pub budget_owner: String,
    pub approved_budget: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_period_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "Utc::now")]
    pub approval_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalApprovalOutcome {
    pub approver: String,
    pub decision: ReviewDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "Utc::now")]
    pub approval_date: DateTime<Utc>,
}

/// Outcome recorded when a review stage signs off. The stage is carried by the
/// variant, so an outcome can only ever be filed under the stage that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutcome {
    HrReview(HrReviewOutcome),
    BudgetApproval(BudgetApprovalOutcome),
    FinalApproval(FinalApprovalOutcome),
}

impl StageOutcome {
    pub const fn stage(&self) -> StageType {
        match self {
            Self::HrReview(_) => StageType::HrReview,
            Self::BudgetApproval(_) => StageType::BudgetApproval,
            Self::FinalApproval(_) => StageType::FinalApproval,
        }
    }

    pub fn decided_at(&self) -> DateTime<Utc> {
        match self {
            Self::HrReview(outcome) => outcome.review_date,
            Self::BudgetApproval(outcome) => outcome.approval_date,
            Self::FinalApproval(outcome) => outcome.approval_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub title: String,
    pub stage: StageType,
    pub status: StepStatus,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl WorkflowStep {
    pub(crate) fn stamp(
        &mut self,
        status: StepStatus,
        reviewer: &str,
        comments: Option<&str>,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.reviewer = Some(reviewer.to_string());
        self.comments = comments.map(str::to_string);
        self.reviewed_at = Some(at);
    }

    pub(crate) fn reset(&mut self, status: StepStatus) {
        self.status = status;
        self.reviewer = None;
        self.comments = None;
        self.reviewed_at = None;
    }
}

/// A job-opening request and its position in the approval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequisition {
    pub id: RequisitionId,
    pub requisition_code: String,
    pub department_request: DepartmentRequest,
    #[serde(default)]
    pub outcomes: Vec<StageOutcome>,
    pub workflow_steps: Vec<WorkflowStep>,
    pub current_step: StageType,
    pub status: RequisitionStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl JobRequisition {
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.workflow_steps.iter().find(|step| step.id == step_id)
    }

    pub fn step_for_stage(&self, stage: StageType) -> Option<&WorkflowStep> {
        self.workflow_steps.iter().find(|step| step.stage == stage)
    }

    /// The step awaiting action, if the requisition is not terminal.
    pub fn active_step(&self) -> Option<&WorkflowStep> {
        self.workflow_steps
            .iter()
            .find(|step| step.status == StepStatus::Current)
    }

    pub fn outcome(&self, stage: StageType) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|outcome| outcome.stage() == stage)
    }

    pub fn hr_review(&self) -> Option<&HrReviewOutcome> {
        match self.outcome(StageType::HrReview) {
            Some(StageOutcome::HrReview(outcome)) => Some(outcome),
            _ => None,
        }
    }

    pub fn budget_approval(&self) -> Option<&BudgetApprovalOutcome> {
        match self.outcome(StageType::BudgetApproval) {
            Some(StageOutcome::BudgetApproval(outcome)) => Some(outcome),
            _ => None,
        }
    }

    pub fn final_approval(&self) -> Option<&FinalApprovalOutcome> {
        match self.outcome(StageType::FinalApproval) {
            Some(StageOutcome::FinalApproval(outcome)) => Some(outcome),
            _ => None,
        }
    }

    /// Files an outcome, replacing any earlier outcome for the same stage.
    pub(crate) fn record_outcome(&mut self, outcome: StageOutcome) {
        let stage = outcome.stage();
        self.outcomes.retain(|existing| existing.stage() != stage);
        self.outcomes.push(outcome);
        self.outcomes.sort_by_key(StageOutcome::stage);
    }

    /// Checks the step/status/current_step agreement every persisted record must satisfy.
    pub fn is_consistent(&self) -> bool {
        let stages: Vec<StageType> = self.workflow_steps.iter().map(|step| step.stage).collect();
        if stages != StageType::ordered() {
            return false;
        }

        let mut current = self
            .workflow_steps
            .iter()
            .filter(|step| step.status == StepStatus::Current);
        let first_current = current.next();
        if current.next().is_some() {
            return false;
        }

        let steps_agree = match first_current {
            Some(step) => {
                self.status == RequisitionStatus::InProgress && self.current_step == step.stage
            }
            None => match self.status {
                RequisitionStatus::InProgress => false,
                RequisitionStatus::Approved => {
                    self.current_step == StageType::FinalApproval
                        && self
                            .workflow_steps
                            .iter()
                            .all(|step| step.status == StepStatus::Approved)
                }
                RequisitionStatus::Declined => self
                    .step_for_stage(self.current_step)
                    .is_some_and(|step| step.status == StepStatus::Declined),
            },
        };

        let mut outcome_stages: Vec<StageType> =
            self.outcomes.iter().map(StageOutcome::stage).collect();
        outcome_stages.dedup();

        steps_agree
            && outcome_stages.len() == self.outcomes.len()
            && self.department_request.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DepartmentRequest {
        DepartmentRequest {
            job_title: "Engineer".to_string(),
            department: "Eng".to_string(),
            manager: "Jane".to_string(),
            number_of_openings: 2,
            job_type: JobType::FullTime,
            location: LocationType::Hybrid,
            skills: vec!["Rust".to_string()],
            experience_level: ExperienceLevel::MidLevel,
            education_requirements: None,
            salary_min: 80_000.0,
            salary_max: 120_000.0,
            reason_for_hire: ReasonForHire::TeamExpansion,
            start_date: None,
            notes: None,
        }
    }

    #[test]
    fn validate_rejects_inverted_or_equal_salary_range() {
        let mut equal = request();
        equal.salary_max = equal.salary_min;
        assert!(matches!(
            equal.validate(),
            Err(ValidationError::SalaryRange { .. })
        ));

        let mut inverted = request();
        inverted.salary_max = 50_000.0;
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::SalaryRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_openings_and_blank_titles() {
        let mut no_openings = request();
        no_openings.number_of_openings = 0;
        assert_eq!(no_openings.validate(), Err(ValidationError::NoOpenings));

        let mut blank = request();
        blank.job_title = "   ".to_string();
        assert_eq!(
            blank.validate(),
            Err(ValidationError::BlankField("job_title"))
        );
    }

    #[test]
    fn department_request_defaults_optional_enums() {
        let payload = serde_json::json!({
            "job_title": "Engineer",
            "department": "Eng",
            "manager": "Jane",
            "number_of_openings": 2,
            "salary_min": 80000,
            "salary_max": 120000
        });

        let parsed: DepartmentRequest = serde_json::from_value(payload).expect("parses");
        assert_eq!(parsed.job_type, JobType::FullTime);
        assert_eq!(parsed.location, LocationType::Office);
        assert_eq!(parsed.reason_for_hire, ReasonForHire::NewRole);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn enum_labels_match_wire_values() {
        let job_type = serde_json::to_value(JobType::PartTime).expect("serializes");
        assert_eq!(job_type, "Part-time");
        let level = serde_json::to_value(ExperienceLevel::SeniorLevel).expect("serializes");
        assert_eq!(level, "Senior Level (6-10 years)");
        let status = serde_json::to_value(RequisitionStatus::InProgress).expect("serializes");
        assert_eq!(status, RequisitionStatus::InProgress.label());
        let stage = serde_json::to_value(StageType::HrReview).expect("serializes");
        assert_eq!(stage, "hr_review");
    }

    #[test]
    fn stage_outcome_is_tagged_by_stage() {
        let outcome = StageOutcome::BudgetApproval(BudgetApprovalOutcome {
            budget_owner: "carol".to_string(),
            approved_budget: 120_000.0,
            currency: default_currency(),
            budget_period_start: None,
            budget_period_end: None,
            comments: None,
            approval_date: Utc::now(),
        });

        let value = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(value["stage"], "budget_approval");
        assert_eq!(value["budget_owner"], "carol");
        assert_eq!(outcome.stage(), StageType::BudgetApproval);
    }
}
