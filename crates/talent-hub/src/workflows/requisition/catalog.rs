use super::domain::{StageType, StepStatus, WorkflowStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub stage: StageType,
}

/// The fixed approval pipeline installed on every new requisition.
#[derive(Debug)]
pub struct WorkflowStepCatalog {
    steps: [StepTemplate; 4],
}

impl WorkflowStepCatalog {
    pub const fn standard() -> Self {
        Self {
            steps: [
                StepTemplate {
                    id: "step-1",
                    title: StageType::DepartmentRequest.label(),
                    stage: StageType::DepartmentRequest,
                },
                StepTemplate {
                    id: "step-2",
                    title: StageType::HrReview.label(),
                    stage: StageType::HrReview,
                },
                StepTemplate {
                    id: "step-3",
                    title: StageType::BudgetApproval.label(),
                    stage: StageType::BudgetApproval,
                },
                StepTemplate {
                    id: "step-4",
                    title: StageType::FinalApproval.label(),
                    stage: StageType::FinalApproval,
                },
            ],
        }
    }

    pub fn step_templates(&self) -> &[StepTemplate] {
        &self.steps
    }

    pub fn template_for(&self, stage: StageType) -> Option<&StepTemplate> {
        self.steps.iter().find(|template| template.stage == stage)
    }

    /// Fresh step list: the first stage is current, the rest wait.
    pub fn instantiate(&self) -> Vec<WorkflowStep> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, template)| WorkflowStep {
                id: template.id.to_string(),
                title: template.title.to_string(),
                stage: template.stage,
                status: if index == 0 {
                    StepStatus::Current
                } else {
                    StepStatus::Pending
                },
                reviewer: None,
                reviewed_at: None,
                comments: None,
            })
            .collect()
    }
}

impl Default for WorkflowStepCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
