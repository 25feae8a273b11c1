use serde::Serialize;

use super::domain::{JobRequisition, RequisitionStatus};

/// Aggregate counts over active requisitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecruitmentStats {
    pub total_requisitions: usize,
    pub pending_requisitions: usize,
    pub approved_requisitions: usize,
    pub declined_requisitions: usize,
    /// Sum of openings across approved requisitions.
    pub open_positions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_approval_hours: Option<f64>,
}

impl RecruitmentStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a JobRequisition>,
    {
        let mut stats = Self::default();
        let mut approval_hours = Vec::new();

        for record in records.into_iter().filter(|record| record.is_active) {
            stats.total_requisitions += 1;
            match record.status {
                RequisitionStatus::InProgress => stats.pending_requisitions += 1,
                RequisitionStatus::Declined => stats.declined_requisitions += 1,
                RequisitionStatus::Approved => {
                    stats.approved_requisitions += 1;
                    stats.open_positions += u64::from(record.department_request.number_of_openings);
                    if let Some(outcome) = record.final_approval() {
                        let elapsed = outcome.approval_date - record.created_at;
                        approval_hours.push(elapsed.num_seconds() as f64 / 3600.0);
                    }
                }
            }
        }

        if !approval_hours.is_empty() {
            let total: f64 = approval_hours.iter().sum();
            stats.average_approval_hours = Some(total / approval_hours.len() as f64);
        }

        stats
    }
}
