//! Field-name normalization for inbound payloads.
//!
//! Clients may send camelCase keys. Each payload shape has its own alias table mapping
//! those keys onto the canonical snake_case names, applied before deserialization so the
//! service and engine only ever see canonical fields. Keys absent from a table are left
//! untouched.

use serde_json::{Map, Value};

type AliasTable = &'static [(&'static str, &'static str)];

const SUBMISSION_FIELDS: AliasTable = &[
    ("departmentRequest", "department_request"),
    ("createdBy", "created_by"),
];

const DEPARTMENT_REQUEST_FIELDS: AliasTable = &[
    ("jobTitle", "job_title"),
    ("numberOfOpenings", "number_of_openings"),
    ("jobType", "job_type"),
    ("locationType", "location"),
    ("requiredSkills", "skills"),
    ("experienceLevel", "experience_level"),
    ("educationRequirements", "education_requirements"),
    ("salaryMin", "salary_min"),
    ("salaryMax", "salary_max"),
    ("reasonForHire", "reason_for_hire"),
    ("startDate", "start_date"),
];

const PATCH_FIELDS: AliasTable = &[
    ("departmentRequest", "department_request"),
    ("hrReview", "hr_review"),
    ("budgetApproval", "budget_approval"),
    ("finalApproval", "final_approval"),
];

const HR_REVIEW_FIELDS: AliasTable = &[("reviewDate", "review_date")];

const BUDGET_APPROVAL_FIELDS: AliasTable = &[
    ("budgetOwner", "budget_owner"),
    ("approvedBudget", "approved_budget"),
    ("budgetPeriodStart", "budget_period_start"),
    ("budgetPeriodEnd", "budget_period_end"),
    ("approvalDate", "approval_date"),
];

const FINAL_APPROVAL_FIELDS: AliasTable = &[
    ("effectiveDate", "effective_date"),
    ("approvalDate", "approval_date"),
];

const ACTION_FIELDS: AliasTable = &[("reviewedBy", "reviewer"), ("comment", "comments")];

/// Canonicalize a creation payload (`{department_request, created_by}`).
pub fn normalize_submission(mut payload: Value) -> Value {
    rename_keys(&mut payload, SUBMISSION_FIELDS);
    if let Some(request) = payload.get_mut("department_request") {
        rename_keys(request, DEPARTMENT_REQUEST_FIELDS);
    }
    payload
}

/// Canonicalize a corrective patch payload.
pub fn normalize_patch(mut payload: Value) -> Value {
    rename_keys(&mut payload, PATCH_FIELDS);
    let nested: [(&str, AliasTable); 4] = [
        ("department_request", DEPARTMENT_REQUEST_FIELDS),
        ("hr_review", HR_REVIEW_FIELDS),
        ("budget_approval", BUDGET_APPROVAL_FIELDS),
        ("final_approval", FINAL_APPROVAL_FIELDS),
    ];
    for (field, table) in nested {
        if let Some(section) = payload.get_mut(field) {
            rename_keys(section, table);
        }
    }
    payload
}

/// Canonicalize a workflow action payload (`{action, reviewer, comments}`).
pub fn normalize_action(mut payload: Value) -> Value {
    rename_keys(&mut payload, ACTION_FIELDS);
    payload
}

fn rename_keys(value: &mut Value, table: AliasTable) {
    let Value::Object(object) = value else {
        return;
    };

    for (alias, canonical) in table {
        rename_key(object, alias, canonical);
    }
}

fn rename_key(object: &mut Map<String, Value>, alias: &str, canonical: &str) {
    if object.contains_key(canonical) {
        return;
    }
    if let Some(value) = object.remove(alias) {
        object.insert(canonical.to_string(), value);
    }
}
