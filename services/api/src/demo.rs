use chrono::{Duration, Utc};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use talent_hub::error::AppError;
use talent_hub::workflows::requisition::{
    ActionRequest, DepartmentRequest, EducationLevel, ExperienceLevel, HeadcountForecast,
    InMemoryRequisitionStore, JobRequisition, JobType, LocationType, ReasonForHire,
    RecruitmentStats, RequisitionService, StaticForecastProvider, WorkflowAction,
};

type DemoService = RequisitionService<InMemoryRequisitionStore, StaticForecastProvider>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Department raising the sample requisitions.
    #[arg(long, default_value = "Engineering")]
    pub(crate) department: String,
    /// Openings requested by the requisition that gets approved.
    #[arg(long, default_value_t = 2)]
    pub(crate) openings: u32,
    /// Print the final records and stats as JSON instead of a readable summary.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    requisitions: Vec<JobRequisition>,
    stats: RecruitmentStats,
    forecast: Vec<HeadcountForecast>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        department,
        openings,
        json,
    } = args;

    let service: DemoService = RequisitionService::new(
        Arc::new(InMemoryRequisitionStore::default()),
        Arc::new(StaticForecastProvider::standard()),
    );

    let approved = walk_approval_path(&service, &department, openings, !json)?;
    let declined = walk_decline_path(&service, &department, !json)?;
    let stats = service.stats()?;
    let forecast = service.forecast()?;

    if json {
        let summary = DemoSummary {
            requisitions: vec![approved, declined],
            stats,
            forecast,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("Demo summary unavailable: {err}"),
        }
        return Ok(());
    }

    render_stats(&stats);
    render_forecast(&forecast);
    Ok(())
}

fn sample_request(department: &str, job_title: &str, openings: u32) -> DepartmentRequest {
    DepartmentRequest {
        job_title: job_title.to_string(),
        department: department.to_string(),
        manager: "Jordan Lee".to_string(),
        number_of_openings: openings,
        job_type: JobType::FullTime,
        location: LocationType::Hybrid,
        skills: vec!["Rust".to_string(), "Distributed systems".to_string()],
        experience_level: ExperienceLevel::SeniorLevel,
        education_requirements: Some(EducationLevel::BachelorsDegree),
        salary_min: 140_000.0,
        salary_max: 175_000.0,
        reason_for_hire: ReasonForHire::TeamExpansion,
        start_date: Some(Utc::now() + Duration::days(45)),
        notes: None,
    }
}

fn walk_approval_path(
    service: &DemoService,
    department: &str,
    openings: u32,
    verbose: bool,
) -> Result<JobRequisition, AppError> {
    let record = service.create(
        sample_request(department, "Senior Platform Engineer", openings),
        "jordan.lee",
    )?;
    if verbose {
        println!("Approval path");
        println!(
            "  Created {} for {} ({} openings)",
            record.requisition_code,
            record.department_request.job_title,
            record.department_request.number_of_openings
        );
    }

    let actions = [
        ("step-1", WorkflowAction::Submit, "jordan.lee", None),
        (
            "step-2",
            WorkflowAction::Approve,
            "priya.hr",
            Some("Role matches the approved org plan"),
        ),
        ("step-3", WorkflowAction::Approve, "sam.finance", None),
        (
            "step-4",
            WorkflowAction::Approve,
            "alex.vp",
            Some("Go ahead"),
        ),
    ];

    let mut latest = record;
    for (step_id, action, reviewer, comments) in actions {
        let mut request = ActionRequest::new(action, reviewer);
        if let Some(comments) = comments {
            request = request.with_comments(comments);
        }
        latest = service.act(&latest.id.0, step_id, &request)?;
        if verbose {
            render_step(&latest, step_id);
        }
    }

    if verbose {
        if let Some(budget) = latest.budget_approval() {
            println!(
                "  Budget approved: {:.0} {}",
                budget.approved_budget, budget.currency
            );
        }
        println!("  Final status: {}", latest.status);
    }
    Ok(latest)
}

fn walk_decline_path(
    service: &DemoService,
    department: &str,
    verbose: bool,
) -> Result<JobRequisition, AppError> {
    let record = service.create(sample_request(department, "Data Analyst", 1), "jordan.lee")?;
    if verbose {
        println!("\nDecline path");
        println!("  Created {}", record.requisition_code);
    }

    let submitted = service.act(
        &record.id.0,
        "step-1",
        &ActionRequest::new(WorkflowAction::Submit, "jordan.lee"),
    )?;
    if verbose {
        render_step(&submitted, "step-1");
    }

    let declined = service.act(
        &record.id.0,
        "step-2",
        &ActionRequest::new(WorkflowAction::Decline, "priya.hr").with_comments("budget frozen"),
    )?;
    if verbose {
        render_step(&declined, "step-2");
        println!(
            "  Final status: {} at {}",
            declined.status, declined.current_step
        );
    }
    Ok(declined)
}

fn render_step(record: &JobRequisition, step_id: &str) {
    let Some(step) = record.step(step_id) else {
        return;
    };
    let reviewer = step.reviewer.as_deref().unwrap_or("-");
    let reviewed_at = step
        .reviewed_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {:<18} {:<9} by {:<12} at {}{}",
        step.title,
        step.status.label(),
        reviewer,
        reviewed_at,
        step.comments
            .as_deref()
            .map(|comments| format!(" ({comments})"))
            .unwrap_or_default()
    );
}

fn render_stats(stats: &RecruitmentStats) {
    println!("\nRecruitment stats");
    println!("  Total requisitions:    {}", stats.total_requisitions);
    println!("  Pending:               {}", stats.pending_requisitions);
    println!("  Approved:              {}", stats.approved_requisitions);
    println!("  Declined:              {}", stats.declined_requisitions);
    println!("  Open positions:        {}", stats.open_positions);
    match stats.average_approval_hours {
        Some(hours) => println!("  Average approval time: {hours:.2}h"),
        None => println!("  Average approval time: n/a"),
    }
}

fn render_forecast(forecast: &[HeadcountForecast]) {
    println!("\nHeadcount forecast");
    for period in forecast {
        let actual = period
            .actual
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<4} actual {:>3}  forecast {:>3}",
            period.period, actual, period.forecast
        );
    }
}
