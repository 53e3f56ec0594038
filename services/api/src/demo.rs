use crate::infra::{
    classify_preview, memory_state, resolve_today, start_of_day, tier_policy, MemoryCrmState,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use crm_audit::audits::{AuditFilter, UserId};
use crm_audit::companies::{parse_company_drafts, Company, CompanyDraft, CompanyFilter, Tier};
use crm_audit::config::AppConfig;
use crm_audit::error::AppError;
use crm_audit::notifications::collect_reminders;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Date the company became a client (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: NaiveDate,
    /// Monthly ad spend in dollars
    #[arg(long)]
    pub(crate) ad_spend: f64,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional company export (Name, Contact, Email, Phone, Start Date, Ad Spend)
    #[arg(long)]
    pub(crate) companies_csv: Option<PathBuf>,
    /// Override the demo date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    if !args.ad_spend.is_finite() {
        return Err(AppError::Demo(format!(
            "ad spend must be a finite number (got {})",
            args.ad_spend
        )));
    }

    let today = resolve_today(args.today);
    let preview = classify_preview(
        &tier_policy(&config),
        args.start_date,
        args.ad_spend,
        start_of_day(today),
    );

    println!("Company classification as of {today}");
    println!(
        "- Client since {} ({} days) | ad spend ${:.2}",
        preview.start_date, preview.age_days, preview.ad_spend
    );
    println!("- Tier: {}", preview.tier);
    println!(
        "- Audit cadence: {} (every {} days)",
        preview.cadence.label(),
        preview.cadence.days()
    );
    println!(
        "- Next audit if scheduled today: {}",
        preview.next_audit_date.format("%Y-%m-%d")
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        companies_csv,
        today,
    } = args;

    let config = AppConfig::load()?;
    let today = resolve_today(today);
    let now = start_of_day(today) + Duration::hours(9);
    let auditor = config
        .scheduling
        .auditors
        .first()
        .map(|name| UserId(name.clone()))
        .ok_or_else(|| AppError::Demo("no auditors configured".to_string()))?;

    let (state, _) = memory_state(&config);

    let (drafts, source) = match companies_csv {
        Some(path) => {
            let file = File::open(&path)?;
            let drafts = parse_company_drafts(BufReader::new(file))?;
            (drafts, path.display().to_string())
        }
        None => (sample_drafts(today), "built-in sample book".to_string()),
    };

    println!("CRM audit scheduling demo ({today}, source: {source})");
    let mut companies = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match state.companies.create(draft, now) {
            Ok(company) => companies.push(company),
            Err(err) => println!("  Skipped company: {err}"),
        }
    }
    render_tiers(&state)?;

    println!("\nInitial audits (assigned to {auditor})");
    for company in &companies {
        let audit = state
            .audits
            .schedule_initial_audit(&company.id, &auditor, now)
            .map_err(demo_error)?;
        println!(
            "- {:<24} {} -> {}",
            company.name,
            company.tier,
            audit.scheduled_date.format("%Y-%m-%d")
        );
    }

    if let Some(first) = companies.first() {
        complete_first_audit(&state, first, now)?;
    }

    let later = now + Duration::days(10);
    let sweep = state
        .audits
        .process_overdue_audits(later)
        .map_err(demo_error)?;
    println!(
        "\nOverdue sweep on {}: {} audit(s) marked overdue",
        later.format("%Y-%m-%d"),
        sweep.marked_count
    );

    let outstanding = state
        .audits
        .list_audits(&AuditFilter::default())
        .map_err(demo_error)?
        .into_iter()
        .filter(|audit| audit.is_outstanding())
        .collect::<Vec<_>>();
    let reminders = collect_reminders(
        &outstanding,
        later,
        config.scheduling.reminder_horizon_days,
    );
    println!("Reminders queued: {}", reminders.len());
    for reminder in reminders.iter().take(5) {
        println!("  - to {}: {}", reminder.recipient, reminder.message);
    }

    let refresh = state
        .audits
        .update_all_schedules(&auditor, later)
        .map_err(demo_error)?;
    println!(
        "Bulk reschedule: {} re-dated, {} created",
        refresh.updated, refresh.created
    );

    let stats = state.audits.get_statistics(later).map_err(demo_error)?;
    println!("\nAudit statistics");
    println!(
        "- total {} | scheduled {} | overdue {} | completed {}",
        stats.total, stats.scheduled, stats.overdue, stats.completed
    );
    println!("- due within a week: {}", stats.upcoming_week);

    Ok(())
}

fn complete_first_audit(
    state: &MemoryCrmState,
    company: &Company,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let audit = state
        .audits
        .outstanding_audit(&company.id)
        .map_err(demo_error)?
        .ok_or_else(|| AppError::Demo(format!("{} has no outstanding audit", company.name)))?;
    let completion = state
        .audits
        .complete_audit(
            &audit.id,
            Some("Walkthrough finished early".to_string()),
            now,
        )
        .map_err(demo_error)?;
    println!(
        "\nCompleted {}'s audit early; next due {}",
        company.name,
        completion.successor.scheduled_date.format("%Y-%m-%d")
    );
    Ok(())
}

fn render_tiers(state: &MemoryCrmState) -> Result<(), AppError> {
    println!("\nCompanies by tier");
    for tier in Tier::ordered() {
        let members = state
            .companies
            .list(&CompanyFilter { tier: Some(tier) })
            .map_err(demo_error)?;
        let names = members
            .iter()
            .map(|company| company.name.as_str())
            .collect::<Vec<_>>();
        println!("- {} ({}): {}", tier, names.len(), names.join(", "));
    }
    Ok(())
}

fn sample_drafts(today: NaiveDate) -> Vec<CompanyDraft> {
    let sample = [
        ("Harbor Dental", "Mina Ortiz", 20, 1_200.0),
        ("Summit Roofing", "Cal Reyes", 150, 6_500.0),
        ("Maple Street Bakery", "Jo Park", 220, 400.0),
        ("Northline Logistics", "Ari Shah", 540, 2_300.0),
    ];

    sample
        .into_iter()
        .map(|(name, contact, days_old, ad_spend)| CompanyDraft {
            name: name.to_string(),
            contact_name: Some(contact.to_string()),
            email: None,
            phone: None,
            start_date: today - Duration::days(days_old),
            ad_spend,
        })
        .collect()
}

fn demo_error(err: impl std::fmt::Display) -> AppError {
    AppError::Demo(err.to_string())
}
