use super::common::*;
use chrono::Duration;
use std::sync::Arc;

use crate::audits::{
    AuditDraft, AuditFilter, AuditId, AuditPatch, AuditRepository, AuditScheduler, AuditStatus,
    AuditValidationError, SchedulerError, UserId,
};
use crate::companies::{CompanyId, Tier};
use crate::error::RepositoryError;
use crate::memory::InMemoryCompanyRepository;

#[test]
fn initial_audit_for_new_company_is_one_week_out() {
    let fixture = Fixture::new();
    let company = fixture.add_company(10, 1_000.0);
    assert_tier(&company, Tier::Tier2);

    let audit = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &auditor(), now())
        .expect("scheduling succeeds");

    assert_eq!(audit.status, AuditStatus::Scheduled);
    assert_eq!(audit.scheduled_date, now() + Duration::days(7));
    assert_eq!(audit.assigned_to, auditor());
    assert_eq!(audit.created_at, now());
}

#[test]
fn cadence_follows_age_not_ad_spend_tier() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 500.0);
    assert_tier(&company, Tier::Tier3);

    let audit = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &auditor(), now())
        .expect("scheduling succeeds");

    assert_eq!(audit.scheduled_date, now() + Duration::days(30));

    let big_spender = fixture.add_company(400, 9_000.0);
    assert_tier(&big_spender, Tier::Tier1);
    let audit = fixture
        .scheduler
        .schedule_initial_audit(&big_spender.id, &auditor(), now())
        .expect("scheduling succeeds");
    assert_eq!(audit.scheduled_date, now() + Duration::days(90));
}

#[test]
fn initial_audit_requires_known_company_and_user() {
    let fixture = Fixture::new();
    let missing = CompanyId::new();
    assert!(matches!(
        fixture
            .scheduler
            .schedule_initial_audit(&missing, &auditor(), now()),
        Err(SchedulerError::CompanyNotFound(id)) if id == missing
    ));

    let company = fixture.add_company(10, 0.0);
    let stranger = UserId("mallory".to_string());
    let err = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &stranger, now())
        .expect_err("unknown user rejected");
    assert!(err.is_not_found());
    assert!(fixture.outstanding_for(company.id).is_empty());
}

#[test]
fn completing_an_audit_chains_exactly_one_successor() {
    let fixture = Fixture::new();
    let company = fixture.add_company(10, 1_000.0);
    let first = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &auditor(), now())
        .expect("scheduling succeeds");

    let completed_at = now() + Duration::days(7);
    let completion = fixture
        .scheduler
        .complete_audit(&first.id, Some("books reconciled".to_string()), completed_at)
        .expect("completion succeeds");

    assert_eq!(completion.completed.status, AuditStatus::Completed);
    assert_eq!(completion.completed.completed_date, Some(completed_at));
    assert_eq!(
        completion.completed.notes.as_deref(),
        Some("books reconciled")
    );
    assert_eq!(completion.successor.status, AuditStatus::Scheduled);
    assert_eq!(
        completion.successor.scheduled_date,
        completed_at + Duration::days(7)
    );
    assert_eq!(completion.successor.assigned_to, auditor());

    let outstanding = fixture.outstanding_for(company.id);
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].id, completion.successor.id);
}

#[test]
fn completing_an_overdue_audit_also_chains() {
    let fixture = Fixture::new();
    let company = fixture.add_company(400, 100.0);
    let audit = fixture.add_audit(company.id, -5);
    fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");

    let completion = fixture
        .scheduler
        .complete_audit(&audit.id, None, now())
        .expect("completion succeeds");

    assert_eq!(completion.successor.scheduled_date, now() + Duration::days(90));
    assert_eq!(fixture.outstanding_for(company.id).len(), 1);
}

#[test]
fn completing_twice_is_rejected_without_a_second_successor() {
    let fixture = Fixture::new();
    let company = fixture.add_company(10, 1_000.0);
    let audit = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &auditor(), now())
        .expect("scheduling succeeds");
    fixture
        .scheduler
        .complete_audit(&audit.id, None, now())
        .expect("first completion succeeds");

    match fixture.scheduler.complete_audit(&audit.id, None, now()) {
        Err(SchedulerError::AlreadyCompleted(id)) => assert_eq!(id, audit.id),
        other => panic!("expected already completed, got {other:?}"),
    }
    assert_eq!(fixture.outstanding_for(company.id).len(), 1);
}

#[test]
fn completion_reuses_existing_outstanding_audit() {
    let fixture = Fixture::new();
    let company = fixture.add_company(10, 1_000.0);
    let current = fixture.add_audit(company.id, 1);
    let stray = fixture.add_audit(company.id, 20);

    let completion = fixture
        .scheduler
        .complete_audit(&current.id, None, now())
        .expect("completion succeeds");

    assert_eq!(completion.successor.id, stray.id);
    assert_eq!(fixture.outstanding_for(company.id).len(), 1);
}

#[test]
fn complete_missing_audit_is_not_found() {
    let fixture = Fixture::new();
    let missing = AuditId::new();
    assert!(matches!(
        fixture.scheduler.complete_audit(&missing, None, now()),
        Err(SchedulerError::AuditNotFound(id)) if id == missing
    ));
}

#[test]
fn overdue_sweep_marks_past_due_audits_once() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 500.0);
    let late = fixture.add_audit(company.id, -5);
    let other = fixture.add_company(20, 500.0);
    fixture.add_audit(other.id, 3);

    let sweep = fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");

    assert_eq!(sweep.marked_count, 1);
    assert_eq!(sweep.audits.len(), 1);
    assert_eq!(sweep.audits[0].id, late.id);
    assert_eq!(sweep.audits[0].status, AuditStatus::Overdue);

    let stored = fixture
        .audits
        .fetch(&late.id)
        .expect("fetch succeeds")
        .expect("audit present");
    assert_eq!(stored.status, AuditStatus::Overdue);

    let again = fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("second sweep succeeds");
    assert_eq!(again.marked_count, 0);
    assert!(again.audits.is_empty());
}

#[test]
fn overdue_sweep_ignores_audit_due_exactly_now() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 500.0);
    fixture.add_audit(company.id, 0);

    let sweep = fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");
    assert_eq!(sweep.marked_count, 0);
}

#[test]
fn update_all_schedules_creates_missing_and_is_idempotent() {
    let fixture = Fixture::new();
    let bare = fixture.add_company(10, 100.0);
    let covered = fixture.add_company(200, 100.0);
    fixture
        .scheduler
        .schedule_initial_audit(&covered.id, &auditor(), now())
        .expect("scheduling succeeds");

    let refresh = fixture
        .scheduler
        .update_all_schedules(&UserId("lee".to_string()), now())
        .expect("refresh succeeds");
    assert_eq!(refresh.created, 1);
    assert_eq!(refresh.updated, 0);

    let outstanding = fixture.outstanding_for(bare.id);
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].assigned_to, UserId("lee".to_string()));
    assert_eq!(outstanding[0].scheduled_date, now() + Duration::days(7));
    assert_eq!(fixture.outstanding_for(covered.id).len(), 1);

    let again = fixture
        .scheduler
        .update_all_schedules(&UserId("lee".to_string()), now())
        .expect("second refresh succeeds");
    assert_eq!(again.created, 0);
    assert_eq!(again.updated, 0);
}

#[test]
fn update_all_schedules_redates_when_company_ages_into_new_bracket() {
    let fixture = Fixture::new();
    let company = fixture.add_company(80, 100.0);
    let audit = fixture
        .scheduler
        .schedule_initial_audit(&company.id, &auditor(), now())
        .expect("scheduling succeeds");
    assert_eq!(audit.scheduled_date, now() + Duration::days(7));

    let later = now() + Duration::days(20);
    let refresh = fixture
        .scheduler
        .update_all_schedules(&auditor(), later)
        .expect("refresh succeeds");
    assert_eq!(refresh.updated, 1);
    assert_eq!(refresh.created, 0);

    let stored = fixture
        .audits
        .fetch(&audit.id)
        .expect("fetch succeeds")
        .expect("audit present");
    assert_eq!(stored.scheduled_date, now() + Duration::days(30));
    assert_eq!(fixture.outstanding_for(company.id).len(), 1);
}

#[test]
fn update_all_schedules_keeps_hand_picked_dates() {
    let fixture = Fixture::new();
    let rescheduled = fixture.add_company(10, 100.0);
    let audit = fixture
        .scheduler
        .schedule_initial_audit(&rescheduled.id, &auditor(), now())
        .expect("scheduling succeeds");
    let moved = fixture
        .scheduler
        .update_audit(
            &audit.id,
            AuditPatch {
                scheduled_date: Some(now() + Duration::days(3)),
                ..AuditPatch::default()
            },
            now(),
        )
        .expect("reschedule succeeds");
    assert!(moved.manual_date);

    let booked = fixture.add_company(200, 100.0);
    let manual = fixture
        .scheduler
        .create_audit(
            AuditDraft {
                company_id: booked.id,
                scheduled_date: now() + Duration::days(45),
                assigned_to: Some("lee".to_string()),
                notes: None,
            },
            now(),
        )
        .expect("manual audit created");

    let refresh = fixture
        .scheduler
        .update_all_schedules(&auditor(), now())
        .expect("refresh succeeds");
    assert_eq!(refresh.updated, 0);
    assert_eq!(refresh.created, 0);

    let stored = fixture
        .audits
        .fetch(&audit.id)
        .expect("fetch succeeds")
        .expect("audit present");
    assert_eq!(stored.scheduled_date, now() + Duration::days(3));
    let stored = fixture
        .audits
        .fetch(&manual.id)
        .expect("fetch succeeds")
        .expect("audit present");
    assert_eq!(stored.scheduled_date, now() + Duration::days(45));
}

#[test]
fn update_all_schedules_reuses_last_assignee_and_leaves_overdue_alone() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 100.0);
    let audit = fixture.add_audit(company.id, -3);
    fixture
        .scheduler
        .complete_audit(&audit.id, None, now())
        .expect("completion succeeds");
    let successor = fixture.outstanding_for(company.id).remove(0);
    fixture
        .audits
        .delete(&successor.id)
        .expect("delete succeeds");

    let lapsed = fixture.add_company(400, 100.0);
    fixture.add_audit(lapsed.id, -10);
    fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");

    let refresh = fixture
        .scheduler
        .update_all_schedules(&UserId("lee".to_string()), now())
        .expect("refresh succeeds");
    assert_eq!(refresh.created, 1);
    assert_eq!(refresh.updated, 0);

    let outstanding = fixture.outstanding_for(company.id);
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].assigned_to, auditor());
    assert_eq!(fixture.outstanding_for(lapsed.id).len(), 1);
}

#[test]
fn update_all_schedules_rejects_unknown_fallback() {
    let fixture = Fixture::new();
    fixture.add_company(10, 100.0);
    let err = fixture
        .scheduler
        .update_all_schedules(&UserId("mallory".to_string()), now())
        .expect_err("unknown fallback rejected");
    assert!(matches!(err, SchedulerError::UserNotFound(_)));
}

#[test]
fn statistics_count_each_status_and_upcoming_week() {
    let fixture = Fixture::new();
    let a = fixture.add_company(10, 100.0);
    let b = fixture.add_company(200, 100.0);
    let c = fixture.add_company(400, 100.0);
    let done = fixture.add_audit(a.id, -1);
    fixture
        .scheduler
        .complete_audit(&done.id, None, now())
        .expect("completion succeeds");
    fixture.add_audit(b.id, 3);
    fixture.add_audit(c.id, -4);
    fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");

    let stats = fixture
        .scheduler
        .get_statistics(now())
        .expect("statistics succeed");

    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.scheduled, 2);
    // b's audit in 3 days and a's successor in 7 days both fall inside the window
    assert_eq!(stats.upcoming_week, 2);
}

#[test]
fn create_audit_validates_assignee_and_refuses_duplicates() {
    let fixture = Fixture::new();
    let company = fixture.add_company(10, 100.0);

    let draft = AuditDraft {
        company_id: company.id,
        scheduled_date: now() + Duration::days(2),
        assigned_to: Some("  ".to_string()),
        notes: None,
    };
    assert!(matches!(
        fixture.scheduler.create_audit(draft.clone(), now()),
        Err(SchedulerError::Validation(AuditValidationError::MissingAssignee))
    ));

    let draft = AuditDraft {
        assigned_to: Some("lee".to_string()),
        ..draft
    };
    let created = fixture
        .scheduler
        .create_audit(draft.clone(), now())
        .expect("creation succeeds");
    assert_eq!(created.assigned_to, UserId("lee".to_string()));

    match fixture.scheduler.create_audit(draft, now()) {
        Err(SchedulerError::OutstandingAudit { audit_id, .. }) => assert_eq!(audit_id, created.id),
        other => panic!("expected outstanding audit conflict, got {other:?}"),
    }
}

#[test]
fn rescheduling_overdue_audit_into_future_reopens_it() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 100.0);
    let audit = fixture.add_audit(company.id, -2);
    fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");

    let updated = fixture
        .scheduler
        .update_audit(
            &audit.id,
            AuditPatch {
                scheduled_date: Some(now() + Duration::days(1)),
                assigned_to: Some("lee".to_string()),
                notes: Some("client asked to move".to_string()),
            },
            now(),
        )
        .expect("update succeeds");

    assert_eq!(updated.status, AuditStatus::Scheduled);
    assert_eq!(updated.assigned_to, UserId("lee".to_string()));
    assert_eq!(updated.notes.as_deref(), Some("client asked to move"));
}

#[test]
fn completed_audits_are_immutable() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 100.0);
    let audit = fixture.add_audit(company.id, 1);
    fixture
        .scheduler
        .complete_audit(&audit.id, None, now())
        .expect("completion succeeds");

    assert!(matches!(
        fixture
            .scheduler
            .update_audit(&audit.id, AuditPatch::default(), now()),
        Err(SchedulerError::AlreadyCompleted(_))
    ));
}

#[test]
fn overdue_and_upcoming_queries() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 100.0);
    let flagged = fixture.add_audit(company.id, -9);
    fixture
        .scheduler
        .process_overdue_audits(now())
        .expect("sweep succeeds");
    let unswept = fixture.add_audit(company.id, -1);
    let soon = fixture.add_audit(company.id, 2);
    fixture.add_audit(company.id, 40);

    let overdue = fixture
        .scheduler
        .overdue_audits(now())
        .expect("query succeeds");
    let ids: Vec<_> = overdue.iter().map(|audit| audit.id).collect();
    assert_eq!(ids, vec![flagged.id, unswept.id]);

    let upcoming = fixture
        .scheduler
        .upcoming_audits(now(), 7)
        .expect("query succeeds");
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, soon.id);
}

#[test]
fn delete_audit_reports_missing() {
    let fixture = Fixture::new();
    let company = fixture.add_company(200, 100.0);
    let audit = fixture.add_audit(company.id, 1);

    fixture
        .scheduler
        .delete_audit(&audit.id)
        .expect("delete succeeds");
    assert!(matches!(
        fixture.scheduler.delete_audit(&audit.id),
        Err(SchedulerError::AuditNotFound(_))
    ));
    assert_eq!(
        fixture
            .audits
            .count(&AuditFilter::default())
            .expect("count succeeds"),
        0
    );
}

#[test]
fn storage_failures_propagate_unmodified() {
    let companies = Arc::new(InMemoryCompanyRepository::default());
    let scheduler = AuditScheduler::new(companies, Arc::new(UnavailableAuditRepository), users());

    assert!(matches!(
        scheduler.process_overdue_audits(now()),
        Err(SchedulerError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        scheduler.get_statistics(now()),
        Err(SchedulerError::Repository(RepositoryError::Unavailable(_)))
    ));
}
