//! Screening pipeline end to end: create, fan out, aggregate, rescreen

mod common;

use common::{imo_for, sample_ship, Harness, DAY_MS, IMO, SECOND_MS, START_MS};
use shipscreen_core::domain::{
    CheckKind, Company, CompanyRole, Imo, JobState, ScreeningPolicy, ScreeningStatus, Severity,
    SeverityChange,
};
use shipscreen_core::port::{Inspection, PortCall, ZoneVisit};
use shipscreen_core::AppError;

#[test]
fn test_generated_imos_are_valid() {
    assert_eq!(imo_for(907472), IMO);
    assert_eq!(imo_for(932148), "9321483");
}

/// A clean ship comes out OK on every check
#[tokio::test]
async fn test_clean_ship_screens_ok() {
    let h = Harness::new().await;
    h.add_ship(sample_ship(IMO)).await;

    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    assert_eq!(screening.status, ScreeningStatus::Scheduled);
    assert_eq!(screening.scheduled_at, Some(START_MS));
    assert!(screening
        .checks
        .values()
        .all(|c| c.status == ScreeningStatus::Scheduled));
    assert_eq!(h.jobs(JobState::Queued).await, CheckKind::ALL.len() as i64);

    assert_eq!(h.drain().await, CheckKind::ALL.len());

    let done = h.screening(&screening.id).await;
    assert_eq!(done.status, ScreeningStatus::Done);
    assert_eq!(done.severity, Some(Severity::Ok));
    assert_eq!(done.completed_at, Some(START_MS));
    // First run has nothing to compare against
    assert_eq!(done.previous_severity, None);
    assert_eq!(done.severity_change, None);
    for (kind, check) in &done.checks {
        assert_eq!(check.status, ScreeningStatus::Done, "{}", kind);
        assert_eq!(check.severity, Some(Severity::Ok), "{}", kind);
        assert!(check.result.is_some(), "{}", kind);
    }
    assert_eq!(h.jobs(JobState::Done).await, CheckKind::ALL.len() as i64);
}

/// Provider findings land on the right checks and the worst one wins
#[tokio::test]
async fn test_findings_aggregate_to_worst_severity() {
    let h = Harness::new().await;
    let imo = Imo::parse(IMO).unwrap();
    h.add_ship(sample_ship(IMO)).await;

    h.sources.sanction_company("Blue Ocean Shipping", "OFAC-SDN");
    h.sources.add_inspection(
        &imo,
        Inspection {
            inspected_at: START_MS - 30 * DAY_MS,
            port: Some("Rotterdam".to_string()),
            authority: Some("Paris MoU".to_string()),
            detained: true,
            deficiencies: 7,
        },
    );
    h.sources.add_port_call(
        &imo,
        PortCall {
            port: "Novorossiysk".to_string(),
            country: "RU".to_string(),
            arrived_at: START_MS - 10 * DAY_MS,
            departed_at: Some(START_MS - 9 * DAY_MS),
        },
    );

    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    h.drain().await;
    let done = h.screening(&screening.id).await;

    let severity = |kind: CheckKind| done.check(kind).and_then(|c| c.severity);
    assert_eq!(severity(CheckKind::OperatorSanction), Some(Severity::Critical));
    assert_eq!(severity(CheckKind::RegisteredOwnerSanction), Some(Severity::Ok));
    assert_eq!(severity(CheckKind::ShipInspections), Some(Severity::Warning));
    assert_eq!(severity(CheckKind::PortVisits), Some(Severity::Warning));
    assert_eq!(severity(CheckKind::ShipFlag), Some(Severity::Ok));

    assert_eq!(done.status, ScreeningStatus::Done);
    assert_eq!(done.severity, Some(Severity::Critical));
}

#[tokio::test]
async fn test_zone_visits_use_policy_ratings() {
    let mut policy = ScreeningPolicy::default();
    policy
        .zone_severities
        .insert("hormuz".to_string(), Severity::Warning);
    let h = Harness::with_policy(policy).await;
    let imo = Imo::parse(IMO).unwrap();
    h.add_ship(sample_ship(IMO)).await;

    h.sources.add_zone_visit(
        &imo,
        ZoneVisit {
            zone: "hormuz".to_string(),
            entered_at: START_MS - 5 * DAY_MS,
            exited_at: Some(START_MS - 4 * DAY_MS),
        },
    );
    h.sources.add_zone_visit(
        &imo,
        ZoneVisit {
            zone: "english-channel".to_string(),
            entered_at: START_MS - 3 * DAY_MS,
            exited_at: None,
        },
    );

    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    h.drain().await;
    let done = h.screening(&screening.id).await;

    assert_eq!(
        done.check(CheckKind::ZoneVisits).and_then(|c| c.severity),
        Some(Severity::Warning)
    );
    assert_eq!(done.severity, Some(Severity::Warning));
}

/// Changing ship master data rescreens it; the old run goes to history
#[tokio::test]
async fn test_ship_update_rescreens_and_records_history() {
    let h = Harness::new().await;
    h.add_ship(sample_ship(IMO)).await;
    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    h.drain().await;

    h.clock.advance(60 * SECOND_MS);
    let mut updated = sample_ship(IMO);
    updated.flag = Some("IR".to_string());
    let outcome = h.ships.upsert(updated).await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.rescheduled, 1);

    let rescheduled = h.screening(&screening.id).await;
    assert_eq!(rescheduled.status, ScreeningStatus::Scheduled);
    assert_eq!(rescheduled.previous_severity, Some(Severity::Ok));
    assert_eq!(rescheduled.severity, None);

    h.drain().await;
    let done = h.screening(&screening.id).await;
    assert_eq!(done.status, ScreeningStatus::Done);
    assert_eq!(done.severity, Some(Severity::Critical));
    assert_eq!(done.severity_change, Some(SeverityChange::Increased));
    assert_eq!(done.completed_at, Some(START_MS + 60 * SECOND_MS));
    assert_eq!(
        done.check(CheckKind::ShipFlag).and_then(|c| c.severity),
        Some(Severity::Critical)
    );

    let history = h.screenings.history(&screening.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].severity, Some(Severity::Ok));
    assert_eq!(history[0].completed_at, Some(START_MS));
    assert_eq!(history[0].checks.len(), CheckKind::ALL.len());
}

#[tokio::test]
async fn test_unchanged_ship_does_not_rescreen() {
    let h = Harness::new().await;
    h.add_ship(sample_ship(IMO)).await;
    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    h.drain().await;

    h.clock.advance(SECOND_MS);
    let outcome = h.ships.upsert(sample_ship(IMO)).await.unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.rescheduled, 0);
    assert_eq!(h.jobs(JobState::Queued).await, 0);
    assert_eq!(
        h.screening(&screening.id).await.status,
        ScreeningStatus::Done
    );
}

/// Scheduling twice supersedes the first run's queued jobs
#[tokio::test]
async fn test_reschedule_supersedes_queued_jobs() {
    let h = Harness::new().await;
    h.add_ship(sample_ship(IMO)).await;
    let screening = h.screenings.create("acct-1", IMO).await.unwrap();

    h.clock.advance(SECOND_MS);
    h.screenings.schedule(&screening.id).await.unwrap();

    let checks = CheckKind::ALL.len() as i64;
    assert_eq!(h.jobs(JobState::Superseded).await, checks);
    assert_eq!(h.jobs(JobState::Queued).await, checks);

    assert_eq!(h.drain().await, CheckKind::ALL.len());
    let done = h.screening(&screening.id).await;
    assert_eq!(done.status, ScreeningStatus::Done);
    assert_eq!(done.scheduled_at, Some(START_MS + SECOND_MS));
    // Never completed before the second schedule, so nothing was archived
    assert!(h.screenings.history(&screening.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_bad_requests() {
    let h = Harness::new().await;
    h.add_ship(sample_ship(IMO)).await;

    let bad_imo = h.screenings.create("acct-1", "1234568").await;
    assert!(matches!(bad_imo, Err(AppError::Validation(_))));

    let empty_account = h.screenings.create("  ", IMO).await;
    assert!(matches!(empty_account, Err(AppError::Validation(_))));

    let unknown_ship = h.screenings.create("acct-1", "9321483").await;
    assert!(matches!(unknown_ship, Err(AppError::NotFound(_))));

    h.screenings.create("acct-1", IMO).await.unwrap();
    let duplicate = h.screenings.create("acct-1", IMO).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Another account may screen the same ship
    h.screenings.create("acct-2", IMO).await.unwrap();
}

/// Company sanctions look up every role the ship has
#[tokio::test]
async fn test_sanctioned_beneficial_owner() {
    let h = Harness::new().await;
    let mut ship = sample_ship(IMO);
    ship.companies.insert(
        CompanyRole::BeneficialOwner,
        Company {
            name: "Shadow Fleet Ltd".to_string(),
            country: Some("AE".to_string()),
        },
    );
    h.add_ship(ship).await;
    h.sources.sanction_company("Shadow Fleet Ltd", "EU");

    let screening = h.screenings.create("acct-1", IMO).await.unwrap();
    h.drain().await;
    let done = h.screening(&screening.id).await;

    assert_eq!(
        done.check(CheckKind::BeneficialOwnerSanction)
            .and_then(|c| c.severity),
        Some(Severity::Critical)
    );
    assert_eq!(
        done.check(CheckKind::BeneficialOwnerCountry)
            .and_then(|c| c.severity),
        Some(Severity::Ok)
    );
}
