//! Integration tests for program instance generation.
//!
//! These tests go through the public API: templates are stored, instances
//! are ensured, and the persisted documents are checked day by day.

use chrono::{Datelike, NaiveDate, Weekday};
use coachflow_core::{
    ensure_cohort_instance_exists, ensure_enrollment_instance_exists, DayTag, DistributionPolicy,
    Program, ProgramCohort, ProgramDb, ProgramEnrollment, ProgramInstance, ProgramTaskTemplate,
    ProgramWeekTemplate, RequestContext,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days_with(instance: &ProgramInstance, template_id: &str) -> Vec<u32> {
    instance
        .days()
        .filter(|d| d.has_template_task(template_id))
        .map(|d| d.global_day_index)
        .collect()
}

#[test]
fn test_one_week_scenario_through_storage() {
    let db = ProgramDb::open_memory().unwrap();
    let ctx = RequestContext::new("org-1");

    let mut program = Program::new("org-1", "Seven Day Reset", 7);
    program.include_weekends = true;
    program.weeks = vec![ProgramWeekTemplate {
        week_number: Some(1),
        tasks: vec![
            ProgramTaskTemplate::new("a", "Morning walk", DayTag::Daily),
            ProgramTaskTemplate::new("b", "Meal prep", DayTag::Day(2)),
            ProgramTaskTemplate::new("c", "Reflection", DayTag::Spread),
            ProgramTaskTemplate::new("d", "Weigh-in", DayTag::Spread),
        ],
        ..Default::default()
    }];
    program.validate().unwrap();
    db.put_program(&program).unwrap();

    let enrollment = ProgramEnrollment::new(&program, "client-1", Some(date(2024, 3, 4)));
    db.put_enrollment(&enrollment).unwrap();

    let id = ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id).unwrap();
    let instance = db.get_instance(&id).unwrap().unwrap();

    assert_eq!(instance.total_days(), 7);
    assert_eq!(days_with(&instance, "a"), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(days_with(&instance, "b"), vec![2]);
    assert_eq!(days_with(&instance, "c"), vec![1]);
    assert_eq!(days_with(&instance, "d"), vec![7]);
    assert_eq!(instance.end_date, date(2024, 3, 10));
}

#[test]
fn test_thirty_day_weekday_program_from_wednesday() {
    let db = ProgramDb::open_memory().unwrap();
    let ctx = RequestContext::new("org-1");

    let mut program = Program::new("org-1", "Thirty Days", 30);
    program.include_weekends = false;
    program.distribution = DistributionPolicy::AllDays;
    program.weeks = (1..=7)
        .map(|n| ProgramWeekTemplate {
            week_number: Some(n),
            tasks: vec![ProgramTaskTemplate::new(format!("w{n}"), "Log meals", DayTag::Auto)],
            ..Default::default()
        })
        .collect();
    db.put_program(&program).unwrap();

    let cohort = ProgramCohort::new(&program, "Spring", date(2024, 3, 6));
    db.put_cohort(&cohort).unwrap();

    let id = ensure_cohort_instance_exists(&db, &ctx, &program.id, &cohort.id).unwrap();
    let instance = db.get_instance(&id).unwrap().unwrap();

    let first = &instance.weeks[0];
    let weekdays: Vec<Weekday> = first.days.iter().map(|d| d.calendar_date.weekday()).collect();
    assert_eq!(weekdays, vec![Weekday::Wed, Weekday::Thu, Weekday::Fri]);

    assert_eq!(instance.total_days(), 30);
    assert!(instance
        .days()
        .all(|d| !matches!(d.calendar_date.weekday(), Weekday::Sat | Weekday::Sun)));
    // all_days policy: each week's auto task on every day of that week
    assert_eq!(days_with(&instance, "w1"), vec![1, 2, 3]);
    assert_eq!(days_with(&instance, "w7"), vec![29, 30]);
}

#[test]
fn test_ensure_twice_returns_same_instance() {
    let db = ProgramDb::open_memory().unwrap();
    let ctx = RequestContext::new("org-1");
    let program = Program::new("org-1", "Idempotent", 10);
    db.put_program(&program).unwrap();
    let enrollment = ProgramEnrollment::new(&program, "client-2", None);
    db.put_enrollment(&enrollment).unwrap();

    let first = ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id);
    let second = ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_two_connections_race_to_one_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coachflow.db");
    let ctx = RequestContext::new("org-1");

    let program = Program::new("org-1", "Raced", 5);
    let enrollment = ProgramEnrollment::new(&program, "client-3", None);
    {
        let db = ProgramDb::open_at(&path).unwrap();
        db.put_program(&program).unwrap();
        db.put_enrollment(&enrollment).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let ctx = ctx.clone();
            let program_id = program.id.clone();
            let enrollment_id = enrollment.id.clone();
            std::thread::spawn(move || {
                let db = ProgramDb::open_at(&path).unwrap();
                ensure_enrollment_instance_exists(&db, &ctx, &program_id, &enrollment_id)
            })
        })
        .collect();

    let ids: Vec<Option<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = ids[0].clone().expect("instance ensured");
    assert!(ids.iter().all(|id| id.as_deref() == Some(first.as_str())));

    let db = ProgramDb::open_at(&path).unwrap();
    assert_eq!(db.list_instances(&program.id).unwrap().len(), 1);
}
