//! # coachflow Core Library
//!
//! Business logic for coaching programs: turning a program template into a
//! calendar-dated instance for an enrollment or a cohort, and keeping the
//! coach's per-client notes. The `coachflow` CLI is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Calendar**: partitions a program's length into Monday-anchored weeks,
//!   honoring weekday-only schedules
//! - **Distribution**: places week-template tasks onto concrete days
//! - **Builder**: assembles the denormalized instance document
//! - **Ensure**: idempotent create-if-absent guards with ownership checks
//! - **Storage**: SQLite document store and TOML configuration
//!
//! ## Key Components
//!
//! - [`calculate_calendar_weeks`]: calendar-week partitioner
//! - [`distribute_tasks_to_days`]: task distributor
//! - [`build_instance_weeks`]: instance builder
//! - [`ensure_enrollment_instance_exists`] / [`ensure_cohort_instance_exists`]
//! - [`ProgramDb`]: document persistence
//! - [`CoachingService`]: client coaching data

pub mod builder;
pub mod calendar;
pub mod coaching;
pub mod context;
pub mod distribution;
pub mod ensure;
pub mod error;
pub mod instance;
pub mod program;
pub mod storage;

pub use builder::{build_instance_weeks, build_program_instance};
pub use calendar::{calculate_calendar_weeks, CalendarWeek};
pub use coaching::{ClientCoachingData, CoachingService};
pub use context::RequestContext;
pub use distribution::{distribute_tasks_to_days, spread_index};
pub use ensure::{
    ensure_cohort_instance_exists, ensure_enrollment_instance_exists,
    try_ensure_cohort_instance_exists, try_ensure_enrollment_instance_exists, EnsureError,
};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use instance::{InstanceDay, InstanceKind, InstanceTask, InstanceWeek, ProgramInstance, TaskSource};
pub use program::{
    DayTag, DistributionPolicy, Program, ProgramCohort, ProgramEnrollment, ProgramHabitTemplate,
    ProgramTaskTemplate, ProgramWeekTemplate, MAX_LENGTH_DAYS,
};
pub use storage::{Config, InstanceRef, ProgramDb};
