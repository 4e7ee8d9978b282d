//! Expansion of a program template into instance weeks.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::calendar::{calculate_calendar_weeks, CalendarWeek};
use crate::distribution::distribute_tasks_to_days;
use crate::instance::{InstanceDay, InstanceHabit, InstanceKind, InstanceWeek, ProgramInstance};
use crate::program::{Program, ProgramHabitTemplate};

fn instantiate_habit(template: &ProgramHabitTemplate) -> InstanceHabit {
    InstanceHabit {
        id: Uuid::new_v4().to_string(),
        template_habit_id: template.id.clone(),
        title: template.title.clone(),
        description: template.description.clone(),
    }
}

/// Build one instance week per calendar week, filling its active days from
/// the matching template week.
///
/// A calendar week without a template still gets its days, just empty.
/// Returns `None` if a week's days cannot be dated.
pub fn build_instance_weeks(calendar_weeks: &[CalendarWeek], program: &Program) -> Option<Vec<InstanceWeek>> {
    calendar_weeks
        .iter()
        .map(|cw| {
            let template = program.template_for_week(cw.week_number);

            let mut days = (0..cw.active_day_count())
                .map(|offset| {
                    let date = cw.date_of(offset)?;
                    Some(InstanceDay::new(offset + 1, cw.start_day_index + offset, date))
                })
                .collect::<Option<Vec<InstanceDay>>>()?;

            if let Some(template) = template {
                let policy = template.distribution.unwrap_or(program.distribution);
                distribute_tasks_to_days(&template.tasks, &mut days, policy);
                for day in days.iter_mut() {
                    day.habits
                        .extend(template.habits.iter().map(instantiate_habit));
                }
            }

            Some(InstanceWeek {
                week_number: cw.week_number,
                template_week_number: template.map(|t| t.week_number.unwrap_or(cw.week_number)),
                name: template.and_then(|t| t.name.clone()),
                theme: template.and_then(|t| t.theme.clone()),
                start_day_index: cw.start_day_index,
                end_day_index: cw.end_day_index,
                start_date: cw.start_date,
                end_date: cw.end_date,
                start_day_of_week: cw.start_day_of_week,
                end_day_of_week: cw.end_day_of_week,
                days,
            })
        })
        .collect()
}

/// Assemble a complete, unsaved instance document for `program` starting on
/// `start_date`.
///
/// Returns `None` when the program would run past the last representable
/// calendar date.
pub fn build_program_instance(
    program: &Program,
    kind: InstanceKind,
    start_date: NaiveDate,
) -> Option<ProgramInstance> {
    let calendar_weeks =
        calculate_calendar_weeks(start_date, program.length_days, program.include_weekends)?;
    let weeks = build_instance_weeks(&calendar_weeks, program)?;

    let first_active = weeks.first().map(|w| w.start_date).unwrap_or(start_date);
    let end_date = weeks.last().map(|w| w.end_date).unwrap_or(start_date);

    Some(ProgramInstance {
        id: Uuid::new_v4().to_string(),
        program_id: program.id.clone(),
        organization_id: program.organization_id.clone(),
        kind,
        start_date: first_active,
        end_date,
        include_weekends: program.include_weekends,
        daily_focus_slots: program.daily_focus_slots,
        weeks,
        created_at: Utc::now(),
    })
}
