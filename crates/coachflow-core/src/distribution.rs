//! Placement of week-template tasks onto concrete program days.
//!
//! Tasks are bucketed by their [`DayTag`] and appended to the days of one
//! week in a fixed order: daily, specific-day, spread, then auto. The
//! template list is only read; every placement is a fresh [`InstanceTask`].

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::instance::{InstanceDay, InstanceTask, TaskSource};
use crate::program::{DayTag, DistributionPolicy, ProgramTaskTemplate};

/// Index (0-based) that task `i` of `count` spread tasks lands on across
/// `num_days` days.
///
/// Computes `round(i * (num_days - 1) / (count - 1))` with halves rounded
/// up. A single task goes to the first day.
pub fn spread_index(i: usize, count: usize, num_days: usize) -> usize {
    if count <= 1 || num_days <= 1 {
        return 0;
    }
    let numerator = i * (num_days - 1);
    let denominator = count - 1;
    (2 * numerator + denominator) / (2 * denominator)
}

fn instantiate(template: &ProgramTaskTemplate) -> InstanceTask {
    InstanceTask {
        id: Uuid::new_v4().to_string(),
        template_task_id: template.id.clone(),
        label: template.label.clone(),
        is_primary: template.is_primary,
        estimated_minutes: template.estimated_minutes,
        notes: template.notes.clone(),
        tag: template.tag.clone(),
        source: TaskSource::Week,
    }
}

fn place_spread(tasks: &[&ProgramTaskTemplate], days: &mut [InstanceDay]) {
    let num_days = days.len();
    for (i, task) in tasks.iter().enumerate() {
        let idx = spread_index(i, tasks.len(), num_days);
        days[idx].tasks.push(instantiate(task));
    }
}

#[derive(Default)]
struct Buckets<'a> {
    daily: Vec<&'a ProgramTaskTemplate>,
    spread: Vec<&'a ProgramTaskTemplate>,
    by_day: BTreeMap<u32, Vec<&'a ProgramTaskTemplate>>,
    auto: Vec<&'a ProgramTaskTemplate>,
}

impl<'a> Buckets<'a> {
    fn partition(tasks: &'a [ProgramTaskTemplate]) -> Self {
        let mut buckets = Buckets::default();
        for task in tasks {
            match &task.day_tag {
                DayTag::Daily => buckets.daily.push(task),
                DayTag::Spread => buckets.spread.push(task),
                DayTag::Auto => buckets.auto.push(task),
                DayTag::Day(day) => buckets.by_day.entry(*day).or_default().push(task),
                DayTag::Days(list) => {
                    // A day listed twice still gets a single copy.
                    let unique: BTreeSet<u32> = list.iter().copied().collect();
                    for day in unique {
                        buckets.by_day.entry(day).or_default().push(task);
                    }
                }
            }
        }
        buckets
    }
}

/// Distribute `tasks` onto the active `days` of one week.
///
/// Specific-day tags outside `1..=days.len()` are dropped (logged at debug
/// level). Zero days or zero tasks leave `days` untouched.
pub fn distribute_tasks_to_days(
    tasks: &[ProgramTaskTemplate],
    days: &mut [InstanceDay],
    policy: DistributionPolicy,
) {
    let num_days = days.len();
    if num_days == 0 || tasks.is_empty() {
        return;
    }

    let buckets = Buckets::partition(tasks);

    for day in days.iter_mut() {
        for task in &buckets.daily {
            day.tasks.push(instantiate(task));
        }
    }

    for (day_number, day_tasks) in &buckets.by_day {
        let slot = (*day_number as usize)
            .checked_sub(1)
            .filter(|idx| *idx < num_days);
        match slot {
            Some(idx) => {
                for task in day_tasks {
                    days[idx].tasks.push(instantiate(task));
                }
            }
            None => {
                for task in day_tasks {
                    tracing::debug!(
                        task_id = %task.id,
                        day = day_number,
                        active_days = num_days,
                        "dropping task tagged for a day outside the week"
                    );
                }
            }
        }
    }

    if !buckets.spread.is_empty() {
        place_spread(&buckets.spread, days);
    }

    if !buckets.auto.is_empty() {
        match policy {
            DistributionPolicy::Spread => place_spread(&buckets.auto, days),
            DistributionPolicy::AllDays => {
                for day in days.iter_mut() {
                    for task in &buckets.auto {
                        day.tasks.push(instantiate(task));
                    }
                }
            }
            DistributionPolicy::FirstDay => {
                for task in &buckets.auto {
                    days[0].tasks.push(instantiate(task));
                }
            }
        }
    }
}
