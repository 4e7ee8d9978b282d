//! Materialized program instances.
//!
//! A [`ProgramInstance`] is the calendar-dated, fully denormalized expansion
//! of a program for one enrollment or one cohort. It is written once and then
//! only touched by downstream sync jobs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a task on an instance day came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Copied from the program's week template.
    Week,
    /// Added by a coach after generation.
    Manual,
    /// Written by a downstream sync job.
    Sync,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTask {
    pub id: String,
    pub template_task_id: String,
    pub label: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub source: TaskSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHabit {
    pub id: String,
    pub template_habit_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One active program day. Instances never contain display padding days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDay {
    /// 1-based within the week.
    pub day_index: u32,
    /// 1-based within the whole program.
    pub global_day_index: u32,
    pub calendar_date: NaiveDate,
    #[serde(default)]
    pub tasks: Vec<InstanceTask>,
    #[serde(default)]
    pub habits: Vec<InstanceHabit>,
}

impl InstanceDay {
    pub fn new(day_index: u32, global_day_index: u32, calendar_date: NaiveDate) -> Self {
        Self {
            day_index,
            global_day_index,
            calendar_date,
            tasks: Vec::new(),
            habits: Vec::new(),
        }
    }

    /// Whether a task generated from `template_task_id` is on this day.
    pub fn has_template_task(&self, template_task_id: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.template_task_id == template_task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceWeek {
    pub week_number: u32,
    /// Template week the content came from, if any matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_week_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub start_day_index: u32,
    pub end_day_index: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_day_of_week: u32,
    pub end_day_of_week: u32,
    pub days: Vec<InstanceDay>,
}

/// Whom an instance belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InstanceKind {
    Cohort {
        #[serde(rename = "cohortId")]
        cohort_id: String,
    },
    Individual {
        #[serde(rename = "enrollmentId")]
        enrollment_id: String,
    },
}

impl InstanceKind {
    pub fn cohort_id(&self) -> Option<&str> {
        match self {
            InstanceKind::Cohort { cohort_id } => Some(cohort_id),
            InstanceKind::Individual { .. } => None,
        }
    }

    pub fn enrollment_id(&self) -> Option<&str> {
        match self {
            InstanceKind::Individual { enrollment_id } => Some(enrollment_id),
            InstanceKind::Cohort { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstanceKind::Cohort { .. } => "cohort",
            InstanceKind::Individual { .. } => "individual",
        }
    }
}

/// The persisted instance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramInstance {
    pub id: String,
    pub program_id: String,
    pub organization_id: String,
    #[serde(flatten)]
    pub kind: InstanceKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub include_weekends: bool,
    pub daily_focus_slots: u32,
    pub weeks: Vec<InstanceWeek>,
    pub created_at: DateTime<Utc>,
}

impl ProgramInstance {
    /// Number of active days across all weeks.
    pub fn total_days(&self) -> u32 {
        self.weeks.iter().map(|w| w.days.len() as u32).sum()
    }

    /// Day by 1-based global index.
    pub fn day(&self, global_day_index: u32) -> Option<&InstanceDay> {
        self.days().find(|d| d.global_day_index == global_day_index)
    }

    /// Active day falling on `date`, if the program runs that day.
    pub fn day_on(&self, date: NaiveDate) -> Option<&InstanceDay> {
        self.weeks
            .iter()
            .find(|w| date >= w.start_date && date <= w.end_date)
            .and_then(|w| w.days.iter().find(|d| d.calendar_date == date))
    }

    /// Iterate over every active day in program order.
    pub fn days(&self) -> impl Iterator<Item = &InstanceDay> {
        self.weeks.iter().flat_map(|w| w.days.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instance() -> ProgramInstance {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let days = (0..3)
            .map(|i| InstanceDay::new(i + 1, i + 1, monday + chrono::Duration::days(i64::from(i))))
            .collect();
        ProgramInstance {
            id: "inst-1".into(),
            program_id: "prog-1".into(),
            organization_id: "org-1".into(),
            kind: InstanceKind::Individual {
                enrollment_id: "enr-1".into(),
            },
            start_date: monday,
            end_date: monday + chrono::Duration::days(2),
            include_weekends: false,
            daily_focus_slots: 2,
            weeks: vec![InstanceWeek {
                week_number: 1,
                template_week_number: Some(1),
                name: None,
                theme: None,
                start_day_index: 1,
                end_day_index: 3,
                start_date: monday,
                end_date: monday + chrono::Duration::days(2),
                start_day_of_week: 1,
                end_day_of_week: 3,
                days,
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn serializes_document_shape() {
        let json = serde_json::to_value(sample_instance()).unwrap();
        assert_eq!(json["type"], "individual");
        assert_eq!(json["enrollmentId"], "enr-1");
        assert_eq!(json["programId"], "prog-1");
        assert_eq!(json["dailyFocusSlots"], 2);
        assert_eq!(json["weeks"][0]["templateWeekNumber"], 1);
        assert_eq!(json["weeks"][0]["days"][1]["globalDayIndex"], 2);
        assert_eq!(json["weeks"][0]["days"][1]["calendarDate"], "2024-03-05");
    }

    #[test]
    fn document_roundtrip_keeps_kind() {
        let instance = sample_instance();
        let json = serde_json::to_string(&instance).unwrap();
        let decoded: ProgramInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.kind.enrollment_id(), Some("enr-1"));
        assert_eq!(decoded, instance);
    }

    #[test]
    fn day_lookups() {
        let instance = sample_instance();
        assert_eq!(instance.total_days(), 3);
        assert_eq!(instance.day(2).unwrap().day_index, 2);
        assert!(instance.day(4).is_none());

        let wednesday = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(instance.day_on(wednesday).unwrap().global_day_index, 3);
        let thursday = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert!(instance.day_on(thursday).is_none());
    }
}
