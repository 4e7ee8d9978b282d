//! Program templates, enrollments and cohorts.
//!
//! These are the persisted documents a program instance is generated from.
//! Field names follow the document-store shape (camelCase on the wire).

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Placement directive on a template task.
///
/// On the wire this is the loose union `"auto" | "daily" | "spread" |
/// number | number[]`; a missing tag means [`DayTag::Auto`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDayTag", into = "RawDayTag")]
pub enum DayTag {
    /// Placed according to the week's [`DistributionPolicy`].
    #[default]
    Auto,
    /// Placed on every active day.
    Daily,
    /// Spread evenly across the active days together with other spread tasks.
    Spread,
    /// Placed on one 1-based day of the week.
    Day(u32),
    /// Placed on each listed 1-based day of the week.
    Days(Vec<u32>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDayTag {
    Keyword(String),
    Day(u32),
    Days(Vec<u32>),
}

impl TryFrom<RawDayTag> for DayTag {
    type Error = String;

    fn try_from(raw: RawDayTag) -> Result<Self, Self::Error> {
        match raw {
            RawDayTag::Keyword(word) => match word.as_str() {
                "auto" => Ok(DayTag::Auto),
                "daily" => Ok(DayTag::Daily),
                "spread" => Ok(DayTag::Spread),
                other => Err(format!("unknown day tag: {other}")),
            },
            RawDayTag::Day(day) => Ok(DayTag::Day(day)),
            RawDayTag::Days(days) => Ok(DayTag::Days(days)),
        }
    }
}

impl From<DayTag> for RawDayTag {
    fn from(tag: DayTag) -> Self {
        match tag {
            DayTag::Auto => RawDayTag::Keyword("auto".into()),
            DayTag::Daily => RawDayTag::Keyword("daily".into()),
            DayTag::Spread => RawDayTag::Keyword("spread".into()),
            DayTag::Day(day) => RawDayTag::Day(day),
            DayTag::Days(days) => RawDayTag::Days(days),
        }
    }
}

/// Week-level default rule for [`DayTag::Auto`] tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPolicy {
    #[default]
    Spread,
    AllDays,
    FirstDay,
}

impl std::str::FromStr for DistributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spread" => Ok(DistributionPolicy::Spread),
            "all_days" => Ok(DistributionPolicy::AllDays),
            "first_day" => Ok(DistributionPolicy::FirstDay),
            other => Err(format!("unknown distribution policy: {other}")),
        }
    }
}

/// A task template inside a program week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTaskTemplate {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub day_tag: DayTag,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ProgramTaskTemplate {
    pub fn new(id: impl Into<String>, label: impl Into<String>, day_tag: DayTag) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            day_tag,
            is_primary: false,
            estimated_minutes: None,
            notes: None,
            tag: None,
        }
    }
}

/// A habit template; habits are repeated on every active day of their week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramHabitTemplate {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One week of a program template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramWeekTemplate {
    /// Absent in the older template format, where weeks are matched by position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub tasks: Vec<ProgramTaskTemplate>,
    #[serde(default)]
    pub habits: Vec<ProgramHabitTemplate>,
    /// Overrides the program-level policy for this week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionPolicy>,
}

/// Longest program accepted by [`Program::validate`], in active days.
pub const MAX_LENGTH_DAYS: u32 = 3660;

/// A coaching program template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub length_days: u32,
    #[serde(default)]
    pub weeks: Vec<ProgramWeekTemplate>,
    #[serde(default)]
    pub distribution: DistributionPolicy,
    #[serde(default)]
    pub include_weekends: bool,
    #[serde(default = "default_daily_focus_slots")]
    pub daily_focus_slots: u32,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn default_daily_focus_slots() -> u32 {
    2
}

impl Program {
    pub fn new(organization_id: impl Into<String>, name: impl Into<String>, length_days: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.into(),
            name: name.into(),
            length_days,
            weeks: Vec::new(),
            distribution: DistributionPolicy::default(),
            include_weekends: false,
            daily_focus_slots: default_daily_focus_slots(),
            created_at: Utc::now(),
        }
    }

    /// Check the structural rules a template must satisfy before instances
    /// can be generated from it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name".into()));
        }
        if self.organization_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("organizationId".into()));
        }
        if self.length_days == 0 {
            return Err(ValidationError::InvalidValue {
                field: "lengthDays".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.length_days > MAX_LENGTH_DAYS {
            return Err(ValidationError::InvalidValue {
                field: "lengthDays".into(),
                message: format!("must be at most {MAX_LENGTH_DAYS}"),
            });
        }
        if self.daily_focus_slots == 0 {
            return Err(ValidationError::InvalidValue {
                field: "dailyFocusSlots".into(),
                message: "must be at least 1".into(),
            });
        }

        let mut seen = HashSet::new();
        for number in self.weeks.iter().filter_map(|w| w.week_number) {
            if number == 0 {
                return Err(ValidationError::InvalidValue {
                    field: "weeks.weekNumber".into(),
                    message: "week numbers are 1-based".into(),
                });
            }
            if !seen.insert(number) {
                return Err(ValidationError::DuplicateWeek(number));
            }
        }
        Ok(())
    }

    /// Template for a calendar week.
    ///
    /// Matches on explicit week numbers; when no template carries one
    /// (older format) falls back to position `week_number - 1`.
    pub fn template_for_week(&self, week_number: u32) -> Option<&ProgramWeekTemplate> {
        let numbered = self.weeks.iter().any(|w| w.week_number.is_some());
        if numbered {
            self.weeks
                .iter()
                .find(|w| w.week_number == Some(week_number))
        } else {
            week_number
                .checked_sub(1)
                .and_then(|idx| self.weeks.get(idx as usize))
        }
    }
}

/// Links one user to a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramEnrollment {
    pub id: String,
    pub organization_id: String,
    pub program_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl ProgramEnrollment {
    pub fn new(program: &Program, user_id: impl Into<String>, start_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: program.organization_id.clone(),
            program_id: program.id.clone(),
            user_id: user_id.into(),
            cohort_id: None,
            start_date,
            created_at: Utc::now(),
        }
    }

    /// Start date used for calendar alignment.
    pub fn effective_start_date(&self) -> NaiveDate {
        self.start_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// A group of users running through the same program instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramCohort {
    pub id: String,
    pub organization_id: String,
    pub program_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl ProgramCohort {
    pub fn new(program: &Program, name: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: program.organization_id.clone(),
            program_id: program.id.clone(),
            name: name.into(),
            start_date,
            created_at: Utc::now(),
        }
    }

    pub fn effective_start_date(&self) -> NaiveDate {
        self.start_date
    }
}
