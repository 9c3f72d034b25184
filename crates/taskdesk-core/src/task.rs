use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::compact_date_serde;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "med" | "medium" => Ok(Self::Medium),
            "h" | "high" => Ok(Self::High),
            other => Err(anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub owner_id: Uuid,

    #[serde(default)]
    pub assignee_id: Option<Uuid>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, with = "compact_date_serde::option")]
    pub due: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "compact_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "compact_date_serde")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, with = "compact_date_serde::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Fields accepted when creating a task. The owner comes from the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

impl Task {
    pub fn new(owner_id: Uuid, fields: NewTask, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(0);
        let category = fields
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_category);

        Self {
            id: Uuid::new_v4(),
            owner_id,
            assignee_id: fields.assignee_id,
            title: fields.title.trim().to_string(),
            description: fields.description.trim().to_string(),
            category,
            priority: fields.priority.unwrap_or_default(),
            due: fields.due.map(|d| d.trunc_subsecs(0)),
            completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.assignee_id == Some(user_id)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.due, self.completed, now)
    }

    pub fn is_due_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        is_due_within(self.due, self.completed, now, days)
    }

    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(0);
        self.completed = completed;
        self.completed_at = completed.then_some(now);
        self.updated_at = now;
    }
}

/// Not completed and due strictly before `now`.
pub fn is_overdue(due: Option<DateTime<Utc>>, completed: bool, now: DateTime<Utc>) -> bool {
    !completed && due.map(|d| d < now).unwrap_or(false)
}

/// Not completed and due inside `[now, now + days]`. A horizon past the
/// representable range leaves the window open-ended.
pub fn is_due_within(
    due: Option<DateTime<Utc>>,
    completed: bool,
    now: DateTime<Utc>,
    days: i64,
) -> bool {
    let horizon = Duration::try_days(days).and_then(|span| now.checked_add_signed(span));
    !completed
        && due
            .map(|d| d >= now && horizon.is_none_or(|h| d <= h))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{NewTask, Priority, Task};

    fn sample(now: chrono::DateTime<Utc>) -> Task {
        Task::new(
            Uuid::new_v4(),
            NewTask {
                title: "  Write report ".to_string(),
                category: Some("  ".to_string()),
                ..NewTask::default()
            },
            now,
        )
    }

    #[test]
    fn new_task_applies_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let task = sample(now);
        assert_eq!(task.title, "Write report");
        assert_eq!(task.category, "general");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
    }

    #[test]
    fn overdue_and_due_soon_windows() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut task = sample(now);

        task.due = Some(now - Duration::hours(1));
        assert!(task.is_overdue(now));
        assert!(!task.is_due_within(now, 3));

        task.due = Some(now + Duration::days(2));
        assert!(!task.is_overdue(now));
        assert!(task.is_due_within(now, 3));

        task.due = Some(now + Duration::days(4));
        assert!(!task.is_due_within(now, 3));

        task.due = Some(now - Duration::days(1));
        task.set_completed(true, now);
        assert!(!task.is_overdue(now));
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn huge_horizons_do_not_overflow() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut task = sample(now);
        task.due = Some(now + Duration::days(400));

        assert!(task.is_due_within(now, 1_000_000_000));
        assert!(task.is_due_within(now, i64::MAX));
        assert!(!task.is_due_within(now, 3));
    }

    #[test]
    fn timestamps_keep_whole_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let whole = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut task = Task::new(
            Uuid::new_v4(),
            NewTask {
                title: "stamp".to_string(),
                due: Some(now),
                ..NewTask::default()
            },
            now,
        );
        assert_eq!(task.created_at, whole);
        assert_eq!(task.due, Some(whole));

        task.set_completed(true, now);
        assert_eq!(task.completed_at, Some(whole));

        let back: Task = serde_json::from_value(serde_json::to_value(&task).unwrap()).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn priority_parses_short_and_long_forms() {
        assert_eq!("H".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn serde_uses_camel_case_and_compact_dates() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let task = sample(now);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["createdAt"], "20261019T090000Z");
        assert_eq!(value["priority"], "medium");

        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }
}
