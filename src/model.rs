use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A plan is overdue when its deadline is strictly before `today` and it is
/// still open. A deadline equal to `today` is never overdue.
pub fn is_overdue(deadline: NaiveDate, completed: bool, today: NaiveDate) -> bool {
    !completed && deadline < today
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyGoalInput {
    pub task: String,
    pub date: NaiveDate,
}

/// Fields of a daily goal that may be changed after creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyGoalChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl DailyGoalChanges {
    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.date.is_none() && self.completed.is_none()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyGoalQuery {
    pub date: Option<NaiveDate>,
}

/// Form fields of a monthly plan, used both for creation and full edits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyPlanInput {
    pub subject: String,
    pub target: String,
    pub deadline: NaiveDate,
}

/// The only partially updatable field of a monthly plan.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyPlanCompletion {
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudySessionInput {
    pub subject: String,
    pub duration_minutes: i32,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudySessionQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyllabusTopicInput {
    pub subject: String,
    pub topic: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyllabusQuery {
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyResourceInput {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyGroupInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn open_plan_past_deadline_is_overdue() {
        assert!(is_overdue(date("2024-01-01"), false, date("2024-01-02")));
    }

    #[test]
    fn deadline_today_is_never_overdue() {
        assert!(!is_overdue(date("2024-03-10"), false, date("2024-03-10")));
    }

    #[test]
    fn completed_plan_is_not_overdue() {
        assert!(!is_overdue(date("2024-01-01"), true, date("2024-06-01")));
    }

    #[test]
    fn future_deadline_is_not_overdue() {
        assert!(!is_overdue(date("2030-01-01"), false, date("2024-06-01")));
    }

    #[test]
    fn daily_goal_changes_reject_unknown_fields() {
        let err = serde_json::from_str::<DailyGoalChanges>(r#"{"user_id":"mallory"}"#)
            .expect_err("unknown field");
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn monthly_completion_accepts_only_completed() {
        let parsed: MonthlyPlanCompletion =
            serde_json::from_str(r#"{"completed":true}"#).expect("completion");
        assert!(parsed.completed);
        assert!(
            serde_json::from_str::<MonthlyPlanCompletion>(r#"{"completed":true,"subject":"x"}"#)
                .is_err()
        );
    }
}
