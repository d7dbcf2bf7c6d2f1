use std::fmt;

use chrono::NaiveDate;

use crate::client::store::{
    DailyGoal, MonthlyPlan, StudyGroup, StudyResource, StudySession, SyllabusTopic,
};
use crate::model::is_overdue;

/// Transient feedback for one resolved store action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success(message.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Success(message) => write!(f, "[ok] {message}"),
            Notice::Failure(message) => write!(f, "[error] {message}"),
        }
    }
}

fn done_marker(completed: bool) -> &'static str {
    if completed {
        "done"
    } else {
        "todo"
    }
}

pub fn format_daily_goals(goals: &[DailyGoal]) -> String {
    if goals.is_empty() {
        return "No daily goals found.".to_string();
    }
    let mut output = format!("{:<4} {:<6} {:<10} {}\n", "ID", "STAT", "DATE", "TASK");
    for goal in goals {
        output.push_str(&format!(
            "{:<4} {:<6} {:<10} {}\n",
            goal.id,
            done_marker(goal.completed),
            goal.date,
            goal.task
        ));
    }
    output.trim_end().to_string()
}

/// Renders monthly plans, flagging open plans whose deadline is before `today`.
pub fn format_monthly_plans(plans: &[MonthlyPlan], today: NaiveDate) -> String {
    if plans.is_empty() {
        return "No monthly plans found.".to_string();
    }
    let mut output = format!(
        "{:<4} {:<6} {:<10} {:<20} {}\n",
        "ID", "STAT", "DEADLINE", "SUBJECT", "TARGET"
    );
    for plan in plans {
        let mut line = format!(
            "{:<4} {:<6} {:<10} {:<20} {}",
            plan.id,
            done_marker(plan.completed),
            plan.deadline,
            plan.subject,
            plan.target
        );
        if is_overdue(plan.deadline, plan.completed, today) {
            line.push_str("  OVERDUE");
        }
        output.push_str(&line);
        output.push('\n');
    }
    output.trim_end().to_string()
}

pub fn format_sessions(sessions: &[StudySession]) -> String {
    if sessions.is_empty() {
        return "No study sessions found.".to_string();
    }
    let mut output = format!(
        "{:<4} {:<10} {:<8} {:<20} {}\n",
        "ID", "DATE", "MINUTES", "SUBJECT", "NOTES"
    );
    for session in sessions {
        output.push_str(&format!(
            "{:<4} {:<10} {:<8} {:<20} {}\n",
            session.id,
            session.date,
            session.duration_minutes,
            session.subject,
            session.notes.as_deref().unwrap_or("")
        ));
    }
    let total: i64 = sessions
        .iter()
        .map(|session| i64::from(session.duration_minutes))
        .sum();
    output.push_str(&format!("Total: {total} minutes"));
    output
}

pub fn format_syllabus(topics: &[SyllabusTopic]) -> String {
    if topics.is_empty() {
        return "No syllabus topics found.".to_string();
    }
    let done = topics.iter().filter(|topic| topic.completed).count();
    let mut output = format!("{:<4} {:<6} {:<20} {}\n", "ID", "STAT", "SUBJECT", "TOPIC");
    for topic in topics {
        output.push_str(&format!(
            "{:<4} {:<6} {:<20} {}\n",
            topic.id,
            done_marker(topic.completed),
            topic.subject,
            topic.topic
        ));
    }
    output.push_str(&format!("Covered: {}/{}", done, topics.len()));
    output
}

pub fn format_resources(resources: &[StudyResource]) -> String {
    if resources.is_empty() {
        return "No resources found.".to_string();
    }
    let mut output = format!("{:<4} {:<30} {:<20} {}\n", "ID", "TITLE", "SUBJECT", "URL");
    for resource in resources {
        output.push_str(&format!(
            "{:<4} {:<30} {:<20} {}\n",
            resource.id,
            resource.title,
            resource.subject.as_deref().unwrap_or("-"),
            resource.url
        ));
    }
    output.trim_end().to_string()
}

pub fn format_groups(groups: &[StudyGroup]) -> String {
    if groups.is_empty() {
        return "No study groups found.".to_string();
    }
    let mut output = format!("{:<4} {:<30} {}\n", "ID", "NAME", "DESCRIPTION");
    for group in groups {
        output.push_str(&format!(
            "{:<4} {:<30} {}\n",
            group.id,
            group.name,
            group.description.as_deref().unwrap_or("")
        ));
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn plan(id: i64, deadline: &str, completed: bool) -> MonthlyPlan {
        MonthlyPlan {
            id,
            user_id: "alice".to_string(),
            subject: "Math".to_string(),
            target: "Finish 5 chapters".to_string(),
            deadline: date(deadline),
            completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notices_render_with_status_prefix() {
        assert_eq!(Notice::success("Goal added").to_string(), "[ok] Goal added");
        let failure = Notice::failure("task cannot be empty");
        assert_eq!(failure.to_string(), "[error] task cannot be empty");
        assert!(failure.is_failure());
    }

    #[test]
    fn monthly_plans_mark_only_open_past_deadlines() {
        let today = date("2024-03-10");
        let output = format_monthly_plans(
            &[
                plan(1, "2024-03-01", false),
                plan(2, "2024-03-10", false),
                plan(3, "2024-01-01", true),
            ],
            today,
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("OVERDUE"));
        assert!(!lines[2].contains("OVERDUE"));
        assert!(!lines[3].contains("OVERDUE"));
    }

    #[test]
    fn empty_collections_render_placeholder() {
        assert_eq!(format_daily_goals(&[]), "No daily goals found.");
        assert_eq!(
            format_monthly_plans(&[], date("2024-01-01")),
            "No monthly plans found."
        );
        assert_eq!(format_groups(&[]), "No study groups found.");
    }

    #[test]
    fn daily_goals_show_status_and_task() {
        let goal = DailyGoal {
            id: 3,
            user_id: "alice".to_string(),
            task: "Read chapter 1".to_string(),
            date: date("2024-01-15"),
            completed: true,
            created_at: Utc::now(),
        };
        let output = format_daily_goals(&[goal]);
        let row = output.lines().nth(1).expect("row");
        assert!(row.starts_with("3    done   2024-01-15"));
        assert!(row.ends_with("Read chapter 1"));
    }

    #[test]
    fn sessions_report_total_minutes() {
        let session = |id, minutes| StudySession {
            id,
            user_id: "alice".to_string(),
            subject: "Physics".to_string(),
            duration_minutes: minutes,
            date: date("2024-01-15"),
            notes: None,
            created_at: Utc::now(),
        };
        let output = format_sessions(&[session(1, 45), session(2, 30)]);
        assert!(output.ends_with("Total: 75 minutes"));
    }

    #[test]
    fn syllabus_reports_coverage() {
        let topic = |id, completed| SyllabusTopic {
            id,
            user_id: "alice".to_string(),
            subject: "Biology".to_string(),
            topic: "Cells".to_string(),
            completed,
            created_at: Utc::now(),
        };
        let output = format_syllabus(&[topic(1, true), topic(2, false)]);
        assert!(output.ends_with("Covered: 1/2"));
    }
}
