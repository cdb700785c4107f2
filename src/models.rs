use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PROJECT: &str = "Genel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Unknown or blank labels fall back to medium.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }

    pub fn label_tr(self) -> &'static str {
        match self {
            Priority::Low => "Düşük",
            Priority::Medium => "Orta",
            Priority::High => "Yüksek",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "in_progress" => Status::InProgress,
            "done" => Status::Done,
            _ => Status::Todo,
        }
    }

    /// done flips back to todo, everything else moves to done.
    pub fn toggled(self) -> Self {
        match self {
            Status::Done => Status::Todo,
            Status::Todo | Status::InProgress => Status::Done,
        }
    }

    pub fn label_tr(self) -> &'static str {
        match self {
            Status::Todo => "Yapılacak",
            Status::InProgress => "Devam ediyor",
            Status::Done => "Tamamlandı",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub project: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due: String,
    pub due_sort: String,
    pub status: Status,
    pub completed_at: Option<NaiveDate>,
}

impl Task {
    pub fn project_name(&self) -> &str {
        let name = self.project.trim();
        if name.is_empty() { DEFAULT_PROJECT } else { name }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub project: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due: String,
    pub due_sort: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub todo: u64,
    pub in_progress: u64,
    pub done: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub task_count: u64,
    pub completed: u64,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub label: String,
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyPoint {
    pub start_date: String,
    pub end_date: String,
    pub label: String,
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSlice {
    pub project: String,
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportsResponse {
    pub status_counts: StatusCounts,
    pub last_7_days: Vec<DailyPoint>,
    pub last_4_weeks: Vec<WeeklyPoint>,
    pub by_project: Vec<ProjectSlice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub project: String,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub iso: String,
    pub in_month: bool,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub weeks: Vec<Vec<CalendarDay>>,
    pub prev_year: i32,
    pub prev_month: u32,
    pub next_year: i32,
    pub next_month: u32,
}

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    pub title: Option<String>,
    pub project: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_sort: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddProjectForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Identifiers arrive as JSON numbers, JSON strings or form strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    pub fn parse(&self) -> Option<i64> {
        match self {
            IdValue::Number(id) => Some(*id),
            IdValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskIdRequest {
    pub id: Option<IdValue>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProjectRequest {
    pub id: Option<IdValue>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub id: i64,
    pub status: Status,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub ok: bool,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteProjectResponse {
    pub ok: bool,
    pub name: String,
    pub deleted_tasks: u64,
}

#[derive(Debug, Serialize)]
pub struct UpcomingTask {
    pub id: i64,
    pub title: String,
    pub project: String,
    pub due: String,
    pub due_sort: String,
    pub priority: Priority,
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub count: usize,
    pub tasks: Vec<UpcomingTask>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_returns_to_start() {
        assert_eq!(Status::Todo.toggled().toggled(), Status::Todo);
        assert_eq!(Status::Done.toggled().toggled(), Status::Done);
        assert_eq!(Status::InProgress.toggled(), Status::Done);
    }

    #[test]
    fn unknown_priority_is_medium() {
        assert_eq!(Priority::parse("urgent"), Priority::Medium);
        assert_eq!(Priority::parse(""), Priority::Medium);
        assert_eq!(Priority::parse("high"), Priority::High);
    }

    #[test]
    fn task_and_project_serialize_dates_as_iso() {
        let task = Task {
            id: 3,
            project: "Web".into(),
            title: "Yayın".into(),
            description: String::new(),
            priority: Priority::High,
            due: "25 Aralık".into(),
            due_sort: "2025-12-25".into(),
            status: Status::Done,
            completed_at: NaiveDate::from_ymd_opt(2025, 12, 24),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["completed_at"], "2025-12-24");
        assert_eq!(json["status"], "done");
        assert_eq!(json["priority"], "high");

        let project = Project {
            id: 1,
            name: "Web".into(),
            description: String::new(),
            created_at: NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["created_at"], "2025-12-01T09:30:00");
    }

    #[test]
    fn id_value_accepts_numbers_and_strings() {
        let payload: TaskIdRequest = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(payload.id.and_then(|id| id.parse()), Some(7));
        let payload: TaskIdRequest = serde_json::from_str(r#"{"id": " 12 "}"#).unwrap();
        assert_eq!(payload.id.and_then(|id| id.parse()), Some(12));
        let payload: TaskIdRequest = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(payload.id.and_then(|id| id.parse()), None);
    }
}
