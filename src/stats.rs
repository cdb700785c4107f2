use crate::locale::day_month;
use crate::models::{
    DailyPoint, Project, ProjectSlice, ProjectSummary, ReportsResponse, Status, StatusCounts,
    Task, WeeklyPoint,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

const DAY_COUNT: i64 = 7;
const WEEK_COUNT: i64 = 4;

/// Per-project totals for every project that has tasks or was created
/// explicitly, sorted case-insensitively by name.
pub fn project_summaries(tasks: &[Task], projects: &[Project]) -> Vec<ProjectSummary> {
    let mut totals: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for task in tasks {
        let entry = totals.entry(task.project_name()).or_default();
        entry.0 += 1;
        if task.status == Status::Done {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<ProjectSummary> = totals
        .iter()
        .map(|(name, (total, done))| {
            let project = projects.iter().find(|project| project.name == *name);
            ProjectSummary {
                id: project.map(|project| project.id),
                name: name.to_string(),
                description: project
                    .map(|project| project.description.clone())
                    .unwrap_or_default(),
                task_count: *total,
                completed: *done,
                percent: completion_percent(*done, *total),
            }
        })
        .collect();

    for project in projects {
        if !totals.contains_key(project.name.as_str()) {
            summaries.push(ProjectSummary {
                id: Some(project.id),
                name: project.name.clone(),
                description: project.description.clone(),
                task_count: 0,
                completed: 0,
                percent: 0,
            });
        }
    }

    summaries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

pub fn completion_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}

pub fn status_counts(tasks: &[Task]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in tasks {
        match task.status {
            Status::Todo => counts.todo += 1,
            Status::InProgress => counts.in_progress += 1,
            Status::Done => counts.done += 1,
        }
    }
    counts
}

pub fn build_reports(tasks: &[Task]) -> ReportsResponse {
    build_reports_at(Local::now().date_naive(), tasks)
}

pub fn build_reports_at(today: NaiveDate, tasks: &[Task]) -> ReportsResponse {
    let mut last_7_days = Vec::with_capacity(DAY_COUNT as usize);
    for offset in (0..DAY_COUNT).rev() {
        let date = today - Duration::days(offset);
        let completed = tasks
            .iter()
            .filter(|task| task.completed_at == Some(date))
            .count() as u64;
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            label: day_month(date),
            completed,
        });
    }

    let current_week_start = week_start(today);
    let mut last_4_weeks = Vec::with_capacity(WEEK_COUNT as usize);
    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset);
        let end = start + Duration::days(6);
        let completed = tasks
            .iter()
            .filter(|task| matches!(task.completed_at, Some(date) if date >= start && date <= end))
            .count() as u64;
        last_4_weeks.push(WeeklyPoint {
            start_date: start.to_string(),
            end_date: end.to_string(),
            label: format!("{} - {}", day_month(start), day_month(end)),
            completed,
        });
    }

    ReportsResponse {
        status_counts: status_counts(tasks),
        last_7_days,
        last_4_weeks,
        by_project: completed_by_project(tasks),
    }
}

/// Doughnut data: completed tasks per project, largest first.
pub fn completed_by_project(tasks: &[Task]) -> Vec<ProjectSlice> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for task in tasks.iter().filter(|task| task.status == Status::Done) {
        *counts.entry(task.project_name()).or_default() += 1;
    }

    let mut slices: Vec<ProjectSlice> = counts
        .into_iter()
        .map(|(project, completed)| ProjectSlice {
            project: project.to_string(),
            completed,
        })
        .collect();
    slices.sort_by(|a, b| b.completed.cmp(&a.completed).then_with(|| a.project.cmp(&b.project)));
    slices
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn task(id: i64, project: &str, status: Status, completed_at: Option<NaiveDate>) -> Task {
        Task {
            id,
            project: project.to_string(),
            title: format!("görev {id}"),
            description: String::new(),
            priority: Priority::Medium,
            due: String::new(),
            due_sort: String::new(),
            status,
            completed_at,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(id: i64, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            description: String::new(),
            created_at: date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn summary_reports_rounded_percentage() {
        let done_on = Some(date(2025, 12, 1));
        let tasks = vec![
            task(1, "Web", Status::Done, done_on),
            task(2, "Web", Status::Todo, None),
            task(3, "Web", Status::InProgress, None),
            task(4, "Web", Status::Todo, None),
            task(5, "Mobil", Status::Done, done_on),
            task(6, "Mobil", Status::Done, done_on),
            task(7, "Mobil", Status::Todo, None),
        ];
        let summaries = project_summaries(&tasks, &[]);
        let web = summaries.iter().find(|s| s.name == "Web").unwrap();
        assert_eq!((web.task_count, web.completed, web.percent), (4, 1, 25));
        let mobile = summaries.iter().find(|s| s.name == "Mobil").unwrap();
        assert_eq!(mobile.percent, 67);
    }

    #[test]
    fn summary_includes_empty_projects_and_sorts_case_insensitively() {
        let tasks = vec![task(1, "beta", Status::Todo, None), task(2, "", Status::Todo, None)];
        let projects = vec![project(1, "Alfa"), project(2, "beta")];
        let summaries = project_summaries(&tasks, &projects);

        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alfa", "beta", "Genel"]);

        let alfa = &summaries[0];
        assert_eq!((alfa.task_count, alfa.percent, alfa.id), (0, 0, Some(1)));
        assert_eq!(summaries[1].id, Some(2));
        assert_eq!(summaries[2].id, None);
    }

    #[test]
    fn daily_window_counts_completions_per_day() {
        let today = date(2025, 12, 10);
        let tasks = vec![
            task(1, "A", Status::Done, Some(today)),
            task(2, "A", Status::Done, Some(date(2025, 12, 8))),
            task(3, "A", Status::Done, Some(date(2025, 12, 8))),
            task(4, "A", Status::Done, Some(date(2025, 12, 3))),
            task(5, "A", Status::Todo, None),
        ];
        let reports = build_reports_at(today, &tasks);

        assert_eq!(reports.last_7_days.len(), 7);
        assert_eq!(reports.last_7_days[0].date, "2025-12-04");
        assert_eq!(reports.last_7_days[6].date, "2025-12-10");
        let counts: Vec<u64> = reports.last_7_days.iter().map(|d| d.completed).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 2, 0, 1]);
    }

    #[test]
    fn weekly_window_uses_monday_boundaries() {
        // Wednesday; current week is 8-14 December.
        let today = date(2025, 12, 10);
        let tasks = vec![
            task(1, "A", Status::Done, Some(date(2025, 12, 8))),
            task(2, "A", Status::Done, Some(date(2025, 12, 7))),
            task(3, "A", Status::Done, Some(date(2025, 11, 17))),
            task(4, "A", Status::Done, Some(date(2025, 11, 16))),
        ];
        let reports = build_reports_at(today, &tasks);

        assert_eq!(reports.last_4_weeks.len(), 4);
        assert_eq!(reports.last_4_weeks[0].start_date, "2025-11-17");
        assert_eq!(reports.last_4_weeks[3].start_date, "2025-12-08");
        assert_eq!(reports.last_4_weeks[3].end_date, "2025-12-14");
        let counts: Vec<u64> = reports.last_4_weeks.iter().map(|w| w.completed).collect();
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[test]
    fn project_breakdown_counts_only_done_tasks() {
        let done_on = Some(date(2025, 12, 1));
        let tasks = vec![
            task(1, "B", Status::Done, done_on),
            task(2, "A", Status::Done, done_on),
            task(3, "A", Status::Done, done_on),
            task(4, "C", Status::Todo, None),
        ];
        let slices = completed_by_project(&tasks);
        assert_eq!(slices.len(), 2);
        assert_eq!((slices[0].project.as_str(), slices[0].completed), ("A", 2));
        assert_eq!((slices[1].project.as_str(), slices[1].completed), ("B", 1));
    }

    #[test]
    fn zero_tasks_is_zero_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 2), 50);
    }
}
