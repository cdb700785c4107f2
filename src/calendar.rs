use crate::locale::month_title;
use crate::models::{CalendarDay, CalendarEvent, CalendarMonth, Task};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::HashMap;

/// Picks the month to show. Anything missing or out of range falls back
/// to the month containing `today`.
pub fn resolve_month(year: Option<&str>, month: Option<&str>, today: NaiveDate) -> (i32, u32) {
    let parsed = year
        .and_then(|value| value.trim().parse::<i32>().ok())
        .zip(month.and_then(|value| value.trim().parse::<u32>().ok()));

    match parsed {
        Some((year, month))
            if (1..=12).contains(&month) && NaiveDate::from_ymd_opt(year, month, 1).is_some() =>
        {
            (year, month)
        }
        _ => (today.year(), today.month()),
    }
}

pub fn build_month(year: Option<&str>, month: Option<&str>, tasks: &[Task]) -> CalendarMonth {
    let today = Local::now().date_naive();
    let (year, month) = resolve_month(year, month, today);
    build_month_for(year, month, tasks, today)
}

/// Monday-first grid covering the whole month, with each day's due tasks.
pub fn build_month_for(year: i32, month: u32, tasks: &[Task], today: NaiveDate) -> CalendarMonth {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
    let (year, month) = (first.year(), first.month());
    let (prev_year, prev_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let mut events: HashMap<&str, Vec<CalendarEvent>> = HashMap::new();
    for task in tasks.iter().filter(|task| !task.due_sort.is_empty()) {
        events
            .entry(task.due_sort.as_str())
            .or_default()
            .push(CalendarEvent {
                id: task.id,
                title: task.title.clone(),
                project: task.project.clone(),
                status: task.status,
            });
    }

    let last = last_day_of_month(first);
    let grid_start = first - Duration::days(first.weekday().num_days_from_monday() as i64);
    let grid_end = last + Duration::days(6 - last.weekday().num_days_from_monday() as i64);

    let mut weeks = Vec::new();
    let mut week = Vec::with_capacity(7);
    let mut day = grid_start;
    while day <= grid_end {
        let iso = day.format("%Y-%m-%d").to_string();
        week.push(CalendarDay {
            day: day.day(),
            in_month: day.month() == month && day.year() == year,
            events: events.get(iso.as_str()).cloned().unwrap_or_default(),
            iso,
        });
        if week.len() == 7 {
            weeks.push(std::mem::replace(&mut week, Vec::with_capacity(7)));
        }
        day += Duration::days(1);
    }

    CalendarMonth {
        year,
        month,
        title: month_title(year, month),
        weeks,
        prev_year,
        prev_month,
        next_year,
        next_month,
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Status};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due_task(id: i64, due_sort: &str) -> Task {
        Task {
            id,
            project: "Genel".into(),
            title: format!("görev {id}"),
            description: String::new(),
            priority: Priority::Medium,
            due: String::new(),
            due_sort: due_sort.into(),
            status: Status::Todo,
            completed_at: None,
        }
    }

    #[test]
    fn grid_has_full_monday_first_weeks() {
        let today = date(2025, 1, 1);
        for month in 1..=12 {
            let cal = build_month_for(2025, month, &[], today);
            assert!(cal.weeks.len() >= 4 && cal.weeks.len() <= 6);
            for week in &cal.weeks {
                assert_eq!(week.len(), 7);
                let monday = NaiveDate::parse_from_str(&week[0].iso, "%Y-%m-%d").unwrap();
                assert_eq!(monday.weekday(), chrono::Weekday::Mon);
            }
            let in_month = cal.weeks.iter().flatten().filter(|d| d.in_month).count();
            assert_eq!(in_month as u32, last_day_of_month(date(2025, month, 1)).day());
        }
    }

    #[test]
    fn adjacent_month_days_are_flagged() {
        // December 2025 starts on a Monday and ends on a Wednesday.
        let cal = build_month_for(2025, 12, &[], date(2025, 12, 1));
        assert_eq!(cal.weeks.len(), 5);
        assert_eq!(cal.weeks[0][0].iso, "2025-12-01");
        let tail = &cal.weeks[4];
        assert_eq!(tail[2].iso, "2025-12-31");
        assert!(tail[2].in_month);
        assert_eq!(tail[3].iso, "2026-01-01");
        assert!(!tail[3].in_month);
    }

    #[test]
    fn navigation_wraps_around_the_year() {
        let cal = build_month_for(2025, 12, &[], date(2025, 12, 1));
        assert_eq!((cal.prev_year, cal.prev_month), (2025, 11));
        assert_eq!((cal.next_year, cal.next_month), (2026, 1));
        assert_eq!(cal.title, "Aralık 2025");

        let cal = build_month_for(2026, 1, &[], date(2025, 12, 1));
        assert_eq!((cal.prev_year, cal.prev_month), (2025, 12));
        assert_eq!(cal.title, "Ocak 2026");
    }

    #[test]
    fn events_attach_to_their_due_date() {
        let tasks = vec![due_task(1, "2025-12-25"), due_task(2, "2025-12-25"), due_task(3, "")];
        let cal = build_month_for(2025, 12, &tasks, date(2025, 12, 1));
        let christmas = cal
            .weeks
            .iter()
            .flatten()
            .find(|day| day.iso == "2025-12-25")
            .unwrap();
        let ids: Vec<i64> = christmas.events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
        let total: usize = cal.weeks.iter().flatten().map(|d| d.events.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn invalid_query_falls_back_to_today() {
        let today = date(2026, 10, 16);
        assert_eq!(resolve_month(None, None, today), (2026, 10));
        assert_eq!(resolve_month(Some("2025"), Some("13"), today), (2026, 10));
        assert_eq!(resolve_month(Some("abc"), Some("3"), today), (2026, 10));
        assert_eq!(resolve_month(Some("2025"), None, today), (2026, 10));
        assert_eq!(resolve_month(Some("2025"), Some("3"), today), (2025, 3));
    }
}
