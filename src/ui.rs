use crate::auth::CurrentUser;
use crate::locale::WEEKDAYS_TR;
use crate::models::{CalendarMonth, ProjectSummary, ReportsResponse, Status, StatusCounts, Task};
use chrono::{Datelike, Local};

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // Keeps user text from matching a `{{PLACEHOLDER}}` filled later.
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON for embedding inside a `<script>` block.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn nav_link(href: &str, label: &str, active: &str) -> String {
    let class = if href == active { " class=\"active\"" } else { "" };
    format!("<a href=\"{href}\"{class}>{label}</a>")
}

fn layout(title: &str, active: &str, user: &CurrentUser, body: &str) -> String {
    let nav = [
        ("/", "Pano"),
        ("/tasks", "Görevler"),
        ("/projects", "Projeler"),
        ("/calendar", "Takvim"),
        ("/reports", "Raporlar"),
    ]
    .iter()
    .map(|(href, label)| nav_link(href, label, active))
    .collect::<Vec<_>>()
    .join("\n        ");

    LAYOUT_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{NAV}}", &nav)
        .replace("{{USER}}", &escape_html(&user.display_name))
        .replace("{{YEAR}}", &Local::now().year().to_string())
        .replace("{{BODY}}", body)
}

pub fn render_dashboard(user: &CurrentUser, counts: &StatusCounts) -> String {
    let body = DASHBOARD_HTML
        .replace("{{USER}}", &escape_html(&user.display_name))
        .replace("{{TODO}}", &counts.todo.to_string())
        .replace("{{IN_PROGRESS}}", &counts.in_progress.to_string())
        .replace("{{DONE}}", &counts.done.to_string());
    layout("Pano", "/", user, &body)
}

fn task_row(task: &Task) -> String {
    let done = task.status == Status::Done;
    let description = if task.description.is_empty() {
        String::new()
    } else {
        format!("<p class=\"muted\">{}</p>", escape_html(&task.description))
    };
    format!(
        r#"<li class="task{done_class}" data-id="{id}">
          <label class="check"><input type="checkbox" data-toggle="{id}"{checked} /></label>
          <div class="task-body">
            <strong>{title}</strong>
            {description}
            <div class="meta">
              <span class="pill">{project}</span>
              <span class="pill priority-{priority}">{priority_label}</span>
              <span class="pill status">{status_label}</span>
              <span class="due">{due}</span>
            </div>
          </div>
          <button class="link danger" type="button" data-delete="{id}">Sil</button>
        </li>"#,
        done_class = if done { " done" } else { "" },
        id = task.id,
        checked = if done { " checked" } else { "" },
        title = escape_html(&task.title),
        description = description,
        project = escape_html(task.project_name()),
        priority = task.priority.as_str(),
        priority_label = task.priority.label_tr(),
        status_label = task.status.label_tr(),
        due = escape_html(&task.due),
    )
}

pub fn render_tasks(user: &CurrentUser, tasks: &[Task]) -> String {
    let rows = if tasks.is_empty() {
        "<li class=\"empty\">Henüz görev yok.</li>".to_string()
    } else {
        tasks.iter().map(task_row).collect::<Vec<_>>().join("\n")
    };
    let body = TASKS_HTML
        .replace("{{FORM}}", &add_task_form("/tasks"))
        .replace("{{ROWS}}", &rows);
    layout("Görevler", "/tasks", user, &body)
}

fn add_task_form(next: &str) -> String {
    ADD_TASK_FORM_HTML.replace("{{NEXT}}", &escape_html(next))
}

pub fn render_projects(user: &CurrentUser, projects: &[ProjectSummary]) -> String {
    let cards = if projects.is_empty() {
        "<p class=\"empty\">Henüz proje yok.</p>".to_string()
    } else {
        projects
            .iter()
            .map(|project| {
                let description = if project.description.is_empty() {
                    String::new()
                } else {
                    format!("<p class=\"muted\">{}</p>", escape_html(&project.description))
                };
                format!(
                    r#"<article class="card project" data-name="{name}">
          <header><h3>{name}</h3><button class="link danger" type="button" data-delete-project="{name}">Sil</button></header>
          {description}
          <p>{completed} / {total} görev tamamlandı</p>
          <div class="progress"><span style="width: {percent}%"></span></div>
          <span class="percent">%{percent}</span>
        </article>"#,
                    name = escape_html(&project.name),
                    description = description,
                    completed = project.completed,
                    total = project.task_count,
                    percent = project.percent,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let body = PROJECTS_HTML.replace("{{CARDS}}", &cards);
    layout("Projeler", "/projects", user, &body)
}

fn bar_rows(points: impl Iterator<Item = (String, u64)>) -> String {
    let points: Vec<(String, u64)> = points.collect();
    let max = points.iter().map(|(_, value)| *value).max().unwrap_or(0).max(1);
    points
        .iter()
        .map(|(label, value)| {
            let width = (*value as f64 / max as f64 * 100.0).round() as u64;
            format!(
                "<div class=\"bar-row\"><span class=\"bar-label\">{}</span><div class=\"bar\"><span style=\"width: {width}%\"></span></div><span class=\"bar-value\">{value}</span></div>",
                escape_html(label)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_reports(user: &CurrentUser, reports: &ReportsResponse) -> String {
    let daily = bar_rows(
        reports
            .last_7_days
            .iter()
            .map(|day| (day.label.clone(), day.completed)),
    );
    let weekly = bar_rows(
        reports
            .last_4_weeks
            .iter()
            .map(|week| (week.label.clone(), week.completed)),
    );
    let projects = if reports.by_project.is_empty() {
        "<p class=\"empty\">Henüz tamamlanan görev yok.</p>".to_string()
    } else {
        bar_rows(
            reports
                .by_project
                .iter()
                .map(|slice| (slice.project.clone(), slice.completed)),
        )
    };
    let counts = &reports.status_counts;
    let body = REPORTS_HTML
        .replace("{{TODO}}", &counts.todo.to_string())
        .replace("{{IN_PROGRESS}}", &counts.in_progress.to_string())
        .replace("{{DONE}}", &counts.done.to_string())
        .replace("{{DAILY}}", &daily)
        .replace("{{WEEKLY}}", &weekly)
        .replace("{{PROJECTS}}", &projects)
        .replace("{{DATA}}", &script_json(reports));
    layout("Raporlar", "/reports", user, &body)
}

pub fn render_calendar(user: &CurrentUser, month: &CalendarMonth) -> String {
    let head = WEEKDAYS_TR
        .iter()
        .map(|day| format!("<th>{day}</th>"))
        .collect::<Vec<_>>()
        .join("");

    let weeks = month
        .weeks
        .iter()
        .map(|week| {
            let cells = week
                .iter()
                .map(|day| {
                    let events = day
                        .events
                        .iter()
                        .map(|event| {
                            format!(
                                "<li class=\"event status-{}\" title=\"{}\">{}</li>",
                                event.status.as_str(),
                                escape_html(&event.project),
                                escape_html(&event.title)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("");
                    let class = if day.in_month { "day" } else { "day out" };
                    format!(
                        "<td class=\"{class}\" data-date=\"{}\"><span class=\"num\">{}</span><ul>{events}</ul></td>",
                        day.iso, day.day
                    )
                })
                .collect::<Vec<_>>()
                .join("");
            format!("<tr>{cells}</tr>")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let here = format!("/calendar?year={}&month={}", month.year, month.month);
    let body = CALENDAR_HTML
        .replace("{{TITLE}}", &escape_html(&month.title))
        .replace(
            "{{PREV}}",
            &format!("/calendar?year={}&amp;month={}", month.prev_year, month.prev_month),
        )
        .replace(
            "{{NEXT}}",
            &format!("/calendar?year={}&amp;month={}", month.next_year, month.next_month),
        )
        .replace("{{HEAD}}", &head)
        .replace("{{WEEKS}}", &weeks)
        .replace("{{FORM}}", &add_task_form(&here));
    layout("Takvim", "/calendar", user, &body)
}

pub fn render_login(error: Option<&str>, next: Option<&str>) -> String {
    let next_field = next
        .map(|next| format!("<input type=\"hidden\" name=\"next\" value=\"{}\" />", escape_html(next)))
        .unwrap_or_default();
    LOGIN_HTML
        .replace("{{ERROR}}", &error_block(error))
        .replace("{{NEXT_FIELD}}", &next_field)
}

pub fn render_register(error: Option<&str>) -> String {
    REGISTER_HTML.replace("{{ERROR}}", &error_block(error))
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|message| format!("<p class=\"error\">{}</p>", escape_html(message)))
        .unwrap_or_default()
}

pub const STYLESHEET: &str = r#"
@import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

:root {
  --bg-1: #f8f3e6;
  --bg-2: #f5d3a7;
  --ink: #2b2a28;
  --accent: #ff6b4a;
  --accent-2: #2f4858;
  --card: rgba(255, 255, 255, 0.86);
  --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
}

* { box-sizing: border-box; }

body {
  margin: 0;
  min-height: 100vh;
  background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
    linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
  color: var(--ink);
  font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
}

.topbar {
  display: flex;
  align-items: center;
  justify-content: space-between;
  gap: 16px;
  padding: 18px 32px;
}

.topbar nav { display: flex; gap: 14px; flex-wrap: wrap; }
.topbar a { color: var(--accent-2); text-decoration: none; font-weight: 500; }
.topbar a.active { color: var(--accent); }

main.app {
  width: min(1040px, 100% - 36px);
  margin: 0 auto 48px;
  background: var(--card);
  backdrop-filter: blur(12px);
  border-radius: 28px;
  box-shadow: var(--shadow);
  padding: 32px;
  display: grid;
  gap: 24px;
}

h1, h2, h3 { font-family: "Fraunces", "Georgia", serif; margin: 0; }
.muted { color: #8b857d; margin: 4px 0; }
.empty { color: #8b857d; }
.error { color: #b3261e; font-weight: 500; }

.panel { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 16px; }
.stat, .card {
  background: white;
  border-radius: 18px;
  padding: 18px;
  border: 1px solid rgba(47, 72, 88, 0.08);
  display: grid;
  gap: 8px;
}
.stat .label { font-size: 0.85rem; text-transform: uppercase; letter-spacing: 0.12em; color: #8b857d; }
.stat .value { font-size: 1.7rem; font-weight: 600; color: var(--accent-2); }

form.inline { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 10px; }
input, select, textarea { font: inherit; padding: 10px 12px; border-radius: 12px; border: 1px solid #d9d2c7; }
button { font: inherit; border: none; border-radius: 14px; padding: 10px 16px; background: var(--accent-2); color: white; cursor: pointer; }
button.link { background: none; color: var(--accent-2); padding: 4px 8px; }
button.danger { color: #b3261e; }

ul.tasks { list-style: none; margin: 0; padding: 0; display: grid; gap: 10px; }
.task { display: flex; gap: 12px; align-items: flex-start; background: white; border-radius: 16px; padding: 14px; }
.task.done strong { text-decoration: line-through; color: #8b857d; }
.task-body { flex: 1; }
.meta { display: flex; gap: 8px; flex-wrap: wrap; font-size: 0.85rem; }
.pill { background: #f3ede4; border-radius: 999px; padding: 2px 10px; }
.priority-high { background: #ffd9d0; }
.priority-low { background: #e3f0e8; }

.project header { display: flex; justify-content: space-between; align-items: center; }
.progress, .bar { background: #f3ede4; border-radius: 999px; height: 10px; overflow: hidden; flex: 1; }
.progress span, .bar span { display: block; height: 100%; background: var(--accent); }
.bar-row { display: flex; align-items: center; gap: 12px; }
.bar-label { width: 180px; font-size: 0.9rem; }
.bar-value { width: 32px; text-align: right; }

table.calendar { width: 100%; border-collapse: collapse; table-layout: fixed; }
table.calendar td { vertical-align: top; height: 96px; border: 1px solid #ece4d8; padding: 6px; background: white; }
table.calendar td.out { background: #f6f1ea; color: #b5ada2; }
table.calendar ul { list-style: none; margin: 4px 0 0; padding: 0; font-size: 0.8rem; }
.event { background: #f3ede4; border-radius: 8px; padding: 2px 6px; margin-bottom: 2px; }
.event.status-done { text-decoration: line-through; opacity: 0.7; }
.month-nav { display: flex; justify-content: space-between; align-items: center; }

.auth { width: min(420px, 100% - 36px); margin: 10vh auto; }
.auth form { display: grid; gap: 12px; }

footer { text-align: center; color: #8b857d; padding: 16px; }
"#;

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="tr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Görev Panosu</title>
  <link rel="stylesheet" href="/static/app.css" />
</head>
<body>
  <header class="topbar">
    <nav>
        {{NAV}}
    </nav>
    <div class="user">{{USER}} · <a href="/logout">Çıkış</a></div>
  </header>
  <main class="app">
{{BODY}}
  </main>
  <footer>© {{YEAR}} Görev Panosu</footer>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"    <header>
      <h1>Merhaba, {{USER}}</h1>
      <p class="muted">Görevlerinin genel durumu.</p>
    </header>
    <section class="panel">
      <div class="stat">
        <span class="label">Yapılacak</span>
        <span id="todo" class="value">{{TODO}}</span>
      </div>
      <div class="stat">
        <span class="label">Devam ediyor</span>
        <span id="in-progress" class="value">{{IN_PROGRESS}}</span>
      </div>
      <div class="stat">
        <span class="label">Tamamlandı</span>
        <span id="done" class="value">{{DONE}}</span>
      </div>
      <div class="stat">
        <span class="label">Yarın teslim</span>
        <span id="upcoming" class="value">–</span>
      </div>
    </section>
    <script>
      fetch('/api/upcoming')
        .then((res) => (res.ok ? res.json() : null))
        .then((data) => {
          if (data) {
            document.getElementById('upcoming').textContent = data.count;
          }
        })
        .catch(() => {});
    </script>
"#;

const ADD_TASK_FORM_HTML: &str = r#"    <form class="inline" method="post" action="/add_task">
      <input type="hidden" name="next" value="{{NEXT}}" />
      <input name="title" placeholder="Görev başlığı" required />
      <input name="project" placeholder="Proje (Genel)" />
      <input name="description" placeholder="Açıklama" />
      <select name="priority">
        <option value="low">Düşük</option>
        <option value="medium" selected>Orta</option>
        <option value="high">Yüksek</option>
      </select>
      <input type="date" name="due_sort" />
      <button type="submit">Ekle</button>
    </form>
"#;

const TASKS_HTML: &str = r#"    <header>
      <h1>Görevler</h1>
    </header>
{{FORM}}
    <ul class="tasks">
{{ROWS}}
    </ul>
    <script>
      const post = (url, body) =>
        fetch(url, {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify(body)
        }).then((res) => {
          if (!res.ok) {
            throw new Error('İstek başarısız');
          }
          return res.json();
        });

      document.querySelectorAll('[data-toggle]').forEach((box) => {
        box.addEventListener('change', () => {
          const id = Number(box.dataset.toggle);
          post('/toggle_task', { id })
            .then((data) => {
              box.closest('.task').classList.toggle('done', data.status === 'done');
            })
            .catch(() => window.location.reload());
        });
      });

      document.querySelectorAll('[data-delete]').forEach((button) => {
        button.addEventListener('click', () => {
          const id = Number(button.dataset.delete);
          post('/delete_task', { id })
            .then(() => button.closest('.task').remove())
            .catch(() => window.location.reload());
        });
      });
    </script>
"#;

const PROJECTS_HTML: &str = r#"    <header>
      <h1>Projeler</h1>
    </header>
    <form class="inline" method="post" action="/add_project">
      <input name="name" placeholder="Proje adı" required />
      <input name="description" placeholder="Açıklama" />
      <button type="submit">Proje oluştur</button>
    </form>
    <section class="panel">
{{CARDS}}
    </section>
    <script>
      document.querySelectorAll('[data-delete-project]').forEach((button) => {
        button.addEventListener('click', () => {
          const name = button.dataset.deleteProject;
          if (!window.confirm(`"${name}" ve tüm görevleri silinsin mi?`)) {
            return;
          }
          fetch('/delete_project', {
            method: 'POST',
            headers: { 'content-type': 'application/json' },
            body: JSON.stringify({ name })
          }).then(() => window.location.reload());
        });
      });
    </script>
"#;

const REPORTS_HTML: &str = r#"    <header>
      <h1>Raporlar</h1>
    </header>
    <section class="panel">
      <div class="stat"><span class="label">Yapılacak</span><span class="value">{{TODO}}</span></div>
      <div class="stat"><span class="label">Devam ediyor</span><span class="value">{{IN_PROGRESS}}</span></div>
      <div class="stat"><span class="label">Tamamlandı</span><span class="value">{{DONE}}</span></div>
    </section>
    <section class="card">
      <h2>Son 7 gün</h2>
{{DAILY}}
    </section>
    <section class="card">
      <h2>Son 4 hafta</h2>
{{WEEKLY}}
    </section>
    <section class="card">
      <h2>Projelere göre tamamlanan</h2>
{{PROJECTS}}
    </section>
    <script id="report-data" type="application/json">{{DATA}}</script>
"#;

const CALENDAR_HTML: &str = r#"    <header class="month-nav">
      <a href="{{PREV}}">‹ Önceki</a>
      <h1>{{TITLE}}</h1>
      <a href="{{NEXT}}">Sonraki ›</a>
    </header>
    <table class="calendar">
      <thead><tr>{{HEAD}}</tr></thead>
      <tbody>
{{WEEKS}}
      </tbody>
    </table>
{{FORM}}
"#;

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="tr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Giriş · Görev Panosu</title>
  <link rel="stylesheet" href="/static/app.css" />
</head>
<body>
  <main class="app auth">
    <h1>Giriş yap</h1>
    {{ERROR}}
    <form method="post" action="/login">
      {{NEXT_FIELD}}
      <input type="email" name="email" placeholder="E-posta" required />
      <input type="password" name="password" placeholder="Şifre" required />
      <button type="submit">Giriş</button>
    </form>
    <p class="muted">Hesabın yok mu? <a href="/register">Kayıt ol</a></p>
  </main>
</body>
</html>
"#;

const REGISTER_HTML: &str = r#"<!DOCTYPE html>
<html lang="tr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Kayıt · Görev Panosu</title>
  <link rel="stylesheet" href="/static/app.css" />
</head>
<body>
  <main class="app auth">
    <h1>Kayıt ol</h1>
    {{ERROR}}
    <form method="post" action="/register">
      <input name="first_name" placeholder="Ad" />
      <input name="last_name" placeholder="Soyad" />
      <input type="email" name="email" placeholder="E-posta" required />
      <input type="password" name="password" placeholder="Şifre" required />
      <input type="password" name="password_confirm" placeholder="Şifre (tekrar)" required />
      <button type="submit">Kayıt ol</button>
    </form>
    <p class="muted">Zaten hesabın var mı? <a href="/login">Giriş yap</a></p>
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralises_markup() {
        assert_eq!(
            escape_html("<b>\"Ali\" & 'Veli'</b>"),
            "&lt;b&gt;&quot;Ali&quot; &amp; &#39;Veli&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn escape_html_neutralises_placeholders() {
        assert_eq!(escape_html("{{FORM}}"), "&#123;&#123;FORM&#125;&#125;");
    }

    #[test]
    fn user_text_never_expands_placeholders() {
        let user = CurrentUser {
            email: "a@b.c".into(),
            display_name: "{{TODO}}".into(),
        };
        let page = render_dashboard(
            &user,
            &StatusCounts {
                todo: 7,
                in_progress: 0,
                done: 0,
            },
        );
        assert!(page.contains("Merhaba, &#123;&#123;TODO&#125;&#125;"));
        assert!(!page.contains("Merhaba, 7"));

        let today = chrono::NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        let mut month = crate::calendar::build_month_for(2025, 12, &[], today);
        month.weeks[0][0].events.push(crate::models::CalendarEvent {
            id: 1,
            title: "{{FORM}}".into(),
            project: "{{BODY}}".into(),
            status: Status::Todo,
        });
        let page = render_calendar(&user, &month);
        assert_eq!(page.matches("<form").count(), 1);
        assert!(page.contains("&#123;&#123;FORM&#125;&#125;"));
        assert!(page.contains("&#123;&#123;BODY&#125;&#125;"));
    }

    #[test]
    fn login_page_carries_next_and_error() {
        let page = render_login(Some("E-posta veya şifre hatalı."), Some("/calendar"));
        assert!(page.contains("name=\"next\" value=\"/calendar\""));
        assert!(page.contains("E-posta veya şifre hatalı."));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn project_card_shows_percentage_width() {
        let user = CurrentUser {
            email: "a@b.c".into(),
            display_name: "Ayşe".into(),
        };
        let page = render_projects(
            &user,
            &[ProjectSummary {
                id: None,
                name: "Web".into(),
                description: String::new(),
                task_count: 4,
                completed: 1,
                percent: 25,
            }],
        );
        assert!(page.contains("width: 25%"));
        assert!(page.contains("Ayşe"));
        assert!(!page.contains("{{"));
    }
}
