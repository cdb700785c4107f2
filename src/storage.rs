use crate::locale::day_month;
use crate::locale::parse_iso_date;
use crate::models::{
    NewTask, NewUser, Priority, Project, Status, StatusCounts, Task, User, DEFAULT_PROJECT,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 4;

const TASK_COLUMNS: &str =
    "id, project, title, description, priority, due, due_sort, status, completed_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Outcome of removing a project together with the tasks filed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDeletion {
    pub name: String,
    pub removed_project: bool,
    pub deleted_tasks: u64,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.migrate_at(Local::now().date_naive())
    }

    /// Brings the schema up to `SCHEMA_VERSION`. Each step runs once and
    /// bumps `user_version`; `today` stamps legacy done tasks.
    pub fn migrate_at(&self, today: NaiveDate) -> Result<(), StoreError> {
        let mut current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        if current < 1 {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project TEXT,
                    title TEXT NOT NULL,
                    description TEXT,
                    priority TEXT,
                    due TEXT,
                    due_sort TEXT,
                    status TEXT DEFAULT 'todo'
                );
                "#,
            )?;
            self.set_schema_version(1)?;
            current = 1;
        }

        if current < 2 {
            // Databases written by older builds may already carry the column.
            if !self.has_column("tasks", "completed_at")? {
                self.conn
                    .execute_batch("ALTER TABLE tasks ADD COLUMN completed_at TEXT;")?;
            }
            self.conn.execute(
                "UPDATE tasks SET completed_at = ?1 WHERE status = 'done' AND completed_at IS NULL",
                params![today],
            )?;
            self.conn.execute(
                "UPDATE tasks SET completed_at = NULL WHERE COALESCE(status, 'todo') <> 'done'",
                [],
            )?;
            self.set_schema_version(2)?;
            current = 2;
        }

        if current < 3 {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    first_name TEXT,
                    last_name TEXT,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    email TEXT NOT NULL,
                    expires_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project);
                CREATE INDEX IF NOT EXISTS idx_tasks_due_sort ON tasks(due_sort);
                "#,
            )?;
            self.set_schema_version(3)?;
            current = 3;
        }

        if current < 4 {
            let updated = self.refresh_due_display()?;
            info!("rewrote due display for {updated} tasks");
            self.set_schema_version(4)?;
        }

        Ok(())
    }

    fn set_schema_version(&self, version: i64) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {version};"))?;
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Rewrites the display form of every parseable due date.
    pub fn refresh_due_display(&self) -> Result<usize, StoreError> {
        let rows: Vec<(i64, String)> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, due_sort FROM tasks WHERE due_sort IS NOT NULL AND due_sort <> ''",
            )?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<Result<_, _>>()?
        };

        let mut updated = 0;
        for (id, due_sort) in rows {
            if let Some(date) = parse_iso_date(&due_sort) {
                self.conn.execute(
                    "UPDATE tasks SET due = ?1 WHERE id = ?2",
                    params![day_month(date), id],
                )?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    pub fn insert_task(&self, task: &NewTask) -> Result<Task, StoreError> {
        self.conn.execute(
            "INSERT INTO tasks (project, title, description, priority, due, due_sort, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.project,
                task.title,
                task.description,
                task.priority.as_str(),
                task.due,
                task.due_sort,
                Status::Todo.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Task {
            id,
            project: task.project.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due: task.due.clone(),
            due_sort: task.due_sort.clone(),
            status: Status::Todo,
            completed_at: None,
        })
    }

    /// Undated tasks first, then by due date, then most severe priority.
    pub fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             ORDER BY COALESCE(due_sort, '') ASC, \
             CASE priority WHEN 'high' THEN 0 WHEN 'low' THEN 2 ELSE 1 END ASC, \
             id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], parse_task)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], parse_task)
            .optional()?)
    }

    /// Flips done <-> todo, keeping `completed_at` in step with the status.
    pub fn toggle_task_status(&self, id: i64, today: NaiveDate) -> Result<Option<Task>, StoreError> {
        let Some(mut task) = self.get_task(id)? else {
            return Ok(None);
        };
        let status = task.status.toggled();
        let completed_at = (status == Status::Done).then_some(today);
        self.conn.execute(
            "UPDATE tasks SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![status.as_str(), completed_at, id],
        )?;
        task.status = status;
        task.completed_at = completed_at;
        Ok(Some(task))
    }

    pub fn delete_task(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(status, 'todo'), COUNT(*) FROM tasks GROUP BY COALESCE(status, 'todo')",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            let count = count.max(0) as u64;
            match Status::parse(&status) {
                Status::Todo => counts.todo += count,
                Status::InProgress => counts.in_progress += count,
                Status::Done => counts.done += count,
            }
        }
        Ok(counts)
    }

    /// Tasks due on `date` that are not finished yet.
    pub fn tasks_due_on(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE due_sort = ?1 AND COALESCE(status, 'todo') <> 'done' \
             ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], parse_task)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns false when a project with that name already exists.
    pub fn insert_project(&self, name: &str, description: &str) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO projects (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(changed > 0)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at FROM projects ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_project_by_id(&self, id: i64) -> Result<Option<ProjectDeletion>, StoreError> {
        let name: Option<String> = self
            .conn
            .query_row("SELECT name FROM projects WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match name {
            Some(name) => self.delete_project_by_name(&name).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the project record, if any, and every task filed under the
    /// name. Tasks with a blank project count as the default project.
    pub fn delete_project_by_name(&self, name: &str) -> Result<ProjectDeletion, StoreError> {
        let deleted_tasks = self.conn.execute(
            "DELETE FROM tasks WHERE project = ?1 \
             OR (?1 = ?2 AND (project IS NULL OR TRIM(project) = ''))",
            params![name, DEFAULT_PROJECT],
        )?;
        let removed = self
            .conn
            .execute("DELETE FROM projects WHERE name = ?1", params![name])?;
        Ok(ProjectDeletion {
            name: name.to_string(),
            removed_project: removed > 0,
            deleted_tasks: deleted_tasks as u64,
        })
    }

    pub fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO users (email, password_hash, first_name, last_name) VALUES (?1, ?2, ?3, ?4)",
            params![user.email, user.password_hash, user.first_name, user.last_name],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateEmail(user.email.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let id = self.conn.last_insert_rowid();
        let created_at = self.conn.query_row(
            "SELECT created_at FROM users WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(User {
            id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at,
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, email, password_hash, first_name, last_name, created_at \
                 FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        first_name: row.get(3)?,
                        last_name: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn create_session(
        &self,
        token: &str,
        email: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO sessions (token, email, expires_at) VALUES (?1, ?2, ?3)",
            params![token, email, expires_at],
        )?;
        Ok(())
    }

    /// Resolves a live session to its email; expired rows are dropped.
    pub fn session_email(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<String>, StoreError> {
        let row: Option<(String, NaiveDateTime)> = self
            .conn
            .query_row(
                "SELECT email, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((email, expires_at)) if expires_at > now => Ok(Some(email)),
            Some(_) => {
                self.delete_session(token)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    pub fn purge_expired_sessions(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        Ok(self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?)
    }
}

fn parse_task(row: &Row) -> rusqlite::Result<Task> {
    let status = Status::parse(&row.get::<_, Option<String>>(7)?.unwrap_or_default());
    Ok(Task {
        id: row.get(0)?,
        project: row
            .get::<_, Option<String>>(1)?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        title: row.get(2)?,
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        priority: Priority::parse(&row.get::<_, Option<String>>(4)?.unwrap_or_default()),
        due: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        due_sort: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        status,
        completed_at: row.get(8)?,
    })
}
