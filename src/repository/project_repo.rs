// ==========================================
// Project repository
// ==========================================

use crate::domain::{Project, ProjectStatus};
use crate::repository::{self, error::RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLS: &str = "id, name, client_name, project_date, code, status, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<(Project, Option<String>, String, String)> {
    Ok((
        Project {
            id: row.get(0)?,
            name: row.get(1)?,
            client_name: row.get(2)?,
            project_date: None, // filled below
            code: row.get(4)?,
            status: ProjectStatus::parse(&row.get::<_, String>(5)?),
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        },
        row.get::<_, Option<String>>(3)?,
        row.get::<_, String>(6)?,
        row.get::<_, String>(7)?,
    ))
}

fn finish(parts: (Project, Option<String>, String, String)) -> RepositoryResult<Project> {
    let (mut project, date, created, updated) = parts;
    project.project_date = repository::parse_opt_date(date)?;
    project.created_at = repository::parse_datetime(&created)?;
    project.updated_at = repository::parse_datetime(&updated)?;
    Ok(project)
}

pub fn insert(
    conn: &Connection,
    now: NaiveDateTime,
    name: &str,
    client_name: &str,
    project_date: Option<NaiveDate>,
    code: &str,
    status: ProjectStatus,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO projects (name, client_name, project_date, code, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
        params![
            name,
            client_name,
            project_date.map(repository::format_date),
            code,
            status.as_str(),
            repository::format_datetime(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> RepositoryResult<Option<Project>> {
    let parts = conn
        .query_row(
            &format!("SELECT {COLS} FROM projects WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?;
    parts.map(finish).transpose()
}

pub fn get_status(conn: &Connection, id: i64) -> RepositoryResult<Option<ProjectStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM projects WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(status.map(|s| ProjectStatus::parse(&s)))
}

pub fn code_exists(conn: &Connection, code: &str) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM projects WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn set_status(
    conn: &Connection,
    now: NaiveDateTime,
    id: i64,
    status: ProjectStatus,
) -> RepositoryResult<usize> {
    let rows = conn.execute(
        "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), repository::format_datetime(now), id],
    )?;
    Ok(rows)
}

pub fn list(conn: &Connection) -> RepositoryResult<Vec<Project>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLS} FROM projects ORDER BY id"))?;
    let rows = stmt.query_map([], map_row)?;

    let mut projects = Vec::new();
    for row in rows {
        projects.push(finish(row?)?);
    }
    Ok(projects)
}
