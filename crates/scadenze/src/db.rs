//! Database operations module for SQLite storage
//!
//! This module handles all database operations including:
//! - Database initialization and migrations
//! - CRUD operations for assignments
//! - Loading and saving the completion streak
//! - Full data wipe

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use scadenze_core::StreakState;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::{debug, info};

use crate::types::Assignment;

/// Migrations compiled into the binary, applied in order
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../db/migrations/001_initial_schema.sql"),
)];

const ASSIGNMENT_COLUMNS: &str = "id, title, description, subject, course_name, due_date, due_time, \
     completed, completed_at, reminder, color, source, created_at, updated_at";

/// Open the database at the given path, running any pending migrations
pub fn init_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let count = run_migrations(&conn)?;
    if count > 0 {
        info!(count = count, path = %db_path.display(), "Applied migrations");
    }

    Ok(conn)
}

/// Run pending migrations, returning how many were applied
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    let mut applied = 0;

    for (version, sql) in MIGRATIONS {
        // Fails before the first migration creates the table, which means "not applied"
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration: {}", version))?;

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;

        debug!(version = %version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

fn map_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    let source: String = row.get(11)?;
    Ok(Assignment {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        subject: row.get(3)?,
        course_name: row.get(4)?,
        due_date: row.get(5)?,
        due_time: row.get(6)?,
        completed: row.get::<_, i32>(7)? != 0,
        completed_at: row.get(8)?,
        reminder: row.get::<_, i32>(9)? != 0,
        color: row.get(10)?,
        // Unknown sources from older rows fall back to manual
        source: source.parse().unwrap_or_default(),
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Get all assignments, sorted by due date then creation time
pub fn get_all_assignments(conn: &Connection) -> Result<Vec<Assignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments ORDER BY due_date ASC, created_at ASC"
    ))?;

    let assignments = stmt
        .query_map([], map_assignment)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(assignments)
}

/// Get a single assignment by ID
pub fn get_assignment(conn: &Connection, id: &str) -> Result<Option<Assignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"
    ))?;

    let assignment = stmt.query_row([id], map_assignment).optional()?;
    Ok(assignment)
}

/// Insert a new assignment
pub fn insert_assignment(conn: &Connection, a: &Assignment) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO assignments ({ASSIGNMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            a.id,
            a.title,
            a.description,
            a.subject,
            a.course_name,
            a.due_date,
            a.due_time,
            a.completed as i32,
            a.completed_at,
            a.reminder as i32,
            a.color,
            a.source.as_str(),
            a.created_at,
            a.updated_at,
        ],
    )
    .with_context(|| format!("Failed to insert assignment {}", a.id))?;
    Ok(())
}

/// Helper struct for partial assignment updates.
///
/// For the nested options, a JSON `null` clears the column while a missing
/// key leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct AssignmentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub due_time: Option<Option<String>>,
    #[serde(default)]
    pub reminder: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Update an existing assignment. Returns false if no row matched.
pub fn update_assignment(conn: &Connection, id: &str, updates: &AssignmentUpdate) -> Result<bool> {
    let mut set_clauses = vec!["updated_at = ?"];
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(chrono::Utc::now().to_rfc3339())];

    if let Some(ref title) = updates.title {
        set_clauses.push("title = ?");
        params_vec.push(Box::new(title.clone()));
    }
    if let Some(ref description) = updates.description {
        set_clauses.push("description = ?");
        params_vec.push(Box::new(description.clone()));
    }
    if let Some(ref due_date) = updates.due_date {
        set_clauses.push("due_date = ?");
        params_vec.push(Box::new(due_date.clone()));
    }
    if let Some(ref due_time) = updates.due_time {
        set_clauses.push("due_time = ?");
        params_vec.push(Box::new(due_time.clone()));
    }
    if let Some(reminder) = updates.reminder {
        set_clauses.push("reminder = ?");
        params_vec.push(Box::new(reminder as i32));
    }
    if let Some(ref color) = updates.color {
        set_clauses.push("color = ?");
        params_vec.push(Box::new(color.clone()));
    }

    params_vec.push(Box::new(id.to_string()));

    let sql = format!(
        "UPDATE assignments SET {} WHERE id = ?",
        set_clauses.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let affected = conn.execute(&sql, params_refs.as_slice())?;
    Ok(affected > 0)
}

/// Set the completed flag. `completed_at` is cleared when un-completing.
pub fn set_completed(
    conn: &Connection,
    id: &str,
    completed: bool,
    completed_at: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE assignments
         SET completed = ?1, completed_at = ?2, updated_at = ?3
         WHERE id = ?4",
        params![
            completed as i32,
            completed_at.filter(|_| completed),
            chrono::Utc::now().to_rfc3339(),
            id
        ],
    )?;
    Ok(affected > 0)
}

/// Delete an assignment by ID
pub fn delete_assignment(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM assignments WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

/// Count all assignments in the database
pub fn count_assignments(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM assignments", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Load the stored streak, or the initial state if none was saved
pub fn load_streak(conn: &Connection) -> Result<StreakState> {
    let row: Option<(u32, Option<String>)> = conn
        .query_row(
            "SELECT count, last_completion FROM streak WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((count, last)) = row else {
        return Ok(StreakState::default());
    };

    let last_completion = last
        .map(|d| {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .with_context(|| format!("Corrupt streak date in database: {}", d))
        })
        .transpose()?;

    Ok(StreakState {
        count,
        last_completion,
    })
}

/// Persist the streak state
pub fn save_streak(conn: &Connection, state: &StreakState) -> Result<()> {
    let last = state
        .last_completion
        .map(|d| d.format("%Y-%m-%d").to_string());
    conn.execute(
        "INSERT INTO streak (id, count, last_completion) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET count = excluded.count, last_completion = excluded.last_completion",
        params![state.count, last],
    )?;
    Ok(())
}

/// Delete every assignment and reset the streak. Returns the number of assignments removed.
pub fn wipe_all(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute("DELETE FROM assignments", [])?;
    tx.execute(
        "UPDATE streak SET count = 0, last_completion = NULL WHERE id = 1",
        [],
    )?;
    tx.commit()?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Connection) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let conn = init_db(&db_path).unwrap();
        (temp_dir, conn)
    }

    fn make_assignment(id: &str, title: &str, due_date: &str) -> Assignment {
        Assignment::with_id(id.to_string(), title.to_string(), due_date.to_string())
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    // ========== init_db tests ==========

    #[test]
    fn test_init_db_creates_tables() {
        let (_temp_dir, conn) = setup_test_db();

        for table in ["assignments", "streak", "schema_migrations"] {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "missing table {table}");
        }
    }

    #[test]
    fn test_init_db_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn1 = init_db(&db_path).unwrap();
        insert_assignment(&conn1, &make_assignment("a1", "Essay", "2025-01-15")).unwrap();
        drop(conn1);

        let conn2 = init_db(&db_path).unwrap();
        assert_eq!(run_migrations(&conn2).unwrap(), 0);
        assert_eq!(count_assignments(&conn2).unwrap(), 1);
    }

    // ========== CRUD tests ==========

    #[test]
    fn test_insert_and_get_assignment() {
        let (_temp_dir, conn) = setup_test_db();
        let mut a = make_assignment("a1", "Math Homework", "2025-01-15");
        a.due_time = Some("23:00".to_string());
        a.course_name = Some("Algebra II".to_string());
        a.color = Some("#ef4444".to_string());

        insert_assignment(&conn, &a).unwrap();

        let retrieved = get_assignment(&conn, "a1").unwrap().unwrap();
        assert_eq!(retrieved, a);
    }

    #[test]
    fn test_get_nonexistent_assignment() {
        let (_temp_dir, conn) = setup_test_db();
        assert!(get_assignment(&conn, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let (_temp_dir, conn) = setup_test_db();
        let a = make_assignment("a1", "Essay", "2025-01-15");
        insert_assignment(&conn, &a).unwrap();
        assert!(insert_assignment(&conn, &a).is_err());
    }

    #[test]
    fn test_get_all_assignments_sorted() {
        let (_temp_dir, conn) = setup_test_db();

        insert_assignment(&conn, &make_assignment("a1", "Third", "2025-01-20")).unwrap();
        insert_assignment(&conn, &make_assignment("a2", "First", "2025-01-10")).unwrap();
        insert_assignment(&conn, &make_assignment("a3", "Second", "2025-01-15")).unwrap();

        let all = get_all_assignments(&conn).unwrap();
        let titles: Vec<&str> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_update_assignment() {
        let (_temp_dir, conn) = setup_test_db();
        insert_assignment(&conn, &make_assignment("a1", "Essay", "2025-01-15")).unwrap();

        let updates = AssignmentUpdate {
            title: Some("Essay draft".to_string()),
            due_date: Some("2025-01-20".to_string()),
            due_time: Some(Some("12:00".to_string())),
            reminder: Some(false),
            ..Default::default()
        };
        assert!(update_assignment(&conn, "a1", &updates).unwrap());

        let a = get_assignment(&conn, "a1").unwrap().unwrap();
        assert_eq!(a.title, "Essay draft");
        assert_eq!(a.due_date, "2025-01-20");
        assert_eq!(a.due_time.as_deref(), Some("12:00"));
        assert!(!a.reminder);
    }

    #[test]
    fn test_update_clears_due_time() {
        let (_temp_dir, conn) = setup_test_db();
        let mut a = make_assignment("a1", "Essay", "2025-01-15");
        a.due_time = Some("09:00".to_string());
        insert_assignment(&conn, &a).unwrap();

        let updates = AssignmentUpdate {
            due_time: Some(None),
            ..Default::default()
        };
        update_assignment(&conn, "a1", &updates).unwrap();
        assert!(get_assignment(&conn, "a1").unwrap().unwrap().due_time.is_none());
    }

    #[test]
    fn test_update_nonexistent_assignment() {
        let (_temp_dir, conn) = setup_test_db();
        let updates = AssignmentUpdate {
            reminder: Some(true),
            ..Default::default()
        };
        assert!(!update_assignment(&conn, "nonexistent", &updates).unwrap());
    }

    #[test]
    fn test_update_deserialize_null_vs_missing() {
        let updates: AssignmentUpdate =
            serde_json::from_str(r#"{"due_time":null,"title":"Lab"}"#).unwrap();
        assert_eq!(updates.due_time, Some(None));
        assert!(updates.color.is_none());
        assert_eq!(updates.title.as_deref(), Some("Lab"));
    }

    #[test]
    fn test_set_completed_and_back() {
        let (_temp_dir, conn) = setup_test_db();
        insert_assignment(&conn, &make_assignment("a1", "Essay", "2025-01-15")).unwrap();

        assert!(set_completed(&conn, "a1", true, Some("2025-01-14T10:00:00+00:00")).unwrap());
        let a = get_assignment(&conn, "a1").unwrap().unwrap();
        assert!(a.completed);
        assert_eq!(a.completed_at.as_deref(), Some("2025-01-14T10:00:00+00:00"));

        assert!(set_completed(&conn, "a1", false, Some("ignored")).unwrap());
        let a = get_assignment(&conn, "a1").unwrap().unwrap();
        assert!(!a.completed);
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn test_set_completed_nonexistent() {
        let (_temp_dir, conn) = setup_test_db();
        assert!(!set_completed(&conn, "missing", true, None).unwrap());
    }

    #[test]
    fn test_delete_assignment() {
        let (_temp_dir, conn) = setup_test_db();
        insert_assignment(&conn, &make_assignment("a1", "Essay", "2025-01-15")).unwrap();

        assert!(delete_assignment(&conn, "a1").unwrap());
        assert!(get_assignment(&conn, "a1").unwrap().is_none());
        assert!(!delete_assignment(&conn, "a1").unwrap());
    }

    // ========== streak persistence tests ==========

    #[test]
    fn test_load_streak_initial() {
        let (_temp_dir, conn) = setup_test_db();
        assert_eq!(load_streak(&conn).unwrap(), StreakState::default());
    }

    #[test]
    fn test_save_and_load_streak() {
        let (_temp_dir, conn) = setup_test_db();
        let state = StreakState {
            count: 7,
            last_completion: Some(day("2024-03-07")),
        };
        save_streak(&conn, &state).unwrap();
        assert_eq!(load_streak(&conn).unwrap(), state);
    }

    #[test]
    fn test_load_streak_without_row() {
        let (_temp_dir, conn) = setup_test_db();
        conn.execute("DELETE FROM streak", []).unwrap();
        assert_eq!(load_streak(&conn).unwrap(), StreakState::default());
    }

    #[test]
    fn test_load_streak_corrupt_date() {
        let (_temp_dir, conn) = setup_test_db();
        conn.execute("UPDATE streak SET count = 2, last_completion = 'garbage'", [])
            .unwrap();
        assert!(load_streak(&conn).is_err());
    }

    // ========== wipe_all tests ==========

    #[test]
    fn test_wipe_all() {
        let (_temp_dir, conn) = setup_test_db();
        insert_assignment(&conn, &make_assignment("a1", "Essay", "2025-01-15")).unwrap();
        insert_assignment(&conn, &make_assignment("a2", "Quiz", "2025-01-16")).unwrap();
        save_streak(
            &conn,
            &StreakState {
                count: 4,
                last_completion: Some(day("2025-01-14")),
            },
        )
        .unwrap();

        assert_eq!(wipe_all(&conn).unwrap(), 2);
        assert_eq!(count_assignments(&conn).unwrap(), 0);
        assert_eq!(load_streak(&conn).unwrap(), StreakState::default());
    }
}
