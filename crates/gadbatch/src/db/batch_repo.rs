//! Batch repository for the `batch_jobs` and `batch_job_files` tables.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, DatabaseError};
use crate::model::{BatchJob, BatchJobFile, ProcessingStatus};

fn status_column(row: &Row<'_>, column: &str) -> Result<ProcessingStatus, rusqlite::Error> {
    let raw: String = row.get(column)?;
    let idx = row.as_ref().column_index(column)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn job_from_row(row: &Row<'_>) -> Result<BatchJob, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;
    Ok(BatchJob {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        status: status_column(row, "status")?,
        total_files: row.get("total_files")?,
        processed_files: row.get("processed_files")?,
        failed_files: row.get("failed_files")?,
        created_at: parse_timestamp(&created_at),
        completed_at: parse_optional_timestamp(row.get("completed_at")?),
    })
}

pub fn insert_job(conn: &Connection, job: &BatchJob) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO batch_jobs (id, user_id, name, status, total_files, processed_files,
         failed_files, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            job.id,
            job.user_id,
            job.name,
            job.status.as_str(),
            job.total_files,
            job.processed_files,
            job.failed_files,
            format_timestamp(job.created_at),
            job.completed_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of a job. `id`, `user_id` and
/// `created_at` are fixed at creation.
pub fn update_job(conn: &Connection, job: &BatchJob) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE batch_jobs SET name = ?2, status = ?3, total_files = ?4, processed_files = ?5,
         failed_files = ?6, completed_at = ?7
         WHERE id = ?1",
        params![
            job.id,
            job.name,
            job.status.as_str(),
            job.total_files,
            job.processed_files,
            job.failed_files,
            job.completed_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn find_job(conn: &Connection, id: &str) -> Result<Option<BatchJob>, DatabaseError> {
    let job = conn
        .query_row(
            "SELECT * FROM batch_jobs WHERE id = ?1",
            params![id],
            job_from_row,
        )
        .optional()?;
    Ok(job)
}

/// Lists a user's jobs in creation order.
pub fn list_jobs_by_user(conn: &Connection, user_id: &str) -> Result<Vec<BatchJob>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM batch_jobs WHERE user_id = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map(params![user_id], job_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_jobs_by_status(
    conn: &Connection,
    status: ProcessingStatus,
) -> Result<Vec<BatchJob>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM batch_jobs WHERE status = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map(params![status.as_str()], job_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn file_from_row(row: &Row<'_>) -> Result<BatchJobFile, rusqlite::Error> {
    Ok(BatchJobFile {
        id: row.get("id")?,
        batch_job_id: row.get("batch_job_id")?,
        project_id: row.get("project_id")?,
        file_name: row.get("file_name")?,
        file_size: row.get("file_size")?,
        status: status_column(row, "status")?,
        progress: row.get("progress")?,
        error_message: row.get("error_message")?,
        current_step: row.get("current_step")?,
        estimated_time: row.get("estimated_time_seconds")?,
        started_at: parse_optional_timestamp(row.get("started_at")?),
        completed_at: parse_optional_timestamp(row.get("completed_at")?),
    })
}

pub fn insert_file(conn: &Connection, file: &BatchJobFile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO batch_job_files (id, batch_job_id, project_id, file_name, file_size,
         status, progress, error_message, current_step, estimated_time_seconds,
         started_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            file.id,
            file.batch_job_id,
            file.project_id,
            file.file_name,
            file.file_size,
            file.status.as_str(),
            file.progress,
            file.error_message,
            file.current_step,
            file.estimated_time,
            file.started_at.map(format_timestamp),
            file.completed_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn update_file(conn: &Connection, file: &BatchJobFile) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE batch_job_files SET project_id = ?2, file_name = ?3, file_size = ?4,
         status = ?5, progress = ?6, error_message = ?7, current_step = ?8,
         estimated_time_seconds = ?9, started_at = ?10, completed_at = ?11
         WHERE id = ?1",
        params![
            file.id,
            file.project_id,
            file.file_name,
            file.file_size,
            file.status.as_str(),
            file.progress,
            file.error_message,
            file.current_step,
            file.estimated_time,
            file.started_at.map(format_timestamp),
            file.completed_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn find_file(conn: &Connection, id: &str) -> Result<Option<BatchJobFile>, DatabaseError> {
    let file = conn
        .query_row(
            "SELECT * FROM batch_job_files WHERE id = ?1",
            params![id],
            file_from_row,
        )
        .optional()?;
    Ok(file)
}

/// Files of a job in the order they were uploaded.
pub fn list_files_by_job(conn: &Connection, job_id: &str) -> Result<Vec<BatchJobFile>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM batch_job_files WHERE batch_job_id = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map(params![job_id], file_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Removes a job together with its file records. Returns whether the job
/// existed.
pub fn delete_job(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    conn.execute(
        "DELETE FROM batch_job_files WHERE batch_job_id = ?1",
        params![id],
    )?;
    let removed = conn.execute("DELETE FROM batch_jobs WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{user_repo, Database};
    use crate::model::User;
    use chrono::Utc;

    fn test_db() -> Database {
        let db = Database::open_in_memory().expect("Failed to create test database");
        db.with_conn(|conn| {
            user_repo::insert(
                conn,
                &User {
                    id: "dummy-user".to_string(),
                    username: "dummy".to_string(),
                    password: String::new(),
                },
            )
        })
        .unwrap();
        db
    }

    fn sample_job(id: &str) -> BatchJob {
        BatchJob {
            id: id.to_string(),
            user_id: "dummy-user".to_string(),
            name: "Batch Job".to_string(),
            status: ProcessingStatus::Pending,
            total_files: 2,
            processed_files: 0,
            failed_files: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn sample_file(id: &str, job_id: &str) -> BatchJobFile {
        BatchJobFile {
            id: id.to_string(),
            batch_job_id: job_id.to_string(),
            project_id: None,
            file_name: "span.txt".to_string(),
            file_size: 120,
            status: ProcessingStatus::Pending,
            progress: 0,
            error_message: None,
            current_step: Some("Queued for processing".to_string()),
            estimated_time: Some(180),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_job_insert_and_update() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut job = sample_job("j1");
            insert_job(conn, &job)?;

            job.status = ProcessingStatus::Completed;
            job.processed_files = 2;
            job.completed_at = Some(Utc::now());
            update_job(conn, &job)?;

            let found = find_job(conn, "j1")?.unwrap();
            assert_eq!(found.status, ProcessingStatus::Completed);
            assert_eq!(found.processed_files, 2);
            assert!(found.completed_at.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_jobs_listed_in_creation_order() {
        let db = test_db();
        db.with_conn(|conn| {
            for id in ["a", "c", "b"] {
                insert_job(conn, &sample_job(id))?;
            }
            let ids: Vec<String> = list_jobs_by_user(conn, "dummy-user")?
                .into_iter()
                .map(|j| j.id)
                .collect();
            assert_eq!(ids, vec!["a", "c", "b"]);
            assert!(list_jobs_by_user(conn, "other")?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_jobs_by_status() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_job(conn, &sample_job("p"))?;
            let mut running = sample_job("r");
            running.status = ProcessingStatus::Processing;
            insert_job(conn, &running)?;

            let found = list_jobs_by_status(conn, ProcessingStatus::Processing)?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, "r");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_file_insert_and_update() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_job(conn, &sample_job("j1"))?;
            let mut file = sample_file("f1", "j1");
            insert_file(conn, &file)?;
            insert_file(conn, &sample_file("f2", "j1"))?;

            file.status = ProcessingStatus::Processing;
            file.progress = 40;
            file.started_at = Some(Utc::now());
            update_file(conn, &file)?;

            let found = find_file(conn, "f1")?.unwrap();
            assert_eq!(found.progress, 40);
            assert_eq!(found.estimated_time, Some(180));
            assert!(found.started_at.is_some());

            assert_eq!(list_files_by_job(conn, "j1")?.len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_job_removes_its_files() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_job(conn, &sample_job("j1"))?;
            insert_job(conn, &sample_job("j2"))?;
            insert_file(conn, &sample_file("f1", "j1"))?;
            insert_file(conn, &sample_file("f2", "j2"))?;

            assert!(delete_job(conn, "j1")?);
            assert!(!delete_job(conn, "j1")?);
            assert!(find_job(conn, "j1")?.is_none());
            assert!(find_file(conn, "f1")?.is_none());
            assert_eq!(list_files_by_job(conn, "j2")?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_job(conn, &sample_job("j1"))?;
            conn.execute("UPDATE batch_jobs SET status = 'queued' WHERE id = 'j1'", [])?;
            assert!(find_job(conn, "j1").is_err());
            Ok(())
        })
        .unwrap();
    }
}
