//! User repository for the `users` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::model::User;

fn from_row(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        password: row.get("password")?,
    })
}

pub fn insert(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
        params![user.id, user.username, user.password],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row("SELECT * FROM users WHERE id = ?1", params![id], from_row)
        .optional()?;
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            "SELECT * FROM users WHERE username = ?1",
            params![username],
            from_row,
        )
        .optional()?;
    Ok(user)
}
