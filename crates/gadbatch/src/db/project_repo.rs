//! Repositories for bridge projects, their parameters and cross-sections,
//! and the free-form design projects.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::model::{BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject};

fn project_from_row(row: &Row<'_>) -> Result<BridgeProject, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;
    Ok(BridgeProject {
        id: row.get("id")?,
        name: row.get("name")?,
        user_id: row.get("user_id")?,
        input_data: row.get("input_data")?,
        parameters: row.get("parameters")?,
        generated_drawing: row.get("generated_drawing")?,
        created_at: parse_timestamp(&created_at),
    })
}

pub fn insert_project(conn: &Connection, project: &BridgeProject) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bridge_projects (id, name, user_id, input_data, parameters,
         generated_drawing, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            project.id,
            project.name,
            project.user_id,
            project.input_data,
            project.parameters,
            project.generated_drawing,
            format_timestamp(project.created_at),
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of a project.
pub fn update_project(conn: &Connection, project: &BridgeProject) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE bridge_projects SET name = ?2, user_id = ?3, input_data = ?4,
         parameters = ?5, generated_drawing = ?6
         WHERE id = ?1",
        params![
            project.id,
            project.name,
            project.user_id,
            project.input_data,
            project.parameters,
            project.generated_drawing,
        ],
    )?;
    Ok(())
}

pub fn find_project(conn: &Connection, id: &str) -> Result<Option<BridgeProject>, DatabaseError> {
    let project = conn
        .query_row(
            "SELECT * FROM bridge_projects WHERE id = ?1",
            params![id],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

/// Lists a user's projects in creation order.
pub fn list_projects_by_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<BridgeProject>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM bridge_projects WHERE user_id = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map(params![user_id], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn parameters_from_row(row: &Row<'_>) -> Result<BridgeParameters, rusqlite::Error> {
    Ok(BridgeParameters {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        scale1: row.get("scale1")?,
        scale2: row.get("scale2")?,
        skew: row.get("skew")?,
        datum: row.get("datum")?,
        toprl: row.get("toprl")?,
        left: row.get("left")?,
        right: row.get("right")?,
        xincr: row.get("xincr")?,
        yincr: row.get("yincr")?,
        noch: row.get("noch")?,
    })
}

pub fn insert_parameters(conn: &Connection, p: &BridgeParameters) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bridge_parameters (id, project_id, scale1, scale2, skew, datum, toprl,
         \"left\", \"right\", xincr, yincr, noch)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            p.id,
            p.project_id,
            p.scale1,
            p.scale2,
            p.skew,
            p.datum,
            p.toprl,
            p.left,
            p.right,
            p.xincr,
            p.yincr,
            p.noch,
        ],
    )?;
    Ok(())
}

pub fn find_parameters(
    conn: &Connection,
    project_id: &str,
) -> Result<Option<BridgeParameters>, DatabaseError> {
    let parameters = conn
        .query_row(
            "SELECT * FROM bridge_parameters WHERE project_id = ?1",
            params![project_id],
            parameters_from_row,
        )
        .optional()?;
    Ok(parameters)
}

fn cross_section_from_row(row: &Row<'_>) -> Result<BridgeCrossSection, rusqlite::Error> {
    Ok(BridgeCrossSection {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        chainage: row.get("chainage")?,
        level: row.get("level")?,
        sequence: row.get("sequence")?,
    })
}

pub fn insert_cross_section(
    conn: &Connection,
    section: &BridgeCrossSection,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bridge_cross_sections (id, project_id, chainage, level, sequence)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            section.id,
            section.project_id,
            section.chainage,
            section.level,
            section.sequence,
        ],
    )?;
    Ok(())
}

/// Cross-sections of a project ordered by their position in the source file.
pub fn list_cross_sections(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<BridgeCrossSection>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM bridge_cross_sections WHERE project_id = ?1 ORDER BY sequence",
    )?;
    let rows = stmt
        .query_map(params![project_id], cross_section_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Removes a project with its parameters and cross-sections. Fails if a
/// batch file still references it.
pub fn delete_project(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    conn.execute(
        "DELETE FROM bridge_cross_sections WHERE project_id = ?1",
        params![id],
    )?;
    conn.execute(
        "DELETE FROM bridge_parameters WHERE project_id = ?1",
        params![id],
    )?;
    let removed = conn.execute("DELETE FROM bridge_projects WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

fn design_from_row(row: &Row<'_>) -> Result<DesignProject, rusqlite::Error> {
    let parameters: String = row.get("parameters")?;
    let cross_section_data: String = row.get("cross_section_data")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(DesignProject {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        parameters: decode_json(&parameters),
        cross_section_data: decode_json(&cross_section_data),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn decode_json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!("Stored JSON column could not be decoded: {}", e);
        serde_json::Value::Null
    })
}

pub fn insert_design(conn: &Connection, project: &DesignProject) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO design_projects (id, name, description, parameters, cross_section_data,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            project.id,
            project.name,
            project.description,
            project.parameters.to_string(),
            project.cross_section_data.to_string(),
            format_timestamp(project.created_at),
            format_timestamp(project.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_design(conn: &Connection, project: &DesignProject) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE design_projects SET name = ?2, description = ?3, parameters = ?4,
         cross_section_data = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            project.id,
            project.name,
            project.description,
            project.parameters.to_string(),
            project.cross_section_data.to_string(),
            format_timestamp(project.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_design(conn: &Connection, id: &str) -> Result<Option<DesignProject>, DatabaseError> {
    let project = conn
        .query_row(
            "SELECT * FROM design_projects WHERE id = ?1",
            params![id],
            design_from_row,
        )
        .optional()?;
    Ok(project)
}

pub fn list_designs(conn: &Connection) -> Result<Vec<DesignProject>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM design_projects ORDER BY rowid")?;
    let rows = stmt
        .query_map([], design_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns whether a row was removed.
pub fn delete_design(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let removed = conn.execute("DELETE FROM design_projects WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}
