//! Zone and interface reference entities.
//!
//! Both are keyed by their uppercased name and created lazily the first
//! time a fact references them. A missing external id is filled in when a
//! later record carries one; an existing id is never overwritten.

use duckdb::Connection;
use grid_ingest_database_models::{Interface, Zone};

use crate::{DbError, optional, sql_timestamp};

/// Canonical form of an entity name.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Looks up a zone by name (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_zone_by_name(conn: &Connection, name: &str) -> Result<Option<Zone>, DbError> {
    optional(conn.query_row(
        "SELECT id, name, ptid, display_name FROM zones WHERE name = ?",
        duckdb::params![normalize_name(name)],
        |row| {
            Ok(Zone {
                id: row.get(0)?,
                name: row.get(1)?,
                ptid: row.get(2)?,
                display_name: row.get(3)?,
            })
        },
    ))
}

/// Returns the zone named `name`, creating it if needed.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn get_or_create_zone(
    conn: &Connection,
    name: &str,
    ptid: Option<i64>,
    now: chrono::NaiveDateTime,
) -> Result<Zone, DbError> {
    if let Some(mut zone) = find_zone_by_name(conn, name)? {
        if zone.ptid.is_none()
            && let Some(ptid) = ptid
        {
            conn.execute(
                "UPDATE zones SET ptid = ? WHERE id = ? AND ptid IS NULL",
                duckdb::params![ptid, zone.id],
            )?;
            zone.ptid = Some(ptid);
        }
        return Ok(zone);
    }

    let name = normalize_name(name);
    let id: i64 = conn.query_row(
        "INSERT INTO zones (name, ptid, display_name, created_at)
         VALUES (?, ?, ?, CAST(? AS TIMESTAMP))
         RETURNING id",
        duckdb::params![name, ptid, name, sql_timestamp(now)],
        |row| row.get(0),
    )?;

    log::debug!("Created zone {name} (id {id})");

    Ok(Zone {
        id,
        display_name: Some(name.clone()),
        name,
        ptid,
    })
}

/// Looks up an interface by name (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_interface_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<Interface>, DbError> {
    optional(conn.query_row(
        "SELECT id, name, point_id, description FROM interfaces WHERE name = ?",
        duckdb::params![normalize_name(name)],
        |row| {
            Ok(Interface {
                id: row.get(0)?,
                name: row.get(1)?,
                point_id: row.get(2)?,
                description: row.get(3)?,
            })
        },
    ))
}

/// Returns the interface named `name`, creating it if needed.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn get_or_create_interface(
    conn: &Connection,
    name: &str,
    point_id: Option<i64>,
    now: chrono::NaiveDateTime,
) -> Result<Interface, DbError> {
    if let Some(mut interface) = find_interface_by_name(conn, name)? {
        if interface.point_id.is_none()
            && let Some(point_id) = point_id
        {
            conn.execute(
                "UPDATE interfaces SET point_id = ? WHERE id = ? AND point_id IS NULL",
                duckdb::params![point_id, interface.id],
            )?;
            interface.point_id = Some(point_id);
        }
        return Ok(interface);
    }

    let name = normalize_name(name);
    let id: i64 = conn.query_row(
        "INSERT INTO interfaces (name, point_id, created_at)
         VALUES (?, ?, CAST(? AS TIMESTAMP))
         RETURNING id",
        duckdb::params![name, point_id, sql_timestamp(now)],
        |row| row.get(0),
    )?;

    log::debug!("Created interface {name} (id {id})");

    Ok(Interface {
        id,
        name,
        point_id,
        description: None,
    })
}
