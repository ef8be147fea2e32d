use crate::database::{from_millis, now_millis};
use crate::error::AppError;
use crate::models::{InstanceStatus, RemoteInstance};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const INSTANCE_COLUMNS: &str =
    "id, tenant_id, instance_name, base_url, username, password, status, last_health_check, last_health_ok";

fn instance_from_row(row: &Row) -> rusqlite::Result<RemoteInstance> {
    let status: String = row.get(6)?;
    let status = InstanceStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown instance status '{}'", status),
            )),
        )
    })?;

    Ok(RemoteInstance {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        instance_name: row.get(2)?,
        base_url: row.get(3)?,
        username: row.get(4)?,
        password: row.get(5)?,
        status,
        last_health_check: row.get::<_, Option<i64>>(7)?.map(from_millis),
        last_health_ok: row.get(8)?,
    })
}

/// Registers a remote deployment for a tenant
pub fn create_instance(conn: &Connection, instance: &RemoteInstance) -> Result<(), AppError> {
    let now = now_millis();
    conn.execute(
        "INSERT INTO remote_instances
         (id, tenant_id, instance_name, base_url, username, password, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            instance.id,
            instance.tenant_id,
            instance.instance_name,
            instance.base_url,
            instance.username,
            instance.password,
            instance.status.as_str(),
            now,
        ],
    )?;
    Ok(())
}

/// The tenant's active deployment, if any
pub fn find_active_instance(
    conn: &Connection,
    tenant_id: &str,
) -> Result<Option<RemoteInstance>, AppError> {
    let instance = conn
        .query_row(
            &format!(
                "SELECT {} FROM remote_instances WHERE tenant_id = ?1 AND status = 'active'",
                INSTANCE_COLUMNS
            ),
            params![tenant_id],
            instance_from_row,
        )
        .optional()?;
    Ok(instance)
}

/// Tenants that currently have an active deployment
pub fn list_active_tenants(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT tenant_id FROM remote_instances WHERE status = 'active' ORDER BY tenant_id",
    )?;
    let tenants = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tenants)
}

pub fn set_instance_status(
    conn: &Connection,
    instance_id: &str,
    status: InstanceStatus,
) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE remote_instances SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_millis(), instance_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("remote instance {}", instance_id)));
    }
    Ok(())
}

/// Stores the outcome of a health probe on the tenant's active deployment
pub fn record_health_check(conn: &Connection, tenant_id: &str, healthy: bool) -> Result<(), AppError> {
    let now = now_millis();
    conn.execute(
        "UPDATE remote_instances SET last_health_check = ?1, last_health_ok = ?2, updated_at = ?1
         WHERE tenant_id = ?3 AND status = 'active'",
        params![now, healthy, tenant_id],
    )?;
    Ok(())
}
