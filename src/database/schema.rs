use rusqlite::{Connection, Result};

/// Initialize the complete schema of the local store
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Schema version table for future migrations
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        create_schema(conn)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Schema version 1
fn create_schema(conn: &Connection) -> Result<()> {
    // Table: remote_instances (one active deployment per tenant)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS remote_instances (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            instance_name TEXT NOT NULL,
            base_url TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            status TEXT CHECK(status IN ('active', 'inactive', 'provisioning', 'error')) NOT NULL DEFAULT 'active',
            last_health_check INTEGER,
            last_health_ok INTEGER CHECK(last_health_ok IN (0,1)),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_remote_instances_one_active
         ON remote_instances(tenant_id) WHERE status = 'active'",
        [],
    )?;

    // Table: photos
    conn.execute(
        "CREATE TABLE IF NOT EXISTS photos (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            original_path TEXT NOT NULL,
            sync_status TEXT CHECK(sync_status IN ('pending', 'syncing', 'synced', 'failed', 'orphaned')) NOT NULL DEFAULT 'pending',
            sync_version INTEGER NOT NULL DEFAULT 1,
            remote_uuid TEXT,
            remote_filename TEXT,
            sync_errors TEXT NOT NULL DEFAULT '[]',
            last_sync_attempt INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_photos_tenant_status ON photos(tenant_id, sync_status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_photos_remote_uuid ON photos(remote_uuid)",
        [],
    )?;

    // Table: sync_events (append-only audit log)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_events (
            id TEXT PRIMARY KEY,
            photo_id TEXT NOT NULL,
            instance_id TEXT NOT NULL,
            event_type TEXT CHECK(event_type IN ('upload', 'update', 'delete', 'reconcile')) NOT NULL,
            event_status TEXT CHECK(event_status IN ('pending', 'processing', 'success', 'failed')) NOT NULL DEFAULT 'pending',
            payload TEXT NOT NULL DEFAULT '{}',
            error_details TEXT,
            processing_time_ms INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_events_photo ON sync_events(photo_id, created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_events_status ON sync_events(instance_id, event_status)",
        [],
    )?;

    Ok(())
}
