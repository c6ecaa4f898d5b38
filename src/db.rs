use rusqlite::Connection;
use std::path::Path;

pub const STORE_DB_FILE: &str = "school.sqlite3";
pub const CACHE_DB_FILE: &str = "cache.sqlite3";
pub const IDENTITY_DB_FILE: &str = "identity.sqlite3";

pub fn open_store_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(STORE_DB_FILE))?;
    init_store_schema(&conn)?;
    Ok(conn)
}

pub fn open_cache_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(CACHE_DB_FILE))?;
    init_cache_schema(&conn)?;
    Ok(conn)
}

pub fn open_identity_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(IDENTITY_DB_FILE))?;
    init_identity_schema(&conn)?;
    Ok(conn)
}

pub fn init_store_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            collection TEXT NOT NULL,
            key TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(collection, key)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
        [],
    )?;
    Ok(())
}

pub fn init_cache_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshot_cache(
            cache_key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            saved_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn init_identity_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts(
            uid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            salt TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email)",
        [],
    )?;
    Ok(())
}

/// Number of rows per collection; used for the backup manifest and health output.
pub fn collection_counts(conn: &Connection) -> rusqlite::Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT collection, COUNT(*)
         FROM documents
         GROUP BY collection
         ORDER BY collection",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
