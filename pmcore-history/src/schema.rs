//! Schema creation and the version-chained migration ladder.

use rusqlite::Connection;

use crate::Error;

const BASE_SCHEMA: &str = r#"
CREATE TABLE config (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE trans (
    id             INTEGER PRIMARY KEY,
    dt_begin       INTEGER NOT NULL,
    dt_end         INTEGER,
    rpmdb_version  TEXT NOT NULL,
    releasever     TEXT NOT NULL,
    user_id        INTEGER NOT NULL,
    cmdline        TEXT NOT NULL,
    state          TEXT NOT NULL
);

CREATE TABLE trans_item (
    id        INTEGER PRIMARY KEY,
    trans_id  INTEGER NOT NULL REFERENCES trans(id),
    name      TEXT NOT NULL,
    epoch     TEXT NOT NULL,
    version   TEXT NOT NULL,
    release   TEXT NOT NULL,
    arch      TEXT NOT NULL,
    repoid    TEXT NOT NULL,
    action    TEXT NOT NULL,
    reason    TEXT NOT NULL,
    failed    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE group_reason (
    group_id TEXT PRIMARY KEY,
    reason   TEXT NOT NULL
);

CREATE TABLE env_reason (
    env_id TEXT PRIMARY KEY,
    reason TEXT NOT NULL
);

CREATE TABLE pkg_reason (
    name   TEXT NOT NULL,
    arch   TEXT NOT NULL,
    reason TEXT NOT NULL,
    PRIMARY KEY (name, arch)
);

CREATE INDEX idx_trans_item_trans_id ON trans_item(trans_id);
CREATE INDEX idx_trans_item_name ON trans_item(name);
"#;

/// Opens (or creates) the schema, chaining migrations up to the current
/// version. Mirrors the ladder in the store's module docs: a fresh database
/// is created directly at `1.2`; an existing `1.1` database is migrated in
/// place.
pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), Error> {
    if !table_exists(conn, "config")? {
        conn.execute_batch(BASE_SCHEMA)?;
        conn.execute("INSERT INTO config (key, value) VALUES ('version', '1.1')", [])?;
    }

    loop {
        match read_version(conn)?.as_str() {
            "1.1" => migrate_1_1_to_1_2(conn)?,
            "1.2" => return Ok(()),
            other => {
                return Err(Error::UnknownSchemaVersion { path: conn.path().unwrap_or_default().to_string(), version: other.to_string() });
            }
        }
    }
}

fn migrate_1_1_to_1_2(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(
        "ALTER TABLE trans ADD COLUMN comment TEXT;
         UPDATE config SET value = '1.2' WHERE key = 'version';",
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, Error> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1", [name], |row| row.get(0))?;
    Ok(count > 0)
}

fn read_version(conn: &Connection) -> Result<String, Error> {
    Ok(conn.query_row("SELECT value FROM config WHERE key = 'version'", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_lands_on_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_version(&conn).unwrap(), "1.2");
        assert!(table_exists(&conn, "trans").unwrap());
    }

    #[test]
    fn a_1_1_database_is_migrated_in_place() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BASE_SCHEMA).unwrap();
        conn.execute("INSERT INTO config (key, value) VALUES ('version', '1.1')", []).unwrap();

        ensure_schema(&conn).unwrap();
        assert_eq!(read_version(&conn).unwrap(), "1.2");
        let has_comment: i64 = conn
            .query_row("SELECT COUNT(*) FROM pragma_table_info('trans') WHERE name = 'comment'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(has_comment, 1);
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_version(&conn).unwrap(), "1.2");
    }
}
