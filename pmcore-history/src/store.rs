//! The history store: schema-versioned transaction/item persistence plus
//! the reason cache preloaded at `sack.fill()` time.

use std::collections::HashMap;
use std::path::Path;

use pmcore_types::{PackageAction, Reason};
use rusqlite::{params, Connection};

use crate::schema::ensure_schema;
use crate::types::{
    action_from_str, action_to_str, reason_from_str, reason_to_str, Entity, NewTransaction, TransactionFilter,
    TransactionItemRecord, TransactionRecord, TransactionState,
};
use crate::Error;

/// Preloaded reason lookups, keyed the way [`HistoryStore::get_item_reason`]
/// keys its single-row queries; built once per `sack.fill()` and consulted
/// by plan-item reason carry-over.
#[derive(Clone, Debug, Default)]
pub struct ReasonCache {
    pub groups: HashMap<String, Reason>,
    pub environments: HashMap<String, Reason>,
    pub packages: HashMap<(String, String), Reason>,
}

impl ReasonCache {
    pub fn get(&self, entity: &Entity) -> Option<Reason> {
        match entity {
            Entity::CompsGroup(id) => self.groups.get(id).copied(),
            Entity::CompsEnvironment(id) => self.environments.get(id).copied(),
            Entity::RpmPackage { name, arch } => self.packages.get(&(name.clone(), arch.clone())).copied(),
        }
    }
}

/// A single-file, schema-versioned database of past transactions.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Begins a transaction record in `"in-progress"` state and returns its id.
    pub fn new_transaction(&self, new: &NewTransaction) -> Result<i64, Error> {
        self.conn.execute(
            "INSERT INTO trans (dt_begin, rpmdb_version, releasever, user_id, cmdline, comment, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![new.dt_begin, new.rpmdb_version, new.releasever, new.user_id, new.cmdline, new.comment, TransactionState::InProgress.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Inserts one transaction item row (§4.10 step 4).
    pub fn add_item(&self, trans_id: i64, name: &str, epoch: &str, version: &str, release: &str, arch: &str, repoid: &str, action: PackageAction, reason: Reason) -> Result<i64, Error> {
        self.conn.execute(
            "INSERT INTO trans_item (trans_id, name, epoch, version, release, arch, repoid, action, reason, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
            params![trans_id, name, epoch, version, release, arch, repoid, action_to_str(action), reason_to_str(reason)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks `item_id` as failed (§4.10 step 6).
    pub fn mark_item_failed(&self, item_id: i64) -> Result<(), Error> {
        self.conn.execute("UPDATE trans_item SET failed = 1 WHERE id = ?1", params![item_id])?;
        Ok(())
    }

    /// Closes a transaction record: sets `dt_end` and the terminal state
    /// (§4.10 steps 6-7).
    pub fn finish_transaction(&self, trans_id: i64, dt_end: i64, state: TransactionState) -> Result<(), Error> {
        let rows = self.conn.execute(
            "UPDATE trans SET dt_end = ?2, state = ?3 WHERE id = ?1",
            params![trans_id, dt_end, state.as_str()],
        )?;
        if rows == 0 {
            return Err(Error::NoOpenTransaction(trans_id));
        }
        Ok(())
    }

    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>, Error> {
        let mut sql = String::from(
            "SELECT DISTINCT t.id, t.dt_begin, t.dt_end, t.rpmdb_version, t.releasever, t.user_id, t.cmdline, t.comment, t.state
             FROM trans t",
        );
        let mut conditions = Vec::new();
        if filter.package_name.is_some() {
            sql.push_str(" JOIN trans_item i ON i.trans_id = t.id");
            conditions.push("i.name = ?".to_string());
        }
        if filter.since.is_some() {
            conditions.push("t.dt_begin >= ?".to_string());
        }
        if filter.until.is_some() {
            conditions.push("t.dt_begin <= ?".to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY t.dt_begin DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut bound: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(name) = &filter.package_name {
            bound.push(Box::new(name.clone()));
        }
        if let Some(since) = filter.since {
            bound.push(Box::new(since));
        }
        if let Some(until) = filter.until {
            bound.push(Box::new(until));
        }
        let params: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok(TransactionRecord {
                id: row.get(0)?,
                dt_begin: row.get(1)?,
                dt_end: row.get(2)?,
                rpmdb_version: row.get(3)?,
                releasever: row.get(4)?,
                user_id: row.get(5)?,
                cmdline: row.get(6)?,
                comment: row.get(7)?,
                state: TransactionState::parse(&row.get::<_, String>(8)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }

    pub fn items_for(&self, trans_id: i64) -> Result<Vec<TransactionItemRecord>, Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, trans_id, name, epoch, version, release, arch, repoid, action, reason, failed
             FROM trans_item WHERE trans_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![trans_id], |row| {
            Ok(TransactionItemRecord {
                id: row.get(0)?,
                trans_id: row.get(1)?,
                name: row.get(2)?,
                epoch: row.get(3)?,
                version: row.get(4)?,
                release: row.get(5)?,
                arch: row.get(6)?,
                repoid: row.get(7)?,
                action: action_from_str(&row.get::<_, String>(8)?),
                reason: reason_from_str(&row.get::<_, String>(9)?),
                failed: row.get::<_, i64>(10)? != 0,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Looks up the most recently recorded reason for one entity.
    pub fn get_item_reason(&self, entity: &Entity) -> Result<Option<Reason>, Error> {
        match entity {
            Entity::CompsGroup(id) => self.query_reason("SELECT reason FROM group_reason WHERE group_id = ?1", params![id]),
            Entity::CompsEnvironment(id) => self.query_reason("SELECT reason FROM env_reason WHERE env_id = ?1", params![id]),
            Entity::RpmPackage { name, arch } => {
                self.query_reason("SELECT reason FROM pkg_reason WHERE name = ?1 AND arch = ?2", params![name, arch])
            }
        }
    }

    fn query_reason(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<Reason>, Error> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(reason_from_str(&row.get::<_, String>(0)?))),
            None => Ok(None),
        }
    }

    /// Records a package's current reason, upserting the single row for
    /// `(name, arch)`.
    pub fn set_package_reason(&self, name: &str, arch: &str, reason: Reason) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO pkg_reason (name, arch, reason) VALUES (?1, ?2, ?3)
             ON CONFLICT(name, arch) DO UPDATE SET reason = excluded.reason",
            params![name, arch, reason_to_str(reason)],
        )?;
        Ok(())
    }

    pub fn set_group_reason(&self, group_id: &str, reason: Reason) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO group_reason (group_id, reason) VALUES (?1, ?2)
             ON CONFLICT(group_id) DO UPDATE SET reason = excluded.reason",
            params![group_id, reason_to_str(reason)],
        )?;
        Ok(())
    }

    pub fn set_environment_reason(&self, env_id: &str, reason: Reason) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO env_reason (env_id, reason) VALUES (?1, ?2)
             ON CONFLICT(env_id) DO UPDATE SET reason = excluded.reason",
            params![env_id, reason_to_str(reason)],
        )?;
        Ok(())
    }

    /// Preloads all three reason maps in one pass, for `sack.fill()`.
    pub fn preload_reason_cache(&self) -> Result<ReasonCache, Error> {
        let mut cache = ReasonCache::default();

        let mut groups = self.conn.prepare("SELECT group_id, reason FROM group_reason")?;
        let rows = groups.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, reason) = row?;
            cache.groups.insert(id, reason_from_str(&reason));
        }

        let mut envs = self.conn.prepare("SELECT env_id, reason FROM env_reason")?;
        let rows = envs.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, reason) = row?;
            cache.environments.insert(id, reason_from_str(&reason));
        }

        let mut pkgs = self.conn.prepare("SELECT name, arch, reason FROM pkg_reason")?;
        let rows = pkgs.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?;
        for row in rows {
            let (name, arch, reason) = row?;
            cache.packages.insert((name, arch), reason_from_str(&reason));
        }

        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_txn() -> NewTransaction {
        NewTransaction {
            dt_begin: 1000,
            rpmdb_version: "abc".to_string(),
            releasever: "42".to_string(),
            user_id: 0,
            cmdline: "pmcore install foo".to_string(),
            comment: None,
        }
    }

    #[test]
    fn new_transaction_starts_in_progress() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.new_transaction(&new_txn()).unwrap();
        let records = store.list_transactions(&TransactionFilter::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].state, TransactionState::InProgress);
    }

    #[test]
    fn finish_transaction_updates_state_and_end_time() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.new_transaction(&new_txn()).unwrap();
        store.finish_transaction(id, 2000, TransactionState::Done).unwrap();
        let records = store.list_transactions(&TransactionFilter::default()).unwrap();
        assert_eq!(records[0].state, TransactionState::Done);
        assert_eq!(records[0].dt_end, Some(2000));
    }

    #[test]
    fn filter_by_package_name_matches_only_transactions_with_that_item() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id1 = store.new_transaction(&new_txn()).unwrap();
        store.add_item(id1, "foo", "0", "1.0", "1", "x86_64", "test-repo", PackageAction::Install, Reason::User).unwrap();
        let id2 = store.new_transaction(&new_txn()).unwrap();
        store.add_item(id2, "bar", "0", "1.0", "1", "x86_64", "test-repo", PackageAction::Install, Reason::User).unwrap();

        let filter = TransactionFilter { package_name: Some("foo".to_string()), ..Default::default() };
        let records = store.list_transactions(&filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id1);
    }

    #[test]
    fn package_reason_round_trips_through_the_cache() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.set_package_reason("foo", "x86_64", Reason::Dependency).unwrap();
        let cache = store.preload_reason_cache().unwrap();
        assert_eq!(cache.get(&Entity::RpmPackage { name: "foo".to_string(), arch: "x86_64".to_string() }), Some(Reason::Dependency));
        assert_eq!(store.get_item_reason(&Entity::RpmPackage { name: "foo".to_string(), arch: "x86_64".to_string() }).unwrap(), Some(Reason::Dependency));
    }

    #[test]
    fn unknown_entity_reason_is_none() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert_eq!(store.get_item_reason(&Entity::CompsGroup("nope".to_string())).unwrap(), None);
    }
}
