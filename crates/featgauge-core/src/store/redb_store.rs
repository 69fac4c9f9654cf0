//! # redb-backed Report Storage
//!
//! A disk-backed report store using the redb embedded database.
//!
//! One table, `reports`: node name -> postcard-encoded `Report`.
//! Each write is its own ACID transaction, so a crash never leaves a
//! half-written report behind.

use super::{ReportSource, ReportStore};
use crate::validation::ReportValidator;
use crate::{GaugeError, NodeName, Report};
use redb::{
    Database, DatabaseError, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};
use std::path::Path;

/// Table for reports: node name -> serialized Report bytes
const REPORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");

fn io(e: impl std::fmt::Display) -> GaugeError {
    GaugeError::IoError(e.to_string())
}

fn read_failed(e: impl std::fmt::Display) -> GaugeError {
    GaugeError::ReadFailed(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<Report, GaugeError> {
    postcard::from_bytes(bytes).map_err(|e| GaugeError::SerializationError(e.to_string()))
}

/// A disk-backed report store using redb.
pub struct RedbReportStore {
    db: Database,
}

impl std::fmt::Debug for RedbReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbReportStore").finish_non_exhaustive()
    }
}

impl RedbReportStore {
    /// Open or create a report database at the given path.
    ///
    /// # Errors
    /// `GaugeError::StoreLocked` if another process (typically a running
    /// server) holds the database; `GaugeError::IoError` otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GaugeError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => GaugeError::StoreLocked(path.display().to_string()),
            other => io(other),
        })?;

        // Initialize the table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(REPORTS).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }
}

impl ReportSource for RedbReportStore {
    fn list_reports(&self) -> Result<Vec<Report>, GaugeError> {
        let read_txn = self.db.begin_read().map_err(read_failed)?;
        let table = read_txn.open_table(REPORTS).map_err(read_failed)?;

        let mut reports = Vec::new();
        for entry in table.iter().map_err(read_failed)? {
            let (_, value) = entry.map_err(read_failed)?;
            reports.push(decode(value.value())?);
        }
        Ok(reports)
    }
}

impl ReportStore for RedbReportStore {
    fn get_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(REPORTS).map_err(io)?;
        match table.get(node.as_str()).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn upsert_report(&self, report: Report) -> Result<Option<Report>, GaugeError> {
        ReportValidator::validate(&report)?;
        let bytes = postcard::to_allocvec(&report)
            .map_err(|e| GaugeError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(io)?;
        let previous = {
            let mut table = write_txn.open_table(REPORTS).map_err(io)?;
            let old = table
                .insert(report.node.as_str(), bytes.as_slice())
                .map_err(io)?;
            match old {
                Some(value) => Some(decode(value.value())?),
                None => None,
            }
        };
        write_txn.commit().map_err(io)?;
        Ok(previous)
    }

    fn remove_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let removed = {
            let mut table = write_txn.open_table(REPORTS).map_err(io)?;
            let old = table.remove(node.as_str()).map_err(io)?;
            match old {
                Some(value) => Some(decode(value.value())?),
                None => None,
            }
        };
        write_txn.commit().map_err(io)?;
        Ok(removed)
    }

    fn report_count(&self) -> Result<usize, GaugeError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(REPORTS).map_err(io)?;
        let len = table.len().map_err(io)?;
        Ok(len as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let store = RedbReportStore::open(temp.path().join("reports.redb")).expect("open db");

        let previous = store
            .upsert_report(Report::from_strs("node1", &["ipv6", "bond"]))
            .expect("upsert");
        assert!(previous.is_none());

        let fetched = store.get_report(&NodeName::new("node1")).expect("get");
        assert_eq!(fetched, Some(Report::from_strs("node1", &["ipv6", "bond"])));
        assert_eq!(store.report_count().expect("count"), 1);
    }

    #[test]
    fn second_open_reports_lock() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("reports.redb");
        let _held = RedbReportStore::open(&path).expect("open db");

        let result = RedbReportStore::open(&path);
        assert!(matches!(result, Err(GaugeError::StoreLocked(_))));
    }

    #[test]
    fn upsert_returns_replaced_report() {
        let temp = tempdir().expect("temp dir");
        let store = RedbReportStore::open(temp.path().join("reports.redb")).expect("open db");

        store
            .upsert_report(Report::from_strs("node1", &["ipv6"]))
            .expect("upsert");
        let previous = store
            .upsert_report(Report::from_strs("node1", &["bond"]))
            .expect("upsert");

        assert_eq!(previous, Some(Report::from_strs("node1", &["ipv6"])));
        assert_eq!(store.report_count().expect("count"), 1);
    }

    #[test]
    fn invalid_report_is_not_written() {
        let temp = tempdir().expect("temp dir");
        let store = RedbReportStore::open(temp.path().join("reports.redb")).expect("open db");

        let result = store.upsert_report(Report::from_strs("", &["ipv6"]));

        assert!(matches!(result, Err(GaugeError::InvalidReport(_))));
        assert_eq!(store.report_count().expect("count"), 0);
    }

    #[test]
    fn remove_report() {
        let temp = tempdir().expect("temp dir");
        let store = RedbReportStore::open(temp.path().join("reports.redb")).expect("open db");
        store
            .upsert_report(Report::from_strs("node1", &["ipv6"]))
            .expect("upsert");

        let removed = store.remove_report(&NodeName::new("node1")).expect("remove");
        assert_eq!(removed, Some(Report::from_strs("node1", &["ipv6"])));
        assert!(store
            .remove_report(&NodeName::new("node1"))
            .expect("remove")
            .is_none());
        assert!(store.list_reports().expect("list").is_empty());
    }

    #[test]
    fn persistence() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("reports.redb");

        // Create and populate
        {
            let store = RedbReportStore::open(&db_path).expect("open db");
            store
                .upsert_report(Report::from_strs("node2", &["vrf"]))
                .expect("upsert");
            store
                .upsert_report(Report::from_strs("node1", &["lldp", "vrf"]))
                .expect("upsert");
        }

        // Reopen and verify
        {
            let store = RedbReportStore::open(&db_path).expect("reopen db");
            let reports = store.list_reports().expect("list");
            assert_eq!(
                reports,
                vec![
                    Report::from_strs("node1", &["lldp", "vrf"]),
                    Report::from_strs("node2", &["vrf"]),
                ]
            );
        }
    }
}
