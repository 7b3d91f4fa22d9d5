//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before consensus starts
//! reading. Besides opening and counting every table, the check compares
//! the sizes of tables that must stay in lockstep: the column-group tables,
//! the single-valued indices and the two milestone tables.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env};

use crate::environment::{TangleTables, TANGLE_TABLES};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub transactions: u64,
    pub milestones: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check the Tangle environment.
///
/// Read failures and count mismatches are recorded in the report rather
/// than causing a hard error; only failing to begin the read transaction is
/// an error.
pub(crate) fn check_integrity(env: &Env, tables: &TangleTables) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.read_txn()?;

    for &db_name in TANGLE_TABLES {
        match env.open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    let mut count = |name: &str, db: Database<Bytes, Bytes>| match db.len(&rtxn) {
        Ok(count) => Some(count),
        Err(e) => {
            report
                .errors
                .push(format!("failed to count '{}': {}", name, e));
            None
        }
    };

    let transactions = count("tx_essence", tables.tx_essence);
    let lockstep = [
        ("tx_attachment", count("tx_attachment", tables.tx_attachment)),
        ("tx_data", count("tx_data", tables.tx_data)),
        ("tx_metadata", count("tx_metadata", tables.tx_metadata)),
    ]
    .into_iter()
    .chain(
        tables
            .single_valued_indices()
            .map(|(name, db)| (name, count(name, db))),
    )
    .collect::<Vec<_>>();
    let milestones = count("milestones", tables.milestones);
    let milestone_hashes = count("milestone_hashes", tables.milestone_hashes);

    if let Some(transactions) = transactions {
        report.transactions = transactions;
        for (name, entries) in lockstep {
            if let Some(entries) = entries.filter(|&n| n != transactions) {
                report.errors.push(format!(
                    "'{}' has {} entries for {} transactions",
                    name, entries, transactions
                ));
            }
        }
    }

    if let (Some(by_index), Some(by_hash)) = (milestones, milestone_hashes) {
        report.milestones = by_index;
        if by_index != by_hash {
            report.errors.push(format!(
                "{} milestones by index but {} by hash",
                by_index, by_hash
            ));
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent or empty) directory. Returns an
/// error if the directory holds files but `data.mdb` is missing, which
/// suggests corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(()); // Fresh start
    }
    let is_empty = path
        .read_dir()
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?
        .next()
        .is_none();
    if is_empty {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LmdbEnvironment, StorageConfig};
    use tangle_store::{Transaction, TransactionStore};
    use tangle_types::{Hash243, HASH_SIZE};

    #[test]
    fn check_data_dir_fresh_path() {
        let result = check_data_dir(Path::new("/tmp/tangle_test_nonexistent_12345"));
        assert!(result.is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stray"), b"x").unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn unhealthy_report() {
        let report = IntegrityReport {
            errors: vec!["corruption detected".to_string()],
            ..IntegrityReport::default()
        };
        assert!(!report.is_healthy());
    }

    #[test]
    fn populated_database_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(&StorageConfig::new(dir.path())).unwrap();
        let store = env.transaction_store();
        for n in 1..=3u8 {
            let mut tx = Transaction::default();
            tx.consensus.hash = Hash243::new([n; HASH_SIZE]);
            store.store(&tx).unwrap();
        }

        let report = env.check_integrity().unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.transactions, 3);
        assert_eq!(report.databases_checked as usize, TANGLE_TABLES.len());
    }

    #[test]
    fn orphaned_index_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(&StorageConfig::new(dir.path())).unwrap();
        let mut tx = Transaction::default();
        tx.consensus.hash = Hash243::new([9; HASH_SIZE]);
        env.transaction_store().store(&tx).unwrap();

        let mut wtxn = env.env().write_txn().unwrap();
        env.tables
            .tx_essence
            .delete(&mut wtxn, tx.hash().as_bytes().as_slice())
            .unwrap();
        wtxn.commit().unwrap();

        let report = env.check_integrity().unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.transactions, 0);
    }
}
