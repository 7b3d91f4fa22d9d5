//! LMDB environment setup.
//!
//! The Tangle database is one environment holding every table below. Each
//! logical store is a cheap handle over the shared `Arc<Env>` and the table
//! handles it needs; multi-table writes happen inside one write transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RwTxn};
use tracing::{info, warn};

use tangle_store::{StoreError, TransactionStore};
use tangle_types::{Clock, SystemClock};

use crate::integrity::{check_data_dir, check_integrity, IntegrityReport};
use crate::meta::LmdbMetaStore;
use crate::migration::check_schema_version;
use crate::milestone::LmdbMilestoneStore;
use crate::state_delta::LmdbStateDeltaStore;
use crate::transaction::LmdbTransactionStore;
use crate::write_batch::TransactionBatch;
use crate::{LmdbError, StorageConfig};

/// Names of every table of the Tangle environment.
pub(crate) const TANGLE_TABLES: &[&str] = &[
    "tx_essence",
    "tx_attachment",
    "tx_data",
    "tx_metadata",
    "idx_address",
    "idx_bundle",
    "idx_tag",
    "idx_obsolete_tag",
    "idx_approvee",
    "milestones",
    "milestone_hashes",
    "state_deltas",
    "meta",
];

const STORE_KIND_KEY: &str = "store_kind";
const TANGLE_STORE_KIND: &[u8] = b"tangle";

/// Handles of every table of the Tangle environment.
///
/// - `tx_*`: `tx_hash` → column group. Essence, attachment and metadata are
///   bincode records, data is the raw fragment. The consensus group is the
///   key itself.
/// - `idx_*`: `value ++ tx_hash` → empty (see [`crate::index`]).
/// - `milestones`: `index_be` → hash; `milestone_hashes`: hash → `index_be`.
/// - `state_deltas`: `index_be` → bincode delta.
#[derive(Clone, Copy)]
pub(crate) struct TangleTables {
    pub tx_essence: Database<Bytes, Bytes>,
    pub tx_attachment: Database<Bytes, Bytes>,
    pub tx_data: Database<Bytes, Bytes>,
    pub tx_metadata: Database<Bytes, Bytes>,
    pub idx_address: Database<Bytes, Bytes>,
    pub idx_bundle: Database<Bytes, Bytes>,
    pub idx_tag: Database<Bytes, Bytes>,
    pub idx_obsolete_tag: Database<Bytes, Bytes>,
    pub idx_approvee: Database<Bytes, Bytes>,
    pub milestones: Database<Bytes, Bytes>,
    pub milestone_hashes: Database<Bytes, Bytes>,
    pub state_deltas: Database<Bytes, Bytes>,
    pub meta: Database<Bytes, Bytes>,
}

impl TangleTables {
    fn create(env: &Env, wtxn: &mut RwTxn) -> Result<Self, LmdbError> {
        let mut open = |name: &str| -> Result<Database<Bytes, Bytes>, LmdbError> {
            Ok(env.create_database(wtxn, Some(name))?)
        };
        Ok(Self {
            tx_essence: open("tx_essence")?,
            tx_attachment: open("tx_attachment")?,
            tx_data: open("tx_data")?,
            tx_metadata: open("tx_metadata")?,
            idx_address: open("idx_address")?,
            idx_bundle: open("idx_bundle")?,
            idx_tag: open("idx_tag")?,
            idx_obsolete_tag: open("idx_obsolete_tag")?,
            idx_approvee: open("idx_approvee")?,
            milestones: open("milestones")?,
            milestone_hashes: open("milestone_hashes")?,
            state_deltas: open("state_deltas")?,
            meta: open("meta")?,
        })
    }

    /// The secondary indices holding exactly one entry per transaction.
    pub fn single_valued_indices(&self) -> [(&'static str, Database<Bytes, Bytes>); 4] {
        [
            ("idx_address", self.idx_address),
            ("idx_bundle", self.idx_bundle),
            ("idx_tag", self.idx_tag),
            ("idx_obsolete_tag", self.idx_obsolete_tag),
        ]
    }
}

/// Open (creating if needed) an LMDB environment at `path`.
pub(crate) fn open_env(
    path: &Path,
    map_size: usize,
    max_dbs: u32,
    max_readers: u32,
) -> Result<Env, LmdbError> {
    std::fs::create_dir_all(path)?;
    // SAFETY: heed hands back the already opened `Env` when this process opens
    // the same path again, and the memory map is only accessed through heed.
    let env = unsafe {
        EnvOpenOptions::new()
            .map_size(map_size)
            .max_dbs(max_dbs)
            .max_readers(max_readers)
            .open(path)?
    };
    Ok(env)
}

/// The Tangle environment: transactions, milestones and state deltas.
///
/// Cloning is cheap and yields another handle to the same environment.
#[derive(Clone)]
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) tables: TangleTables,
    clock: Arc<dyn Clock>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create the Tangle environment described by `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, LmdbError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`LmdbEnvironment::open`], taking arrival timestamps from `clock`.
    pub fn open_with_clock(
        config: &StorageConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LmdbError> {
        config.validate()?;
        check_data_dir(&config.db_path).map_err(LmdbError::Corruption)?;

        let env = open_env(
            &config.db_path,
            config.map_size,
            TANGLE_TABLES.len() as u32,
            config.max_readers,
        )?;

        let mut wtxn = env.write_txn()?;
        let tables = TangleTables::create(&env, &mut wtxn)?;
        let kind = tables
            .meta
            .get(&wtxn, STORE_KIND_KEY.as_bytes())?
            .map(<[u8]>::to_vec);
        match kind.as_deref() {
            None => tables
                .meta
                .put(&mut wtxn, STORE_KIND_KEY.as_bytes(), TANGLE_STORE_KIND)?,
            Some(kind) if kind == TANGLE_STORE_KIND => {}
            Some(kind) => {
                return Err(LmdbError::Corruption(format!(
                    "{} holds a '{}' database, not a Tangle database",
                    config.db_path.display(),
                    String::from_utf8_lossy(kind)
                )))
            }
        }
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            tables,
            clock,
            path: config.db_path.clone(),
        };

        check_schema_version(&environment.meta_store())?;

        if config.run_integrity_check {
            let report = environment.check_integrity()?;
            if !report.is_healthy() {
                for problem in &report.errors {
                    warn!(path = %environment.path.display(), problem = %problem, "integrity check failed");
                }
            }
        }

        let transactions = environment.transaction_store().count().map_err(LmdbError::from)?;
        info!(
            path = %environment.path.display(),
            transactions,
            "tangle database opened"
        );
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    pub fn transaction_store(&self) -> LmdbTransactionStore {
        LmdbTransactionStore {
            env: Arc::clone(&self.env),
            tables: self.tables,
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn milestone_store(&self) -> LmdbMilestoneStore {
        LmdbMilestoneStore {
            env: Arc::clone(&self.env),
            milestones_db: self.tables.milestones,
            milestone_hashes_db: self.tables.milestone_hashes,
        }
    }

    pub fn state_delta_store(&self) -> LmdbStateDeltaStore {
        LmdbStateDeltaStore {
            env: Arc::clone(&self.env),
            state_deltas_db: self.tables.state_deltas,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.tables.meta,
        }
    }

    /// Begin a batch of transaction writes committed atomically.
    ///
    /// The batch holds the store-wide writer lock while it is open: writers on
    /// other threads block until it commits or drops, readers do not. Keep it
    /// short-lived, and never open a second batch or write through a store
    /// handle on the same thread while one is open.
    pub fn write_batch(&self) -> Result<TransactionBatch<'_>, StoreError> {
        TransactionBatch::new(self.env(), self.tables, self.clock.as_ref())
    }

    /// Count every table and cross-check index sizes.
    pub fn check_integrity(&self) -> Result<IntegrityReport, LmdbError> {
        check_integrity(self.env(), &self.tables)
    }

    /// Flush the environment to disk. The environment itself closes when
    /// the last handle is dropped.
    pub fn close(self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        info!(path = %self.path.display(), "tangle database closed");
        Ok(())
    }
}

impl std::fmt::Debug for LmdbEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbEnvironment")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
