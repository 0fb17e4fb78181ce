//! LMDB environment setup and schema versioning.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const MAX_DBS: u32 = 4;
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Owns the LMDB environment and every database handle.
///
/// Cloning is cheap; clones share the same environment.
#[derive(Clone)]
pub struct LmdbStore {
    pub(crate) env: Env,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    pub(crate) relations_db: Database<Bytes, Bytes>,
    pub(crate) keys_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create an LMDB environment at the given directory.
    ///
    /// A fresh environment is stamped with [`CURRENT_SCHEMA_VERSION`]; an
    /// environment written by a newer schema is refused.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process for this
        // directory and never mapped by another handle.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let accounts_db = env.create_database(&mut wtxn, Some("accounts"))?;
        let relations_db = env.create_database(&mut wtxn, Some("relations"))?;
        let keys_db = env.create_database(&mut wtxn, Some("keys"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let found = match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) if bytes.len() == 4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                u32::from_be_bytes(buf)
            }
            Some(_) => {
                return Err(LmdbError::Serialization(
                    "schema version record has the wrong length".into(),
                ))
            }
            None => 0,
        };
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found < CURRENT_SCHEMA_VERSION {
            tracing::info!(
                from = found,
                to = CURRENT_SCHEMA_VERSION,
                "stamping database schema version"
            );
            meta_db.put(
                &mut wtxn,
                SCHEMA_VERSION_KEY,
                &CURRENT_SCHEMA_VERSION.to_be_bytes(),
            )?;
        }
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env,
            accounts_db,
            relations_db,
            keys_db,
            meta_db,
        })
    }

    /// The schema version recorded in the environment.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let version = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)?
            .filter(|bytes| bytes.len() == 4)
            .map(|bytes| {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                u32::from_be_bytes(buf)
            })
            .unwrap_or(0);
        Ok(version)
    }

    pub(crate) fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match db.get(&rtxn, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_record<T: serde::Serialize>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
        record: &T,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        let mut wtxn = self.env.write_txn()?;
        db.put(&mut wtxn, key, &bytes)?;
        wtxn.commit()?;
        Ok(())
    }
}
