//! Atomic, schema-versioned JSON persistence.
//!
//! Every logical slot is one file under the store's base directory. Files are
//! written as `{"payload": ..., "schemaVersion": N}` with sorted keys. Files
//! written before the envelope existed hold the bare payload and are upgraded
//! in place the first time they are read.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write temp file {path}: {source}")]
    WriteTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has schema version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub schema_version: u32,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(schema_version: u32, payload: T) -> Self {
        Self {
            schema_version,
            payload,
        }
    }
}

// The two shapes a slot file may hold on disk.
enum OnDisk<T> {
    Envelope(Envelope<T>),
    Legacy(T),
}

#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `base_dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let existed = base_dir.is_dir();
        // Fails for an existing non-directory, not just a missing parent.
        fs::create_dir_all(&base_dir).map_err(|source| StoreError::CreateDirectory {
            path: base_dir.clone(),
            source,
        })?;
        if !existed {
            log::debug!("created store directory {}", base_dir.display());
        }
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path(&self, slot: &str) -> PathBuf {
        self.base_dir.join(slot)
    }

    pub fn exists(&self, slot: &str) -> bool {
        self.path(slot).is_file()
    }

    /// Writes `envelope` to `slot` so readers only ever see the old or the new
    /// contents, never a partial file.
    pub fn write_atomic<T: Serialize>(&self, slot: &str, envelope: &Envelope<T>) -> Result<()> {
        let temp = self.write_temp(slot, envelope)?;
        self.swap_into_place(&temp, slot)
    }

    pub(crate) fn write_temp<T: Serialize>(
        &self,
        slot: &str,
        envelope: &Envelope<T>,
    ) -> Result<PathBuf> {
        let target = self.path(slot);
        let bytes = to_sorted_pretty_json(envelope).map_err(|source| StoreError::Serialize {
            path: target.clone(),
            source,
        })?;

        let suffix: u64 = rand::thread_rng().gen();
        let temp = self.base_dir.join(format!(".{}.tmp-{:016x}", slot, suffix));

        let written = File::create(&temp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(source) = written {
            remove_temp(&temp);
            return Err(StoreError::WriteTemp { path: temp, source });
        }
        Ok(temp)
    }

    pub(crate) fn swap_into_place(&self, temp: &Path, slot: &str) -> Result<()> {
        let target = self.path(slot);
        if let Err(source) = fs::rename(temp, &target) {
            remove_temp(temp);
            return Err(StoreError::Replace {
                path: target,
                source,
            });
        }
        if let Err(e) = sync_dir(&self.base_dir) {
            log::debug!("could not sync {}: {}", self.base_dir.display(), e);
        }
        log::debug!("wrote {}", target.display());
        Ok(())
    }

    /// Reads `slot` as an envelope, falling back to the bare legacy payload.
    /// A legacy file is rewritten as an envelope at `schema_version` before
    /// returning.
    pub fn read_envelope_or_legacy<T>(&self, slot: &str, schema_version: u32) -> Result<Envelope<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.path(slot);
        let bytes = fs::read(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;

        match decode::<T>(&bytes) {
            Ok(OnDisk::Envelope(envelope)) => {
                if envelope.schema_version > schema_version {
                    return Err(StoreError::UnsupportedVersion {
                        path,
                        found: envelope.schema_version,
                        supported: schema_version,
                    });
                }
                Ok(envelope)
            }
            Ok(OnDisk::Legacy(payload)) => {
                let envelope = Envelope::new(schema_version, payload);
                self.write_atomic(slot, &envelope)?;
                log::info!(
                    "migrated legacy {} to schema version {}",
                    path.display(),
                    schema_version
                );
                Ok(envelope)
            }
            Err(source) => Err(StoreError::Decode { path, source }),
        }
    }
}

// Envelope first, then the bare payload. When neither fits the envelope's
// error is the one reported.
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<OnDisk<T>> {
    match serde_json::from_slice::<Envelope<T>>(bytes) {
        Ok(envelope) => Ok(OnDisk::Envelope(envelope)),
        Err(envelope_err) => match serde_json::from_slice::<T>(bytes) {
            Ok(payload) => Ok(OnDisk::Legacy(payload)),
            Err(_) => Err(envelope_err),
        },
    }
}

// serde_json's default Map is ordered, so going through Value sorts keys.
fn to_sorted_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut bytes = serde_json::to_vec_pretty(&value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

// Makes a completed rename durable. Not every platform can open a directory,
// so callers treat failure as best effort.
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

fn remove_temp(temp: &Path) {
    if let Err(e) = fs::remove_file(temp) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("could not remove temp file {}: {}", temp.display(), e);
        }
    }
}
