// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! The erasure-library capability interface.
//!
//! `ErasureLib` is the opaque collaborator the spec calls out of scope: it
//! is the thing that actually splits/replicates/codes files across ranks.
//! This module only models the *shape* of that collaborator (the
//! create/add/dispatch/wait/free lifecycle) plus a `MockErasureLib`
//! reference implementation that replicates files by copy rather than doing
//! real erasure math, which is enough to exercise every code path in
//! [`crate::encode_pipeline`] and [`crate::decode_pipeline`] without
//! implementing the Non-goal.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::copy_scheme::CopyScheme;
use crate::error::RedsetError;

/// The direction an erasure set is driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Rebuild,
    Remove,
}

/// An opaque erasure-scheme handle. `RedDesc::erasure_scheme` holds
/// `Option<SchemeHandle>`, `None` standing in for the source's `-1`
/// sentinel for "unbuilt or freed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemeHandle(u64);

/// An opaque erasure-set handle, scoped to one `apply`/`recover`/`unapply`
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetHandle(u64);

/// The capability interface a real erasure library exposes. The core only
/// ever drives it through this trait, never assumes a concrete
/// implementation.
pub trait ErasureLib: Send + Sync {
    fn create_scheme(&self, copy_type: CopyScheme, world_size: usize) -> Result<SchemeHandle, RedsetError>;

    fn free_scheme(&self, scheme: SchemeHandle);

    /// Creates an erasure set bound to `prefix` in `direction`. `scheme` is
    /// required for `Encode` (the set needs to know how to split/replicate
    /// data being added); it is unused for `Rebuild`/`Remove`, since those
    /// directions recover everything they need from what was already
    /// persisted under `prefix` at encode time.
    fn create_set(
        &self,
        direction: Direction,
        prefix: &str,
        scheme: Option<SchemeHandle>,
    ) -> Result<SetHandle, RedsetError>;

    /// Adds a file (by absolute path) to an `Encode` set. Only meaningful
    /// for `Encode`; `Rebuild`/`Remove` sets are not added to.
    fn add(&self, set: SetHandle, path: &str) -> Result<(), RedsetError>;

    fn dispatch(&self, set: SetHandle) -> Result<(), RedsetError>;

    fn wait(&self, set: SetHandle) -> Result<(), RedsetError>;

    fn free(&self, set: SetHandle) -> Result<(), RedsetError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    original_path: String,
    backup_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    entries: Vec<ManifestEntry>,
}

struct SetState {
    direction: Direction,
    prefix: PathBuf,
    added: Vec<String>,
}

/// A filesystem-backed reference [`ErasureLib`]. It replicates added files
/// by copying them into a backup location under the set's prefix and
/// records a manifest; it does not compute real parity, matching the
/// Non-goal that the erasure math itself is out of scope.
#[derive(Default)]
pub struct MockErasureLib {
    next_id: AtomicU64,
    sets: Mutex<HashMap<u64, SetState>>,
}

impl MockErasureLib {
    pub fn new() -> Self {
        Self::default()
    }

    fn manifest_path(prefix: &Path) -> PathBuf {
        let mut p = prefix.as_os_str().to_owned();
        p.push(".manifest.json");
        PathBuf::from(p)
    }

    fn backup_dir(prefix: &Path) -> PathBuf {
        let mut p = prefix.as_os_str().to_owned();
        p.push(".files");
        PathBuf::from(p)
    }

    fn next_handle(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl ErasureLib for MockErasureLib {
    fn create_scheme(&self, _copy_type: CopyScheme, _world_size: usize) -> Result<SchemeHandle, RedsetError> {
        Ok(SchemeHandle(self.next_handle()))
    }

    fn free_scheme(&self, _scheme: SchemeHandle) {}

    fn create_set(
        &self,
        direction: Direction,
        prefix: &str,
        scheme: Option<SchemeHandle>,
    ) -> Result<SetHandle, RedsetError> {
        if direction == Direction::Encode && scheme.is_none() {
            return Err(RedsetError::SchemeBuildFailed {
                copy_type: "unknown".to_string(),
                reason: "encode set created without a scheme handle".to_string(),
            });
        }
        let prefix_path = PathBuf::from(prefix);
        if direction == Direction::Encode {
            if let Some(parent) = prefix_path.parent() {
                fs::create_dir_all(parent).map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
            }
        }
        let id = self.next_handle();
        self.sets.lock().unwrap().insert(
            id,
            SetState {
                direction,
                prefix: prefix_path,
                added: Vec::new(),
            },
        );
        Ok(SetHandle(id))
    }

    fn add(&self, set: SetHandle, path: &str) -> Result<(), RedsetError> {
        let mut sets = self.sets.lock().unwrap();
        let state = sets.get_mut(&set.0).ok_or_else(|| {
            RedsetError::FileInvalid {
                path: path.to_string(),
                reason: "erasure set does not exist".to_string(),
            }
        })?;
        if !Path::new(path).is_file() {
            return Err(RedsetError::FileInvalid {
                path: path.to_string(),
                reason: "file does not exist".to_string(),
            });
        }
        state.added.push(path.to_string());
        Ok(())
    }

    fn dispatch(&self, set: SetHandle) -> Result<(), RedsetError> {
        let (direction, prefix, added) = {
            let sets = self.sets.lock().unwrap();
            let state = sets
                .get(&set.0)
                .ok_or_else(|| RedsetError::EncodeFailed("unknown set".to_string()))?;
            (state.direction, state.prefix.clone(), state.added.clone())
        };
        match direction {
            Direction::Encode => {
                let backup_dir = Self::backup_dir(&prefix);
                fs::create_dir_all(&backup_dir).map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
                let mut manifest = Manifest::default();
                for (idx, original) in added.iter().enumerate() {
                    let backup_path = backup_dir.join(format!("{idx}.bak"));
                    fs::copy(original, &backup_path).map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
                    manifest.entries.push(ManifestEntry {
                        original_path: original.clone(),
                        backup_path: backup_path.to_string_lossy().into_owned(),
                    });
                }
                let json = serde_json::to_vec_pretty(&manifest)
                    .map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
                fs::write(Self::manifest_path(&prefix), json)
                    .map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
                Ok(())
            }
            Direction::Rebuild => {
                let manifest_path = Self::manifest_path(&prefix);
                let bytes = fs::read(&manifest_path).map_err(|e| RedsetError::RebuildFailed(e.to_string()))?;
                let manifest: Manifest =
                    serde_json::from_slice(&bytes).map_err(|e| RedsetError::RebuildFailed(e.to_string()))?;
                for entry in &manifest.entries {
                    if !Path::new(&entry.original_path).is_file() {
                        if let Some(parent) = Path::new(&entry.original_path).parent() {
                            fs::create_dir_all(parent).map_err(|e| RedsetError::RebuildFailed(e.to_string()))?;
                        }
                        fs::copy(&entry.backup_path, &entry.original_path)
                            .map_err(|e| RedsetError::RebuildFailed(e.to_string()))?;
                    }
                }
                Ok(())
            }
            Direction::Remove => {
                let _ = fs::remove_file(Self::manifest_path(&prefix));
                let _ = fs::remove_dir_all(Self::backup_dir(&prefix));
                Ok(())
            }
        }
    }

    fn wait(&self, set: SetHandle) -> Result<(), RedsetError> {
        if self.sets.lock().unwrap().contains_key(&set.0) {
            Ok(())
        } else {
            Err(RedsetError::EncodeFailed("unknown set".to_string()))
        }
    }

    fn free(&self, set: SetHandle) -> Result<(), RedsetError> {
        self.sets.lock().unwrap().remove(&set.0);
        Ok(())
    }
}
