// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! The per-checkpoint file manifest a rank owns locally: which files belong
//! to this checkpoint, their size, an optional CRC, and whether the caller
//! has marked them complete.
//!
//! Modeled as a concrete in-memory struct backed by a real on-disk path for
//! its own serialized copy (so [`crate::encode_pipeline`] can add the
//! filemap to the erasure set the same way it adds any other file), rather
//! than implemented as the persisted store the spec calls out of scope —
//! only enough surface to drive the encode pipeline.

use std::fs;
use std::path::Path;

use crate::error::{RedsetError, RedsetResult};

/// One file owned by a checkpoint, as the filemap tracks it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub crc: Option<u32>,
    pub complete: bool,
}

/// The local rank's list of files for one checkpoint, plus the on-disk path
/// of the filemap's own serialized copy (itself a file the encode pipeline
/// must protect — §4.5 step 5).
#[derive(Debug, Clone, Default)]
pub struct Filemap {
    entries: Vec<FileEntry>,
    on_disk_path: String,
}

impl Filemap {
    pub fn new(on_disk_path: impl Into<String>) -> Self {
        Filemap {
            entries: Vec::new(),
            on_disk_path: on_disk_path.into(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<String>, size: u64, complete: bool) -> &mut Self {
        self.entries.push(FileEntry {
            path: path.into(),
            size,
            crc: None,
            complete,
        });
        self
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn on_disk_path(&self) -> &str {
        &self.on_disk_path
    }

    pub fn set_crc(&mut self, path: &str, crc: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.crc = Some(crc);
        }
    }

    pub fn crc_of(&self, path: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.path == path).and_then(|e| e.crc)
    }

    /// Persists the filemap's own listing to `on_disk_path`, so it exists as
    /// a real file the erasure set can add and later rebuild.
    pub fn persist(&self) -> RedsetResult<()> {
        let body = self
            .entries
            .iter()
            .map(|e| format!("{}\t{}\t{}", e.path, e.size, e.complete as u8))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(parent) = Path::new(&self.on_disk_path).parent() {
            fs::create_dir_all(parent).map_err(|e| RedsetError::EncodeFailed(e.to_string()))?;
        }
        fs::write(&self.on_disk_path, body).map_err(|e| RedsetError::EncodeFailed(e.to_string()))
    }
}
