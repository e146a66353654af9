// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::path_reduce::reduce_path;
use crate::world::World;

/// One storage tier, as this rank sees it. The real `StoreRegistry` also
/// carries a per-node communicator; that substrate is out of scope here, so
/// only the fields the builder actually reads are modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub path: String,
    pub enabled: bool,
}

/// A process-global, read-only table mapping a reduced store path to its
/// [`Store`]. Iteration and index assignment are in ascending path order so
/// `store_index` is stable and identical on every rank that was configured
/// with the same set of stores.
#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    stores: BTreeMap<String, Store>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, path: impl Into<String>, enabled: bool) -> Self {
        let path = reduce_path(&path.into());
        self.stores.insert(path.clone(), Store { path, enabled });
        self
    }

    /// Resolves a store path to its stable index, or `None` if unknown.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        let reduced = reduce_path(path);
        self.stores.keys().position(|k| *k == reduced)
    }

    /// Resolves `dir` to the store that contains it: the store whose
    /// reduced path equals `dir` or is one of its ancestors (§4.6). Ties
    /// (one store's path a prefix of another's) are broken toward the
    /// longest match.
    pub fn resolve_containing(&self, dir: &str) -> Option<usize> {
        let reduced = reduce_path(dir);
        self.stores
            .values()
            .enumerate()
            .filter(|(_, store)| reduced == store.path || reduced.starts_with(&format!("{}/", store.path)))
            .max_by_key(|(_, store)| store.path.len())
            .map(|(index, _)| index)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Store> {
        self.stores.values().nth(index)
    }
}

/// This rank's view of one failure-domain group: how many ranks share the
/// domain, and which world rank acts as its leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupInfo {
    pub size: usize,
    pub leader_rank: usize,
}

/// A process-global, read-only table mapping a failure-group name (`"NODE"`,
/// `"RACK"`, ...) to this rank's membership in it.
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    groups: BTreeMap<String, GroupInfo>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: impl Into<String>, info: GroupInfo) -> Self {
        self.groups.insert(name.into(), info);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<GroupInfo> {
        self.groups.get(name).copied()
    }
}

/// Global defaults used to fill in fields a descriptor's config subtree
/// leaves unset (§6 of the spec).
#[derive(Debug, Clone)]
pub struct Defaults {
    pub store: String,
    pub copy_type: String,
    pub group: String,
    pub set_size: u32,
    pub interval: i64,
}

/// The immutable, explicitly-passed handle every builder and pipeline
/// operation closes over instead of touching process-global state. One
/// `JobContext` is constructed per rank and shared read-only for the life of
/// the job.
pub struct JobContext {
    pub world: Arc<dyn World>,
    pub store_registry: StoreRegistry,
    pub group_registry: GroupRegistry,
    pub username: String,
    pub jobid: String,
    pub defaults: Defaults,
    /// Whether a CRC should be computed and persisted into the filemap for
    /// files encoded with a non-`Partner` copy type.
    pub crc_on_copy: bool,
}

impl JobContext {
    /// Derives `<store>/<username>/scr.<jobid>`, reduced, per §3.
    pub fn checkpoint_directory(&self, store_path: &str) -> String {
        reduce_path(&format!("{store_path}/{}/scr.{}", self.username, self.jobid))
    }
}
