// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! The ordered collection of [`RedDesc`]s built from a job's redundancy
//! configuration, plus checkpoint-id selection.

use std::sync::Arc;

use crate::context::JobContext;
use crate::erasure::ErasureLib;
use crate::kvtree::KVTree;
use crate::red_desc::RedDesc;
use crate::red_desc_builder;

/// All descriptors built from one job's redundancy configuration, in
/// ascending key order (§4.4: identical on every rank given identical
/// config).
///
/// Owns the `ErasureLib` handle so it can free every descriptor's erasure
/// scheme on `Drop` — the concrete form the spec's "teardown is expressed
/// as `Drop`" design note takes here, since the scheme handle's owner
/// (`ErasureLib`) is supplied externally rather than stored per-descriptor.
pub struct RedDescTable {
    descs: Vec<RedDesc>,
    erasure_lib: Arc<dyn ErasureLib>,
}

impl RedDescTable {
    /// Builds a table by walking `config`'s named subtrees in ascending key
    /// order, calling [`red_desc_builder::build`] with sequential indices.
    /// Must be called identically (same `config`) on every rank.
    pub fn build(ctx: &JobContext, erasure_lib: Arc<dyn ErasureLib>, config: &KVTree) -> RedDescTable {
        let descs = config
            .subtrees()
            .enumerate()
            .map(|(index, (_name, subtree))| red_desc_builder::build(ctx, erasure_lib.as_ref(), index, subtree))
            .collect();
        RedDescTable { descs, erasure_lib }
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Whether construction failed for at least one descriptor in the table
    /// (§4.4: "if any construction fails, the whole table build reports
    /// failure"). A disabled descriptor stays in the table — callers that
    /// only care about usable ones should go through `select`/`iter` — but
    /// this is the single signal for "did everything build cleanly".
    pub fn build_failed(&self) -> bool {
        self.descs.iter().any(|desc| !desc.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedDesc> {
        self.descs.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RedDesc> {
        self.descs.get(index)
    }

    /// Selects the enabled descriptor with the largest `interval` dividing
    /// `id`, first-in-table on ties (§4.4). `None` if no descriptor
    /// qualifies.
    pub fn select(&self, id: i64) -> Option<&RedDesc> {
        let mut best: Option<&RedDesc> = None;
        for desc in &self.descs {
            if !desc.eligible_for(id) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => desc.interval > current.interval,
            };
            if better {
                best = Some(desc);
            }
        }
        best
    }
}

impl Drop for RedDescTable {
    fn drop(&mut self) {
        for desc in self.descs.drain(..) {
            if let Some(handle) = desc.erasure_scheme {
                self.erasure_lib.free_scheme(handle);
            }
        }
    }
}
