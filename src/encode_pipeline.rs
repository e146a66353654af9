// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! `apply`: wraps a [`Filemap`]'s files plus the filemap itself into an
//! erasure set, validates locally, barriers globally, dispatches, and
//! reports bytes transferred (§4.5).

use std::fs;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::collective::{all_true, reduce_sum_double};
use crate::context::JobContext;
use crate::copy_scheme::CopyScheme;
use crate::erasure::{Direction, ErasureLib};
use crate::error::{RedsetError, RedsetResult};
use crate::filemap::Filemap;
use crate::path_reduce::reduce_path;
use crate::red_desc::RedDesc;
use crate::telemetry::{log_transfer, TransferLogEntry};

/// Derives `<desc.directory>/.redset/<id>`, path-reduced: the per-checkpoint
/// hidden cache directory under the store's per-job root (GLOSSARY: Hidden
/// cache directory).
pub fn hidden_directory(desc: &RedDesc, id: i64) -> String {
    reduce_path(&format!("{}/.redset/{id}", desc.directory))
}

/// Encodes `filemap`'s files (plus the filemap itself) into a redundant
/// representation under `desc`'s hidden cache directory for checkpoint
/// `id`. Must be called identically, with the same `id`, on every rank.
///
/// Returns the world-wide bytes transferred on success. On any failure, no
/// rank has called `Dispatch` (§8 Encode atomicity) and the erasure set has
/// already been freed.
pub fn apply(
    ctx: &JobContext,
    erasure_lib: &dyn ErasureLib,
    desc: &RedDesc,
    id: i64,
    filemap: &mut Filemap,
) -> RedsetResult<f64> {
    let world = ctx.world.as_ref();

    let hidden_dir = hidden_directory(desc, id);
    let prefix = reduce_path(&format!("{hidden_dir}/reddesc"));

    // Erasure-set creation is itself a barrier point (§5): a rank-local
    // failure here must be folded into the collective before anyone
    // branches on it, not returned early via `?`.
    let set_result = erasure_lib.create_set(Direction::Encode, &prefix, desc.erasure_scheme);
    if !all_true(world, set_result.is_ok()) {
        if let Ok(set) = set_result {
            let _ = erasure_lib.free(set);
        }
        return Err(RedsetError::ConsensusFailure);
    }
    let set = match set_result {
        Ok(set) => set,
        Err(_) => unreachable!("all_true confirmed create_set succeeded on every rank"),
    };

    let mut local_valid = true;
    let mut local_bytes = 0.0_f64;

    for entry in filemap.files().cloned().collect::<Vec<_>>() {
        if !entry.complete {
            local_valid = false;
            continue;
        }
        if erasure_lib.add(set, &entry.path).is_err() {
            local_valid = false;
            continue;
        }
        local_bytes += entry.size as f64;

        if ctx.crc_on_copy && desc.copy_type != CopyScheme::Partner {
            match compute_crc32(&entry.path) {
                Ok(crc) => filemap.set_crc(&entry.path, crc),
                Err(_) => local_valid = false,
            }
        }
    }

    // Protect the filemap itself (§4.5 step 5). Only the enumerated files'
    // sizes count toward bytes_transferred; the filemap's own on-disk size
    // does not (§8 Byte-accounting property).
    if filemap.persist().is_err() || erasure_lib.add(set, filemap.on_disk_path()).is_err() {
        local_valid = false;
    }

    if !all_true(world, local_valid) {
        let _ = erasure_lib.free(set);
        return Err(RedsetError::ConsensusFailure);
    }

    let start = Instant::now();
    let start_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut local_success = erasure_lib.dispatch(set).is_ok();
    if local_success {
        local_success = erasure_lib.wait(set).is_ok();
    }
    let _ = erasure_lib.free(set);

    if !all_true(world, local_success) {
        return Err(RedsetError::EncodeFailed("dispatch failed on at least one rank".to_string()));
    }

    let bytes_transferred = reduce_sum_double(world, local_bytes);
    let duration_secs = start.elapsed().as_secs_f64();
    let per_rank_mb_s = if duration_secs > 0.0 {
        local_bytes / (1024.0 * 1024.0) / duration_secs
    } else {
        0.0
    };

    let entry = TransferLogEntry::copy(
        &desc.store_name,
        &hidden_dir,
        id,
        start_epoch,
        duration_secs,
        bytes_transferred,
    );
    log_transfer(world, &entry, per_rank_mb_s);

    Ok(bytes_transferred)
}

fn compute_crc32(path: &str) -> RedsetResult<u32> {
    let bytes = fs::read(path).map_err(|e| RedsetError::FileInvalid {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(crc32fast::hash(&bytes))
}
