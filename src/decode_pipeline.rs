// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! `recover` and `unapply`: drive the erasure library in REBUILD and REMOVE
//! directions over a discovered hidden directory, without consulting a
//! filemap (§4.6) — which is what makes them usable during restart, before
//! a filemap has been loaded.

use crate::collective::all_true;
use crate::context::JobContext;
use crate::erasure::{Direction, ErasureLib};
use crate::error::{RedsetError, RedsetResult};
use crate::path_reduce::reduce_path;

fn reddesc_prefix(dir: &str) -> String {
    reduce_path(&format!("{dir}/reddesc"))
}

fn run_direction(ctx: &JobContext, erasure_lib: &dyn ErasureLib, dir: &str, direction: Direction) -> RedsetResult<()> {
    let world = ctx.world.as_ref();

    // Resolve `dir` against the known stores before anything else (§4.6):
    // this is what lets `recover`/`unapply` be called with nothing but a
    // directory, before a filemap (which would otherwise carry `store_index`)
    // has been loaded.
    let store_index = ctx.store_registry.resolve_containing(dir);
    if !all_true(world, store_index.is_some()) {
        return Err(RedsetError::UnknownStore { store: dir.to_string() });
    }

    let prefix = reddesc_prefix(dir);

    // Erasure-set creation is itself a barrier point (§5): a rank-local
    // failure here must be folded into the collective before anyone
    // branches on it, not returned early via `?`.
    let set_result = erasure_lib.create_set(direction, &prefix, None);
    if !all_true(world, set_result.is_ok()) {
        if let Ok(set) = set_result {
            let _ = erasure_lib.free(set);
        }
        return Err(match direction {
            Direction::Rebuild => RedsetError::RebuildFailed(format!("failed to create erasure set on at least one rank for {dir}")),
            Direction::Remove => RedsetError::RemoveFailed(format!("failed to create erasure set on at least one rank for {dir}")),
            Direction::Encode => unreachable!("run_direction is never called with Direction::Encode"),
        });
    }
    let set = match set_result {
        Ok(set) => set,
        Err(_) => unreachable!("all_true confirmed create_set succeeded on every rank"),
    };

    let mut local_success = erasure_lib.dispatch(set).is_ok();
    if local_success {
        local_success = erasure_lib.wait(set).is_ok();
    }
    let _ = erasure_lib.free(set);

    if all_true(world, local_success) {
        Ok(())
    } else {
        Err(match direction {
            Direction::Rebuild => RedsetError::RebuildFailed(format!("rebuild failed on at least one rank for {dir}")),
            Direction::Remove => RedsetError::RemoveFailed(format!("remove failed on at least one rank for {dir}")),
            Direction::Encode => unreachable!("run_direction is never called with Direction::Encode"),
        })
    }
}

/// Rebuilds whatever is missing under `dir` from the redundancy artifacts
/// persisted there. Must be called identically on every rank.
pub fn recover(ctx: &JobContext, erasure_lib: &dyn ErasureLib, dir: &str) -> RedsetResult<()> {
    run_direction(ctx, erasure_lib, dir, Direction::Rebuild)
}

/// Deletes the redundancy artifacts persisted under `dir`. Must be called
/// identically on every rank.
pub fn unapply(ctx: &JobContext, erasure_lib: &dyn ErasureLib, dir: &str) -> RedsetResult<()> {
    run_direction(ctx, erasure_lib, dir, Direction::Remove)
}
