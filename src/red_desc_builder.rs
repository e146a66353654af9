// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! Collective construction of a [`RedDesc`] from one configuration subtree.
//!
//! Every public entry point here (`build`) must be called on every rank
//! with the same `config` and the same `index`, in the same position
//! relative to other collective calls, or the job deadlocks (§5). Nothing
//! in this module branches on rank-local state before reducing it.

use crate::collective::{all_true, broadcast_string};
use crate::context::JobContext;
use crate::copy_scheme::CopyScheme;
use crate::erasure::ErasureLib;
use crate::kvtree::KVTree;
use crate::path_reduce::reduce_path;
use crate::red_desc::RedDesc;
use crate::telemetry::warn_rank0;

/// Builds one [`RedDesc`] at table position `index` from `config`,
/// performing cross-rank validation and building the erasure scheme over
/// the failure-domain group, per §4.3.
///
/// Never panics and never returns a half-built descriptor: any local error
/// disables the descriptor on every rank, and the returned `RedDesc` is
/// always internally consistent (`usable()` agrees with `enabled`).
pub fn build(ctx: &JobContext, erasure_lib: &dyn ErasureLib, index: usize, config: &KVTree) -> RedDesc {
    let world = ctx.world.as_ref();
    let mut desc = RedDesc::zeroed(index);

    // Step 1: validate inputs locally, then agree globally. A `&KVTree` is
    // always a valid reference in Rust, so this is really exercising the
    // barrier itself rather than a meaningful local check — but the spec
    // requires every rank to pass through this collective before anything
    // else, so it stays.
    let locally_valid = !config_subtree_is_malformed(config);
    if !all_true(world, locally_valid) {
        warn_rank0(world, &format!("descriptor {index}: config invalid on at least one rank"));
        return desc;
    }

    // Step 2: tentatively enabled.
    desc.enabled = true;

    // Step 3: read fields with defaults.
    let interval = config
        .get_int("INTERVAL", ctx.defaults.interval)
        .unwrap_or(ctx.defaults.interval)
        .max(1);
    let output = config.get_bool("OUTPUT", false).unwrap_or(false);
    let store_token = config
        .get_str("STORE", &ctx.defaults.store)
        .unwrap_or_else(|_| ctx.defaults.store.clone());
    let type_token = config
        .get_str("TYPE", &ctx.defaults.copy_type)
        .unwrap_or_else(|_| ctx.defaults.copy_type.clone());
    let group_name = config
        .get_str("GROUP", &ctx.defaults.group)
        .unwrap_or_else(|_| ctx.defaults.group.clone());
    let set_size = config
        .get_int("SET_SIZE", ctx.defaults.set_size as i64)
        .unwrap_or(ctx.defaults.set_size as i64)
        .max(1) as u32;

    desc.interval = interval;
    desc.output = output;

    // Step 4: resolve store.
    let reduced_store = reduce_path(&store_token);
    match ctx.store_registry.resolve(&reduced_store) {
        Some(store_idx) => {
            desc.store_index = Some(store_idx);
            desc.store_name = reduced_store;
        }
        None => {
            warn_rank0(
                world,
                &format!("descriptor {index}: unknown store {reduced_store:?}, disabling"),
            );
            desc.enabled = false;
        }
    }

    // Step 5: derive directory.
    if desc.enabled {
        desc.directory = ctx.checkpoint_directory(&desc.store_name);
    }

    // Step 6: parse copy type.
    if desc.enabled {
        match CopyScheme::parse(&type_token, set_size) {
            Ok(copy_type) => desc.copy_type = copy_type,
            Err(_) => {
                warn_rank0(
                    world,
                    &format!("descriptor {index}: unknown copy type {type_token:?}, disabling"),
                );
                desc.enabled = false;
            }
        }
    }

    // Step 7: force Single for single-node jobs.
    if desc.enabled {
        if let Some(node_group) = ctx.group_registry.resolve("NODE") {
            if node_group.size == world.size() && desc.copy_type != CopyScheme::Single {
                warn_rank0(
                    world,
                    &format!(
                        "descriptor {index}: single-node job, forcing copy type {} -> SINGLE",
                        desc.copy_type
                    ),
                );
                desc.copy_type = CopyScheme::Single;
            }
        }
    }

    // Step 8: resolve failure group, then compute and broadcast the
    // failure-domain identifier: the group leader's world rank, decimal,
    // broadcast to every member of the group so all members agree on it.
    //
    // The broadcast itself runs unconditionally, on every rank, even one
    // whose `desc.enabled` already went false earlier: that flag is still
    // rank-local un-reduced state at this point (final consensus is step
    // 10), and §5 forbids gating a collective on it.
    let group_info = ctx.group_registry.resolve(&group_name);
    let local_payload = match group_info {
        Some(info) if world.rank() == info.leader_rank => Some(info.leader_rank.to_string()),
        _ => None,
    };
    let broadcast_root = group_info.map(|info| info.leader_rank).unwrap_or(0);
    desc.failure_domain_id = broadcast_string(world, local_payload.as_deref(), broadcast_root);

    if desc.enabled {
        match group_info {
            Some(_) => desc.failure_group = group_name,
            None => {
                warn_rank0(
                    world,
                    &format!("descriptor {index}: unknown failure group {group_name:?}, disabling"),
                );
                desc.enabled = false;
            }
        }
    }

    // Step 9: build the erasure scheme over the world communicator.
    if desc.enabled {
        match erasure_lib.create_scheme(desc.copy_type, world.size()) {
            Ok(handle) => desc.erasure_scheme = Some(handle),
            Err(e) => {
                warn_rank0(
                    world,
                    &format!("descriptor {index}: failed to build erasure scheme: {e}"),
                );
                desc.enabled = false;
            }
        }
    }

    // Step 10: global consensus. Every rank must call all_true here
    // regardless of its own local `enabled`, since the condition has
    // already been folded into `desc.enabled` above.
    desc.enabled = all_true(world, desc.enabled);

    // A descriptor that ends up disabled must not hold a live scheme
    // handle: free it so `usable()` and the `-1`-sentinel invariant agree.
    if !desc.enabled {
        if let Some(handle) = desc.erasure_scheme.take() {
            erasure_lib.free_scheme(handle);
        }
    }

    desc
}

fn config_subtree_is_malformed(_config: &KVTree) -> bool {
    false
}
