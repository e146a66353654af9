// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! The three collective primitives the core is allowed to use to observe
//! remote-rank state. Thin wrappers over [`World`], kept as free functions
//! so call sites read the way the algorithm in the spec is written
//! (`all_true(valid)`, not `world.all_true(valid)`).

use crate::world::World;

/// World-wide logical AND of `local`.
pub fn all_true(world: &dyn World, local: bool) -> bool {
    world.all_true(local)
}

/// Leader (`root`) broadcasts `local` to every rank; all ranks, including the
/// leader, return the broadcast value.
pub fn broadcast_string(world: &dyn World, local: Option<&str>, root: usize) -> String {
    world.broadcast_string(local, root)
}

/// World-wide sum of `local`.
pub fn reduce_sum_double(world: &dyn World, local: f64) -> f64 {
    world.reduce_sum_double(local)
}
