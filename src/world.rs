// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! The collective substrate.
//!
//! `World` is the only way the core observes remote-rank state. Every method
//! on it is a global barrier: it must be called identically, by every rank,
//! in the same order, or the job deadlocks. Wiring a real implementation to
//! an MPI runtime is out of scope here (see the crate's Non-goals) — callers
//! supply their own `World` the way a production build would supply one
//! backed by `MPI_Allreduce`/`MPI_Bcast`.

/// Collective operations over the fixed set of ranks in a job.
pub trait World: Send + Sync {
    /// This rank's position in `0..size()`.
    fn rank(&self) -> usize;

    /// The number of ranks in the world.
    fn size(&self) -> usize;

    /// World-wide logical AND of `local`.
    fn all_true(&self, local: bool) -> bool;

    /// Leader (`root`) sets `local`; every rank, including the leader,
    /// returns the leader's value. `local` is ignored on non-root ranks.
    fn broadcast_string(&self, local: Option<&str>, root: usize) -> String;

    /// World-wide sum of `local`.
    fn reduce_sum_double(&self, local: f64) -> f64;

    /// A pure synchronization point with no data exchange. Implied by the
    /// other collectives but occasionally needed on its own (e.g. between
    /// pipeline stages in a multi-rank test).
    fn barrier(&self);
}
