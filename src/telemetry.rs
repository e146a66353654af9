// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rank-0-only structured logging, standing in for the teacher's dedicated
//! `telemetry-subscribers` crate: here it is just an `EnvFilter` + fmt
//! subscriber behind a single `init_tracing()` call, since the core itself
//! only needs the initialization entry point, not a published crate.

use crate::world::World;

/// Installs a process-wide `tracing` subscriber reading `RUST_LOG` (default
/// `info`). Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Emits `msg` as a `tracing::warn!` exactly once, on rank 0 only, to avoid
/// the quadratic log volume of every rank printing the same warning (§7).
pub fn warn_rank0(world: &dyn World, msg: &str) {
    if world.rank() == 0 {
        tracing::warn!("{msg}");
    }
}

/// Emits `msg` as a `tracing::info!`, rank 0 only.
pub fn info_rank0(world: &dyn World, msg: &str) {
    if world.rank() == 0 {
        tracing::info!("{msg}");
    }
}

/// A single logged transfer record, per §6: `"COPY"`, the store base, the
/// target directory, the checkpoint id, an epoch-second start timestamp,
/// duration in seconds, and bytes transferred.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLogEntry {
    pub operation: &'static str,
    pub store: String,
    pub directory: String,
    pub checkpoint_id: i64,
    pub start_epoch_secs: u64,
    pub duration_secs: f64,
    pub bytes: f64,
}

impl TransferLogEntry {
    pub fn copy(
        store: impl Into<String>,
        directory: impl Into<String>,
        checkpoint_id: i64,
        start_epoch_secs: u64,
        duration_secs: f64,
        bytes: f64,
    ) -> Self {
        TransferLogEntry {
            operation: "COPY",
            store: store.into(),
            directory: directory.into(),
            checkpoint_id,
            start_epoch_secs,
            duration_secs,
            bytes,
        }
    }
}

/// Logs `entry` as a single structured rank-0 record, plus the
/// elapsed/bytes/throughput summary line the spec requires in §4.5 step 11.
pub fn log_transfer(world: &dyn World, entry: &TransferLogEntry, per_rank_mb_s: f64) {
    if world.rank() != 0 {
        return;
    }
    let aggregate_mb_s = if entry.duration_secs > 0.0 {
        entry.bytes / (1024.0 * 1024.0) / entry.duration_secs
    } else {
        0.0
    };
    tracing::info!(
        operation = entry.operation,
        store = %entry.store,
        directory = %entry.directory,
        checkpoint_id = entry.checkpoint_id,
        duration_secs = entry.duration_secs,
        bytes = entry.bytes,
        aggregate_mb_s,
        per_rank_mb_s,
        "redundancy transfer complete"
    );
}
