// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error taxonomy for the redundancy-descriptor core.
///
/// Every fallible step in the builder and the pipelines returns one of these
/// variants. Local errors are never panics: they are recorded here, reduced
/// with [`crate::collective::all_true`], and only then acted upon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedsetError {
    #[error("config subtree invalid: {0}")]
    ConfigInvalid(String),

    #[error("unknown store {store:?}")]
    UnknownStore { store: String },

    #[error("unknown copy type {0:?}")]
    UnknownCopyType(String),

    #[error("unknown failure group {group:?}")]
    UnknownGroup { group: String },

    #[error("failed to build erasure scheme for copy type {copy_type}: {reason}")]
    SchemeBuildFailed { copy_type: String, reason: String },

    #[error("file {path} invalid: {reason}")]
    FileInvalid { path: String, reason: String },

    #[error("encode failed: {0}")]
    EncodeFailed(String),

    #[error("rebuild failed: {0}")]
    RebuildFailed(String),

    #[error("remove failed: {0}")]
    RemoveFailed(String),

    #[error("operation disabled by cross-rank consensus")]
    ConsensusFailure,
}

pub type RedsetResult<T> = Result<T, RedsetError>;
