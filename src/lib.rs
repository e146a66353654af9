// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! Collective redundancy-descriptor core for a checkpoint/restart runtime.
//!
//! Parses a job's redundancy configuration into [`RedDesc`] descriptors via
//! [`red_desc_builder`], organizes them into a [`RedDescTable`] keyed by
//! checkpoint id, and drives the encode/decode/remove lifecycle
//! ([`encode_pipeline::apply`], [`decode_pipeline::recover`],
//! [`decode_pipeline::unapply`]) across a fixed set of cooperating ranks
//! through the [`World`](world::World) collective substrate.
//!
//! Every public entry point that touches `World` is collective: it must be
//! called identically, in the same relative order, by every rank, or the
//! job deadlocks. See [`collective`] for the only primitives this crate
//! uses to observe remote-rank state.

pub mod collective;
pub mod context;
pub mod copy_scheme;
pub mod decode_pipeline;
pub mod encode_pipeline;
pub mod erasure;
pub mod error;
pub mod filemap;
pub mod kvtree;
pub mod path_reduce;
pub mod red_desc;
pub mod red_desc_builder;
pub mod red_desc_table;
pub mod telemetry;
pub mod testutil;
pub mod world;

pub use context::{Defaults, GroupInfo, GroupRegistry, JobContext, Store, StoreRegistry};
pub use copy_scheme::CopyScheme;
pub use error::{RedsetError, RedsetResult};
pub use filemap::{FileEntry, Filemap};
pub use red_desc::RedDesc;
pub use red_desc_table::RedDescTable;
pub use world::World;
