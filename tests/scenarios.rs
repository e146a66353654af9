// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end, multi-rank scenarios driving the redundancy-descriptor core
//! through `LocalWorld` with several simulated ranks.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use redset_core::context::{Defaults, GroupInfo, GroupRegistry, JobContext, StoreRegistry};
use redset_core::copy_scheme::CopyScheme;
use redset_core::erasure::{ErasureLib, MockErasureLib};
use redset_core::filemap::Filemap;
use redset_core::kvtree::KVTree;
use redset_core::red_desc_table::RedDescTable;
use redset_core::testutil::{run_ranks, LocalWorld};
use redset_core::{decode_pipeline, encode_pipeline};

fn job_context(world: LocalWorld, node_group_size: usize, store_root: &str) -> JobContext {
    JobContext {
        world: Arc::new(world),
        store_registry: StoreRegistry::new().with_store(store_root, true),
        group_registry: GroupRegistry::new().with_group(
            "NODE",
            GroupInfo {
                size: node_group_size,
                leader_rank: 0,
            },
        ),
        username: "alice".to_string(),
        jobid: "1234".to_string(),
        defaults: Defaults {
            store: store_root.to_string(),
            copy_type: "PARTNER".to_string(),
            group: "NODE".to_string(),
            set_size: 4,
            interval: 1,
        },
        crc_on_copy: false,
    }
}

fn xor_config() -> KVTree {
    let mut root = KVTree::new();
    let mut ckpt = KVTree::new();
    ckpt.set_str("TYPE", "xor");
    ckpt.set_int("SET_SIZE", 4);
    ckpt.set_int("INTERVAL", 1);
    root.set_tree("ckpt", ckpt);
    root
}

/// Scenario 1: XOR, 8 ranks, 2 nodes (NODE group size 4 != world size 8, so
/// the single-node override does not fire). Each rank owns one 1 MiB file;
/// `select(7)` must return the built descriptor, `apply` must succeed, and
/// the world-wide byte total must equal `8 * 1048576`.
#[test]
fn xor_eight_ranks_two_nodes_encodes_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    let results = run_ranks((0..8).collect(), {
        let root = root.clone();
        move |world, rank: usize| {
            let ctx = job_context(world, 4, &root);
            let lib: Arc<dyn ErasureLib> = Arc::new(MockErasureLib::new());
            let table = RedDescTable::build(&ctx, lib.clone(), &xor_config());

            let desc = table.select(7).expect("descriptor with interval 1 must be selected");
            assert_eq!(desc.copy_type, CopyScheme::Xor { set_size: 4 });

            let file_path = format!("{root}/rank{rank}.dat");
            {
                let mut f = fs::File::create(&file_path).unwrap();
                f.write_all(&vec![b'x'; 1024 * 1024]).unwrap();
            }
            let mut filemap = Filemap::new(format!("{root}/rank{rank}.filemap"));
            filemap.add_file(&file_path, 1024 * 1024, true);

            encode_pipeline::apply(&ctx, lib.as_ref(), desc, 7, &mut filemap)
        }
    });

    // Each rank's `apply` call already returns the reduced world-wide total,
    // so summing all 8 identical results and dividing back out by the rank
    // count recovers that single total.
    let total_bytes: f64 = results
        .into_iter()
        .map(|r| r.expect("encode must succeed on every rank"))
        .sum::<f64>()
        / 8.0;
    assert_eq!(total_bytes, 8.0 * 1024.0 * 1024.0);
}

/// Scenario 2: single-node override. world_size == group_size(NODE) == 4, a
/// PARTNER request must be rewritten to SINGLE on every rank.
#[test]
fn single_node_job_forces_single_copy_type_everywhere() {
    let mut root = KVTree::new();
    let mut ckpt = KVTree::new();
    ckpt.set_str("TYPE", "PARTNER");
    root.set_tree("ckpt", ckpt);

    let results = run_ranks(vec![(), (), (), ()], move |world, ()| {
        let ctx = job_context(world, 4, "/mnt/ssd");
        let lib: Arc<dyn ErasureLib> = Arc::new(MockErasureLib::new());
        let table = RedDescTable::build(&ctx, lib, &root.clone());
        table.get(0).unwrap().copy_type
    });

    for copy_type in results {
        assert_eq!(copy_type, CopyScheme::Single);
    }
}

/// Scenario 3: selection tie. Two enabled descriptors with intervals 2 and
/// 6; for id 12, the descriptor with interval 6 must win.
#[test]
fn selection_prefers_larger_dividing_interval() {
    let mut root = KVTree::new();
    let mut a = KVTree::new();
    a.set_int("INTERVAL", 2);
    let mut b = KVTree::new();
    b.set_int("INTERVAL", 6);
    root.set_tree("a_every_2", a);
    root.set_tree("b_every_6", b);

    let results = run_ranks(vec![()], move |world, ()| {
        let ctx = job_context(world, 1, "/mnt/ssd");
        let lib: Arc<dyn ErasureLib> = Arc::new(MockErasureLib::new());
        let table = RedDescTable::build(&ctx, lib, &root.clone());
        table.select(12).map(|d| d.interval)
    });

    assert_eq!(results[0], Some(6));
}

/// Scenario 4: unknown store. Every rank must come out disabled, with no
/// erasure scheme allocated.
#[test]
fn unknown_store_disables_descriptor_on_every_rank() {
    let mut root = KVTree::new();
    let mut ckpt = KVTree::new();
    ckpt.set_str("STORE", "/no/such/path");
    root.set_tree("ckpt", ckpt);

    let results = run_ranks(vec![(), (), ()], move |world, ()| {
        let ctx = job_context(world, 1, "/mnt/ssd");
        let lib: Arc<dyn ErasureLib> = Arc::new(MockErasureLib::new());
        let table = RedDescTable::build(&ctx, lib, &root.clone());
        let desc = table.get(0).unwrap();
        (desc.enabled, desc.erasure_scheme.is_some())
    });

    for (enabled, has_scheme) in results {
        assert!(!enabled);
        assert!(!has_scheme);
    }
}

/// Scenario 5: partial file invalid. One rank out of several reports a file
/// incomplete; `apply` must fail on every rank, and the erasure set must
/// have been freed without any rank calling `Dispatch`.
#[test]
fn one_rank_incomplete_file_fails_apply_on_every_rank() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    let results = run_ranks((0..8).collect(), {
        let root = root.clone();
        move |world, rank: usize| {
            let ctx = job_context(world, 8, &root);
            let lib = MockErasureLib::new();
            let mut desc = redset_core::RedDesc::zeroed(0);
            desc.enabled = true;
            desc.interval = 1;
            desc.store_name = root.clone();
            desc.directory = format!("{root}/alice/scr.1234");
            desc.copy_type = CopyScheme::Single;
            desc.erasure_scheme = Some(lib.create_scheme(desc.copy_type, 8).unwrap());

            let file_path = format!("{root}/rank{rank}.dat");
            fs::write(&file_path, b"data").unwrap();
            let mut filemap = Filemap::new(format!("{root}/rank{rank}.filemap"));
            filemap.add_file(&file_path, 4, rank != 3);

            encode_pipeline::apply(&ctx, &lib, &desc, 1, &mut filemap)
        }
    });

    for result in results {
        assert!(result.is_err());
    }
}

/// Scenario 6: recover round-trip. After a successful `apply(id=5)`, delete
/// rank 3's local file, then `recover(dir)`. Every rank must report
/// success, and the deleted file must be restored.
#[test]
fn recover_round_trip_restores_deleted_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    let encode_results = run_ranks((0..4).collect(), {
        let root = root.clone();
        move |world, rank: usize| {
            let ctx = job_context(world, 4, &root);
            let lib = MockErasureLib::new();
            let mut desc = redset_core::RedDesc::zeroed(0);
            desc.enabled = true;
            desc.interval = 1;
            desc.store_name = root.clone();
            desc.directory = format!("{root}/alice/scr.1234");
            desc.copy_type = CopyScheme::Single;
            desc.erasure_scheme = Some(lib.create_scheme(desc.copy_type, 4).unwrap());

            let file_path = format!("{root}/rank{rank}.dat");
            fs::write(&file_path, format!("payload-{rank}")).unwrap();
            let mut filemap = Filemap::new(format!("{root}/rank{rank}.filemap"));
            filemap.add_file(&file_path, 9, true);

            let bytes = encode_pipeline::apply(&ctx, &lib, &desc, 5, &mut filemap);
            (desc.directory, bytes)
        }
    });

    for (_, bytes) in &encode_results {
        assert!(bytes.is_ok());
    }
    let scr_dir = encode_results[0].0.clone();

    fs::remove_file(format!("{root}/rank3.dat")).unwrap();
    assert!(!std::path::Path::new(&format!("{root}/rank3.dat")).exists());

    let hidden_dir = format!("{scr_dir}/.redset/5");
    let recover_results = run_ranks((0..4).collect(), {
        let root = root.clone();
        let hidden_dir = hidden_dir.clone();
        move |world, _rank: usize| {
            let ctx = job_context(world, 4, &root);
            let lib = MockErasureLib::new();
            decode_pipeline::recover(&ctx, &lib, &hidden_dir)
        }
    });

    for result in &recover_results {
        assert!(result.is_ok());
    }
    assert_eq!(fs::read(format!("{root}/rank3.dat")).unwrap(), b"payload-3");
}
