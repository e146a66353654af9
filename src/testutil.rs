// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

//! An in-process collective test harness.
//!
//! `LocalWorld` simulates a fixed set of ranks as real OS threads
//! coordinated through a `std::sync::Barrier`, so that collective code paths
//! run under genuine concurrent execution instead of a single-threaded
//! stand-in. No real MPI runtime is involved; that substrate is out of
//! scope for this crate (see the Non-goals).

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use crate::world::World;

struct Shared {
    bool_slots: Mutex<Vec<bool>>,
    str_slot: Mutex<Option<String>>,
    f64_slots: Mutex<Vec<f64>>,
    barrier: Barrier,
}

/// A single rank's view of a simulated world of `size` ranks.
pub struct LocalWorld {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl World for LocalWorld {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_true(&self, local: bool) -> bool {
        self.shared.bool_slots.lock().unwrap()[self.rank] = local;
        self.shared.barrier.wait();
        let result = self.shared.bool_slots.lock().unwrap().iter().all(|b| *b);
        self.shared.barrier.wait();
        result
    }

    fn broadcast_string(&self, local: Option<&str>, root: usize) -> String {
        if self.rank == root {
            *self.shared.str_slot.lock().unwrap() = Some(local.unwrap_or_default().to_string());
        }
        self.shared.barrier.wait();
        let result = self
            .shared
            .str_slot
            .lock()
            .unwrap()
            .clone()
            .expect("broadcast root never set a value");
        self.shared.barrier.wait();
        result
    }

    fn reduce_sum_double(&self, local: f64) -> f64 {
        self.shared.f64_slots.lock().unwrap()[self.rank] = local;
        self.shared.barrier.wait();
        let sum = self.shared.f64_slots.lock().unwrap().iter().sum();
        self.shared.barrier.wait();
        sum
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

/// Runs `body` on `items.len()` simulated ranks concurrently, one thread per
/// rank, handing rank `i` both its `LocalWorld` handle and `items[i]`.
/// Returns the per-rank results in rank order once every thread has joined.
///
/// Panics propagate: a panicking rank fails the whole call, which is the
/// right default for tests (a silently-dropped rank would just hang the
/// barrier for everyone else).
pub fn run_ranks<T, R, F>(items: Vec<T>, body: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(LocalWorld, T) -> R + Send + Sync + 'static,
{
    let size = items.len();
    let shared = Arc::new(Shared {
        bool_slots: Mutex::new(vec![false; size]),
        str_slot: Mutex::new(None),
        f64_slots: Mutex::new(vec![0.0; size]),
        barrier: Barrier::new(size),
    });
    let body = Arc::new(body);

    let handles: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(rank, item)| {
            let shared = shared.clone();
            let body = body.clone();
            thread::Builder::new()
                .name(format!("redset-rank-{rank}"))
                .spawn(move || {
                    let world = LocalWorld {
                        rank,
                        size,
                        shared,
                    };
                    body(world, item)
                })
                .expect("failed to spawn simulated rank thread")
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("simulated rank panicked"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_true_requires_unanimous_local_values() {
        let results = run_ranks(vec![true, true, false, true], |world, local| world.all_true(local));
        assert!(results.iter().all(|r| !r));
    }

    #[test]
    fn all_true_passes_when_unanimous() {
        let results = run_ranks(vec![true, true, true], |world, local| world.all_true(local));
        assert!(results.iter().all(|r| *r));
    }

    #[test]
    fn broadcast_string_is_identical_on_every_rank() {
        let results = run_ranks(vec![(), (), (), ()], |world, ()| {
            let payload = if world.rank() == 0 {
                Some("leader-value")
            } else {
                None
            };
            world.broadcast_string(payload, 0)
        });
        assert!(results.iter().all(|r| r == "leader-value"));
    }

    #[test]
    fn reduce_sum_double_sums_across_ranks() {
        let results = run_ranks(vec![1.0, 2.0, 3.0, 4.0], |world, local| {
            world.reduce_sum_double(local)
        });
        assert!(results.iter().all(|r| (*r - 10.0).abs() < f64::EPSILON));
    }
}
