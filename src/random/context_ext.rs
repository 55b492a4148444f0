use std::any::TypeId;
use std::cell::RefMut;

use log::trace;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64;

use crate::context::Context;
use crate::random::{RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the random number generator associated with the given
/// [`RngId`]. If the Rng has not been used before, one will be created from the base seed
/// passed to `init_random`.
///
/// # Panics
///
/// Panics if `init_random` was not called yet.
fn get_rng<R: RngId>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");

    let rng_holders = data_container.rng_holders.borrow_mut();
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                let base_seed = data_container.base_seed;
                let seed_offset = xxh3_64(R::get_name().as_bytes());
                trace!(
                    "creating new RNG {} (base seed={base_seed})",
                    R::get_name()
                );
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("RNG holder contains the type its RngId declares")
    })
}

// This is a trait extension on Context for
// random number generation functionality.
pub trait ContextRandomExt {
    /// Sets the base seed and discards any generators created so far, so they are re-seeded on
    /// next use.
    fn init_random(&mut self, base_seed: u64);

    /// Applies `sampler` to the generator associated with `rng_id`.
    fn sample<R: RngId, T>(&self, rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    /// Returns `true` with probability `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` is outside `[0, 1]`.
    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    /// Shuffles `items` in place (Fisher-Yates).
    fn shuffle<R: RngId, T>(&self, rng_id: R, items: &mut [T]) {
        self.sample(rng_id, |rng| items.shuffle(rng));
    }

    /// Draws `amount` distinct indices uniformly from `0..len`, in random order.
    ///
    /// # Panics
    ///
    /// Panics if `amount > len`.
    fn sample_indices<R: RngId>(&self, rng_id: R, len: usize, amount: usize) -> Vec<usize> {
        self.sample(rng_id, |rng| index::sample(rng, len, amount).into_vec())
    }
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let data_container = self.get_data_mut(RngPlugin);
        data_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when `get_rng` is called
        data_container.rng_holders.borrow_mut().clear();
    }

    fn sample<R: RngId, T>(&self, _rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }
}
