//! Named, seeded random number generators stored in the [`Context`](crate::Context).
//!
//! Every concern that needs randomness declares its own generator with [`define_rng!`]. All
//! generators derive from one base seed set with [`ContextRandomExt::init_random`], which makes
//! a run reproducible from its seed and keeps the streams of different concerns independent.
mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::define_data_plugin;

pub trait RngId: Copy + Clone + Any {
    type RngType: SeedableRng + Rng + 'static;

    fn get_name() -> &'static str;
}

// Any `SeedableRng` can be stored here; the concrete type is recovered by downcasting with the
// generator's `RngId`.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<FxHashMap<TypeId, RngHolder>>,
}

// Registers a data container which stores:
// * base_seed: A base seed for all rngs
// * rng_holders: A map of rngs, keyed by their RngId. Note that this is
//   stored in a RefCell to allow for mutable borrow without requiring a
//   mutable borrow of the Context itself.
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(FxHashMap::default()),
    }
);
