use serde::{Deserialize, Serialize};
pub use uuid_generation::*;

mod uuid_generation {
	use rand_chacha::ChaCha20Rng;
	use rand_chacha::rand_core::{RngCore, SeedableRng};
	use std::cell::Cell;
	use std::sync::Mutex;

	static RNG: Mutex<Option<ChaCha20Rng>> = Mutex::new(None);
	thread_local! {
		pub static UUID_SEED: Cell<Option<u64>> = const { Cell::new(None) };
	}

	pub fn set_uuid_seed(random_seed: u64) {
		UUID_SEED.with(|seed| seed.set(Some(random_seed)))
	}

	pub fn generate_uuid() -> u64 {
		let mut lock = RNG.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let rng = lock.get_or_insert_with(|| {
			let random_seed = UUID_SEED.with(|seed| seed.get().unwrap_or(42));
			ChaCha20Rng::seed_from_u64(random_seed)
		});
		rng.next_u64()
	}
}

/// Stable handle of a layer inside a [Sprite](crate::Sprite).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl LayerId {
	pub fn new() -> Self {
		Self(generate_uuid())
	}
}

impl std::fmt::Display for LayerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}
