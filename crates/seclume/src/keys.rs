//! The two-key schedule derived from an archive password.

use crate::{
	crypto::{self, SecretKey},
	PBKDF2_ITERATIONS, SALT_SIZE,
};

/// KDF info string for the file key.
pub const FILE_KEY_INFO: &str = "file encryption";

/// KDF info string for the meta key.
pub const META_KEY_INFO: &str = "metadata encryption";

/// The pair of domain-separated keys every archive operation works with.
///
/// Both keys are stretched from the same password and salt but with distinct
/// info strings, so recovering plaintext in one domain gives no purchase on
/// the other. Each key zeroizes itself on drop, which covers every exit path
/// of the operation that owns the schedule.
#[derive(Debug)]
pub struct KeySchedule {
	/// Seals payload frames and authenticates the header.
	pub file: SecretKey,
	/// Seals entry metadata and the header's comment/outdir regions.
	pub meta: SecretKey,
}

impl KeySchedule {
	/// Derive both keys. Deliberately expensive: two PBKDF2 runs of
	/// [`PBKDF2_ITERATIONS`] iterations each.
	pub fn derive(password: &str, salt: &[u8; SALT_SIZE]) -> Self {
		Self {
			file: crypto::derive_key(password, salt, FILE_KEY_INFO, PBKDF2_ITERATIONS),
			meta: crypto::derive_key(password, salt, META_KEY_INFO, PBKDF2_ITERATIONS),
		}
	}
}
