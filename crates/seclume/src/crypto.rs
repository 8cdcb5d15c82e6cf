//! Cryptographic primitives: AES-256-GCM, PBKDF2-SHA256, HMAC-SHA256,
//! constant-time comparison, and key zeroization.
//!
//! Everything here is a thin, typed binding over the RustCrypto crates; the
//! archive semantics (which key seals what, nonce placement, tag placement)
//! live in [`format`](crate::format), [`encode`](crate::encode), and
//! [`decode`](crate::decode).

use aes_gcm::{
	aead::{Aead, KeyInit},
	Aes256Gcm, Nonce,
};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand_core::CryptoRngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
	error::{Error, Result},
	HMAC_SIZE, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};

type HmacSha256 = Hmac<Sha256>;

/// A 256-bit symmetric key.
///
/// Zeroized on drop so derived key material does not linger in freed memory,
/// and redacted from `Debug` output.
#[derive(Clone)]
pub struct SecretKey {
	bytes: [u8; KEY_SIZE],
}

impl SecretKey {
	/// Wrap raw key bytes.
	pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
		Self { bytes }
	}

	/// Borrow the raw key bytes.
	pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
		&self.bytes
	}
}

impl Drop for SecretKey {
	fn drop(&mut self) {
		self.bytes.zeroize();
	}
}

impl std::fmt::Debug for SecretKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretKey")
			.field("bytes", &"[REDACTED]")
			.finish()
	}
}

/// Marker returned when an AEAD tag does not verify.
///
/// Carries no detail on purpose: the caller decides whether this was an
/// entry, a payload, or a header region, and a wrong key is indistinguishable
/// from tampered ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFailure;

/// Fill `buf` from the CSPRNG.
///
/// Fails only when the OS entropy source does.
pub fn fill_random<R: CryptoRngCore + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
	rng.try_fill_bytes(buf)
		.map_err(|err| Error::Rng(err.to_string()))
}

/// Stretch `password` into a 256-bit key with PBKDF2-HMAC-SHA256.
///
/// The `info` string domain-separates keys derived from the same password
/// and salt: it is appended to the salt before stretching, so different info
/// strings yield unrelated keys.
pub fn derive_key(
	password: &str,
	salt: &[u8; SALT_SIZE],
	info: &str,
	iterations: u32,
) -> SecretKey {
	let mut salted = Vec::with_capacity(SALT_SIZE + info.len());
	salted.extend_from_slice(salt);
	salted.extend_from_slice(info.as_bytes());

	let mut key = [0u8; KEY_SIZE];
	pbkdf2_hmac::<Sha256>(password.as_bytes(), &salted, iterations, &mut key);
	SecretKey::from_bytes(key)
}

/// Encrypt `plaintext` under `key` with the given nonce, returning the
/// ciphertext and its detached 16-byte tag.
///
/// Ciphertext length always equals plaintext length.
pub fn aead_seal(
	key: &SecretKey,
	nonce: &[u8; NONCE_SIZE],
	plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
	let cipher = Aes256Gcm::new(key.as_bytes().into());
	let mut sealed = cipher
		.encrypt(Nonce::from_slice(nonce), plaintext)
		.map_err(|_| Error::Crypto("AES-GCM encryption failed"))?;

	let split = sealed.len() - TAG_SIZE;
	let mut tag = [0u8; TAG_SIZE];
	tag.copy_from_slice(&sealed[split..]);
	sealed.truncate(split);
	Ok((sealed, tag))
}

/// Decrypt `ciphertext` and verify its detached tag.
pub fn aead_open(
	key: &SecretKey,
	nonce: &[u8; NONCE_SIZE],
	ciphertext: &[u8],
	tag: &[u8; TAG_SIZE],
) -> std::result::Result<Vec<u8>, AuthFailure> {
	let cipher = Aes256Gcm::new(key.as_bytes().into());
	let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
	sealed.extend_from_slice(ciphertext);
	sealed.extend_from_slice(tag);

	cipher
		.decrypt(Nonce::from_slice(nonce), sealed.as_slice())
		.map_err(|_| AuthFailure)
}

/// Compute HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &SecretKey, data: &[u8]) -> [u8; HMAC_SIZE] {
	let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
		.expect("HMAC accepts any key length");
	mac.update(data);
	mac.finalize().into_bytes().into()
}

/// Constant-time byte equality.
///
/// Slices of different lengths compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
	use super::*;

	// unit tests use a reduced iteration count; the real schedule uses
	// PBKDF2_ITERATIONS
	const TEST_ITER: u32 = 1_000;

	fn test_key(seed: u8) -> SecretKey {
		SecretKey::from_bytes([seed; KEY_SIZE])
	}

	#[test]
	fn derive_key_is_deterministic() {
		let salt = [7u8; SALT_SIZE];
		let a = derive_key("swordfish", &salt, "file encryption", TEST_ITER);
		let b = derive_key("swordfish", &salt, "file encryption", TEST_ITER);
		assert_eq!(a.as_bytes(), b.as_bytes());
	}

	#[test]
	fn derive_key_separates_domains() {
		let salt = [7u8; SALT_SIZE];
		let file = derive_key("swordfish", &salt, "file encryption", TEST_ITER);
		let meta = derive_key("swordfish", &salt, "metadata encryption", TEST_ITER);
		assert_ne!(file.as_bytes(), meta.as_bytes());
	}

	#[test]
	fn derive_key_depends_on_password_and_salt() {
		let salt = [7u8; SALT_SIZE];
		let base = derive_key("swordfish", &salt, "file encryption", TEST_ITER);
		let other_pw = derive_key("swordfisH", &salt, "file encryption", TEST_ITER);
		let other_salt = derive_key("swordfish", &[8u8; SALT_SIZE], "file encryption", TEST_ITER);
		assert_ne!(base.as_bytes(), other_pw.as_bytes());
		assert_ne!(base.as_bytes(), other_salt.as_bytes());
	}

	#[test]
	fn seal_open_roundtrip() {
		let key = test_key(1);
		let nonce = [2u8; NONCE_SIZE];
		let (ciphertext, tag) = aead_seal(&key, &nonce, b"attack at dawn").unwrap();
		assert_eq!(ciphertext.len(), b"attack at dawn".len());

		let plain = aead_open(&key, &nonce, &ciphertext, &tag).unwrap();
		assert_eq!(plain, b"attack at dawn");
	}

	#[test]
	fn open_rejects_tampered_ciphertext() {
		let key = test_key(1);
		let nonce = [2u8; NONCE_SIZE];
		let (mut ciphertext, tag) = aead_seal(&key, &nonce, b"attack at dawn").unwrap();
		ciphertext[0] ^= 0x01;
		assert_eq!(aead_open(&key, &nonce, &ciphertext, &tag), Err(AuthFailure));
	}

	#[test]
	fn open_rejects_tampered_tag() {
		let key = test_key(1);
		let nonce = [2u8; NONCE_SIZE];
		let (ciphertext, mut tag) = aead_seal(&key, &nonce, b"attack at dawn").unwrap();
		tag[TAG_SIZE - 1] ^= 0x80;
		assert_eq!(aead_open(&key, &nonce, &ciphertext, &tag), Err(AuthFailure));
	}

	#[test]
	fn open_rejects_wrong_key_and_nonce() {
		let key = test_key(1);
		let nonce = [2u8; NONCE_SIZE];
		let (ciphertext, tag) = aead_seal(&key, &nonce, b"attack at dawn").unwrap();

		assert!(aead_open(&test_key(3), &nonce, &ciphertext, &tag).is_err());
		assert!(aead_open(&key, &[9u8; NONCE_SIZE], &ciphertext, &tag).is_err());
	}

	#[test]
	fn hmac_depends_on_key_and_data() {
		let a = hmac_sha256(&test_key(1), b"header bytes");
		let b = hmac_sha256(&test_key(2), b"header bytes");
		let c = hmac_sha256(&test_key(1), b"header byteS");
		assert_ne!(a, b);
		assert_ne!(a, c);
		assert_eq!(a, hmac_sha256(&test_key(1), b"header bytes"));
	}

	#[test]
	fn constant_time_eq_handles_lengths() {
		assert!(constant_time_eq(b"abc", b"abc"));
		assert!(!constant_time_eq(b"abc", b"abd"));
		assert!(!constant_time_eq(b"abc", b"abcd"));
		assert!(constant_time_eq(b"", b""));
	}

	#[test]
	fn secret_key_debug_is_redacted() {
		let key = test_key(0xAA);
		let rendered = format!("{key:?}");
		assert!(rendered.contains("REDACTED"));
		assert!(!rendered.contains("170"));
	}
}
