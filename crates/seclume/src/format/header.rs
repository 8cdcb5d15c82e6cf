//! The fixed-layout archive header.
//!
//! # Binary layout (900 bytes, little-endian, no padding)
//!
//! ```text
//! Offset  Size  Field
//!      0     4  magic            = b"SLM\0"
//!      4     1  version          (readers accept 4–6; writers emit 6)
//!      5     1  compression_algo (1 = zlib DEFLATE, 2 = LZMA; ignored for v4)
//!      6     1  compression_level (0–9)
//!      7     1  reserved         (zero)
//!      8     4  file_count       (u32 LE, <= 1000)
//!     12     4  comment_len      (u32 LE, ciphertext length, 0 = absent)
//!     16     4  outdir_len       (u32 LE, ciphertext length, 0 = absent)
//!     20    16  salt
//!     36   512  comment region   (sealed, see below)
//!    548   320  outdir region    (sealed; zero-filled when unused)
//!    868    32  hmac             (HMAC-SHA256 over bytes 0..868, file key)
//! ```
//!
//! The reference implementation reads this one layout for every version it
//! accepts, so versions 4 and 5 share the 900-byte size; only whether the
//! outdir fields are consulted is version-gated.
//!
//! Sealed regions pack `[ciphertext || nonce(12) || tag(16)]` at their low
//! end and are zero-padded; the `*_len` header field records the ciphertext
//! length, which equals the plaintext length.

use std::fmt;

use rand_core::CryptoRngCore;

use crate::{
	codec::Compression,
	crypto::{self, SecretKey},
	error::{Error, Result},
	COMMENT_PLAIN_MAX, HMAC_SIZE, MAX_COMMENT_REGION, MAX_FILES, MAX_OUTDIR, NONCE_SIZE,
	OUTDIR_PLAIN_MAX, SALT_SIZE, SEALED_REGION_OVERHEAD, SLM_MAGIC, SLM_VERSION, SLM_VERSION_MIN,
	TAG_SIZE,
};

/// Serialized size of the header in bytes.
pub const HEADER_SIZE: usize = 900;

/// Bytes of the header covered by the HMAC: everything before the tag.
pub const HEADER_HMAC_LEN: usize = HEADER_SIZE - HMAC_SIZE;

/// Archive header, one per `.slm` file.
#[derive(Clone)]
pub struct ArchiveHeader {
	/// Format version this header was built with or parsed from.
	pub version: u8,
	/// Raw compression algorithm byte; see [`effective_algo`](Self::effective_algo).
	pub algo: u8,
	/// Compression level 0–9.
	pub level: u8,
	/// Number of entries following the header.
	pub file_count: u32,
	/// Ciphertext length of the sealed comment, 0 when absent.
	pub comment_len: u32,
	/// Ciphertext length of the sealed output directory, 0 when absent.
	pub outdir_len: u32,
	/// PBKDF2 salt for this archive's key schedule.
	pub salt: [u8; SALT_SIZE],
	/// Sealed comment region.
	pub comment: [u8; MAX_COMMENT_REGION],
	/// Sealed output-directory region.
	pub outdir: [u8; MAX_OUTDIR],
	/// HMAC-SHA256 over all preceding header bytes, under the file key.
	pub hmac: [u8; HMAC_SIZE],
}

impl ArchiveHeader {
	/// A writer-version header with empty sealed regions and a zero HMAC.
	pub fn new(algo: Compression, level: u8, file_count: u32) -> Self {
		Self {
			version: SLM_VERSION,
			algo: algo.as_u8(),
			level,
			file_count,
			comment_len: 0,
			outdir_len: 0,
			salt: [0; SALT_SIZE],
			comment: [0; MAX_COMMENT_REGION],
			outdir: [0; MAX_OUTDIR],
			hmac: [0; HMAC_SIZE],
		}
	}

	/// The algorithm every payload in this archive uses.
	///
	/// Version 4 predates the algorithm byte and is always LZMA, whatever
	/// the byte says; later versions validate it.
	pub fn effective_algo(&self) -> Result<Compression> {
		if self.version == 4 {
			Ok(Compression::Lzma)
		} else {
			Compression::from_u8(self.algo)
		}
	}

	/// Seal `comment` into its header region under the meta key.
	pub fn seal_comment<R: CryptoRngCore + ?Sized>(
		&mut self,
		rng: &mut R,
		meta_key: &SecretKey,
		comment: &str,
	) -> Result<()> {
		self.comment_len = seal_region(
			rng,
			meta_key,
			comment.as_bytes(),
			&mut self.comment,
			"comment",
			COMMENT_PLAIN_MAX,
		)?;
		Ok(())
	}

	/// Seal `outdir` into its header region under the meta key.
	pub fn seal_outdir<R: CryptoRngCore + ?Sized>(
		&mut self,
		rng: &mut R,
		meta_key: &SecretKey,
		outdir: &str,
	) -> Result<()> {
		self.outdir_len = seal_region(
			rng,
			meta_key,
			outdir.as_bytes(),
			&mut self.outdir,
			"output directory",
			OUTDIR_PLAIN_MAX,
		)?;
		Ok(())
	}

	/// Decrypt the sealed comment, if one was stored.
	pub fn open_comment(&self, meta_key: &SecretKey) -> Result<Option<String>> {
		open_region(&self.comment, self.comment_len, meta_key, "comment")
	}

	/// Decrypt the sealed output directory, if one was stored.
	pub fn open_outdir(&self, meta_key: &SecretKey) -> Result<Option<String>> {
		open_region(&self.outdir, self.outdir_len, meta_key, "output directory")
	}

	/// Compute the header HMAC under the file key.
	pub fn compute_hmac(&self, file_key: &SecretKey) -> [u8; HMAC_SIZE] {
		let bytes = self.to_bytes();
		crypto::hmac_sha256(file_key, &bytes[..HEADER_HMAC_LEN])
	}

	/// Serialize to the 900-byte on-disk layout.
	pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
		let mut out = [0u8; HEADER_SIZE];
		out[0..4].copy_from_slice(&SLM_MAGIC);
		out[4] = self.version;
		out[5] = self.algo;
		out[6] = self.level;
		// byte 7 reserved, zero
		out[8..12].copy_from_slice(&self.file_count.to_le_bytes());
		out[12..16].copy_from_slice(&self.comment_len.to_le_bytes());
		out[16..20].copy_from_slice(&self.outdir_len.to_le_bytes());
		out[20..36].copy_from_slice(&self.salt);
		out[36..548].copy_from_slice(&self.comment);
		out[548..868].copy_from_slice(&self.outdir);
		out[868..900].copy_from_slice(&self.hmac);
		out
	}

	/// Parse the on-disk layout, checking magic, version, and field bounds.
	///
	/// The HMAC is carried through untouched; authenticating it needs the
	/// derived file key and happens in the decoder.
	pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
		if bytes[0..4] != SLM_MAGIC {
			return Err(Error::BadMagic);
		}
		let version = bytes[4];
		if !(SLM_VERSION_MIN..=SLM_VERSION).contains(&version) {
			return Err(Error::UnsupportedVersion(version));
		}

		let file_count = u32::from_le_bytes(bytes[8..12].try_into().expect("slice length fixed"));
		if file_count > MAX_FILES {
			return Err(Error::MalformedHeader {
				field: "file count",
			});
		}
		let comment_len =
			u32::from_le_bytes(bytes[12..16].try_into().expect("slice length fixed"));
		if comment_len as usize > COMMENT_PLAIN_MAX {
			return Err(Error::MalformedHeader {
				field: "comment length",
			});
		}
		let outdir_len = u32::from_le_bytes(bytes[16..20].try_into().expect("slice length fixed"));
		if outdir_len as usize > OUTDIR_PLAIN_MAX {
			return Err(Error::MalformedHeader {
				field: "output directory length",
			});
		}

		let mut salt = [0u8; SALT_SIZE];
		salt.copy_from_slice(&bytes[20..36]);
		let mut comment = [0u8; MAX_COMMENT_REGION];
		comment.copy_from_slice(&bytes[36..548]);
		let mut outdir = [0u8; MAX_OUTDIR];
		outdir.copy_from_slice(&bytes[548..868]);
		let mut hmac = [0u8; HMAC_SIZE];
		hmac.copy_from_slice(&bytes[868..900]);

		Ok(Self {
			version,
			algo: bytes[5],
			level: bytes[6],
			file_count,
			comment_len,
			outdir_len,
			salt,
			comment,
			outdir,
			hmac,
		})
	}
}

impl fmt::Debug for ArchiveHeader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ArchiveHeader")
			.field("version", &self.version)
			.field("algo", &self.algo)
			.field("level", &self.level)
			.field("file_count", &self.file_count)
			.field("comment_len", &self.comment_len)
			.field("outdir_len", &self.outdir_len)
			.finish_non_exhaustive()
	}
}

// sealed regions share one layout: ciphertext at the low end, then nonce and
// tag, zero padding to the region size

fn seal_region<R: CryptoRngCore + ?Sized>(
	rng: &mut R,
	key: &SecretKey,
	plaintext: &[u8],
	region: &mut [u8],
	what: &'static str,
	cap: usize,
) -> Result<u32> {
	if plaintext.len() > cap {
		return Err(Error::ResourceLimit {
			what,
			limit: cap as u64,
			actual: plaintext.len() as u64,
		});
	}

	let mut nonce = [0u8; NONCE_SIZE];
	crypto::fill_random(rng, &mut nonce)?;
	let (ciphertext, tag) = crypto::aead_seal(key, &nonce, plaintext)?;

	let len = ciphertext.len();
	region[..len].copy_from_slice(&ciphertext);
	region[len..len + NONCE_SIZE].copy_from_slice(&nonce);
	region[len + NONCE_SIZE..len + SEALED_REGION_OVERHEAD].copy_from_slice(&tag);
	Ok(len as u32)
}

fn open_region(
	region: &[u8],
	len: u32,
	key: &SecretKey,
	what: &'static str,
) -> Result<Option<String>> {
	if len == 0 {
		return Ok(None);
	}
	let len = len as usize;
	if len + SEALED_REGION_OVERHEAD > region.len() {
		return Err(Error::MalformedHeader { field: what });
	}

	let nonce: [u8; NONCE_SIZE] = region[len..len + NONCE_SIZE]
		.try_into()
		.expect("slice length fixed");
	let tag: [u8; TAG_SIZE] = region[len + NONCE_SIZE..len + SEALED_REGION_OVERHEAD]
		.try_into()
		.expect("slice length fixed");

	let plain = crypto::aead_open(key, &nonce, &region[..len], &tag)
		.map_err(|_| Error::FieldAuth { field: what })?;
	let text = String::from_utf8(plain).map_err(|_| Error::MalformedHeader { field: what })?;
	Ok(Some(text))
}
