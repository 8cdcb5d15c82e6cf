//! Archive encoder (the packer).

use std::{fmt, io::Write};

use rand_core::CryptoRngCore;
use tracing::{debug, trace};

use crate::{
	codec::{self, Compression, MAX_LEVEL},
	crypto,
	error::{Error, Result},
	format::{entry::FileEntryPlain, header::ArchiveHeader, path},
	keys::KeySchedule,
	MAX_FILES, MAX_FILE_SIZE, NONCE_SIZE, SALT_SIZE, SLM_VERSION,
};

/// Options for a new archive.
#[derive(Debug, Clone)]
pub struct PackOptions {
	/// Compression algorithm for every payload.
	pub algo: Compression,
	/// Compression level, 0 (store) to 9 (maximum).
	pub level: u8,
	/// Comment sealed into the header, readable with the password.
	pub comment: Option<String>,
	/// Extraction directory hint sealed into the header.
	pub outdir: Option<String>,
}

impl Default for PackOptions {
	fn default() -> Self {
		Self {
			algo: Compression::Lzma,
			level: 1,
			comment: None,
			outdir: None,
		}
	}
}

/// Archive encoder.
///
/// [`new`](Self::new) writes the authenticated header; [`add_entry`](Self::add_entry)
/// compresses, encrypts, and appends one file at a time in input order; and
/// [`finish`](Self::finish) checks that exactly the declared number of
/// entries was added. Randomness comes from the injected CSPRNG, so salt and
/// every nonce are drawn immediately before their single use.
///
/// Dropping the encoder zeroizes both derived keys, on success and error
/// paths alike.
pub struct Encoder<'a, W: Write, R: CryptoRngCore + ?Sized> {
	writer: &'a mut W,
	csprng: &'a mut R,
	keys: KeySchedule,
	algo: Compression,
	level: u8,
	declared: u32,
	written: u32,
}

impl<W: Write, R: CryptoRngCore + ?Sized> fmt::Debug for Encoder<'_, W, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Encoder")
			.field("algo", &self.algo)
			.field("level", &self.level)
			.field("declared", &self.declared)
			.field("written", &self.written)
			.finish_non_exhaustive()
	}
}

impl<'a, W: Write, R: CryptoRngCore + ?Sized> Encoder<'a, W, R> {
	/// Create an encoder and write the archive header.
	///
	/// `file_count` is the exact number of entries the caller will add; it
	/// is part of the header, which is authenticated before any entry is
	/// written, so it cannot be revised later.
	pub fn new(
		writer: &'a mut W,
		csprng: &'a mut R,
		password: &str,
		file_count: u32,
		opts: &PackOptions,
	) -> Result<Self> {
		if opts.level > MAX_LEVEL {
			return Err(Error::BadCompressionLevel(opts.level));
		}
		if file_count > MAX_FILES {
			return Err(Error::ResourceLimit {
				what: "file count",
				limit: u64::from(MAX_FILES),
				actual: u64::from(file_count),
			});
		}
		if let Some(outdir) = &opts.outdir {
			if path::has_traversal(outdir) {
				return Err(Error::PathTraversal {
					path: outdir.clone(),
				});
			}
		}

		let mut salt = [0u8; SALT_SIZE];
		crypto::fill_random(csprng, &mut salt)?;
		trace!("derive encryption keys");
		let keys = KeySchedule::derive(password, &salt);

		let mut header = ArchiveHeader::new(opts.algo, opts.level, file_count);
		header.salt = salt;
		if let Some(comment) = &opts.comment {
			header.seal_comment(csprng, &keys.meta, comment)?;
		}
		if let Some(outdir) = &opts.outdir {
			header.seal_outdir(csprng, &keys.meta, outdir)?;
		}
		header.hmac = header.compute_hmac(&keys.file);

		writer.write_all(&header.to_bytes())?;
		debug!(
			version = SLM_VERSION,
			algo = %opts.algo,
			level = opts.level,
			entries = file_count,
			"wrote archive header"
		);

		Ok(Self {
			writer,
			csprng,
			keys,
			algo: opts.algo,
			level: opts.level,
			declared: file_count,
			written: 0,
		})
	}

	/// Compress, encrypt, and append one entry.
	///
	/// Zero-byte inputs produce a metadata record with both sizes zero and
	/// no payload frame.
	pub fn add_entry(&mut self, name: &str, mode: u32, data: &[u8]) -> Result<()> {
		if self.written == self.declared {
			return Err(Error::EntryCountMismatch {
				declared: self.declared,
				written: self.written + 1,
			});
		}
		path::validate_entry_name(name)?;
		if data.len() as u64 > MAX_FILE_SIZE {
			return Err(Error::ResourceLimit {
				what: "file size",
				limit: MAX_FILE_SIZE,
				actual: data.len() as u64,
			});
		}

		let compressed = if data.is_empty() {
			Vec::new()
		} else {
			codec::compress(data, self.algo, self.level)?
		};
		let entry = FileEntryPlain::new(name, compressed.len() as u64, data.len() as u64, mode)?;

		let mut meta_nonce = [0u8; NONCE_SIZE];
		crypto::fill_random(self.csprng, &mut meta_nonce)?;
		let (meta_ct, meta_tag) = crypto::aead_seal(&self.keys.meta, &meta_nonce, &entry.to_bytes())?;
		self.writer.write_all(&meta_nonce)?;
		self.writer.write_all(&meta_tag)?;
		self.writer.write_all(&meta_ct)?;

		if !data.is_empty() {
			let mut file_nonce = [0u8; NONCE_SIZE];
			crypto::fill_random(self.csprng, &mut file_nonce)?;
			let (file_ct, file_tag) = crypto::aead_seal(&self.keys.file, &file_nonce, &compressed)?;
			self.writer.write_all(&file_nonce)?;
			self.writer.write_all(&file_tag)?;
			self.writer.write_all(&file_ct)?;
		}

		self.written += 1;
		debug!(
			name,
			original = data.len(),
			compressed = compressed.len(),
			"added entry"
		);
		Ok(())
	}

	/// Flush the writer after checking every declared entry was added.
	pub fn finish(self) -> Result<()> {
		if self.written != self.declared {
			return Err(Error::EntryCountMismatch {
				declared: self.declared,
				written: self.written,
			});
		}
		self.writer.flush()?;
		trace!(entries = self.written, "archive complete");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::format::{entry::ENTRY_SIZE, header::HEADER_SIZE};
	use rand::rngs::OsRng;

	// a deliberately weak password keeps the KDF cost of each test to two
	// schedules at most; strength policy lives in the CLI, not here

	#[test]
	fn count_and_level_preconditions() {
		let mut sink = std::io::sink();
		let opts = PackOptions {
			level: 10,
			..PackOptions::default()
		};
		assert!(matches!(
			Encoder::new(&mut sink, &mut OsRng, "pw", 0, &opts),
			Err(Error::BadCompressionLevel(10))
		));

		let opts = PackOptions::default();
		assert!(matches!(
			Encoder::new(&mut sink, &mut OsRng, "pw", MAX_FILES + 1, &opts),
			Err(Error::ResourceLimit { .. })
		));
	}

	#[test]
	fn traversing_outdir_is_refused_before_any_work() {
		let mut sink = std::io::sink();
		let opts = PackOptions {
			outdir: Some("../somewhere".into()),
			..PackOptions::default()
		};
		assert!(matches!(
			Encoder::new(&mut sink, &mut OsRng, "pw", 0, &opts),
			Err(Error::PathTraversal { .. })
		));
	}

	#[test]
	fn empty_entry_has_no_payload_frame() {
		let mut out = Vec::new();
		let mut csprng = OsRng;
		let mut encoder =
			Encoder::new(&mut out, &mut csprng, "pw", 1, &PackOptions::default()).unwrap();
		encoder.add_entry("empty.txt", 0o644, b"").unwrap();
		encoder.finish().unwrap();

		assert_eq!(&out[0..4], b"SLM\0");
		assert_eq!(out.len(), HEADER_SIZE + ENTRY_SIZE);
	}

	#[test]
	fn non_empty_entry_carries_a_framed_payload() {
		let mut out = Vec::new();
		let mut csprng = OsRng;
		let mut encoder =
			Encoder::new(&mut out, &mut csprng, "pw", 1, &PackOptions::default()).unwrap();
		encoder.add_entry("small.txt", 0o644, b"hello").unwrap();
		encoder.finish().unwrap();

		// nonce + tag + at least one ciphertext byte after the entry record
		assert!(out.len() > HEADER_SIZE + ENTRY_SIZE + NONCE_SIZE + 16);
	}

	#[test]
	fn finish_requires_the_declared_count() {
		let mut out = Vec::new();
		let mut csprng = OsRng;
		let encoder =
			Encoder::new(&mut out, &mut csprng, "pw", 1, &PackOptions::default()).unwrap();
		assert!(matches!(
			encoder.finish(),
			Err(Error::EntryCountMismatch {
				declared: 1,
				written: 0
			})
		));
	}

	#[test]
	fn extra_entries_are_refused() {
		let mut out = Vec::new();
		let mut csprng = OsRng;
		let mut encoder =
			Encoder::new(&mut out, &mut csprng, "pw", 0, &PackOptions::default()).unwrap();
		assert!(matches!(
			encoder.add_entry("a", 0o644, b"x"),
			Err(Error::EntryCountMismatch { .. })
		));
	}

	#[test]
	fn bad_entry_names_are_refused() {
		let mut out = Vec::new();
		let mut csprng = OsRng;
		let mut encoder =
			Encoder::new(&mut out, &mut csprng, "pw", 1, &PackOptions::default()).unwrap();
		assert!(matches!(
			encoder.add_entry("../up", 0o644, b"x"),
			Err(Error::PathTraversal { .. })
		));
		assert!(matches!(
			encoder.add_entry("", 0o644, b"x"),
			Err(Error::InvalidEntryName { .. })
		));
	}
}
