//! Archive decoder: the shared consumer prelude and the entry stream.
//!
//! Both consumers (extraction and listing) run the same state machine:
//! header read → header authenticated → entry metadata read → payload read
//! or skipped → … → done. Any authentication failure or short read aborts
//! the walk with the corresponding error.

use std::{
	fmt,
	io::{ErrorKind, Read, Seek, SeekFrom},
};

use tracing::{debug, trace};

use crate::{
	codec::{self, Compression},
	crypto,
	error::{Error, Result},
	format::{
		entry::{FileEntryPlain, ENTRY_PLAIN_SIZE, ENTRY_SIZE},
		header::{ArchiveHeader, HEADER_HMAC_LEN, HEADER_SIZE},
		path,
	},
	keys::KeySchedule,
	NONCE_SIZE, TAG_SIZE,
};

/// Archive decoder.
///
/// [`new`](Self::new) performs the whole consumer prelude: it reads and
/// bounds-checks the header, derives both keys, and verifies the header HMAC
/// in constant time. A wrong password and a tampered header fail identically
/// there. Afterwards [`next_entry`](Self::next_entry) streams the metadata
/// records in order, and each record's payload is either
/// [read](Self::read_payload) or [skipped](Self::skip_payload).
pub struct Decoder<R: Read + Seek> {
	reader: R,
	header: ArchiveHeader,
	algo: Compression,
	keys: KeySchedule,
	next_index: u32,
}

impl<R: Read + Seek> fmt::Debug for Decoder<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Decoder")
			.field("header", &self.header)
			.field("algo", &self.algo)
			.field("next_index", &self.next_index)
			.finish_non_exhaustive()
	}
}

impl<R: Read + Seek> Decoder<R> {
	/// Read and authenticate the archive header, deriving both keys.
	pub fn new(mut reader: R, password: &str) -> Result<Self> {
		let mut raw = [0u8; HEADER_SIZE];
		reader.read_exact(&mut raw).map_err(|err| {
			if err.kind() == ErrorKind::UnexpectedEof {
				Error::TruncatedHeader
			} else {
				Error::Io(err)
			}
		})?;

		let header = ArchiveHeader::from_bytes(&raw)?;
		let algo = header.effective_algo()?;
		debug!(
			version = header.version,
			entries = header.file_count,
			algo = %algo,
			level = header.level,
			"read archive header"
		);

		trace!("derive encryption keys");
		let keys = KeySchedule::derive(password, &header.salt);

		let expected = crypto::hmac_sha256(&keys.file, &raw[..HEADER_HMAC_LEN]);
		if !crypto::constant_time_eq(&expected, &header.hmac) {
			return Err(Error::HeaderAuth);
		}
		trace!("verified header HMAC");

		Ok(Self {
			reader,
			header,
			algo,
			keys,
			next_index: 0,
		})
	}

	/// The authenticated archive header.
	pub fn header(&self) -> &ArchiveHeader {
		&self.header
	}

	/// Compression algorithm for every payload in this archive.
	pub fn algo(&self) -> Compression {
		self.algo
	}

	/// Number of entries the header declares.
	pub fn file_count(&self) -> u32 {
		self.header.file_count
	}

	/// Index of the next entry [`next_entry`](Self::next_entry) will return.
	pub fn next_index(&self) -> u32 {
		self.next_index
	}

	/// Decrypt the archive comment, if one was stored.
	pub fn comment(&self) -> Result<Option<String>> {
		self.header.open_comment(&self.keys.meta)
	}

	/// Decrypt and re-validate the stored output directory, if any.
	///
	/// Only version 6 archives carry one. The decoded string is checked
	/// against the traversal rule even though it authenticated: the party
	/// that chose the archive may not be the party extracting it.
	pub fn stored_outdir(&self) -> Result<Option<String>> {
		if self.header.version < 6 {
			return Ok(None);
		}
		let Some(outdir) = self.header.open_outdir(&self.keys.meta)? else {
			return Ok(None);
		};
		if path::has_traversal(&outdir) {
			return Err(Error::PathTraversal { path: outdir });
		}
		Ok(Some(outdir))
	}

	/// Read and decrypt the next entry's metadata record.
	///
	/// Returns `None` once every declared entry has been read. The record
	/// is authenticated but not yet validated; callers apply
	/// [`FileEntryPlain::validate`] and decide how violations map to their
	/// operation.
	pub fn next_entry(&mut self) -> Result<Option<FileEntryPlain>> {
		if self.next_index == self.header.file_count {
			return Ok(None);
		}
		let index = self.next_index;
		self.next_index += 1;

		let mut raw = [0u8; ENTRY_SIZE];
		self.reader.read_exact(&mut raw).map_err(|err| {
			if err.kind() == ErrorKind::UnexpectedEof {
				Error::TruncatedEntry { index }
			} else {
				Error::Io(err)
			}
		})?;

		let nonce: [u8; NONCE_SIZE] = raw[..NONCE_SIZE].try_into().expect("slice length fixed");
		let tag: [u8; TAG_SIZE] = raw[NONCE_SIZE..NONCE_SIZE + TAG_SIZE]
			.try_into()
			.expect("slice length fixed");
		let plain = crypto::aead_open(
			&self.keys.meta,
			&nonce,
			&raw[NONCE_SIZE + TAG_SIZE..],
			&tag,
		)
		.map_err(|_| Error::EntryAuth { index })?;

		let plain: [u8; ENTRY_PLAIN_SIZE] = plain
			.try_into()
			.expect("AES-GCM preserves plaintext length");
		trace!(index, "decrypted entry metadata");
		Ok(Some(FileEntryPlain::from_bytes(&plain)))
	}

	/// Read, decrypt, and decompress the payload frame for `entry`.
	///
	/// `index` is the entry's position, for error reporting. Empty entries
	/// have no frame and yield an empty buffer. The plaintext is complete
	/// and verified in memory before this returns, so a tampered payload
	/// never reaches the filesystem.
	pub fn read_payload(&mut self, index: u32, entry: &FileEntryPlain) -> Result<Vec<u8>> {
		if entry.compressed_size == 0 {
			return Ok(Vec::new());
		}
		let len = usize::try_from(entry.compressed_size)
			.map_err(|_| Error::Io(std::io::Error::other("payload too large for this platform")))?;

		let mut frame_head = [0u8; NONCE_SIZE + TAG_SIZE];
		let mut ciphertext = vec![0u8; len];
		let read = self
			.reader
			.read_exact(&mut frame_head)
			.and_then(|()| self.reader.read_exact(&mut ciphertext));
		read.map_err(|err| {
			if err.kind() == ErrorKind::UnexpectedEof {
				Error::TruncatedEntry { index }
			} else {
				Error::Io(err)
			}
		})?;

		let nonce: [u8; NONCE_SIZE] = frame_head[..NONCE_SIZE]
			.try_into()
			.expect("slice length fixed");
		let tag: [u8; TAG_SIZE] = frame_head[NONCE_SIZE..]
			.try_into()
			.expect("slice length fixed");
		let compressed = crypto::aead_open(&self.keys.file, &nonce, &ciphertext, &tag)
			.map_err(|_| Error::PayloadAuth { index })?;
		trace!(index, bytes = compressed.len(), "decrypted payload");

		codec::decompress(&compressed, self.algo, entry.original_size)
	}

	/// Seek past the payload frame for `entry` without reading it.
	///
	/// Only safe when the entry metadata authenticated, because the skip
	/// distance comes from `compressed_size`.
	pub fn skip_payload(&mut self, entry: &FileEntryPlain) -> Result<()> {
		if entry.compressed_size == 0 {
			return Ok(());
		}
		let distance = entry
			.compressed_size
			.checked_add((NONCE_SIZE + TAG_SIZE) as u64)
			.and_then(|total| i64::try_from(total).ok())
			.ok_or_else(|| Error::Io(std::io::Error::other("payload size out of range")))?;
		self.reader.seek(SeekFrom::Current(distance))?;
		Ok(())
	}
}
