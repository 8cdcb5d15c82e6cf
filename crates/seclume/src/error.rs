//! Error types shared by the encoder, decoder, and consumer operations.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::format::entry::EntryViolation;

/// Convenience return type.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while producing or consuming an archive.
///
/// Authentication failures deliberately carry no detail beyond their
/// position: a wrong password and a tampered archive are indistinguishable.
#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
	/// I/O error on the archive or an input/output file.
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// The file does not start with the archive magic.
	#[error("not a seclume archive (bad magic)")]
	BadMagic,

	/// The archive was written by an unsupported format version.
	#[error("unsupported archive version {0}, this build reads versions 4 to 6")]
	UnsupportedVersion(u8),

	/// The header names a compression algorithm this build does not know.
	#[error("invalid compression algorithm in header ({0})")]
	BadCompressionAlgo(u8),

	/// Compression level outside 0–9.
	#[error("invalid compression level {0}, expected 0 to 9")]
	BadCompressionLevel(u8),

	/// The file ended before a complete header could be read.
	#[error("archive header is truncated")]
	TruncatedHeader,

	/// The file ended in the middle of an entry or its payload.
	#[error("entry {index}: archive is truncated")]
	TruncatedEntry {
		/// Zero-based entry index.
		index: u32,
	},

	/// A header field violates its bounds.
	#[error("malformed header: bad {field}")]
	MalformedHeader {
		/// Which field was out of bounds.
		field: &'static str,
	},

	/// The header HMAC did not verify.
	#[error("header authentication failed (wrong password or corrupted archive)")]
	HeaderAuth,

	/// An entry's metadata record did not authenticate.
	#[error("entry {index}: metadata authentication failed")]
	EntryAuth {
		/// Zero-based entry index.
		index: u32,
	},

	/// An entry's payload frame did not authenticate.
	#[error("entry {index}: payload authentication failed")]
	PayloadAuth {
		/// Zero-based entry index.
		index: u32,
	},

	/// A sealed header region (comment or stored output directory) did not
	/// authenticate.
	#[error("{field} could not be decrypted")]
	FieldAuth {
		/// Which region failed.
		field: &'static str,
	},

	/// A decrypted metadata record violates the format invariants.
	#[error("entry {index}: invalid metadata: {violation}")]
	InvalidMetadata {
		/// Zero-based entry index.
		index: u32,
		/// The specific invariant violated.
		violation: EntryViolation,
	},

	/// A name contains a component that could escape the extraction root.
	#[error("path traversal detected in {path:?}")]
	PathTraversal {
		/// The offending name.
		path: String,
	},

	/// Refusing to replace an existing file without the overwrite flag.
	#[error("destination {path:?} already exists")]
	DestinationExists {
		/// The file that was already present.
		path: PathBuf,
	},

	/// An entry name the packer cannot store.
	#[error("invalid entry name {name:?}: {reason}")]
	InvalidEntryName {
		/// The rejected name.
		name: String,
		/// Why it was rejected.
		reason: &'static str,
	},

	/// The codec failed to compress.
	#[error("compression failed: {0}")]
	Compress(String),

	/// The codec failed to decompress.
	#[error("decompression failed: {0}")]
	Decompress(String),

	/// Decompression would have produced more than the declared size.
	#[error("decompressed data exceeds the declared size of {expected} bytes")]
	DecompressOverflow {
		/// Declared plaintext size.
		expected: u64,
	},

	/// Decompression produced less than the declared size.
	#[error("decompressed to {actual} bytes, expected {expected}")]
	DecompressShort {
		/// Declared plaintext size.
		expected: u64,
		/// Bytes actually produced.
		actual: u64,
	},

	/// The cryptographic backend refused an operation.
	#[error("cryptographic backend failure: {0}")]
	Crypto(&'static str),

	/// The OS entropy source failed.
	#[error("random generator failure: {0}")]
	Rng(String),

	/// A size or count bound was exceeded.
	#[error("{what} exceeds the limit of {limit} (got {actual})")]
	ResourceLimit {
		/// Which bound was hit.
		what: &'static str,
		/// The bound.
		limit: u64,
		/// The offending value.
		actual: u64,
	},

	/// The encoder was finished with a different number of entries than the
	/// header declares.
	#[error("archive declares {declared} entries but {written} were added")]
	EntryCountMismatch {
		/// Entry count written into the header.
		declared: u32,
		/// Entries actually added.
		written: u32,
	},
}
