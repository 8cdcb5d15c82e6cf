//! Compression codec over in-memory buffers.
//!
//! Two algorithm families are supported: zlib-wrapped DEFLATE and the LZMA
//! container. Decompression is bounded: it never produces more bytes than
//! the caller declares, so a hostile archive cannot expand past the size its
//! authenticated metadata promises.

use std::io::{Cursor, Read, Write};

use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression as DeflateLevel;

use crate::error::{Error, Result};

/// Compression algorithms an archive may use.
///
/// The discriminants are the header's `compression_algo` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
	/// zlib-wrapped DEFLATE.
	Deflate = 1,
	/// LZMA container.
	Lzma = 2,
}

impl Compression {
	/// The header byte for this algorithm.
	pub fn as_u8(self) -> u8 {
		self as u8
	}

	/// Decode a header byte.
	pub fn from_u8(value: u8) -> Result<Self> {
		match value {
			1 => Ok(Compression::Deflate),
			2 => Ok(Compression::Lzma),
			other => Err(Error::BadCompressionAlgo(other)),
		}
	}

	/// Human-readable algorithm name.
	pub fn label(self) -> &'static str {
		match self {
			Compression::Deflate => "zlib",
			Compression::Lzma => "LZMA",
		}
	}
}

impl std::fmt::Display for Compression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}

/// Highest valid compression level. Level 0 is store mode.
pub const MAX_LEVEL: u8 = 9;

/// Compress `data` with `algo` at `level` (0–9).
pub fn compress(data: &[u8], algo: Compression, level: u8) -> Result<Vec<u8>> {
	if level > MAX_LEVEL {
		return Err(Error::BadCompressionLevel(level));
	}

	match algo {
		Compression::Deflate => {
			let mut encoder = ZlibEncoder::new(data, DeflateLevel::new(u32::from(level)));
			let mut out = Vec::new();
			encoder
				.read_to_end(&mut out)
				.map_err(|err| Error::Compress(err.to_string()))?;
			Ok(out)
		}
		Compression::Lzma => {
			// lzma-rs uses fixed encoder settings; the level byte is still
			// recorded in the header but only drives the DEFLATE path
			let mut out = Vec::new();
			lzma_rs::lzma_compress(&mut Cursor::new(data), &mut out)
				.map_err(|err| Error::Compress(err.to_string()))?;
			Ok(out)
		}
	}
}

/// Decompress `data` with `algo` into exactly `declared_len` bytes.
///
/// Streams that would produce more fail with
/// [`DecompressOverflow`](Error::DecompressOverflow) without the extra bytes
/// ever being buffered; streams that produce less fail with
/// [`DecompressShort`](Error::DecompressShort).
pub fn decompress(data: &[u8], algo: Compression, declared_len: u64) -> Result<Vec<u8>> {
	let out = match algo {
		Compression::Deflate => {
			let mut out = Vec::new();
			ZlibDecoder::new(data)
				.take(declared_len.saturating_add(1))
				.read_to_end(&mut out)
				.map_err(|err| Error::Decompress(err.to_string()))?;
			out
		}
		Compression::Lzma => {
			let mut sink = BoundedSink::new(declared_len);
			match lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut sink) {
				Ok(()) => {}
				Err(_) if sink.overflowed => {
					return Err(Error::DecompressOverflow {
						expected: declared_len,
					})
				}
				Err(err) => return Err(Error::Decompress(err.to_string())),
			}
			sink.buf
		}
	};

	if out.len() as u64 > declared_len {
		return Err(Error::DecompressOverflow {
			expected: declared_len,
		});
	}
	if (out.len() as u64) < declared_len {
		return Err(Error::DecompressShort {
			expected: declared_len,
			actual: out.len() as u64,
		});
	}
	Ok(out)
}

// lzma-rs decompresses through io::Write; capping the sink keeps a hostile
// stream from expanding past the declared size
struct BoundedSink {
	buf: Vec<u8>,
	limit: u64,
	overflowed: bool,
}

impl BoundedSink {
	fn new(limit: u64) -> Self {
		Self {
			buf: Vec::new(),
			limit,
			overflowed: false,
		}
	}
}

impl Write for BoundedSink {
	fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
		if self.buf.len() as u64 + data.len() as u64 > self.limit {
			self.overflowed = true;
			return Err(std::io::Error::other("declared output size exceeded"));
		}
		self.buf.extend_from_slice(data);
		Ok(data.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}
