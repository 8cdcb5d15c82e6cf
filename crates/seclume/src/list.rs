//! Listing: walk an archive's metadata without touching payloads.

use std::{fs, io::BufReader, path::Path};

use tracing::warn;

use crate::{
	decode::Decoder,
	error::{Error, Result},
};

/// One row of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
	/// POSIX permission bits.
	pub mode: u32,
	/// Uncompressed size in bytes.
	pub size: u64,
	/// Entry name.
	pub name: String,
}

/// Result of walking an archive's metadata.
#[derive(Debug, Clone)]
pub struct Listing {
	/// Rows for entries whose metadata authenticated and validated.
	pub entries: Vec<ListEntry>,
	/// Entries that could not be processed.
	pub failed: u32,
}

/// Walk `archive`'s entry metadata under `password`.
///
/// Payloads are never decrypted; the walk seeks past them using the
/// authenticated `compressed_size`. A record that authenticates but violates
/// the format invariants is counted and skipped. A record that fails
/// authentication is counted and ends the walk: without trusted metadata
/// there is no payload length to skip by, and guessing is worse than
/// stopping.
pub fn list_archive(archive: &Path, password: &str) -> Result<Listing> {
	let file = fs::File::open(archive)?;
	let mut decoder = Decoder::new(BufReader::new(file), password)?;

	let mut entries = Vec::with_capacity(decoder.file_count() as usize);
	let mut failed = 0u32;
	loop {
		let entry = match decoder.next_entry() {
			Ok(Some(entry)) => entry,
			Ok(None) => break,
			Err(Error::EntryAuth { index }) => {
				warn!(
					index,
					"entry metadata failed authentication; stopping, payload length untrusted"
				);
				failed += 1;
				break;
			}
			Err(err) => return Err(err),
		};
		let index = decoder.next_index() - 1;

		match entry.validate() {
			Ok(name) => {
				entries.push(ListEntry {
					mode: entry.mode,
					size: entry.original_size,
					name: name.to_owned(),
				});
			}
			Err(violation) => {
				warn!(index, %violation, "invalid entry metadata, skipping");
				failed += 1;
			}
		}
		decoder.skip_payload(&entry)?;
	}

	Ok(Listing { entries, failed })
}

/// Render POSIX permission bits in `ls -l` style, 10 characters.
pub fn mode_string(mode: u32) -> String {
	let mut out = String::with_capacity(10);
	out.push(if mode & 0o040000 != 0 { 'd' } else { '-' });
	for shift in [6u32, 3, 0] {
		let bits = mode >> shift;
		out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
		out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
		out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mode_strings_render_like_ls() {
		assert_eq!(mode_string(0o644), "-rw-r--r--");
		assert_eq!(mode_string(0o755), "-rwxr-xr-x");
		assert_eq!(mode_string(0o600), "-rw-------");
		assert_eq!(mode_string(0o040755), "drwxr-xr-x");
		assert_eq!(mode_string(0), "----------");
		assert_eq!(mode_string(0o777), "-rwxrwxrwx");
	}
}
