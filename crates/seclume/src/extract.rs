//! Extraction: verify an archive and materialize its entries on disk.

use std::{
	fs,
	io::{BufReader, Read, Seek},
	path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
	decode::Decoder,
	error::{Error, Result},
	format::entry::EntryViolation,
};

/// Options for [`extract_archive`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
	/// Target directory. Always wins over a directory stored in the archive.
	pub outdir: Option<PathBuf>,
	/// Replace existing files instead of refusing.
	pub overwrite: bool,
}

/// What an extraction accomplished.
#[derive(Debug, Clone)]
pub struct ExtractSummary {
	/// Number of files materialized.
	pub files: u32,
	/// Directory the files were written under.
	pub destination: PathBuf,
}

/// Verify `archive` under `password` and write every entry below the
/// resolved extraction directory.
///
/// Each payload is decrypted and decompressed entirely in memory before its
/// file is created, so an authentication failure aborts the run without the
/// tampered entry ever reaching its final name. Permission restoration is
/// best-effort: platforms without POSIX permission bits only cost a warning.
pub fn extract_archive(
	archive: &Path,
	password: &str,
	opts: &ExtractOptions,
) -> Result<ExtractSummary> {
	let file = fs::File::open(archive)?;
	let mut decoder = Decoder::new(BufReader::new(file), password)?;

	let destination = resolve_destination(&decoder, opts.outdir.as_deref())?;
	info!(
		archive = %archive.display(),
		destination = %destination.display(),
		entries = decoder.file_count(),
		"extracting archive"
	);

	let mut files = 0u32;
	while let Some(entry) = decoder.next_entry()? {
		let index = decoder.next_index() - 1;
		let name = entry
			.validate()
			.map_err(|violation| match violation {
				EntryViolation::Traversal => Error::PathTraversal {
					path: entry.name_lossy(),
				},
				violation => Error::InvalidMetadata { index, violation },
			})?
			.to_owned();

		let target = destination.join(&name);
		if target.exists() && !opts.overwrite {
			return Err(Error::DestinationExists { path: target });
		}
		if let Some(parent) = target.parent() {
			if !parent.as_os_str().is_empty() {
				// strict: an existing non-directory component is an error
				fs::create_dir_all(parent)?;
			}
		}

		let data = decoder.read_payload(index, &entry)?;
		fs::write(&target, &data)?;
		apply_mode(&target, entry.mode);
		debug!(name = %name, bytes = data.len(), "extracted file");
		files += 1;
	}

	info!(files, "extraction complete");
	Ok(ExtractSummary { files, destination })
}

/// Pick the extraction directory: caller-supplied, else the archive's stored
/// directory, else the current directory; anything that fails a stat check
/// falls back to the current directory, which must itself be accessible.
fn resolve_destination<R: Read + Seek>(
	decoder: &Decoder<R>,
	requested: Option<&Path>,
) -> Result<PathBuf> {
	let chosen = match requested {
		Some(dir) => Some(dir.to_path_buf()),
		None => decoder.stored_outdir()?.map(PathBuf::from),
	};

	let destination = match chosen {
		Some(dir) if is_dir(&dir) => dir,
		Some(dir) => {
			warn!(
				directory = %dir.display(),
				"output directory is missing or not a directory, falling back to the current directory"
			);
			PathBuf::from(".")
		}
		None => PathBuf::from("."),
	};

	if !is_dir(&destination) {
		return Err(Error::Io(std::io::Error::other(
			"current directory is not accessible",
		)));
	}
	Ok(destination)
}

fn is_dir(path: &Path) -> bool {
	fs::metadata(path).map(|meta| meta.is_dir()).unwrap_or(false)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
	use std::os::unix::fs::PermissionsExt;
	if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
		warn!(path = %path.display(), %err, "failed to restore permissions");
	}
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}
