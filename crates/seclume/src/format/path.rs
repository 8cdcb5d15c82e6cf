//! Path-traversal validation for entry names and stored directories.

use crate::{
	error::{Error, Result},
	MAX_FILENAME,
};

/// True when `path` contains a component that could escape the extraction
/// root.
///
/// A path is rejected when `../` or `..\` appears anywhere in it, when the
/// whole string is `..`, or when — after stripping a single leading `/` — it
/// starts with a `..` component.
pub fn has_traversal(path: &str) -> bool {
	if path.contains("../") || path.contains("..\\") || path == ".." {
		return true;
	}
	let trimmed = path.strip_prefix('/').unwrap_or(path);
	match trimmed.strip_prefix("..") {
		Some(rest) => rest.is_empty() || rest.starts_with('/'),
		None => false,
	}
}

/// Validate a name for storage in an entry record: non-empty, fits the
/// 256-byte filename field with its NUL terminator, no interior NULs, and
/// traversal-free.
pub fn validate_entry_name(name: &str) -> Result<()> {
	if has_traversal(name) {
		return Err(Error::PathTraversal { path: name.into() });
	}
	let reason = if name.is_empty() {
		"empty name"
	} else if name.len() > MAX_FILENAME - 1 {
		"longer than 255 bytes"
	} else if name.as_bytes().contains(&0) {
		"contains a NUL byte"
	} else {
		return Ok(());
	};
	Err(Error::InvalidEntryName {
		name: name.into(),
		reason,
	})
}
