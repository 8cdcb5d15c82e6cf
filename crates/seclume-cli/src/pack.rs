use std::{
	fs::File,
	io::{self, Write},
	path::{Component, Path, PathBuf},
};

use clap::{Parser, ValueEnum, ValueHint};
use miette::{bail, miette, IntoDiagnostic, Result};
use rand::rngs::OsRng;
use seclume::{
	codec::Compression,
	encode::{Encoder, PackOptions},
	MAX_FILES,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::password;

#[derive(Debug, Clone, Parser)]
pub struct PackArgs {
	/// Output archive file.
	#[arg(
		long,
		short,
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub output: PathBuf,

	/// Files and directories to pack.
	///
	/// Directories are walked recursively in sorted order, depth-first, so
	/// the same inputs always produce the same entry order.
	#[arg(
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
		required = true,
	)]
	pub paths: Vec<PathBuf>,

	/// Archive password. Prompted for (twice) when not given.
	#[arg(long, short, value_name = "PASSWORD")]
	pub password: Option<String>,

	/// Compression algorithm.
	#[arg(long, short = 'a', value_enum, default_value = "lzma")]
	pub algo: Algo,

	/// Compression level, 0 (store) to 9 (maximum).
	#[arg(
		long,
		short = 'L',
		default_value_t = 1,
		value_parser = clap::value_parser!(u8).range(0..=9),
	)]
	pub level: u8,

	/// Comment stored encrypted in the archive header.
	#[arg(long, value_name = "TEXT")]
	pub comment: Option<String>,

	/// Default extraction directory, stored encrypted in the header.
	///
	/// Used by 'unpack' when no target directory is given on its command
	/// line.
	#[arg(long, value_name = "DIR")]
	pub outdir: Option<String>,

	/// Exclude files whose archive path matches a glob pattern.
	///
	/// Matched against the forward-slash relative name each file gets in
	/// the archive. Can be given multiple times.
	#[arg(long, short = 'x', value_name = "GLOB")]
	pub exclude: Vec<String>,

	/// Overwrite the output file if it exists.
	#[arg(long, short = 'f')]
	pub force: bool,

	/// Do everything, including all crypto, except writing the archive.
	#[arg(long, short = 'n')]
	pub dry_run: bool,

	/// Skip the password strength check.
	#[arg(long)]
	pub allow_weak: bool,
}

/// Compression algorithm flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algo {
	/// zlib-wrapped DEFLATE.
	Zlib,
	/// LZMA.
	Lzma,
}

impl From<Algo> for Compression {
	fn from(algo: Algo) -> Self {
		match algo {
			Algo::Zlib => Compression::Deflate,
			Algo::Lzma => Compression::Lzma,
		}
	}
}

pub(crate) fn pack(args: PackArgs) -> Result<()> {
	let password = password::resolve(args.password.clone(), true)?;
	if !password::acceptable(&password, args.allow_weak) {
		bail!(
			"password too weak: need at least 8 characters mixing uppercase, lowercase, \
			digits, and special characters (or pass --allow-weak)"
		);
	}

	let excludes = args
		.exclude
		.iter()
		.map(|pattern| {
			glob::Pattern::new(pattern)
				.map_err(|err| miette!("invalid exclude pattern {pattern:?}: {err}"))
		})
		.collect::<Result<Vec<_>>>()?;

	info!("collecting input files");
	let inputs = collect_inputs(&args.paths, &excludes)?;
	if inputs.len() as u64 > u64::from(MAX_FILES) {
		bail!("too many input files ({} > {MAX_FILES})", inputs.len());
	}
	if inputs.is_empty() {
		warn!("no input files matched; the archive will be empty");
	}

	if !args.force && !args.dry_run && args.output.exists() {
		bail!(
			"output file {} exists, use --force to overwrite",
			args.output.display()
		);
	}

	let opts = PackOptions {
		algo: args.algo.into(),
		level: args.level,
		comment: args.comment.clone(),
		outdir: args.outdir.clone(),
	};

	if args.dry_run {
		info!("dry run: performing all work without writing");
		write_archive(&mut io::sink(), &password, &inputs, &opts)?;
		eprintln!("dry run: {} files OK", inputs.len());
	} else {
		let mut file = File::create(&args.output).into_diagnostic()?;
		write_archive(&mut file, &password, &inputs, &opts)?;
		eprintln!(
			"packed {} files into {}",
			inputs.len(),
			args.output.display()
		);
	}

	Ok(())
}

struct Input {
	path: PathBuf,
	name: String,
	mode: u32,
}

fn write_archive<W: Write>(
	writer: &mut W,
	password: &str,
	inputs: &[Input],
	opts: &PackOptions,
) -> Result<()> {
	let mut csprng = OsRng;
	let mut encoder = Encoder::new(writer, &mut csprng, password, inputs.len() as u32, opts)?;
	for input in inputs {
		debug!(path = %input.path.display(), name = %input.name, "read input file");
		let data = std::fs::read(&input.path).into_diagnostic()?;
		encoder.add_entry(&input.name, input.mode, &data)?;
	}
	encoder.finish()?;
	Ok(())
}

fn collect_inputs(paths: &[PathBuf], excludes: &[glob::Pattern]) -> Result<Vec<Input>> {
	let mut inputs = Vec::new();
	for path in paths {
		for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
			let entry = entry.map_err(|err| miette!("cannot read {}: {err}", path.display()))?;
			let meta = entry
				.metadata()
				.map_err(|err| miette!("cannot stat {}: {err}", entry.path().display()))?;
			if !meta.is_file() {
				continue;
			}

			let Some(name) = archive_name(entry.path()) else {
				warn!(path = %entry.path().display(), "skipping file with no archivable name");
				continue;
			};
			if excludes.iter().any(|pattern| pattern.matches(&name)) {
				debug!(%name, "excluded");
				continue;
			}

			let mode = posix_mode(&meta);
			inputs.push(Input {
				path: entry.into_path(),
				name,
				mode,
			});
		}
	}
	Ok(inputs)
}

/// The forward-slash relative name a file gets in the archive: the normal
/// components of its path, so `./src/lib.rs` and `src/lib.rs` agree and
/// leading roots or `..` never survive.
fn archive_name(path: &Path) -> Option<String> {
	let parts: Vec<_> = path
		.components()
		.filter_map(|component| match component {
			Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
			_ => None,
		})
		.collect();
	if parts.is_empty() {
		None
	} else {
		Some(parts.join("/"))
	}
}

#[cfg(unix)]
fn posix_mode(meta: &std::fs::Metadata) -> u32 {
	use std::os::unix::fs::MetadataExt;
	meta.mode()
}

#[cfg(not(unix))]
fn posix_mode(_meta: &std::fs::Metadata) -> u32 {
	0o644
}
