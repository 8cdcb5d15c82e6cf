use std::path::PathBuf;

use clap::{Parser, ValueHint};
use miette::Result;
use seclume::extract::{extract_archive, ExtractOptions};
use tracing::info;

use crate::password;

#[derive(Debug, Clone, Parser)]
pub struct UnpackArgs {
	/// Input archive.
	#[arg(
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub input: PathBuf,

	/// Extract into this directory.
	///
	/// Overrides any default directory stored in the archive. Without
	/// either, files land in the current directory.
	#[arg(
		long,
		short,
		value_hint = ValueHint::DirPath,
		value_name = "DIR",
	)]
	pub outdir: Option<PathBuf>,

	/// Archive password. Prompted for when not given.
	#[arg(long, short, value_name = "PASSWORD")]
	pub password: Option<String>,

	/// Overwrite existing files.
	#[arg(long, short = 'f')]
	pub force: bool,
}

pub(crate) fn unpack(args: UnpackArgs) -> Result<()> {
	let password = password::resolve(args.password.clone(), false)?;

	info!(archive = %args.input.display(), "unpacking");
	let summary = extract_archive(
		&args.input,
		&password,
		&ExtractOptions {
			outdir: args.outdir.clone(),
			overwrite: args.force,
		},
	)?;

	eprintln!(
		"unpacked {} files into {}",
		summary.files,
		summary.destination.display()
	);
	Ok(())
}
