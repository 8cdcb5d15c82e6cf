use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::{comment::CommentArgs, list::ListArgs, pack::PackArgs, unpack::UnpackArgs};

/// Seclume: password-authenticated encrypted archives.
///
/// Seclume packages files into a single `.slm` container that is compressed,
/// encrypted, and tamper-evident under a password-derived key. Confidentiality
/// and integrity come first; compression is along for the ride.
#[derive(Debug, Clone, Parser)]
#[command(
	name = "seclume",
	bin_name = "seclume",
	author,
	version,
	after_help = "Want more detail? Try the long '--help' flag!"
)]
#[cfg_attr(debug_assertions, command(before_help = "⚠ DEBUG BUILD ⚠"))]
pub struct Args {
	/// Set diagnostic log level
	///
	/// This enables diagnostic logging, which is useful for investigating
	/// archive failures or simply watching what the codec is doing. Use
	/// multiple times to increase verbosity, up to '-vvvv'.
	///
	/// If $RUST_LOG is set, this flag is ignored.
	#[arg(long, short, action = ArgAction::Count)]
	pub verbose: u8,

	/// Write diagnostic logs to a file
	///
	/// Writes diagnostic logs to a file in JSON format instead of the
	/// terminal. If the path is a directory, a timestamped file is created
	/// inside it. Only takes effect together with '--verbose'.
	#[arg(
		long,
		num_args = 0..=1,
		default_missing_value = ".",
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub log_file: Option<PathBuf>,

	/// What to do
	#[command(subcommand)]
	pub action: Action,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
	/// Pack files into an encrypted archive.
	Pack(PackArgs),

	/// Verify an archive and extract its files.
	Unpack(UnpackArgs),

	/// List an archive's contents without extracting.
	List(ListArgs),

	/// Show the comment stored in an archive.
	Comment(CommentArgs),
}
