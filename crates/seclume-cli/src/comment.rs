use std::{fs::File, io::BufReader, path::PathBuf};

use clap::{Parser, ValueHint};
use miette::{IntoDiagnostic, Result};
use seclume::decode::Decoder;

use crate::password;

#[derive(Debug, Clone, Parser)]
pub struct CommentArgs {
	/// Input archive.
	#[arg(
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub input: PathBuf,

	/// Archive password. Prompted for when not given.
	#[arg(long, short, value_name = "PASSWORD")]
	pub password: Option<String>,
}

pub(crate) fn comment(args: CommentArgs) -> Result<()> {
	let password = password::resolve(args.password.clone(), false)?;

	let file = File::open(&args.input).into_diagnostic()?;
	let decoder = Decoder::new(BufReader::new(file), &password)?;

	match decoder.comment()? {
		Some(comment) => println!("{comment}"),
		None => eprintln!("no comment stored in {}", args.input.display()),
	}
	Ok(())
}
