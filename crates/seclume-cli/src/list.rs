use std::path::PathBuf;

use clap::{Parser, ValueHint};
use miette::{bail, Result};
use seclume::list::{list_archive, mode_string};

use crate::password;

#[derive(Debug, Clone, Parser)]
pub struct ListArgs {
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

pub(crate) fn list(args: ListArgs) -> Result<()> {
	let password = password::resolve(args.password.clone(), false)?;
	let listing = list_archive(&args.input, &password)?;

	println!("Contents of {}:", args.input.display());
	println!("{:<11} {:<12} {}", "Permissions", "Size", "Filename");
	println!("{:<11} {:<12} {}", "-----------", "------------", "--------");
	for entry in &listing.entries {
		println!(
			"{:<11} {:>12} {}",
			mode_string(entry.mode),
			entry.size,
			entry.name
		);
	}

	if listing.failed > 0 {
		bail!("{} file entries could not be processed", listing.failed);
	}
	Ok(())
}
