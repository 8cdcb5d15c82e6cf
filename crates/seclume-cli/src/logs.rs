//! Diagnostic logging setup.
//!
//! `RUST_LOG` wins when set; otherwise `-v` repetition picks the level and
//! `--log-file` redirects JSON-formatted logs to a file.

use std::{
	env::var,
	fs::{metadata, File},
	io::{Error, Result},
	path::{Path, PathBuf},
	sync::Mutex,
};

use tracing::info;

use crate::args::Args;

pub fn from_env() -> Result<bool> {
	if var("RUST_LOG").is_ok() {
		tracing_subscriber::fmt::try_init().map_err(Error::other)?;
		Ok(true)
	} else {
		Ok(false)
	}
}

pub fn from_args(args: &Args) -> Result<()> {
	if args.verbose == 0 {
		return Ok(());
	}

	let filter = match args.verbose {
		1 => "warn",
		2 => "info",
		3 => "debug",
		_ => "trace",
	};
	let builder = tracing_subscriber::fmt().with_env_filter(filter);

	let init = if let Some(file) = &args.log_file {
		let writer = File::create(log_file_path(file))?;
		builder.json().with_writer(Mutex::new(writer)).try_init()
	} else {
		builder.try_init()
	};

	match init {
		Ok(()) => info!(%filter, "logging initialised"),
		Err(err) => eprintln!("Failed to initialise logging, continuing with none\n{err}"),
	}

	Ok(())
}

// a directory gets a timestamped file created inside it
fn log_file_path(file: &Path) -> PathBuf {
	let is_dir = metadata(file).map_or(false, |info| info.is_dir());
	if is_dir {
		file.join(format!(
			"seclume.{}.log",
			chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
		))
	} else {
		file.to_owned()
	}
}
