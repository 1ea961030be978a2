// Copyright 2023 Viktor Reusch
//
// This file is part of tcx_garmin_convert.
//
// tcx_garmin_convert is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// tcx_garmin_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with tcx_garmin_convert. If not, see <https://www.gnu.org/licenses/>.

//! This is a simple command-line interface for the Huawei-to-Garmin TCX
//! converter.

use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use tcx_garmin_convert::{transform, Document, LapOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Extension of written files.
const EXTENSION: &str = "tcx";
/// Environment variable holding the log filter; `RUST_LOG` is the fallback.
const LOG_ENV: &str = "TCX_CONVERT_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Convert a TCX file recorded with a Huawei watch into a TCX file which
/// Garmin Connect accepts.
///
/// The result is written to a new file with a random name.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// TCX file exported from the watch
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Total number of calories burned during the whole activity
    #[arg(value_name = "CALORIES")]
    calories: u32,

    /// Average heart rate in beats per minute
    #[arg(long, value_name = "BPM")]
    avg_bpm: Option<u8>,

    /// Maximum heart rate in beats per minute
    #[arg(long, value_name = "BPM")]
    max_bpm: Option<u8>,

    /// Cadence in steps per minute
    #[arg(long, value_name = "SPM")]
    cadence: Option<u8>,

    /// Directory the converted file is written to
    #[arg(long, value_name = "DIR", env = "TCX_CONVERT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();
    match run(&args) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Conversion failed with: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install a stderr subscriber filtered by [`LOG_ENV`] or `RUST_LOG`.
fn init_logging() {
    let filter = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

/// Convert the file given in `args` and return the path of the result.
fn run(args: &Args) -> Result<PathBuf> {
    info!("converting {}", args.file.display());
    let source = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let document = Document::parse(source.as_slice())
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    let options = LapOptions {
        avg_bpm: args.avg_bpm,
        max_bpm: args.max_bpm,
        cadence: args.cadence,
    };
    let document = transform(document, args.calories, &options)?;

    let path = output_path(&args.output_dir);
    write(&document, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("saved as {}", path.display());
    Ok(path)
}

/// Fresh file name inside of `dir`.
fn output_path(dir: &Path) -> PathBuf {
    dir.join(Uuid::new_v4().to_string()).with_extension(EXTENSION)
}

/// Write `document` to a newly created file at `path`.
fn write(document: &Document, path: &Path) -> Result<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut sink = BufWriter::new(file);
    document.write(&mut sink)?;
    sink.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn output_path_is_unique_tcx() {
        let first = output_path(Path::new("out"));
        let second = output_path(Path::new("out"));

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("out")));
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some(EXTENSION));
    }
}
