#![forbid(unsafe_code)]

use std::{io, path::PathBuf};

use anyhow::{ensure, Result};
use structopt::StructOpt;

use zlibdec::{ErrorMode, LabelStyle, Options, Outcome};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "zlibdec",
    about = "Decompress a zlib file, or every file below a directory"
)]
struct Opts {
    /// File or directory to decompress
    #[structopt(parse(from_os_str))]
    path: PathBuf,

    /// How files are labelled in directory mode
    #[structopt(long, default_value = "oid", possible_values = &LabelStyle::VARIANTS)]
    label: LabelStyle,

    /// Whether a broken file aborts a directory walk or is skipped
    #[structopt(long, default_value = "strict", possible_values = &["strict", "lenient"])]
    on_error: ErrorMode,

    /// Silence all log output
    #[structopt(short, long)]
    quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

fn main() -> Result<()> {
    let opts = Opts::from_args();

    stderrlog::new()
        .module(module_path!())
        .quiet(opts.quiet)
        .verbosity(opts.verbose + 1)
        .timestamp(stderrlog::Timestamp::Off)
        .init()?;

    let options = Options {
        label: opts.label,
        mode: opts.on_error,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Outcome::Directory { processed, failed } = zlibdec::run(&opts.path, &options, &mut out)? {
        ensure!(
            failed == 0,
            "{} of {} files failed to decompress",
            failed,
            processed + failed
        );
    }
    Ok(())
}
