#![forbid(unsafe_code)]

use std::{
    fmt, fs,
    io::Write,
    path::Path,
    str::FromStr,
};

use anyhow::{bail, Context, Error, Result};
use log::*;

use crate::{label::LabelStyle, walk::RegularFiles};

////////////////////////////////////////////////////////////////////////////////

pub const NOT_FOUND_MESSAGE: &str = "Path does not exist!";
pub const LABEL_PREFIX: &str = "OID: ";
pub const SEPARATOR: &str = "---";

////////////////////////////////////////////////////////////////////////////////

/// What happens when one file of a directory walk cannot be decompressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMode {
    /// Abort the whole walk on the first failure.
    Strict,
    /// Log the failure, skip the file and carry on.
    Lenient,
}

impl Default for ErrorMode {
    fn default() -> Self {
        Self::Strict
    }
}

impl FromStr for ErrorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => bail!("unknown error mode {:?}", other),
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub label: LabelStyle,
    pub mode: ErrorMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The input path does not exist; only the not-found message was printed.
    Missing,
    /// A single file was decompressed.
    File,
    /// A directory was walked. `failed` is always zero in strict mode.
    Directory { processed: usize, failed: usize },
}

////////////////////////////////////////////////////////////////////////////////

/// Decompress `path` (a zlib file or a directory of them) and report the
/// result to `out`.
pub fn run<W: Write>(path: &Path, options: &Options, out: &mut W) -> Result<Outcome> {
    let outcome = if !path.exists() {
        info!("{} does not exist", path.display());
        writeln!(out, "{}", NOT_FOUND_MESSAGE)?;
        Outcome::Missing
    } else if path.is_dir() {
        report_directory(path, options, out)?
    } else {
        report_file(path, out)?;
        Outcome::File
    };
    out.flush()?;
    Ok(outcome)
}

fn report_file<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    info!("decompressing {}", path.display());
    let payload = decompress_file(path)?;
    out.write_all(&payload)?;
    writeln!(out)?;
    Ok(())
}

fn report_directory<W: Write>(root: &Path, options: &Options, out: &mut W) -> Result<Outcome> {
    info!("walking {} ({} mode)", root.display(), options.mode);

    let mut processed = 0;
    let mut failed = 0;
    for entry in RegularFiles::new(root) {
        let result = entry.and_then(|path| {
            let payload = decompress_file(&path)?;
            Ok((path, payload))
        });

        let (path, payload) = match (result, options.mode) {
            (Ok(found), _) => found,
            (Err(err), ErrorMode::Strict) => return Err(err),
            (Err(err), ErrorMode::Lenient) => {
                error!("{:#}", err);
                failed += 1;
                continue;
            }
        };

        writeln!(out, "{}{}", LABEL_PREFIX, options.label.label(&path))?;
        out.write_all(&payload)?;
        writeln!(out)?;
        writeln!(out, "{}", SEPARATOR)?;
        processed += 1;
    }

    info!("{} files decompressed, {} failed", processed, failed);
    Ok(Outcome::Directory { processed, failed })
}

fn decompress_file(path: &Path) -> Result<Vec<u8>> {
    let compressed =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    debug!("read {} bytes from {}", compressed.len(), path.display());
    crate::decompress_to_vec(&compressed)
        .with_context(|| format!("failed to decompress {}", path.display()))
}

////////////////////////////////////////////////////////////////////////////////
