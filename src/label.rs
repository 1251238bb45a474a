#![forbid(unsafe_code)]

use std::{fmt, path::Path, str::FromStr};

use anyhow::{bail, Error, Result};

////////////////////////////////////////////////////////////////////////////////

/// How a file found during a directory walk is named in the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelStyle {
    /// Object id of a loose git object: the two-character fan-out directory
    /// joined with the 38-character file name, cut from the end of the path.
    Oid,
    /// Bare file name.
    Name,
    /// Path as produced by the walk.
    Path,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::Oid
    }
}

impl LabelStyle {
    pub const VARIANTS: [&'static str; 3] = ["oid", "name", "path"];

    pub fn label(&self, path: &Path) -> String {
        match self {
            Self::Oid => oid_label(&path.to_string_lossy()),
            Self::Name => path
                .file_name()
                .unwrap_or(path.as_os_str())
                .to_string_lossy()
                .into_owned(),
            Self::Path => path.display().to_string(),
        }
    }
}

impl FromStr for LabelStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oid" => Ok(Self::Oid),
            "name" => Ok(Self::Name),
            "path" => Ok(Self::Path),
            other => bail!(
                "unknown label style {:?}, expected one of {:?}",
                other,
                Self::VARIANTS
            ),
        }
    }
}

impl fmt::Display for LabelStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Oid => "oid",
            Self::Name => "name",
            Self::Path => "path",
        };
        f.write_str(name)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// `path[-41:-39] + path[-38:]`, counted in characters and clamped at the
/// start of the string.
fn oid_label(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    let from_end = |n: usize| chars.len().saturating_sub(n);

    let fan_out = &chars[from_end(41)..from_end(39)];
    let rest = &chars[from_end(38)..];
    fan_out.iter().chain(rest).collect()
}

////////////////////////////////////////////////////////////////////////////////
