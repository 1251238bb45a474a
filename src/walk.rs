#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::*;
use walkdir::WalkDir;

////////////////////////////////////////////////////////////////////////////////

/// Lazily yields every regular file below a directory root, depth first.
///
/// Entries of one directory come out sorted by file name. Symbolic links are
/// not followed, so they are neither reported nor descended into.
pub struct RegularFiles {
    inner: walkdir::IntoIter,
}

impl RegularFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            inner: WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        }
    }
}

impl Iterator for RegularFiles {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf);
                    return Some(Err(err).with_context(|| match path {
                        Some(path) => format!("failed to walk {}", path.display()),
                        None => "failed to walk directory".to_owned(),
                    }));
                }
            };

            if entry.file_type().is_file() {
                return Some(Ok(entry.into_path()));
            }
            trace!("skipping {}", entry.path().display());
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
