use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::format::BatchPos;

/// Extension of dense batch files as written by the game.
pub const BATCH_FILE_EXTENSION: &str = "optoctrees";

static BATCH_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^compiled-batch-(-?[0-9]+)-(-?[0-9]+)-(-?[0-9]+)\.optoctrees$").expect("batch file name pattern is valid")
});

impl BatchPos {
    /// Parses names of the form `compiled-batch-{x}-{y}-{z}.optoctrees`. Coordinates outside of the `i16` range
    /// are rejected, as are names that differ from [`BatchPos::file_name`] (leading zeros, `-0`), so every
    /// position maps to exactly one file name.
    pub fn from_file_name(name: &str) -> Option<BatchPos> {
        let captures = BATCH_FILE_NAME.captures(name)?;
        let x = captures[1].parse().ok()?;
        let y = captures[2].parse().ok()?;
        let z = captures[3].parse().ok()?;
        let pos = BatchPos::new(x, y, z);
        (pos.file_name() == name).then_some(pos)
    }

    /// Parses the batch position from the file name component of `path`.
    pub fn from_path(path: &Path) -> Option<BatchPos> {
        path.file_name()?.to_str().and_then(BatchPos::from_file_name)
    }

    pub fn file_name(&self) -> String {
        format!("compiled-batch-{}-{}-{}.{}", self.x, self.y, self.z, BATCH_FILE_EXTENSION)
    }
}

/// Lists all batch files directly inside `dir` by their position. Files that do not follow the batch naming scheme
/// are skipped.
pub fn scan_batch_dir<P: AsRef<Path>>(dir: P) -> Result<FxHashMap<BatchPos, PathBuf>> {
    let dir = dir.as_ref();
    let mut found = FxHashMap::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| Error::Io { path: dir.to_path_buf(), source: io::Error::from(err) })?;
        if !entry.file_type().is_file() {
            continue;
        }

        match BatchPos::from_path(entry.path()) {
            Some(pos) => {
                found.insert(pos, entry.into_path());
            }
            None => debug!("skipping {}, not a batch file", entry.path().display()),
        }
    }

    debug!("found {} batch files in {}", found.len(), dir.display());
    Ok(found)
}
