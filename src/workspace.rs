use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::diff::diff_batch;
use crate::error::{Error, Result};
use crate::format::{BatchPos, PatchBatch, PatchRoot, Root};
use crate::storage::{load_root, scan_batch_dir};
use crate::systems::{BatchProcessor, JobSystem};

/// Settings for diffing two batch directories.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiffOptions {
    /// Number of worker threads loading and diffing batch pairs.
    pub workers: usize,
    /// Version written into the resulting patch.
    pub version: i32,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            workers: num_cpus::get(),
            version: 0,
        }
    }
}

/// Diffs every batch file in `new_dir` against the file of the same position in `old_dir` and collects all changes
/// into one patch. Batches without a counterpart in `old_dir` are diffed against an empty root. Batches that only
/// exist in `old_dir` cannot be expressed in a patch and are skipped.
///
/// Batches in the returned patch are ordered by position. The first batch that fails to load aborts the build.
pub fn build_patch<P: AsRef<Path>, Q: AsRef<Path>>(old_dir: P, new_dir: Q, options: &DiffOptions) -> Result<PatchRoot> {
    let old_files = scan_batch_dir(old_dir)?;
    let new_files = scan_batch_dir(new_dir)?;

    let mut removed: Vec<BatchPos> = old_files.keys()
        .filter(|pos| !new_files.contains_key(pos))
        .copied()
        .collect();
    removed.sort();
    for pos in removed {
        warn!("batch {} was removed, patches cannot delete batches", pos);
    }

    let job_system = JobSystem::new(options.workers);
    debug!("diffing {} batches on {} workers", new_files.len(), job_system.worker_count());

    let result = collect_batches(&job_system, old_files, new_files);
    job_system.stop();

    let mut batches = result?;
    batches.sort_by_key(PatchBatch::pos);

    info!("built patch v{} with {} changed batches", options.version, batches.len());
    Ok(PatchRoot::with_batches(options.version, batches))
}

fn collect_batches(
    job_system: &JobSystem,
    mut old_files: FxHashMap<BatchPos, PathBuf>,
    new_files: FxHashMap<BatchPos, PathBuf>,
) -> Result<Vec<PatchBatch>> {
    let mut processor = BatchProcessor::new(job_system);
    for (pos, new_path) in new_files {
        let old_path = old_files.remove(&pos);
        processor.enqueue(pos, move || diff_files(pos, old_path.as_deref(), &new_path));
    }

    let mut batches = Vec::new();
    while let Some(result) = processor.next_result() {
        match result.value {
            Ok(Some(batch)) => batches.push(batch),
            Ok(None) => debug!("batch {} is unchanged", result.pos),
            Err(err) => {
                processor.cancel_all();
                return Err(err);
            }
        }
    }

    // jobs only stay unfinished if they panicked
    if let Some(pos) = processor.unfinished().first() {
        return Err(Error::Worker(*pos));
    }
    Ok(batches)
}

fn diff_files(pos: BatchPos, old_path: Option<&Path>, new_path: &Path) -> Result<Option<PatchBatch>> {
    let new = load_root(new_path)?;
    let old = match old_path {
        Some(path) => load_root(path)?,
        None => Root::empty(new.version),
    };
    Ok(diff_batch(pos, &old, &new))
}
