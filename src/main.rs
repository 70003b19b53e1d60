use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use serde_json::{json, Value};

use optoctree::diff::{apply_patch, diff_batch};
use optoctree::format::{BatchPos, PatchRoot, Root};
use optoctree::storage::{load_patch, load_root, save_patch, save_root};
use optoctree::{build_patch, DiffOptions, Error, Result};

#[derive(Parser)]
#[command(name = "optoctree", about = "Inspect, diff and patch compiled optoctree batch files")]
struct Cli {
    /// Log more details, repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary of a batch or patch file
    Inspect {
        file: PathBuf,
        /// Read the file as patch instead of batch
        #[arg(long)]
        patch: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Diff two versions of one batch into a patch file
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Output patch file
        #[arg(long, short)]
        output: PathBuf,
        /// Batch position as x,y,z, taken from the file name of <NEW> if missing
        #[arg(long, value_parser = parse_pos, allow_hyphen_values = true)]
        pos: Option<BatchPos>,
        /// Version written into the patch
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        version: i32,
    },
    /// Diff two directories of batch files into one patch file
    DiffDir {
        old_dir: PathBuf,
        new_dir: PathBuf,
        /// Output patch file
        #[arg(long, short)]
        output: PathBuf,
        /// Worker threads, defaults to the number of cpus
        #[arg(long)]
        workers: Option<usize>,
        /// Version written into the patch
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        version: i32,
    },
    /// Apply the matching batch of a patch to a batch file
    Apply {
        root: PathBuf,
        patch: PathBuf,
        /// Output batch file
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn parse_pos(value: &str) -> std::result::Result<BatchPos, String> {
    let coords = value.split(',')
        .map(|part| part.trim().parse::<i16>().map_err(|err| format!("invalid coordinate {:?}: {}", part, err)))
        .collect::<std::result::Result<Vec<i16>, String>>()?;
    match coords[..] {
        [x, y, z] => Ok(BatchPos::new(x, y, z)),
        _ => Err(format!("expected three coordinates, got {}", coords.len())),
    }
}

fn position_of(path: &Path) -> Result<BatchPos> {
    BatchPos::from_path(path).ok_or_else(|| Error::MissingPosition(path.to_path_buf()))
}

fn root_summary(root: &Root) -> Value {
    let trees: Vec<Value> = root.trees().iter()
        .enumerate()
        .filter(|(_, tree)| !tree.is_empty())
        .map(|(slot, tree)| json!({ "slot": slot, "nodes": tree.node_count() }))
        .collect();
    json!({
        "version": root.version,
        "total_nodes": root.total_nodes(),
        "trees": trees,
    })
}

fn patch_summary(patch: &PatchRoot) -> Value {
    let batches: Vec<Value> = patch.batches().iter()
        .map(|batch| {
            let pos = batch.pos();
            let octrees: Vec<Value> = batch.octrees().iter()
                .map(|octree| json!({ "slot": octree.octree_number(), "nodes": octree.node_count() }))
                .collect();
            json!({ "pos": [pos.x, pos.y, pos.z], "octrees": octrees })
        })
        .collect();
    json!({
        "version": patch.version,
        "batches": batches,
    })
}

fn print_root(root: &Root) {
    println!("version: {}", root.version);
    println!("total nodes: {}", root.total_nodes());
    for (slot, tree) in root.trees().iter().enumerate().filter(|(_, tree)| !tree.is_empty()) {
        println!("  slot {:3}: {} nodes", slot, tree.node_count());
    }
}

fn print_patch(patch: &PatchRoot) {
    println!("version: {}", patch.version);
    println!("batches: {}", patch.batches().len());
    for batch in patch.batches() {
        println!("  batch {}: {} octrees", batch.pos(), batch.octree_count());
        for octree in batch.octrees() {
            println!("    slot {:3}: {} nodes", octree.octree_number(), octree.node_count());
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Inspect { file, patch: true, json } => {
            let patch = load_patch(&file)?;
            if json {
                println!("{}", patch_summary(&patch));
            } else {
                print_patch(&patch);
            }
        }
        Command::Inspect { file, patch: false, json } => {
            let root = load_root(&file)?;
            if json {
                println!("{}", root_summary(&root));
            } else {
                print_root(&root);
            }
        }
        Command::Diff { old, new, output, pos, version } => {
            let pos = match pos {
                Some(pos) => pos,
                None => position_of(&new)?,
            };
            let old_root = load_root(&old)?;
            let new_root = load_root(&new)?;

            let patch = PatchRoot::with_batches(version, diff_batch(pos, &old_root, &new_root).into_iter().collect());
            save_patch(&output, &patch)?;
            info!("wrote {} changed batches to {}", patch.batches().len(), output.display());
        }
        Command::DiffDir { old_dir, new_dir, output, workers, version } => {
            let mut options = DiffOptions { version, ..DiffOptions::default() };
            if let Some(workers) = workers {
                options.workers = workers;
            }

            let patch = build_patch(&old_dir, &new_dir, &options)?;
            save_patch(&output, &patch)?;
            info!("wrote {} changed batches to {}", patch.batches().len(), output.display());
        }
        Command::Apply { root, patch, output } => {
            let pos = position_of(&root)?;
            let base = load_root(&root)?;
            let patch = load_patch(&patch)?;

            let patched = apply_patch(&base, pos, &patch);
            save_root(&output, &patched)?;
            info!("wrote patched batch {} to {}", pos, output.display());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        error!("{}", err);
        process::exit(1);
    }
}
