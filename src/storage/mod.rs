pub use batch_files::{BATCH_FILE_EXTENSION, scan_batch_dir};
pub use files::{load_patch, load_root, read_bytes, save_patch, save_root, write_bytes};

pub mod batch_files;
pub mod files;
