pub use apply::{apply_batch, apply_patch};
pub use differ::{diff, diff_batch};

mod apply;
mod differ;
