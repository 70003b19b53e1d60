//! Reading, writing, diffing and patching of compiled optoctree batch files.
//!
//! A batch file holds a dense [`format::Root`] of 125 octrees. Patches ([`format::PatchRoot`]) carry only the
//! octrees that changed, grouped by batch position.

pub use error::{Error, Result};
pub use workspace::{build_patch, DiffOptions};

pub mod diff;
pub mod error;
pub mod format;
pub mod storage;
pub mod systems;
pub mod workspace;
