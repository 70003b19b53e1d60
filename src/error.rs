use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::{BatchPos, DecodeError, FormatError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no batch position in file name of {}", .0.display())]
    MissingPosition(PathBuf),
    #[error("diff worker stopped before reporting batch {0}")]
    Worker(BatchPos),
}

pub type Result<T> = std::result::Result<T, Error>;
