pub use error::{DecodeError, FormatError};
pub use patch::{decode_patch, encode_patch, encoded_patch_len};
pub use root::{decode_root, encode_root, encoded_root_len};
pub use types::*;

pub mod cursor;
pub mod error;
pub mod patch;
pub mod root;
pub mod types;
