use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::format::{decode_patch, decode_root, encode_patch, encode_root, PatchRoot, Root};

/// Reads the whole file at `path`.
pub fn read_bytes<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let size = file.metadata().map(|m| m.len() as usize).ok();
    let mut data = Vec::with_capacity(size.unwrap_or(0));
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// Writes `bytes` to `path`, creating the file or truncating an existing one.
pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

pub fn load_root<P: AsRef<Path>>(path: P) -> Result<Root> {
    let path = path.as_ref();
    let bytes = read_bytes(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let root = decode_root(&bytes).map_err(|source| Error::Decode { path: path.to_path_buf(), source })?;
    debug!("loaded root v{} from {}", root.version, path.display());
    Ok(root)
}

pub fn load_patch<P: AsRef<Path>>(path: P) -> Result<PatchRoot> {
    let path = path.as_ref();
    let bytes = read_bytes(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let patch = decode_patch(&bytes).map_err(|source| Error::Decode { path: path.to_path_buf(), source })?;
    debug!("loaded patch v{} from {}", patch.version, path.display());
    Ok(patch)
}

pub fn save_root<P: AsRef<Path>>(path: P, root: &Root) -> Result<()> {
    let path = path.as_ref();
    write_bytes(path, &encode_root(root)).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

pub fn save_patch<P: AsRef<Path>>(path: P, patch: &PatchRoot) -> Result<()> {
    let path = path.as_ref();
    write_bytes(path, &encode_patch(patch)).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}
