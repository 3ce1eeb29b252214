//! MD5 content hashing for add-on archives.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

use crate::vfs::{SearchPath, VfsError};

/// Read buffer size for hashing.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Returns the lowercase hex MD5 digest of everything `reader` yields.
pub fn md5_hex<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hashes a real file on disk.
///
/// Directories (loose add-ons) have no single content stream and hash to
/// an empty string.
pub fn md5_from_file(path: &Path) -> io::Result<String> {
    if path.is_dir() {
        return Ok(String::new());
    }
    md5_hex(File::open(path)?)
}

/// Hashes a file through the search path.
pub fn md5_from_search_path(search_path: &SearchPath, vpath: &str) -> Result<String, VfsError> {
    let reader = search_path.open(vpath)?;
    Ok(md5_hex(reader)?)
}
