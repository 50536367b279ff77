//! Content hashing with blake3.
//!
//! Source files are hashed to skip unchanged documents; the template folder
//! is hashed as a whole so that a template edit re-renders everything.

use std::{fs, io, path::Path};
use walkdir::WalkDir;

/// Hex digest of a byte slice.
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hex digest of a file's content.
pub fn file_digest(path: &Path) -> io::Result<String> {
    Ok(digest(&fs::read(path)?))
}

/// Signature over every file below `dir` (relative path + content).
///
/// A missing folder hashes to the signature of an empty folder.
pub fn tree_signature(dir: &Path) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();

    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    for path in files {
        let relative = path.strip_prefix(dir).unwrap_or(&path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(&fs::read(&path)?);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
